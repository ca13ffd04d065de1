use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect},
    routing::{delete, get, post},
};
use serde::Deserialize;
use std::collections::HashMap;

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::{Item, User, Wishlist};
use crate::reservation::{self, ReservationError};

#[derive(Template)]
#[template(path = "items/form.html")]
struct ItemFormTemplate {
    item: Option<Item>,
    wishlist_id: String,
    errors: HashMap<String, String>,

    user: Option<User>,
}

#[derive(Deserialize)]
pub struct ItemForm {
    title: String,
    url: Option<String>,
    price: Option<String>,
    description: Option<String>,
}

/// Form fields after validation, with the price parsed and empty strings
/// collapsed to None.
#[derive(Debug)]
pub struct ItemInput {
    pub title: String,
    pub url: Option<String>,
    pub price: Option<f64>,
    pub description: Option<String>,
}

fn validate_item_form(form: &ItemForm) -> Result<ItemInput, HashMap<String, String>> {
    let mut errors = HashMap::new();

    if form.title.trim().is_empty() {
        errors.insert("title".to_string(), "Title is required".to_string());
    }

    if form.title.len() > 200 {
        errors.insert("title".to_string(), "Title must be under 200 characters".to_string());
    }

    let url = form
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string);
    if let Some(u) = &url {
        match url::Url::parse(u) {
            Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => {}
            _ => {
                errors.insert("url".to_string(), "URL must start with http:// or https://".to_string());
            }
        }
    }

    let price_field = form
        .price
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());
    let price = match price_field {
        Some(raw) => match raw.replace(',', ".").parse::<f64>() {
            Ok(value) if value >= 0.0 => Some(value),
            _ => {
                errors.insert("price".to_string(), "Price must be a non-negative number".to_string());
                None
            }
        },
        None => None,
    };

    let description = form
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    if errors.is_empty() {
        Ok(ItemInput {
            title: form.title.trim().to_string(),
            url,
            price,
            description,
        })
    } else {
        Err(errors)
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/wishlists/{id}/items/new", get(new_item_form))
        .route("/wishlists/{id}/items", post(create_item))
        .route("/items/{id}/edit", get(edit_item_form))
        .route("/items/{id}", post(update_item))
        .route("/items/{id}", delete(delete_item))
        .route("/items/{id}/reserve", post(reserve_item))
        .route("/items/{id}/cancel", post(cancel_reservation))
}

async fn owned_wishlist(
    state: &AppState,
    wishlist_id: &str,
    owner_id: &str,
) -> Result<Option<Wishlist>, AppError> {
    let wishlist = sqlx::query_as("SELECT * FROM wishlists WHERE id = ? AND owner_id = ?")
        .bind(wishlist_id)
        .bind(owner_id)
        .fetch_optional(&state.db)
        .await?;
    Ok(wishlist)
}

async fn owned_item(
    state: &AppState,
    item_id: &str,
    owner_id: &str,
) -> Result<Option<Item>, AppError> {
    let item = sqlx::query_as(
        r#"
        SELECT i.* FROM items i
        JOIN wishlists w ON w.id = i.wishlist_id
        WHERE i.id = ? AND w.owner_id = ?
        "#,
    )
    .bind(item_id)
    .bind(owner_id)
    .fetch_optional(&state.db)
    .await?;
    Ok(item)
}

/// Best-effort enrichment from the source page. Non-empty scraped fields win
/// over the form's; every failure is swallowed so the save always proceeds.
async fn apply_scraped_data(state: &AppState, item: &mut Item, source_url: &str) {
    let data = state.scraper.scrape(source_url).await;

    if let Some(title) = data.title {
        item.title = title;
    }
    if let Some(price) = data.price {
        item.price = Some(price);
    }
    if let Some(description) = data.description {
        item.description = Some(description);
    }

    if let Some(image_url) = data.image_url {
        if let Some(bytes) = state.scraper.fetch_image(&image_url, source_url).await {
            match state.media.save(&bytes, "jpg") {
                Ok(filename) => item.image = Some(filename),
                Err(e) => tracing::warn!("Failed to store scraped image: {e}"),
            }
        }
    }
}

async fn new_item_form(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(wishlist_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if owned_wishlist(&state, &wishlist_id, &user.id).await?.is_none() {
        return Ok(Redirect::to("/wishlists").into_response());
    }

    let template = ItemFormTemplate {
        item: None,
        wishlist_id,
        errors: HashMap::new(),

        user: Some(user),
    };
    Ok(Html(template.render()?).into_response())
}

async fn create_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(wishlist_id): Path<String>,
    Form(form): Form<ItemForm>,
) -> Result<impl IntoResponse, AppError> {
    let Some(wishlist) = owned_wishlist(&state, &wishlist_id, &user.id).await? else {
        return Ok(Redirect::to("/wishlists").into_response());
    };

    let input = match validate_item_form(&form) {
        Ok(input) => input,
        Err(errors) => {
            let template = ItemFormTemplate {
                item: None,
                wishlist_id,
                errors,
                user: Some(user),
            };
            return Ok(Html(template.render()?).into_response());
        }
    };

    let mut item = Item::new(wishlist.id.clone(), input.title);
    item.url = input.url;
    item.price = input.price;
    item.description = input.description;

    if let Some(source_url) = item.url.clone() {
        apply_scraped_data(&state, &mut item, &source_url).await;
    }

    sqlx::query(
        r#"
        INSERT INTO items (id, wishlist_id, title, url, price, image, description, is_reserved, reserved_by, reserved_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, 0, NULL, NULL, ?, ?)
        "#,
    )
    .bind(&item.id)
    .bind(&item.wishlist_id)
    .bind(&item.title)
    .bind(&item.url)
    .bind(item.price)
    .bind(&item.image)
    .bind(&item.description)
    .bind(&item.created_at)
    .bind(&item.updated_at)
    .execute(&state.db)
    .await?;

    Ok(Redirect::to(&format!("/wishlists/{}", wishlist.id)).into_response())
}

async fn edit_item_form(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let Some(item) = owned_item(&state, &id, &user.id).await? else {
        return Ok(Redirect::to("/wishlists").into_response());
    };

    let template = ItemFormTemplate {
        wishlist_id: item.wishlist_id.clone(),
        item: Some(item),
        errors: HashMap::new(),

        user: Some(user),
    };
    Ok(Html(template.render()?).into_response())
}

async fn update_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Form(form): Form<ItemForm>,
) -> Result<impl IntoResponse, AppError> {
    let Some(mut item) = owned_item(&state, &id, &user.id).await? else {
        return Ok(Redirect::to("/wishlists").into_response());
    };

    let input = match validate_item_form(&form) {
        Ok(input) => input,
        Err(errors) => {
            let template = ItemFormTemplate {
                wishlist_id: item.wishlist_id.clone(),
                item: Some(item),
                errors,
                user: Some(user),
            };
            return Ok(Html(template.render()?).into_response());
        }
    };

    let old_url = item.url.clone();
    item.title = input.title;
    item.url = input.url;
    item.price = input.price;
    item.description = input.description;

    // Re-scrape only when the source URL actually changed.
    if let Some(source_url) = item.url.clone() {
        if old_url.as_deref() != Some(source_url.as_str()) {
            apply_scraped_data(&state, &mut item, &source_url).await;
        }
    }

    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        UPDATE items
        SET title = ?, url = ?, price = ?, image = ?, description = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&item.title)
    .bind(&item.url)
    .bind(item.price)
    .bind(&item.image)
    .bind(&item.description)
    .bind(&now)
    .bind(&id)
    .execute(&state.db)
    .await?;

    Ok(Redirect::to(&format!("/items/{}", id)).into_response())
}

async fn delete_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let Some(item) = owned_item(&state, &id, &user.id).await? else {
        return Ok(([("HX-Redirect", "/wishlists".to_string())], "").into_response());
    };

    sqlx::query("DELETE FROM items WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;

    let location = format!("/wishlists/{}", item.wishlist_id);
    Ok(([("HX-Redirect", location)], "").into_response())
}

/// The item's parent wishlist, whose public page is the safe view that
/// reservation outcomes redirect back to.
async fn parent_wishlist(state: &AppState, item_id: &str) -> Result<Option<Wishlist>, AppError> {
    let wishlist = sqlx::query_as(
        r#"
        SELECT w.* FROM wishlists w
        JOIN items i ON i.wishlist_id = w.id
        WHERE i.id = ?
        "#,
    )
    .bind(item_id)
    .fetch_optional(&state.db)
    .await?;
    Ok(wishlist)
}

fn redirect_outcome(back: &str, outcome: Result<(), ReservationError>) -> Redirect {
    match outcome {
        Ok(()) => Redirect::to(back),
        Err(ReservationError::Conflict) => Redirect::to(&format!("{back}?error=reserved")),
        Err(ReservationError::Unauthorized) => Redirect::to(&format!("{back}?error=not-holder")),
    }
}

async fn reserve_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let Some(wishlist) = parent_wishlist(&state, &id).await? else {
        return Err(AppError::NotFound);
    };
    let back = wishlist.public_path();

    // The workflow, not the state machine, keeps owners from reserving
    // their own items.
    if wishlist.owner_id == user.id {
        return Ok(Redirect::to(&format!("{back}?error=own-item")));
    }

    let outcome = reservation::reserve(&state.db, &id, &user.id).await?;
    Ok(redirect_outcome(&back, outcome))
}

async fn cancel_reservation(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let Some(wishlist) = parent_wishlist(&state, &id).await? else {
        return Err(AppError::NotFound);
    };
    let back = wishlist.public_path();

    let outcome = reservation::cancel(&state.db, &id, &user.id).await?;
    Ok(redirect_outcome(&back, outcome))
}
