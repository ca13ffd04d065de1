use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect},
    routing::{delete, get, post},
};
use serde::Deserialize;
use sqlx::FromRow;
use std::collections::HashMap;

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::{Item, User, Wishlist};

#[derive(Template)]
#[template(path = "wishlists/list.html")]
struct WishlistListTemplate {
    wishlists: Vec<WishlistView>,

    user: Option<User>,
}

#[derive(Template)]
#[template(path = "wishlists/form.html")]
struct WishlistFormTemplate {
    wishlist: Option<Wishlist>,
    errors: HashMap<String, String>,

    user: Option<User>,
}

#[derive(Template)]
#[template(path = "wishlists/show.html")]
struct WishlistShowTemplate {
    wishlist: Wishlist,
    items: Vec<Item>,
    public_path: String,

    user: Option<User>,
}

struct WishlistView {
    id: String,
    name: String,
    public_path: String,
    item_count: i64,
}

/// Wishlist with item count for queries that join with items
#[derive(FromRow)]
struct WishlistWithCount {
    // Wishlist fields
    id: String,
    owner_id: String,
    name: String,
    code: String,
    cover_image: Option<String>,
    created_at: String,
    updated_at: String,
    // Extra field
    item_count: i64,
}

impl WishlistWithCount {
    fn into_wishlist_and_count(self) -> (Wishlist, i64) {
        let wishlist = Wishlist {
            id: self.id,
            owner_id: self.owner_id,
            name: self.name,
            code: self.code,
            cover_image: self.cover_image,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        (wishlist, self.item_count)
    }
}

#[derive(Deserialize)]
pub struct WishlistForm {
    name: String,
}

fn validate_wishlist_form(form: &WishlistForm) -> HashMap<String, String> {
    let mut errors = HashMap::new();

    if form.name.trim().is_empty() {
        errors.insert("name".to_string(), "Name is required".to_string());
    }

    if form.name.len() > 200 {
        errors.insert("name".to_string(), "Name must be under 200 characters".to_string());
    }

    errors
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_wishlists))
        .route("/wishlists", get(list_wishlists))
        .route("/wishlists/new", get(new_wishlist_form))
        .route("/wishlists", post(create_wishlist))
        .route("/wishlists/{id}", get(show_wishlist))
        .route("/wishlists/{id}/edit", get(edit_wishlist_form))
        .route("/wishlists/{id}", post(update_wishlist))
        .route("/wishlists/{id}", delete(delete_wishlist))
}

async fn list_wishlists(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let wishlists: Vec<WishlistWithCount> = sqlx::query_as(
        r#"
        SELECT w.*, COUNT(i.id) as item_count
        FROM wishlists w
        LEFT JOIN items i ON i.wishlist_id = w.id
        WHERE w.owner_id = ?
        GROUP BY w.id
        ORDER BY w.name
        "#,
    )
    .bind(&user.id)
    .fetch_all(&state.db)
    .await
    .unwrap_or_default();

    let views: Vec<WishlistView> = wishlists
        .into_iter()
        .map(|wwc| {
            let (w, count) = wwc.into_wishlist_and_count();
            WishlistView {
                public_path: w.public_path(),
                id: w.id,
                name: w.name,
                item_count: count,
            }
        })
        .collect();

    let template = WishlistListTemplate {
        wishlists: views,

        user: Some(user),
    };
    Ok(Html(template.render()?))
}

async fn new_wishlist_form(AuthUser(user): AuthUser) -> Result<impl IntoResponse, AppError> {
    let template = WishlistFormTemplate {
        wishlist: None,
        errors: HashMap::new(),

        user: Some(user),
    };
    Ok(Html(template.render()?))
}

async fn create_wishlist(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Form(form): Form<WishlistForm>,
) -> Result<impl IntoResponse, AppError> {
    let errors = validate_wishlist_form(&form);
    if !errors.is_empty() {
        let template = WishlistFormTemplate {
            wishlist: None,
            errors,
            user: Some(user),
        };
        return Ok(Html(template.render()?).into_response());
    }

    // Derived from the owner's email, unique across all wishlists.
    let code = Wishlist::assign_unique_code(&state.db, &user.email).await?;
    let wishlist = Wishlist::new(user.id, form.name, code);

    sqlx::query(
        "INSERT INTO wishlists (id, owner_id, name, code, cover_image, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&wishlist.id)
    .bind(&wishlist.owner_id)
    .bind(&wishlist.name)
    .bind(&wishlist.code)
    .bind(&wishlist.cover_image)
    .bind(&wishlist.created_at)
    .bind(&wishlist.updated_at)
    .execute(&state.db)
    .await?;

    Ok(Redirect::to("/wishlists").into_response())
}

async fn show_wishlist(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let wishlist: Option<Wishlist> = sqlx::query_as(
        "SELECT * FROM wishlists WHERE id = ? AND owner_id = ?",
    )
    .bind(&id)
    .bind(&user.id)
    .fetch_optional(&state.db)
    .await?;

    let Some(wishlist) = wishlist else {
        return Ok(Redirect::to("/wishlists").into_response());
    };

    let items: Vec<Item> = sqlx::query_as(
        "SELECT * FROM items WHERE wishlist_id = ? ORDER BY created_at",
    )
    .bind(&id)
    .fetch_all(&state.db)
    .await
    .unwrap_or_default();

    let template = WishlistShowTemplate {
        public_path: wishlist.public_path(),
        wishlist,
        items,

        user: Some(user),
    };
    Ok(Html(template.render()?).into_response())
}

async fn edit_wishlist_form(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let wishlist: Option<Wishlist> = sqlx::query_as(
        "SELECT * FROM wishlists WHERE id = ? AND owner_id = ?",
    )
    .bind(&id)
    .bind(&user.id)
    .fetch_optional(&state.db)
    .await?;

    let Some(wishlist) = wishlist else {
        return Ok(Redirect::to("/wishlists").into_response());
    };

    let template = WishlistFormTemplate {
        wishlist: Some(wishlist),
        errors: HashMap::new(),

        user: Some(user),
    };
    Ok(Html(template.render()?).into_response())
}

async fn update_wishlist(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Form(form): Form<WishlistForm>,
) -> Result<impl IntoResponse, AppError> {
    let errors = validate_wishlist_form(&form);
    if !errors.is_empty() {
        let wishlist: Option<Wishlist> = sqlx::query_as(
            "SELECT * FROM wishlists WHERE id = ? AND owner_id = ?",
        )
        .bind(&id)
        .bind(&user.id)
        .fetch_optional(&state.db)
        .await?;

        let template = WishlistFormTemplate {
            wishlist,
            errors,
            user: Some(user),
        };
        return Ok(Html(template.render()?).into_response());
    }

    let now = chrono::Utc::now().to_rfc3339();

    // The code never changes after creation, only the display name does.
    sqlx::query("UPDATE wishlists SET name = ?, updated_at = ? WHERE id = ? AND owner_id = ?")
        .bind(&form.name)
        .bind(&now)
        .bind(&id)
        .bind(&user.id)
        .execute(&state.db)
        .await?;

    Ok(Redirect::to("/wishlists").into_response())
}

async fn delete_wishlist(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    // Items go with the wishlist via ON DELETE CASCADE.
    sqlx::query("DELETE FROM wishlists WHERE id = ? AND owner_id = ?")
        .bind(&id)
        .bind(&user.id)
        .execute(&state.db)
        .await?;

    Ok(([("HX-Redirect", "/wishlists")], ""))
}
