use askama::Template;
use axum::{
    Router,
    extract::{Path, Query, State},
    response::{Html, IntoResponse},
    routing::get,
};
use serde::Deserialize;
use sqlx::FromRow;

use crate::AppState;
use crate::auth::{AuthUser, MaybeUser};
use crate::error::AppError;
use crate::models::{Item, Share, User, Wishlist};
use crate::reservation::ReservationError;

#[derive(Template)]
#[template(path = "public/wishlist.html")]
struct PublicWishlistTemplate {
    wishlist: Wishlist,
    items: Vec<PublicItemView>,
    is_owner: bool,
    message: Option<String>,

    user: Option<User>,
}

#[derive(Template)]
#[template(path = "public/item.html")]
struct PublicItemTemplate {
    item: PublicItemView,
    wishlist: Wishlist,
    is_owner: bool,

    user: Option<User>,
}

#[derive(Template)]
#[template(path = "shared.html")]
struct SharedListTemplate {
    wishlists: Vec<SharedView>,

    user: Option<User>,
}

pub struct PublicItemView {
    pub id: String,
    pub title: String,
    pub url: Option<String>,
    pub price: Option<f64>,
    pub image: Option<String>,
    pub description: Option<String>,
    pub is_reserved: bool,
    pub reserved_by_viewer: bool,
}

impl PublicItemView {
    fn build(item: Item, viewer: Option<&User>) -> Self {
        let reserved_by_viewer = match (&item.reserved_by, viewer) {
            (Some(holder), Some(user)) => *holder == user.id,
            _ => false,
        };
        Self {
            id: item.id,
            title: item.title,
            url: item.url,
            price: item.price,
            image: item.image,
            description: item.description,
            is_reserved: item.is_reserved,
            reserved_by_viewer,
        }
    }
}

/// Wishlist shared with the viewer, with the owner's name for display
#[derive(FromRow)]
struct SharedRow {
    id: String,
    owner_id: String,
    name: String,
    code: String,
    cover_image: Option<String>,
    created_at: String,
    updated_at: String,
    owner_name: String,
    shared_at: String,
}

struct SharedView {
    name: String,
    owner_name: String,
    public_path: String,
    shared_at: String,
}

#[derive(Deserialize)]
pub struct PublicPageQuery {
    error: Option<String>,
}

fn error_message(code: &str) -> Option<String> {
    let message = match code {
        "reserved" => ReservationError::Conflict.message(),
        "not-holder" => ReservationError::Unauthorized.message(),
        "own-item" => "You can't reserve items from your own wishlist.",
        _ => return None,
    };
    Some(message.to_string())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/w/{code}", get(public_wishlist))
        .route("/w/{code}/{slug}", get(public_wishlist_with_slug))
        .route("/items/{id}", get(public_item))
        .route("/shared", get(shared_with_me))
}

/// Deep links by code alone resolve too; the slug is cosmetic.
async fn public_wishlist(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(code): Path<String>,
    Query(query): Query<PublicPageQuery>,
) -> Result<impl IntoResponse, AppError> {
    render_public_wishlist(state, viewer, code, query).await
}

async fn public_wishlist_with_slug(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path((code, _slug)): Path<(String, String)>,
    Query(query): Query<PublicPageQuery>,
) -> Result<impl IntoResponse, AppError> {
    render_public_wishlist(state, viewer, code, query).await
}

async fn render_public_wishlist(
    state: AppState,
    viewer: Option<User>,
    code: String,
    query: PublicPageQuery,
) -> Result<Html<String>, AppError> {
    let wishlist: Option<Wishlist> = sqlx::query_as("SELECT * FROM wishlists WHERE code = ?")
        .bind(&code)
        .fetch_optional(&state.db)
        .await?;

    let Some(wishlist) = wishlist else {
        return Err(AppError::NotFound);
    };

    let is_owner = viewer
        .as_ref()
        .is_some_and(|user| user.id == wishlist.owner_id);

    // First view by a signed-in non-owner lands in the sharing ledger; the
    // UNIQUE (wishlist_id, user_id) pair makes repeat views no-ops.
    if let Some(user) = viewer.as_ref().filter(|_| !is_owner) {
        let share = Share::new(wishlist.id.clone(), user.id.clone());
        sqlx::query(
            "INSERT OR IGNORE INTO shares (id, wishlist_id, user_id, shared_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&share.id)
        .bind(&share.wishlist_id)
        .bind(&share.user_id)
        .bind(&share.shared_at)
        .execute(&state.db)
        .await?;
    }

    let items: Vec<Item> = sqlx::query_as(
        "SELECT * FROM items WHERE wishlist_id = ? ORDER BY created_at",
    )
    .bind(&wishlist.id)
    .fetch_all(&state.db)
    .await
    .unwrap_or_default();

    let item_views = items
        .into_iter()
        .map(|item| PublicItemView::build(item, viewer.as_ref()))
        .collect();

    let template = PublicWishlistTemplate {
        wishlist,
        items: item_views,
        is_owner,
        message: query.error.as_deref().and_then(error_message),

        user: viewer,
    };
    Ok(Html(template.render()?))
}

async fn public_item(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let item: Option<Item> = sqlx::query_as("SELECT * FROM items WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?;

    let Some(item) = item else {
        return Err(AppError::NotFound);
    };

    let wishlist: Wishlist = sqlx::query_as("SELECT * FROM wishlists WHERE id = ?")
        .bind(&item.wishlist_id)
        .fetch_one(&state.db)
        .await?;

    let is_owner = viewer
        .as_ref()
        .is_some_and(|user| user.id == wishlist.owner_id);

    let template = PublicItemTemplate {
        item: PublicItemView::build(item, viewer.as_ref()),
        wishlist,
        is_owner,

        user: viewer,
    };
    Ok(Html(template.render()?))
}

/// "Shared with me": every wishlist the viewer has been shown, newest first.
async fn shared_with_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let rows: Vec<SharedRow> = sqlx::query_as(
        r#"
        SELECT w.*, u.name as owner_name, s.shared_at
        FROM shares s
        JOIN wishlists w ON w.id = s.wishlist_id
        JOIN users u ON u.id = w.owner_id
        WHERE s.user_id = ?
        ORDER BY s.shared_at DESC
        "#,
    )
    .bind(&user.id)
    .fetch_all(&state.db)
    .await
    .unwrap_or_default();

    let views = rows
        .into_iter()
        .map(|row| {
            let wishlist = Wishlist {
                id: row.id,
                owner_id: row.owner_id,
                name: row.name,
                code: row.code,
                cover_image: row.cover_image,
                created_at: row.created_at,
                updated_at: row.updated_at,
            };
            SharedView {
                public_path: wishlist.public_path(),
                name: wishlist.name,
                owner_name: row.owner_name,
                shared_at: row.shared_at,
            }
        })
        .collect();

    let template = SharedListTemplate {
        wishlists: views,

        user: Some(user),
    };
    Ok(Html(template.render()?))
}
