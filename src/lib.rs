pub mod auth;
pub mod cli;
pub mod db;
pub mod error;
pub mod media;
pub mod models;
pub mod reservation;
pub mod routes;
pub mod scrape;

pub const STATIC_HASH: &str = env!("STATIC_HASH");

use std::sync::Arc;

use axum::http::{HeaderValue, header};
use axum::{Router, routing::get};
use sqlx::SqlitePool;
use time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tower_sessions::{Expiry, SessionManagerLayer, cookie::SameSite};
use tower_sessions_sqlx_store::SqliteStore;
use tracing::Level;

use crate::media::MediaStore;
use crate::scrape::{HttpScraper, ProductScraper};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub scraper: Arc<dyn ProductScraper>,
    pub media: Arc<MediaStore>,
}

async fn health() -> &'static str {
    "ok"
}

/// Build the full Axum application router with the default HTTP scraper and
/// media directory.
///
/// Caller is responsible for running database migrations on `pool` beforehand.
pub async fn build_app(pool: SqlitePool, secure_cookies: bool) -> Router {
    build_app_with(
        pool,
        secure_cookies,
        Arc::new(HttpScraper::default()),
        Arc::new(MediaStore::new("data/media")),
    )
    .await
}

/// Same as [`build_app`] but with an injected scraper and media store, so
/// tests can run without touching the network or a shared directory.
pub async fn build_app_with(
    pool: SqlitePool,
    secure_cookies: bool,
    scraper: Arc<dyn ProductScraper>,
    media: Arc<MediaStore>,
) -> Router {
    let session_store = SqliteStore::new(pool.clone());
    session_store
        .migrate()
        .await
        .expect("Failed to migrate session store");

    let session_layer = SessionManagerLayer::new(session_store)
        .with_expiry(Expiry::OnInactivity(Duration::days(30)))
        .with_secure(secure_cookies)
        .with_http_only(true)
        .with_same_site(SameSite::Lax);

    let media_dir = media.root().clone();
    let state = AppState {
        db: pool,
        scraper,
        media,
    };

    Router::new()
        .route("/health", get(health))
        .merge(routes::auth::router())
        .merge(routes::wishlists::router())
        .merge(routes::items::router())
        .merge(routes::public::router())
        .nest_service(
            "/static",
            ServiceBuilder::new()
                .layer(SetResponseHeaderLayer::overriding(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("public, max-age=86400"),
                ))
                .service(ServeDir::new("static")),
        )
        .nest_service("/media", ServeDir::new(media_dir))
        .layer(session_layer)
        .layer(
            TraceLayer::new_for_http()
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
