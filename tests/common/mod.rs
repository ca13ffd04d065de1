use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use http_body_util::BodyExt;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

use giftwish::media::MediaStore;
use giftwish::scrape::{ProductData, ProductScraper};

/// Scraper stand-in for tests: returns canned data and counts page fetches.
#[derive(Default)]
pub struct FakeScraper {
    pub data: ProductData,
    pub image: Option<Vec<u8>>,
    pub scrape_calls: AtomicUsize,
}

#[async_trait::async_trait]
impl ProductScraper for FakeScraper {
    async fn scrape(&self, _url: &str) -> ProductData {
        self.scrape_calls.fetch_add(1, Ordering::SeqCst);
        self.data.clone()
    }

    async fn fetch_image(&self, _image_url: &str, _referer: &str) -> Option<Vec<u8>> {
        self.image.clone()
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: SqlitePool,
    pub media_root: PathBuf,
    _media_dir: tempfile::TempDir,
}

impl TestApp {
    /// App with a scraper that always returns the empty record.
    pub async fn new() -> Self {
        Self::with_scraper(Arc::new(FakeScraper::default())).await
    }

    pub async fn with_scraper(scraper: Arc<dyn ProductScraper>) -> Self {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .expect("Failed to create in-memory SQLite pool");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        let media_dir = tempfile::tempdir().expect("Failed to create media dir");
        let media_root = media_dir.path().to_path_buf();
        let media = Arc::new(MediaStore::new(&media_root));

        let router = giftwish::build_app_with(pool.clone(), false, scraper, media).await;

        Self {
            router,
            db: pool,
            media_root,
            _media_dir: media_dir,
        }
    }

    /// Send a request through the app and return the response.
    pub async fn request(&self, req: Request<Body>) -> Response {
        tower::ServiceExt::oneshot(self.router.clone(), req)
            .await
            .unwrap()
    }

    /// Create a user in the database and return their id.
    pub async fn create_user(&self, name: &str, email: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO users (id, name, email, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(name)
        .bind(email)
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await
        .expect("Failed to create test user");

        id
    }

    /// Log in as the given user and return the session cookie string.
    pub async fn login(&self, email: &str) -> String {
        let body = format!("email={}", email.replace('@', "%40"));
        let req = Request::builder()
            .uri("/login")
            .method("POST")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();

        let resp = self.request(req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);

        resp.headers()
            .get("set-cookie")
            .expect("Login should set a session cookie")
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string()
    }

    /// Create a wishlist row directly and return its id.
    pub async fn create_wishlist(&self, owner_id: &str, name: &str, code: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO wishlists (id, owner_id, name, code, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(owner_id)
        .bind(name)
        .bind(code)
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await
        .expect("Failed to create test wishlist");

        id
    }

    /// Create an item row directly and return its id.
    pub async fn create_item(&self, wishlist_id: &str, title: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO items (id, wishlist_id, title, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(wishlist_id)
        .bind(title)
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await
        .expect("Failed to create test item");

        id
    }

    /// Fetch an item's reservation fields as (is_reserved, reserved_by).
    pub async fn reservation_state(&self, item_id: &str) -> (bool, Option<String>) {
        sqlx::query_as("SELECT is_reserved, reserved_by FROM items WHERE id = ?")
            .bind(item_id)
            .fetch_one(&self.db)
            .await
            .expect("Item should exist")
    }

    /// Send a GET request with an optional session cookie.
    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        let req = builder.body(Body::empty()).unwrap();
        self.request(req).await
    }

    /// Send a POST form request with an optional session cookie.
    pub async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder()
            .uri(uri)
            .method("POST")
            .header("content-type", "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        let req = builder.body(Body::from(body.to_string())).unwrap();
        self.request(req).await
    }

    /// Send a DELETE request with an optional session cookie.
    pub async fn delete(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(uri).method("DELETE");
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        let req = builder.body(Body::empty()).unwrap();
        self.request(req).await
    }
}

/// Read the full response body as a String.
pub async fn body_string(resp: Response) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Assert that a response is a redirect to the given location.
pub fn assert_redirect(resp: &Response, expected_location: &str) {
    assert!(
        resp.status().is_redirection(),
        "Expected redirect, got {}",
        resp.status()
    );
    let location = resp
        .headers()
        .get("location")
        .expect("Redirect should have location header")
        .to_str()
        .unwrap();
    assert_eq!(location, expected_location);
}

/// Assert that an HX-Redirect header points to the expected location.
pub fn assert_hx_redirect(resp: &Response, expected_location: &str) {
    let hx = resp
        .headers()
        .get("hx-redirect")
        .expect("Expected HX-Redirect header")
        .to_str()
        .unwrap();
    assert_eq!(hx, expected_location);
}
