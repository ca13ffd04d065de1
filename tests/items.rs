mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::http::StatusCode;
use common::{FakeScraper, TestApp, assert_redirect, body_string};
use giftwish::scrape::ProductData;

#[tokio::test]
async fn create_item_without_url_uses_form_fields() {
    let app = TestApp::new().await;
    let owner_id = app.create_user("Alice", "alice@example.com").await;
    let cookie = app.login("alice@example.com").await;
    let wishlist_id = app.create_wishlist(&owner_id, "Books", "alice").await;

    let body = "title=A+novel&url=&price=12%2C50&description=Hardcover";
    let resp = app
        .post_form(&format!("/wishlists/{}/items", wishlist_id), body, Some(&cookie))
        .await;
    assert_redirect(&resp, &format!("/wishlists/{}", wishlist_id));

    let (title, price, description): (String, Option<f64>, Option<String>) =
        sqlx::query_as("SELECT title, price, description FROM items")
            .fetch_one(&app.db)
            .await
            .unwrap();
    assert_eq!(title, "A novel");
    assert_eq!(price, Some(12.5));
    assert_eq!(description.as_deref(), Some("Hardcover"));
}

#[tokio::test]
async fn create_item_empty_title_shows_error() {
    let app = TestApp::new().await;
    let owner_id = app.create_user("Alice", "alice@example.com").await;
    let cookie = app.login("alice@example.com").await;
    let wishlist_id = app.create_wishlist(&owner_id, "Books", "alice").await;

    let body = "title=&url=&price=&description=";
    let resp = app
        .post_form(&format!("/wishlists/{}/items", wishlist_id), body, Some(&cookie))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_string(resp).await;
    assert!(html.contains("Title is required"));
}

#[tokio::test]
async fn create_item_rejects_bad_url_and_negative_price() {
    let app = TestApp::new().await;
    let owner_id = app.create_user("Alice", "alice@example.com").await;
    let cookie = app.login("alice@example.com").await;
    let wishlist_id = app.create_wishlist(&owner_id, "Books", "alice").await;

    let body = "title=Thing&url=ftp%3A%2F%2Fexample.com&price=-5&description=";
    let resp = app
        .post_form(&format!("/wishlists/{}/items", wishlist_id), body, Some(&cookie))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_string(resp).await;
    assert!(html.contains("URL must start with http"));
    assert!(html.contains("Price must be a non-negative number"));
}

#[tokio::test]
async fn scraped_fields_override_form_fields() {
    let scraper = Arc::new(FakeScraper {
        data: ProductData {
            title: Some("Scraped Bicycle".to_string()),
            price: Some(1500.0),
            image_url: Some("https://cdn.example.com/bike.jpg".to_string()),
            description: Some("A very nice bike".to_string()),
        },
        image: Some(b"jpegbytes".to_vec()),
        ..FakeScraper::default()
    });
    let app = TestApp::with_scraper(scraper).await;
    let owner_id = app.create_user("Alice", "alice@example.com").await;
    let cookie = app.login("alice@example.com").await;
    let wishlist_id = app.create_wishlist(&owner_id, "Wheels", "alice").await;

    let body = "title=My+guess&url=https%3A%2F%2Fshop.example%2Fbike&price=10&description=";
    let resp = app
        .post_form(&format!("/wishlists/{}/items", wishlist_id), body, Some(&cookie))
        .await;
    assert_redirect(&resp, &format!("/wishlists/{}", wishlist_id));

    let (title, price, image, description): (String, Option<f64>, Option<String>, Option<String>) =
        sqlx::query_as("SELECT title, price, image, description FROM items")
            .fetch_one(&app.db)
            .await
            .unwrap();
    assert_eq!(title, "Scraped Bicycle");
    assert_eq!(price, Some(1500.0));
    assert_eq!(description.as_deref(), Some("A very nice bike"));

    let image = image.expect("Scraped image should be stored");
    let stored = std::fs::read(app.media_root.join(&image)).unwrap();
    assert_eq!(stored, b"jpegbytes");
}

#[tokio::test]
async fn failed_extraction_keeps_form_fields() {
    // The default FakeScraper returns the empty record, the same outcome as
    // a network failure or unparseable page.
    let app = TestApp::new().await;
    let owner_id = app.create_user("Alice", "alice@example.com").await;
    let cookie = app.login("alice@example.com").await;
    let wishlist_id = app.create_wishlist(&owner_id, "Wheels", "alice").await;

    let body = "title=My+guess&url=https%3A%2F%2Fdead.example%2Fgone&price=10&description=";
    let resp = app
        .post_form(&format!("/wishlists/{}/items", wishlist_id), body, Some(&cookie))
        .await;
    assert_redirect(&resp, &format!("/wishlists/{}", wishlist_id));

    let (title, price, image): (String, Option<f64>, Option<String>) =
        sqlx::query_as("SELECT title, price, image FROM items")
            .fetch_one(&app.db)
            .await
            .unwrap();
    assert_eq!(title, "My guess");
    assert_eq!(price, Some(10.0));
    assert_eq!(image, None);
}

#[tokio::test]
async fn edit_rescrapes_only_when_url_changes() {
    let scraper = Arc::new(FakeScraper::default());
    let app = TestApp::with_scraper(scraper.clone()).await;
    let owner_id = app.create_user("Alice", "alice@example.com").await;
    let cookie = app.login("alice@example.com").await;
    let wishlist_id = app.create_wishlist(&owner_id, "Wheels", "alice").await;

    let body = "title=Bike&url=https%3A%2F%2Fshop.example%2Fa&price=&description=";
    app.post_form(&format!("/wishlists/{}/items", wishlist_id), body, Some(&cookie))
        .await;
    assert_eq!(scraper.scrape_calls.load(Ordering::SeqCst), 1);

    let (item_id,): (String,) = sqlx::query_as("SELECT id FROM items")
        .fetch_one(&app.db)
        .await
        .unwrap();

    // Same URL: title change only, no second fetch.
    let body = "title=Better+bike&url=https%3A%2F%2Fshop.example%2Fa&price=&description=";
    app.post_form(&format!("/items/{}", item_id), body, Some(&cookie))
        .await;
    assert_eq!(scraper.scrape_calls.load(Ordering::SeqCst), 1);

    // New URL: scraped again.
    let body = "title=Better+bike&url=https%3A%2F%2Fshop.example%2Fb&price=&description=";
    app.post_form(&format!("/items/{}", item_id), body, Some(&cookie))
        .await;
    assert_eq!(scraper.scrape_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn non_owner_cannot_edit_or_delete_item() {
    let app = TestApp::new().await;
    let owner_id = app.create_user("Alice", "alice@example.com").await;
    app.create_user("Bob", "bob@example.com").await;
    let bob_cookie = app.login("bob@example.com").await;

    let wishlist_id = app.create_wishlist(&owner_id, "Books", "alice").await;
    let item_id = app.create_item(&wishlist_id, "A novel").await;

    let body = "title=Hijacked&url=&price=&description=";
    let resp = app
        .post_form(&format!("/items/{}", item_id), body, Some(&bob_cookie))
        .await;
    assert_redirect(&resp, "/wishlists");

    app.delete(&format!("/items/{}", item_id), Some(&bob_cookie))
        .await;

    let (title, count): (String, i64) =
        sqlx::query_as("SELECT title, COUNT(*) FROM items WHERE id = ?")
            .bind(&item_id)
            .fetch_one(&app.db)
            .await
            .unwrap();
    assert_eq!(title, "A novel");
    assert_eq!(count, 1);
}

#[tokio::test]
async fn owner_deletes_item() {
    let app = TestApp::new().await;
    let owner_id = app.create_user("Alice", "alice@example.com").await;
    let cookie = app.login("alice@example.com").await;

    let wishlist_id = app.create_wishlist(&owner_id, "Books", "alice").await;
    let item_id = app.create_item(&wishlist_id, "A novel").await;

    app.delete(&format!("/items/{}", item_id), Some(&cookie))
        .await;

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM items")
        .fetch_one(&app.db)
        .await
        .unwrap();
    assert_eq!(count, 0);
}
