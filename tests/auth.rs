mod common;

use axum::http::StatusCode;
use common::{TestApp, assert_redirect, body_string};

#[tokio::test]
async fn login_with_known_email_sets_session() {
    let app = TestApp::new().await;
    app.create_user("Alice", "alice@example.com").await;

    let cookie = app.login("alice@example.com").await;

    let resp = app.get("/wishlists", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_string(resp).await;
    assert!(html.contains("My wishlists"));
}

#[tokio::test]
async fn login_with_unknown_email_shows_error() {
    let app = TestApp::new().await;

    let resp = app
        .post_form("/login", "email=nobody%40example.com", None)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_string(resp).await;
    assert!(html.contains("No account with that email"));
}

#[tokio::test]
async fn anonymous_user_is_redirected_to_login() {
    let app = TestApp::new().await;

    let resp = app.get("/wishlists", None).await;
    assert_redirect(&resp, "/login");
}

#[tokio::test]
async fn logout_clears_session() {
    let app = TestApp::new().await;
    app.create_user("Alice", "alice@example.com").await;
    let cookie = app.login("alice@example.com").await;

    let resp = app.post_form("/logout", "", Some(&cookie)).await;
    assert_redirect(&resp, "/login");

    let resp = app.get("/wishlists", Some(&cookie)).await;
    assert_redirect(&resp, "/login");
}
