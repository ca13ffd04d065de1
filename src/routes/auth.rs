use askama::Template;
use axum::{
    Form, Router,
    extract::State,
    response::{Html, IntoResponse, Redirect},
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::AppState;
use crate::auth::{login_user, logout_user};
use crate::error::AppError;
use crate::models::User;

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    error: Option<String>,

    user: Option<User>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    email: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page))
        .route("/login", post(login_submit))
        .route("/logout", post(logout))
}

async fn login_page() -> Result<impl IntoResponse, AppError> {
    let template = LoginTemplate {
        error: None,

        user: None,
    };
    Ok(Html(template.render()?))
}

async fn login_submit(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<impl IntoResponse, AppError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(form.email.trim().to_lowercase())
        .fetch_optional(&state.db)
        .await?;

    match user {
        Some(user) => {
            login_user(&session, user).await?;
            Ok(Redirect::to("/").into_response())
        }
        None => {
            let template = LoginTemplate {
                error: Some("No account with that email".to_string()),

                user: None,
            };
            Ok(Html(template.render()?).into_response())
        }
    }
}

async fn logout(session: Session) -> Result<impl IntoResponse, AppError> {
    logout_user(&session).await?;
    Ok(Redirect::to("/login"))
}
