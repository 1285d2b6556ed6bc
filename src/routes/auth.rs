//! Authentication routes (login, logout).

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::info;

use crate::form::csrf::{generate_csrf_token, verify_csrf_token};
use crate::models::User;
use crate::state::AppState;

use super::helpers::{SESSION_USER_ID, render_template};

/// Create the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user/login", get(login_form).post(login_form_submit))
        .route("/user/login/json", post(login_json))
        .route("/user/logout", post(logout))
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
}

/// Form-based login request.
#[derive(Debug, Deserialize)]
pub struct LoginFormRequest {
    pub username: String,
    pub password: String,
    #[serde(rename = "_token")]
    pub csrf_token: Option<String>,
}

/// Login form handler.
///
/// GET /user/login
async fn login_form(State(state): State<AppState>, session: Session) -> Response {
    let csrf_token = match generate_csrf_token(&session).await {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "failed to generate CSRF token");
            return Html("<h1>Error</h1><p>Failed to generate form token</p>".to_string())
                .into_response();
        }
    };

    let mut context = tera::Context::new();
    context.insert("csrf_token", &csrf_token);

    render_template(&state, "user/login.html", context).await
}

/// Form-based login handler.
///
/// POST /user/login (form data)
async fn login_form_submit(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginFormRequest>,
) -> Response {
    if let Some(token) = &form.csrf_token {
        match verify_csrf_token(&session, token).await {
            Ok(true) => {}
            _ => {
                return render_login_error(&state, &session, "Invalid form token. Please try again.")
                    .await;
            }
        }
    }

    let request = LoginRequest {
        username: form.username,
        password: form.password,
    };

    match do_login(&state, &session, &request).await {
        Ok(_) => Redirect::to("/course/mine/").into_response(),
        Err(message) => render_login_error(&state, &session, message).await,
    }
}

/// JSON login handler.
///
/// POST /user/login/json
async fn login_json(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<LoginRequest>,
) -> Response {
    match do_login(&state, &session, &request).await {
        Ok(_) => (
            StatusCode::OK,
            Json(LoginResponse {
                success: true,
                message: "logged in".to_string(),
            }),
        )
            .into_response(),
        Err(message) => (
            StatusCode::UNAUTHORIZED,
            Json(LoginResponse {
                success: false,
                message: message.to_string(),
            }),
        )
            .into_response(),
    }
}

/// Logout handler.
///
/// POST /user/logout
async fn logout(session: Session) -> Response {
    if let Err(e) = session.flush().await {
        tracing::error!(error = %e, "failed to clear session on logout");
    }

    Redirect::to("/user/login").into_response()
}

/// Authenticate and initialize the session.
async fn do_login(
    state: &AppState,
    session: &Session,
    request: &LoginRequest,
) -> Result<(), &'static str> {
    let user = match User::find_by_name(state.db(), &request.username).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err("Invalid username or password"),
        Err(e) => {
            tracing::error!(error = %e, "failed to look up user during login");
            return Err("Login temporarily unavailable");
        }
    };

    if !user.is_active() || !user.verify_password(&request.password) {
        return Err("Invalid username or password");
    }

    // Rotate the session id on login
    if let Err(e) = session.cycle_id().await {
        tracing::error!(error = %e, "failed to cycle session id");
        return Err("Login temporarily unavailable");
    }

    if let Err(e) = session.insert(SESSION_USER_ID, user.id).await {
        tracing::error!(error = %e, "failed to store user id in session");
        return Err("Login temporarily unavailable");
    }

    info!(user = %user.name, "user logged in");

    Ok(())
}

/// Render login form with error message.
async fn render_login_error(state: &AppState, session: &Session, error: &str) -> Response {
    let csrf_token = generate_csrf_token(session).await.unwrap_or_default();

    let mut context = tera::Context::new();
    context.insert("csrf_token", &csrf_token);
    context.insert("error", error);

    render_template(state, "user/login.html", context).await
}
