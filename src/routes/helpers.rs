//! Shared route helpers: the authorization gate and page rendering.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use tower_sessions::Session;
use uuid::Uuid;

use crate::form::csrf::verify_csrf_token;
use crate::models::User;
use crate::state::AppState;

/// Session key for user ID.
pub const SESSION_USER_ID: &str = "user_id";

/// Require an authenticated user, or redirect to login.
///
/// Returns the [`User`] if one is logged in. Returns a redirect response if
/// the session contains no valid user id.
pub async fn require_login(state: &AppState, session: &Session) -> Result<User, Response> {
    let user_id: Option<Uuid> = session.get(SESSION_USER_ID).await.ok().flatten();

    if let Some(id) = user_id {
        if let Ok(Some(user)) = User::find_by_id(state.db(), id).await {
            return Ok(user);
        }
    }

    Err(Redirect::to("/user/login").into_response())
}

/// Require an authenticated user holding a named permission.
///
/// Redirects to login when unauthenticated; responds 403 when the
/// permission is missing. Ownership is not checked here; the owner scope
/// folds that into row resolution.
pub async fn require_permission(
    state: &AppState,
    session: &Session,
    permission: &str,
) -> Result<User, Response> {
    let user = require_login(state, session).await?;

    match state.permissions().user_has_permission(&user, permission).await {
        Ok(true) => Ok(user),
        Ok(false) => Err((StatusCode::FORBIDDEN, Html("Access denied")).into_response()),
        Err(e) => {
            tracing::error!(error = %e, "permission check failed");
            Err(render_server_error("Permission check failed."))
        }
    }
}

/// Require a valid CSRF token on a form submission.
pub async fn require_csrf(session: &Session, token: &str) -> Result<(), Response> {
    match verify_csrf_token(session, token).await {
        Ok(true) => Ok(()),
        _ => Err((
            StatusCode::FORBIDDEN,
            Html("Invalid form token. Please go back and try again."),
        )
            .into_response()),
    }
}

/// Render a template with the given context.
pub async fn render_template(state: &AppState, template: &str, context: tera::Context) -> Response {
    match state.theme().tera().render(template, &context) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!(error = %e, template = %template, "failed to render template");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(format!(
                    r#"<!DOCTYPE html>
<html><head><title>Error</title></head>
<body><h1>Template Error</h1><pre>{}</pre></body></html>"#,
                    html_escape(&e.to_string())
                )),
            )
                .into_response()
        }
    }
}

/// Generic not-found response.
///
/// Used for unresolved ids, unresolved kinds, and ownership-filtered rows
/// alike, so absence and foreign ownership are indistinguishable.
pub fn render_not_found() -> Response {
    (StatusCode::NOT_FOUND, Html("Not found")).into_response()
}

/// Generic server error response.
pub fn render_server_error(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(message.to_string()),
    )
        .into_response()
}

/// HTML-escape a string for safe output.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape_special_chars() {
        assert_eq!(
            html_escape("<script>alert('xss')</script>"),
            "&lt;script&gt;alert(&#x27;xss&#x27;)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_html_escape_plain_text() {
        assert_eq!(html_escape("hello world"), "hello world");
    }
}
