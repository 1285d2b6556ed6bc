//! JSON reordering endpoints for modules and content.
//!
//! The request body is a map from row id (string key) to its new position.
//! Each pair is applied as an independent owner-filtered update: ids that do
//! not resolve to a row owned by the caller are skipped without an error.
//! These two endpoints carry no CSRF token; a valid authenticated session
//! and a JSON body are the whole contract.

use std::collections::HashMap;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;
use tower_sessions::Session;
use uuid::Uuid;

use crate::models::{Content, Module};
use crate::state::AppState;

use super::helpers::require_login;

/// Create the reorder router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/course/module/order/", post(reorder_modules))
        .route("/content/order/", post(reorder_content))
}

/// The fixed acknowledgement payload. Applied changes are not echoed back.
fn saved_ok() -> Response {
    Json(json!({"saved": "OK"})).into_response()
}

/// Bulk-apply module positions.
///
/// POST /course/module/order/
async fn reorder_modules(
    State(state): State<AppState>,
    session: Session,
    Json(orders): Json<HashMap<String, i32>>,
) -> Response {
    let user = match require_login(&state, &session).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    for (raw_id, position) in orders {
        // Unparsable ids resolve to no row, exactly like unowned ones
        let Ok(id) = Uuid::parse_str(&raw_id) else {
            continue;
        };

        if let Err(e) = Module::set_position_owned(state.db(), id, user.id, position).await {
            tracing::error!(error = %e, module_id = %id, "failed to reorder module");
        }
    }

    saved_ok()
}

/// Bulk-apply content positions.
///
/// POST /content/order/
async fn reorder_content(
    State(state): State<AppState>,
    session: Session,
    Json(orders): Json<HashMap<String, i32>>,
) -> Response {
    let user = match require_login(&state, &session).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    for (raw_id, position) in orders {
        let Ok(id) = Uuid::parse_str(&raw_id) else {
            continue;
        };

        if let Err(e) = Content::set_position_owned(state.db(), id, user.id, position).await {
            tracing::error!(error = %e, content_id = %id, "failed to reorder content");
        }
    }

    saved_ok()
}
