//! Content editor and content deletion.
//!
//! The editor resolves, in order: the module (owned through its course),
//! the item kind (closed allow-list), and, when editing, the typed item
//! itself (owned). Any unresolved step is a not-found before persistence
//! is touched.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use tower_sessions::Session;
use uuid::Uuid;

use crate::form::csrf::generate_csrf_token;
use crate::models::{Content, ContentItem, ItemKind, Module, User};
use crate::ownership::OwnerScope;
use crate::state::AppState;

use super::helpers::{
    render_not_found, render_server_error, render_template, require_csrf, require_login,
};

/// Create the content router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/module/{module_id}/content/{kind}/create/",
            get(create_form).post(create_submit),
        )
        .route(
            "/module/{module_id}/content/{kind}/{item_id}/",
            get(edit_form).post(edit_submit),
        )
        .route("/content/{id}/delete/", post(delete_content))
}

/// Content item form data.
#[derive(Debug, Deserialize)]
struct ItemFormData {
    #[serde(rename = "_token")]
    token: String,
    title: String,
    payload: String,
}

impl ItemFormData {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.title.trim().is_empty() {
            errors.push("Title is required.".to_string());
        }
        if self.payload.trim().is_empty() {
            errors.push("This field is required.".to_string());
        }

        errors
    }
}

/// The resolved identities an editor request operates on.
struct EditorTarget {
    module: Module,
    kind: ItemKind,
    item: Option<ContentItem>,
}

/// Resolve module, kind, and (optionally) the existing item, in that order.
async fn resolve_target(
    state: &AppState,
    user: &User,
    module_id: Uuid,
    kind_name: &str,
    item_id: Option<Uuid>,
) -> Result<EditorTarget, Response> {
    let scope = OwnerScope::new(state.db(), user.id);

    let Some(module) = scope.module(module_id).await.ok().flatten() else {
        return Err(render_not_found());
    };

    let Some(kind) = ItemKind::from_path_name(kind_name) else {
        return Err(render_not_found());
    };

    let item = match item_id {
        Some(id) => match scope.item(id, kind).await.ok().flatten() {
            Some(item) => Some(item),
            None => return Err(render_not_found()),
        },
        None => None,
    };

    Ok(EditorTarget { module, kind, item })
}

/// Render the item form for creating or editing.
async fn render_item_form(
    state: &AppState,
    session: &Session,
    target: &EditorTarget,
    submitted: Option<&ItemFormData>,
    errors: &[String],
) -> Response {
    let csrf_token = generate_csrf_token(session).await.unwrap_or_default();

    let action = match &target.item {
        Some(item) => format!(
            "/module/{}/content/{}/{}/",
            target.module.id,
            target.kind.as_str(),
            item.id
        ),
        None => format!(
            "/module/{}/content/{}/create/",
            target.module.id,
            target.kind.as_str()
        ),
    };

    let values = match (submitted, &target.item) {
        (Some(form), _) => serde_json::json!({
            "title": form.title,
            "payload": form.payload,
        }),
        (None, Some(item)) => serde_json::json!({
            "title": item.title,
            "payload": item.payload,
        }),
        (None, None) => serde_json::json!({
            "title": "",
            "payload": "",
        }),
    };

    let mut context = tera::Context::new();
    context.insert("module", &target.module);
    context.insert("kind", target.kind.as_str());
    context.insert("payload_label", target.kind.payload_label());
    context.insert("action", &action);
    context.insert("csrf_token", &csrf_token);
    context.insert("values", &values);
    context.insert("errors", errors);
    context.insert("editing", &target.item.is_some());

    render_template(state, "manage/content_form.html", context).await
}

/// Show the create item form.
///
/// GET /module/{module_id}/content/{kind}/create/
async fn create_form(
    State(state): State<AppState>,
    session: Session,
    Path((module_id, kind_name)): Path<(Uuid, String)>,
) -> Response {
    let user = match require_login(&state, &session).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let target = match resolve_target(&state, &user, module_id, &kind_name, None).await {
        Ok(target) => target,
        Err(resp) => return resp,
    };

    render_item_form(&state, &session, &target, None, &[]).await
}

/// Handle the create item submission.
///
/// A new item is persisted with the acting user stamped as owner, linked
/// into the module, and the request redirects to the module content list.
///
/// POST /module/{module_id}/content/{kind}/create/
async fn create_submit(
    State(state): State<AppState>,
    session: Session,
    Path((module_id, kind_name)): Path<(Uuid, String)>,
    Form(form): Form<ItemFormData>,
) -> Response {
    let user = match require_login(&state, &session).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let target = match resolve_target(&state, &user, module_id, &kind_name, None).await {
        Ok(target) => target,
        Err(resp) => return resp,
    };

    if let Err(resp) = require_csrf(&session, &form.token).await {
        return resp;
    }

    let errors = form.validate();
    if !errors.is_empty() {
        return render_item_form(&state, &session, &target, Some(&form), &errors).await;
    }

    let item = match ContentItem::create(
        state.db(),
        user.id,
        target.kind,
        form.title.trim(),
        &form.payload,
    )
    .await
    {
        Ok(item) => item,
        Err(e) => {
            tracing::error!(error = %e, "failed to create item");
            return render_server_error("Failed to save content.");
        }
    };

    match Content::create(state.db(), target.module.id, item.id).await {
        Ok(_) => Redirect::to(&format!("/module/{}/content/", target.module.id)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, item_id = %item.id, "failed to link item into module");
            render_server_error("Failed to save content.")
        }
    }
}

/// Show the edit item form.
///
/// GET /module/{module_id}/content/{kind}/{item_id}/
async fn edit_form(
    State(state): State<AppState>,
    session: Session,
    Path((module_id, kind_name, item_id)): Path<(Uuid, String, Uuid)>,
) -> Response {
    let user = match require_login(&state, &session).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let target = match resolve_target(&state, &user, module_id, &kind_name, Some(item_id)).await {
        Ok(target) => target,
        Err(resp) => return resp,
    };

    render_item_form(&state, &session, &target, None, &[]).await
}

/// Handle the edit item submission.
///
/// The item is saved and the form re-renders in place; unlike creation,
/// editing does not redirect.
///
/// POST /module/{module_id}/content/{kind}/{item_id}/
async fn edit_submit(
    State(state): State<AppState>,
    session: Session,
    Path((module_id, kind_name, item_id)): Path<(Uuid, String, Uuid)>,
    Form(form): Form<ItemFormData>,
) -> Response {
    let user = match require_login(&state, &session).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let mut target =
        match resolve_target(&state, &user, module_id, &kind_name, Some(item_id)).await {
            Ok(target) => target,
            Err(resp) => return resp,
        };

    if let Err(resp) = require_csrf(&session, &form.token).await {
        return resp;
    }

    let errors = form.validate();
    if !errors.is_empty() {
        return render_item_form(&state, &session, &target, Some(&form), &errors).await;
    }

    match ContentItem::update_owned(state.db(), item_id, user.id, form.title.trim(), &form.payload)
        .await
    {
        Ok(Some(item)) => {
            target.item = Some(item);
            render_item_form(&state, &session, &target, None, &[]).await
        }
        Ok(None) => render_not_found(),
        Err(e) => {
            tracing::error!(error = %e, item_id = %item_id, "failed to update item");
            render_server_error("Failed to save content.")
        }
    }
}

/// Confirmation-free content deletion.
///
/// Resolves the link through the module → course → owner join, deletes the
/// linked item first and the link row second, then returns to the module
/// content list.
///
/// POST /content/{id}/delete/
async fn delete_content(
    State(state): State<AppState>,
    session: Session,
    Path(content_id): Path<Uuid>,
    Form(form): Form<DeleteFormData>,
) -> Response {
    let user = match require_login(&state, &session).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    if let Err(resp) = require_csrf(&session, &form.token).await {
        return resp;
    }

    let Some(content) = OwnerScope::new(state.db(), user.id)
        .content(content_id)
        .await
        .ok()
        .flatten()
    else {
        return render_not_found();
    };

    // Item first, then the link row
    if let Err(e) = ContentItem::delete(state.db(), content.item_id).await {
        tracing::error!(error = %e, item_id = %content.item_id, "failed to delete item");
        return render_server_error("Failed to delete content.");
    }

    if let Err(e) = Content::delete(state.db(), content.id).await {
        tracing::error!(error = %e, content_id = %content.id, "failed to delete content link");
        return render_server_error("Failed to delete content.");
    }

    Redirect::to(&format!("/module/{}/content/", content.module_id)).into_response()
}

/// Deletion form data (token only).
#[derive(Debug, Deserialize)]
struct DeleteFormData {
    #[serde(rename = "_token")]
    token: String,
}
