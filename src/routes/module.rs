//! Module formset editing and module content listing.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use tower_sessions::Session;
use uuid::Uuid;

use crate::form::csrf::generate_csrf_token;
use crate::form::module_formset::ModuleFormSet;
use crate::models::{Content, ContentWithItem, Course, Module, Renderable};
use crate::ownership::OwnerScope;
use crate::state::AppState;

use super::helpers::{
    render_not_found, render_server_error, render_template, require_csrf, require_login,
};

/// Create the module router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/course/{id}/module/",
            get(formset_form).post(formset_submit),
        )
        .route("/module/{module_id}/content/", get(content_list))
}

/// Resolve the course for the formset. Ownership is folded into existence:
/// a course owned by someone else yields not-found.
async fn resolve_course(
    state: &AppState,
    session: &Session,
    course_id: Uuid,
) -> Result<Course, Response> {
    let user = require_login(state, session).await?;

    OwnerScope::new(state.db(), user.id)
        .course(course_id)
        .await
        .ok()
        .flatten()
        .ok_or_else(render_not_found)
}

/// Render the formset page.
async fn render_formset(
    state: &AppState,
    session: &Session,
    course: &Course,
    formset: &ModuleFormSet,
) -> Response {
    let csrf_token = generate_csrf_token(session).await.unwrap_or_default();

    let mut context = tera::Context::new();
    context.insert("course", course);
    context.insert("formset", formset);
    context.insert("csrf_token", &csrf_token);

    render_template(state, "manage/module_formset.html", context).await
}

/// Show the module formset bound to the course's current modules.
///
/// GET /course/{id}/module/
async fn formset_form(
    State(state): State<AppState>,
    session: Session,
    Path(course_id): Path<Uuid>,
) -> Response {
    let course = match resolve_course(&state, &session, course_id).await {
        Ok(course) => course,
        Err(resp) => return resp,
    };

    let modules = match Module::list_by_course(state.db(), course.id).await {
        Ok(modules) => modules,
        Err(e) => {
            tracing::error!(error = %e, "failed to list modules");
            return render_server_error("Failed to load modules.");
        }
    };

    let formset = ModuleFormSet::for_modules(&modules);
    render_formset(&state, &session, &course, &formset).await
}

/// Handle a formset submission.
///
/// Either every row validates and the whole set commits in one transaction,
/// or nothing persists and the same view re-renders with per-row errors.
///
/// POST /course/{id}/module/
async fn formset_submit(
    State(state): State<AppState>,
    session: Session,
    Path(course_id): Path<Uuid>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Response {
    let course = match resolve_course(&state, &session, course_id).await {
        Ok(course) => course,
        Err(resp) => return resp,
    };

    let token = pairs
        .iter()
        .find(|(k, _)| k == "_token")
        .map(|(_, v)| v.as_str())
        .unwrap_or_default();
    if let Err(resp) = require_csrf(&session, token).await {
        return resp;
    }

    let mut formset = ModuleFormSet::from_pairs(&pairs);
    if !formset.validate() {
        return render_formset(&state, &session, &course, &formset).await;
    }

    match formset.save(state.db(), course.id).await {
        Ok(()) => Redirect::to("/course/mine/").into_response(),
        Err(e) => {
            tracing::error!(error = %e, course_id = %course.id, "failed to save module formset");
            render_server_error("Failed to save modules.")
        }
    }
}

/// List a module's content in display order.
///
/// GET /module/{module_id}/content/
async fn content_list(
    State(state): State<AppState>,
    session: Session,
    Path(module_id): Path<Uuid>,
) -> Response {
    let user = match require_login(&state, &session).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let Some(module) = OwnerScope::new(state.db(), user.id)
        .module(module_id)
        .await
        .ok()
        .flatten()
    else {
        return render_not_found();
    };

    let contents = match Content::list_by_module(state.db(), module.id).await {
        Ok(contents) => contents,
        Err(e) => {
            tracing::error!(error = %e, "failed to list module content");
            return render_server_error("Failed to load content.");
        }
    };

    #[derive(serde::Serialize)]
    struct ContentEntry<'a> {
        #[serde(flatten)]
        content: &'a ContentWithItem,
        summary: String,
    }

    let entries: Vec<ContentEntry> = contents
        .iter()
        .map(|c| ContentEntry {
            content: c,
            summary: c.summary(),
        })
        .collect();

    let csrf_token = generate_csrf_token(&session).await.unwrap_or_default();

    let mut context = tera::Context::new();
    context.insert("module", &module);
    context.insert("contents", &entries);
    context.insert("csrf_token", &csrf_token);

    render_template(&state, "manage/content_list.html", context).await
}
