//! Course management routes: owner-scoped list, create, edit, and delete.
//!
//! Every handler passes the authorization gate: an authenticated session,
//! the named course permission for the operation, and owner-filtered row
//! resolution. A course owned by someone else resolves exactly like one
//! that does not exist.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use serde::Deserialize;
use tower_sessions::Session;
use uuid::Uuid;

use crate::form::csrf::generate_csrf_token;
use crate::models::{Course, CourseForm, Subject};
use crate::ownership::OwnerScope;
use crate::permissions::course_perms;
use crate::state::AppState;

use super::helpers::{
    render_not_found, render_server_error, render_template, require_csrf, require_permission,
};

/// Create the course management router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/course/mine/", get(course_list))
        .route("/course/create/", get(create_form).post(create_submit))
        .route("/course/{id}/edit/", get(edit_form).post(edit_submit))
        .route("/course/{id}/delete/", get(delete_confirm).post(delete_submit))
}

/// Course form data.
#[derive(Debug, Deserialize)]
struct CourseFormData {
    #[serde(rename = "_token")]
    token: String,
    subject_id: String,
    title: String,
    slug: String,
    overview: String,
}

impl CourseFormData {
    /// Field-level validation; slug uniqueness stays with the database.
    fn validate(&self) -> Result<CourseForm, Vec<String>> {
        let mut errors = Vec::new();

        let subject_id = match Uuid::parse_str(&self.subject_id) {
            Ok(id) => Some(id),
            Err(_) => {
                errors.push("Choose a subject.".to_string());
                None
            }
        };

        if self.title.trim().is_empty() {
            errors.push("Title is required.".to_string());
        }

        let slug = self.slug.trim();
        if slug.is_empty() {
            errors.push("Slug is required.".to_string());
        } else if !slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
        {
            errors.push("Slug may only contain lowercase letters, digits, hyphens, and underscores.".to_string());
        }

        match (errors.is_empty(), subject_id) {
            (true, Some(subject_id)) => Ok(CourseForm {
                subject_id,
                title: self.title.trim().to_string(),
                slug: slug.to_string(),
                overview: self.overview.clone(),
            }),
            _ => Err(errors),
        }
    }
}

/// List the courses owned by the current user.
///
/// GET /course/mine/
async fn course_list(State(state): State<AppState>, session: Session) -> Response {
    let user = match require_permission(&state, &session, course_perms::VIEW).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let courses = match OwnerScope::new(state.db(), user.id).courses().await {
        Ok(courses) => courses,
        Err(e) => {
            tracing::error!(error = %e, "failed to list courses");
            return render_server_error("Failed to load courses.");
        }
    };

    let mut context = tera::Context::new();
    context.insert("courses", &courses);

    render_template(&state, "manage/course_list.html", context).await
}

/// Render the course form (create or edit).
async fn render_course_form(
    state: &AppState,
    session: &Session,
    action: &str,
    course: Option<&Course>,
    submitted: Option<&CourseFormData>,
    errors: &[String],
) -> Response {
    let subjects = match Subject::list_all(state.db()).await {
        Ok(subjects) => subjects,
        Err(e) => {
            tracing::error!(error = %e, "failed to list subjects");
            return render_server_error("Failed to load subjects.");
        }
    };

    let csrf_token = generate_csrf_token(session).await.unwrap_or_default();

    let values = match (submitted, course) {
        (Some(form), _) => serde_json::json!({
            "subject_id": form.subject_id,
            "title": form.title,
            "slug": form.slug,
            "overview": form.overview,
        }),
        (None, Some(course)) => serde_json::json!({
            "subject_id": course.subject_id.to_string(),
            "title": course.title,
            "slug": course.slug,
            "overview": course.overview,
        }),
        (None, None) => serde_json::json!({
            "subject_id": "",
            "title": "",
            "slug": "",
            "overview": "",
        }),
    };

    let mut context = tera::Context::new();
    context.insert("action", action);
    context.insert("csrf_token", &csrf_token);
    context.insert("subjects", &subjects);
    context.insert("values", &values);
    context.insert("errors", errors);
    context.insert("editing", &course.is_some());

    render_template(state, "manage/course_form.html", context).await
}

/// Show the create course form.
///
/// GET /course/create/
async fn create_form(State(state): State<AppState>, session: Session) -> Response {
    if let Err(resp) = require_permission(&state, &session, course_perms::ADD).await {
        return resp;
    }

    render_course_form(&state, &session, "/course/create/", None, None, &[]).await
}

/// Handle create course form submission.
///
/// POST /course/create/
async fn create_submit(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CourseFormData>,
) -> Response {
    let user = match require_permission(&state, &session, course_perms::ADD).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    if let Err(resp) = require_csrf(&session, &form.token).await {
        return resp;
    }

    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => {
            return render_course_form(
                &state,
                &session,
                "/course/create/",
                None,
                Some(&form),
                &errors,
            )
            .await;
        }
    };

    match Course::create(state.db(), user.id, &input).await {
        Ok(course) => {
            tracing::info!(course_id = %course.id, "course created");
            Redirect::to("/course/mine/").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to create course");
            render_server_error("Failed to create course.")
        }
    }
}

/// Show the edit course form.
///
/// GET /course/{id}/edit/
async fn edit_form(
    State(state): State<AppState>,
    session: Session,
    Path(course_id): Path<Uuid>,
) -> Response {
    let user = match require_permission(&state, &session, course_perms::CHANGE).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let Some(course) = OwnerScope::new(state.db(), user.id)
        .course(course_id)
        .await
        .ok()
        .flatten()
    else {
        return render_not_found();
    };

    let action = format!("/course/{course_id}/edit/");
    render_course_form(&state, &session, &action, Some(&course), None, &[]).await
}

/// Handle edit course form submission.
///
/// POST /course/{id}/edit/
async fn edit_submit(
    State(state): State<AppState>,
    session: Session,
    Path(course_id): Path<Uuid>,
    Form(form): Form<CourseFormData>,
) -> Response {
    let user = match require_permission(&state, &session, course_perms::CHANGE).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    if let Err(resp) = require_csrf(&session, &form.token).await {
        return resp;
    }

    let Some(course) = OwnerScope::new(state.db(), user.id)
        .course(course_id)
        .await
        .ok()
        .flatten()
    else {
        return render_not_found();
    };

    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => {
            let action = format!("/course/{course_id}/edit/");
            return render_course_form(
                &state,
                &session,
                &action,
                Some(&course),
                Some(&form),
                &errors,
            )
            .await;
        }
    };

    match Course::update_owned(state.db(), course_id, user.id, &input).await {
        Ok(Some(_)) => Redirect::to("/course/mine/").into_response(),
        Ok(None) => render_not_found(),
        Err(e) => {
            tracing::error!(error = %e, course_id = %course_id, "failed to update course");
            render_server_error("Failed to update course.")
        }
    }
}

/// Show the delete confirmation page.
///
/// GET /course/{id}/delete/
async fn delete_confirm(
    State(state): State<AppState>,
    session: Session,
    Path(course_id): Path<Uuid>,
) -> Response {
    let user = match require_permission(&state, &session, course_perms::DELETE).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let Some(course) = OwnerScope::new(state.db(), user.id)
        .course(course_id)
        .await
        .ok()
        .flatten()
    else {
        return render_not_found();
    };

    let csrf_token = generate_csrf_token(&session).await.unwrap_or_default();

    let mut context = tera::Context::new();
    context.insert("course", &course);
    context.insert("csrf_token", &csrf_token);

    render_template(&state, "manage/course_delete.html", context).await
}

/// Confirmation form data (token only).
#[derive(Debug, Deserialize)]
struct ConfirmFormData {
    #[serde(rename = "_token")]
    token: String,
}

/// Handle the confirmed deletion.
///
/// POST /course/{id}/delete/
async fn delete_submit(
    State(state): State<AppState>,
    session: Session,
    Path(course_id): Path<Uuid>,
    Form(form): Form<ConfirmFormData>,
) -> Response {
    let user = match require_permission(&state, &session, course_perms::DELETE).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    if let Err(resp) = require_csrf(&session, &form.token).await {
        return resp;
    }

    match Course::delete_owned(state.db(), course_id, user.id).await {
        Ok(true) => {
            tracing::info!(course_id = %course_id, "course deleted");
            Redirect::to("/course/mine/").into_response()
        }
        Ok(false) => render_not_found(),
        Err(e) => {
            tracing::error!(error = %e, course_id = %course_id, "failed to delete course");
            render_server_error("Failed to delete course.")
        }
    }
}
