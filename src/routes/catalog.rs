//! Public catalog routes. No authentication required.

use axum::Router;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::get;

use crate::error::{AppError, AppResult};
use crate::models::{Course, Module, Subject};
use crate::state::AppState;

use super::helpers::render_template;

/// Path the external student application receives enrollments on.
const ENROLL_ACTION: &str = "/students/enroll-course/";

/// Create the catalog router.
pub fn router() -> Router<AppState> {
    // The detail segment shares its position with the management routes'
    // {id} parameter and must carry the same name; the captured value is
    // the course slug.
    Router::new()
        .route("/course/", get(course_list))
        .route("/subject/{slug}/", get(course_list_by_subject))
        .route("/course/{id}/", get(course_detail))
}

/// Shared list rendering: all subjects with course counts, all courses with
/// module counts, optionally filtered to one subject.
async fn render_course_list(state: &AppState, subject_slug: Option<&str>) -> AppResult<Response> {
    // The filter must name a real subject; an empty course set is fine
    let subject = match subject_slug {
        Some(slug) => Some(
            Subject::find_by_slug(state.db(), slug)
                .await?
                .ok_or(AppError::NotFound)?,
        ),
        None => None,
    };

    let subjects = Subject::list_with_course_counts(state.db()).await?;
    let courses =
        Course::list_with_module_counts(state.db(), subject.as_ref().map(|s| s.id)).await?;

    let mut context = tera::Context::new();
    context.insert("subjects", &subjects);
    context.insert("subject", &subject);
    context.insert("courses", &courses);

    Ok(render_template(state, "catalog/list.html", context).await)
}

/// Full catalog.
///
/// GET /course/
async fn course_list(State(state): State<AppState>) -> AppResult<Response> {
    render_course_list(&state, None).await
}

/// Catalog filtered to one subject.
///
/// GET /subject/{slug}/
async fn course_list_by_subject(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Response> {
    render_course_list(&state, Some(&slug)).await
}

/// Course detail with an unbound enrollment form.
///
/// GET /course/{slug}/
async fn course_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Response> {
    let course = Course::find_by_slug(state.db(), &slug)
        .await?
        .ok_or(AppError::NotFound)?;

    let modules = Module::list_by_course(state.db(), course.id).await?;

    let mut context = tera::Context::new();
    context.insert("course", &course);
    context.insert("modules", &modules);
    // Display-only enrollment form, pre-populated with the resolved course
    context.insert("enroll_action", ENROLL_ACTION);

    Ok(render_template(&state, "catalog/detail.html", context).await)
}
