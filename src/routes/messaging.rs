//! Messaging toggle routes: mutation endpoint, block view, state query.

use axum::Form;
use axum::extract::rejection::{FormRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, Json};
use serde::Deserialize;
use tracing::{info, warn};

use crate::routes::auth::{AuthUser, MaybeAuthUser, access_error_to_status};
use crate::services::access::{self, Capability, Context};
use crate::services::messaging::{self, CourseMessagingFlag};
use crate::services::store::StoreError;
use crate::state::AppState;
use crate::widget::InitArgs;
use crate::widget::markup;

#[derive(Debug, Deserialize)]
pub struct ToggleForm {
    pub courseid: i64,
    pub state: i64,
}

#[derive(Debug, Deserialize)]
pub struct ViewQuery {
    pub courseid: i64,
    pub cmid: Option<i64>,
}

/// `POST /blocks/coursemessaging/ajax.php`: store the messaging flag for a course.
///
/// Requires a session and `moodle/course:manageactivities` in the course
/// context. Every rejection happens before the store is touched.
pub async fn toggle(
    State(state): State<AppState>,
    auth: AuthUser,
    form: Result<Form<ToggleForm>, FormRejection>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let Form(form) = form.map_err(|rejection| {
        warn!(error = %rejection, "toggle parameters rejected");
        StatusCode::BAD_REQUEST
    })?;
    if form.courseid <= 0 {
        return Err(StatusCode::BAD_REQUEST);
    }

    let context = Context::Course(form.courseid);
    if let Err(err) =
        access::require_capability(state.access.as_ref(), &auth.viewer, Capability::ManageActivities, context).await
    {
        warn!(course_id = form.courseid, user_id = auth.viewer.user_id, error = %err, "toggle denied");
        return Err(access_error_to_status(err));
    }

    let flag = messaging::write_state(state.store.as_ref(), form.courseid, form.state)
        .await
        .map_err(store_error_to_status)?;

    info!(
        course_id = flag.course_id,
        user_id = auth.viewer.user_id,
        enabled = flag.enabled,
        "course messaging state changed"
    );
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /blocks/coursemessaging/view?courseid=&cmid=`: block body for a course or activity page.
///
/// Viewers without `block/coursemessaging:addinstance` in the page context
/// get an empty block; the init payload is emitted either way. A `cmid`
/// that names no activity leaves the page without a context, which also
/// renders the empty block.
pub async fn view(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    query: Result<Query<ViewQuery>, QueryRejection>,
) -> Result<Html<String>, StatusCode> {
    let Query(query) = query.map_err(|_| StatusCode::BAD_REQUEST)?;
    if query.courseid <= 0 {
        return Err(StatusCode::BAD_REQUEST);
    }
    let context = page_context(query.courseid, query.cmid);

    let flag = messaging::read_flag(state.store.as_ref(), query.courseid)
        .await
        .map_err(store_error_to_status)?;

    let visible = match (&viewer, context) {
        (Some(viewer), Some(context)) => state
            .access
            .has_capability(viewer.user_id, Capability::AddInstance, context)
            .await
            .map_err(access_error_to_status)?,
        _ => false,
    };

    let args = InitArgs::for_course(&state.config.public_url, flag.course_id, flag.enabled);
    Ok(Html(markup::render_block(&args, &state.config.labels, visible)))
}

/// `GET /api/courses/{id}/messaging`: current flag for a course.
pub async fn course_state(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(course_id): Path<i64>,
) -> Result<Json<CourseMessagingFlag>, StatusCode> {
    if course_id <= 0 {
        return Err(StatusCode::BAD_REQUEST);
    }
    access::require_capability(state.access.as_ref(), &auth.viewer, Capability::AddInstance, Context::Course(course_id))
        .await
        .map_err(access_error_to_status)?;

    let flag = messaging::read_flag(state.store.as_ref(), course_id)
        .await
        .map_err(store_error_to_status)?;
    Ok(Json(flag))
}

/// Authorization context of a block page. Only positive ids resolve.
fn page_context(course_id: i64, cmid: Option<i64>) -> Option<Context> {
    match (course_id, cmid) {
        (c, _) if c <= 0 => None,
        (c, None) => Some(Context::Course(c)),
        (c, Some(m)) if m > 0 => Some(Context::Module { course_id: c, cmid: m }),
        _ => None,
    }
}

pub(crate) fn store_error_to_status(err: StoreError) -> StatusCode {
    tracing::error!(error = %err, "config store failed");
    StatusCode::INTERNAL_SERVER_ERROR
}

#[cfg(test)]
#[path = "messaging_test.rs"]
mod tests;
