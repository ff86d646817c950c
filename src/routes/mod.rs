//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the block's HTTP surface: the mutation endpoint the toggle posts
//! to, the block view the host page embeds, a JSON state query, the icon
//! assets and a health check. Paths live here so the client transport and
//! the router agree on them.

pub mod auth;
pub mod messaging;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session_token";
/// Mutation endpoint (`POST`, URL-encoded `courseid` + `state`).
pub const TOGGLE_PATH: &str = "/blocks/coursemessaging/ajax.php";
/// Block view (`GET ?courseid=&cmid=`).
pub const VIEW_PATH: &str = "/blocks/coursemessaging/view";
/// Icon directory.
pub const PIX_PATH: &str = "/blocks/coursemessaging/pix";

/// JSON state query path for a course.
#[must_use]
pub fn state_path(course_id: i64) -> String {
    format!("/api/courses/{course_id}/messaging")
}

pub fn app(state: AppState) -> Router {
    let pix = ServeDir::new(&state.config.pix_dir);

    Router::new()
        .route(TOGGLE_PATH, post(messaging::toggle))
        .route(VIEW_PATH, get(messaging::view))
        .route("/api/courses/{id}/messaging", get(messaging::course_state))
        .route("/healthz", get(healthz))
        .nest_service(PIX_PATH, pix)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
