use std::sync::Arc;

use reqwest::header::{CONTENT_TYPE, COOKIE};

use super::*;
use crate::routes::{self, PIX_PATH, SESSION_COOKIE, TOGGLE_PATH, VIEW_PATH};
use crate::services::access::MemoryAccessControl;
use crate::services::messaging::PLUGIN;
use crate::services::store::ConfigStore;
use crate::state::test_helpers::{TestApp, seed_user, test_app_with_config, test_config};
use crate::widget::controller::{Controller, ToggleError};
use crate::widget::page::{PageModel, Slot};
use crate::widget::transport::{HttpTransport, Transport, TransportError};

// =============================================================================
// HARNESS
// =============================================================================

/// Bind the router on an ephemeral port; `public_url` points at it.
async fn start() -> (TestApp, String) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let mut config = test_config();
    config.public_url = base.clone();
    let test_app = test_app_with_config(config);
    serve(listener, test_app.state.clone());
    (test_app, base)
}

fn serve(listener: tokio::net::TcpListener, state: AppState) {
    let router = routes::app(state);
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test server failed");
    });
}

async fn post_toggle(base: &str, token: Option<&str>, body: &str) -> reqwest::Response {
    let mut request = reqwest::Client::new()
        .post(format!("{base}{TOGGLE_PATH}"))
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(body.to_owned());
    if let Some(token) = token {
        request = request.header(COOKIE, format!("{SESSION_COOKIE}={token}"));
    }
    request.send().await.unwrap()
}

async fn get_view(base: &str, token: Option<&str>, query: &str) -> reqwest::Response {
    let mut request = reqwest::Client::new().get(format!("{base}{VIEW_PATH}?{query}"));
    if let Some(token) = token {
        request = request.header(COOKIE, format!("{SESSION_COOKIE}={token}"));
    }
    request.send().await.unwrap()
}

async fn stored(app: &TestApp, course_id: i64) -> Option<String> {
    app.store
        .get(PLUGIN, &messaging::course_key(course_id))
        .await
        .unwrap()
}

fn init_args_from(html: &str) -> InitArgs {
    let marker = format!(r#"id="{}">"#, markup::INIT_SCRIPT_ID);
    let start = html.find(&marker).expect("init payload present") + marker.len();
    let end = start + html[start..].find("</script>").expect("init payload closed");
    serde_json::from_str(&html[start..end]).unwrap()
}

const MANAGER: &[Capability] = &[Capability::ManageActivities, Capability::AddInstance];

// =============================================================================
// page_context
// =============================================================================

#[test]
fn page_context_resolves_course_and_module() {
    assert_eq!(page_context(42, None), Some(Context::Course(42)));
    assert_eq!(page_context(42, Some(7)), Some(Context::Module { course_id: 42, cmid: 7 }));
    assert_eq!(page_context(0, None), None);
    assert_eq!(page_context(42, Some(0)), None);
}

// =============================================================================
// TOGGLE ENDPOINT
// =============================================================================

#[tokio::test]
async fn manager_can_disable_and_enable() {
    let (app, base) = start().await;
    let token = seed_user(&app, "teacher", MANAGER, Context::Course(42)).await;

    let resp = post_toggle(&base, Some(&token), "courseid=42&state=0").await;
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body, serde_json::json!({ "status": "ok" }));
    assert_eq!(stored(&app, 42).await.as_deref(), Some("0"));

    let resp = post_toggle(&base, Some(&token), "courseid=42&state=1").await;
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert_eq!(stored(&app, 42).await.as_deref(), Some("1"));
}

#[tokio::test]
async fn unauthenticated_toggle_never_writes() {
    let (app, base) = start().await;

    for (course_id, state) in [(1, 0), (1, 1), (42, 0), (999, 1)] {
        let resp = post_toggle(&base, None, &format!("courseid={course_id}&state={state}")).await;
        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
        assert_eq!(stored(&app, course_id).await, None);
    }

    let resp = post_toggle(&base, Some("not-a-session"), "courseid=42&state=0").await;
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    assert_eq!(stored(&app, 42).await, None);
}

#[tokio::test]
async fn toggle_without_capability_never_writes() {
    let (app, base) = start().await;
    let student = seed_user(&app, "student", &[], Context::Course(42)).await;
    let viewer_only = seed_user(&app, "observer", &[Capability::AddInstance], Context::Course(42)).await;
    let other_course = seed_user(&app, "elsewhere", MANAGER, Context::Course(43)).await;
    let module_only =
        seed_user(&app, "ta", MANAGER, Context::Module { course_id: 42, cmid: 5 }).await;

    for token in [&student, &viewer_only, &other_course, &module_only] {
        for state in [0, 1] {
            let resp = post_toggle(&base, Some(token.as_str()), &format!("courseid=42&state={state}")).await;
            assert_eq!(resp.status(), reqwest::StatusCode::FORBIDDEN);
        }
    }
    assert_eq!(stored(&app, 42).await, None);
}

#[tokio::test]
async fn site_grant_allows_toggle() {
    let (app, base) = start().await;
    let token = seed_user(&app, "admin", &[Capability::ManageActivities], Context::Site).await;

    let resp = post_toggle(&base, Some(&token), "courseid=8&state=0").await;
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert_eq!(stored(&app, 8).await.as_deref(), Some("0"));
}

#[tokio::test]
async fn malformed_parameters_are_rejected_before_writing() {
    let (app, base) = start().await;
    let token = seed_user(&app, "teacher", MANAGER, Context::Course(42)).await;

    for body in ["", "courseid=42", "state=0", "courseid=abc&state=0", "courseid=42&state=off", "courseid=0&state=0", "courseid=-3&state=1"] {
        let resp = post_toggle(&base, Some(&token), body).await;
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST, "body {body:?}");
    }
    assert_eq!(stored(&app, 42).await, None);
}

#[tokio::test]
async fn out_of_domain_state_is_stored_verbatim() {
    let (app, base) = start().await;
    let token = seed_user(&app, "teacher", MANAGER, Context::Course(42)).await;

    let resp = post_toggle(&base, Some(&token), "courseid=42&state=5").await;
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert_eq!(stored(&app, 42).await.as_deref(), Some("5"));
    assert!(messaging::read_flag(&*app.store, 42).await.unwrap().enabled);
}

struct FailingStore;

#[async_trait::async_trait]
impl ConfigStore for FailingStore {
    async fn get(&self, _plugin: &str, _name: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn set(&self, _plugin: &str, _name: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }
}

#[tokio::test]
async fn store_failure_is_a_server_error() {
    let access = Arc::new(MemoryAccessControl::new());
    let user_id = access.add_user("teacher").await;
    access.grant(user_id, Capability::ManageActivities, Context::Course(42)).await;
    let token = access.issue_session(user_id).await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    serve(listener, AppState::new(Arc::new(FailingStore), access, test_config()));

    let resp = post_toggle(&base, Some(&token), "courseid=42&state=0").await;
    assert_eq!(resp.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);

    let resp = get_view(&base, Some(&token), "courseid=42").await;
    assert_eq!(resp.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn sequential_writes_last_one_wins() {
    let (app, base) = start().await;
    let token = seed_user(&app, "teacher", MANAGER, Context::Course(42)).await;

    for state in [0, 1, 0] {
        post_toggle(&base, Some(&token), &format!("courseid=42&state={state}")).await;
    }
    assert_eq!(stored(&app, 42).await.as_deref(), Some("0"));
}

#[tokio::test]
async fn concurrent_writes_leave_one_whole_value() {
    let (app, base) = start().await;
    let first = seed_user(&app, "teacher-a", MANAGER, Context::Course(42)).await;
    let second = seed_user(&app, "teacher-b", MANAGER, Context::Course(42)).await;

    let (a, b) = tokio::join!(
        post_toggle(&base, Some(&first), "courseid=42&state=0"),
        post_toggle(&base, Some(&second), "courseid=42&state=1"),
    );
    assert_eq!(a.status(), reqwest::StatusCode::OK);
    assert_eq!(b.status(), reqwest::StatusCode::OK);

    let value = stored(&app, 42).await.unwrap();
    assert!(value == "0" || value == "1", "unexpected stored value {value:?}");
}

// =============================================================================
// BLOCK VIEW
// =============================================================================

#[tokio::test]
async fn guest_sees_empty_block_with_init_payload() {
    let (_app, base) = start().await;

    let html = get_view(&base, None, "courseid=42").await.text().await.unwrap();
    assert!(!html.contains(markup::TOGGLE_BUTTON_ID));
    let args = init_args_from(&html);
    assert!(args.active);
    assert_eq!(args.course_id, 42);
}

#[tokio::test]
async fn viewer_without_addinstance_sees_empty_block() {
    let (app, base) = start().await;
    let token = seed_user(&app, "manager-no-block", &[Capability::ManageActivities], Context::Course(42)).await;

    let html = get_view(&base, Some(&token), "courseid=42").await.text().await.unwrap();
    assert!(!html.contains(markup::TOGGLE_BUTTON_ID));
}

#[tokio::test]
async fn manager_sees_toggle_reflecting_store() {
    let (app, base) = start().await;
    let token = seed_user(&app, "teacher", MANAGER, Context::Course(42)).await;

    let html = get_view(&base, Some(&token), "courseid=42").await.text().await.unwrap();
    assert!(html.contains(markup::TOGGLE_BUTTON_ID));
    assert!(html.contains(">Active</span>"));

    messaging::write_state(&*app.store, 42, 0).await.unwrap();
    let html = get_view(&base, Some(&token), "courseid=42").await.text().await.unwrap();
    assert!(html.contains(">Inactive</span>"));
    assert!(!init_args_from(&html).active);
}

#[tokio::test]
async fn module_page_checks_module_context() {
    let (app, base) = start().await;
    let token = seed_user(&app, "ta", &[Capability::AddInstance], Context::Module { course_id: 42, cmid: 9 }).await;

    let html = get_view(&base, Some(&token), "courseid=42&cmid=9").await.text().await.unwrap();
    assert!(html.contains(markup::TOGGLE_BUTTON_ID));

    let html = get_view(&base, Some(&token), "courseid=42").await.text().await.unwrap();
    assert!(!html.contains(markup::TOGGLE_BUTTON_ID));
}

#[tokio::test]
async fn view_rejects_bad_query() {
    let (_app, base) = start().await;
    for query in ["", "courseid=abc", "courseid=0", "courseid=-3&cmid=2", "courseid=4&cmid=x"] {
        let resp = get_view(&base, None, query).await;
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST, "query {query:?}");
    }
}

#[tokio::test]
async fn unresolvable_module_renders_empty_block() {
    let (app, base) = start().await;
    let token = seed_user(&app, "admin", MANAGER, Context::Site).await;
    messaging::write_state(&*app.store, 4, 0).await.unwrap();

    for query in ["courseid=4&cmid=0", "courseid=4&cmid=-1"] {
        let resp = get_view(&base, Some(&token), query).await;
        assert_eq!(resp.status(), reqwest::StatusCode::OK, "query {query:?}");
        let html = resp.text().await.unwrap();
        assert!(!html.contains(markup::TOGGLE_BUTTON_ID), "query {query:?}");
        let args = init_args_from(&html);
        assert_eq!(args.course_id, 4);
        assert!(!args.active);
    }
}

// =============================================================================
// STATE QUERY, ASSETS, HEALTH
// =============================================================================

#[tokio::test]
async fn state_query_requires_visibility_capability() {
    let (app, base) = start().await;
    let manager = seed_user(&app, "teacher", MANAGER, Context::Course(42)).await;
    let student = seed_user(&app, "student", &[], Context::Course(42)).await;
    messaging::write_state(&*app.store, 42, 0).await.unwrap();

    let flag = HttpTransport::new(&base).with_session_token(manager).fetch_state(42).await.unwrap();
    assert_eq!(flag.course_id, 42);
    assert!(!flag.enabled);

    let err = HttpTransport::new(&base).with_session_token(student).fetch_state(42).await.unwrap_err();
    assert!(matches!(err, TransportError::Status { status: 403, .. }));

    let err = HttpTransport::new(&base).fetch_state(42).await.unwrap_err();
    assert!(matches!(err, TransportError::Status { status: 401, .. }));
}

#[tokio::test]
async fn healthz_ok() {
    let (_app, base) = start().await;
    let resp = reqwest::get(format!("{base}/healthz")).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
}

#[tokio::test]
async fn icons_are_served() {
    let (_app, base) = start().await;
    for icon in ["toggle_on.svg", "toggle_off.svg"] {
        let resp = reqwest::get(format!("{base}{PIX_PATH}/{icon}")).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK, "{icon}");
        assert!(resp.text().await.unwrap().contains("<svg"));
    }
}

// =============================================================================
// END TO END
// =============================================================================

#[tokio::test]
async fn render_toggle_off_render_again() {
    let (app, base) = start().await;
    let token = seed_user(&app, "teacher", MANAGER, Context::Course(42)).await;
    assert_eq!(stored(&app, 42).await, None);

    let html = get_view(&base, Some(&token), "courseid=42").await.text().await.unwrap();
    let args = init_args_from(&html);
    assert!(args.active);

    let transport = HttpTransport::new(&args.wwwroot).with_session_token(token.clone());
    let mut controller = Controller::new(args, app.state.config.labels.clone(), transport);
    let mut page = PageModel::with_slots(&Slot::ALL);
    controller.render(&mut page);
    assert!(!page.get(Slot::Popover).unwrap().is_hidden());

    let active = controller.toggle(&mut page).await.unwrap();
    assert!(!active);
    assert!(page.get(Slot::Popover).unwrap().is_hidden());
    assert_eq!(stored(&app, 42).await.as_deref(), Some("0"));

    let html = get_view(&base, Some(&token), "courseid=42").await.text().await.unwrap();
    assert!(!init_args_from(&html).active);
    assert!(html.contains(">Inactive</span>"));
}

#[tokio::test]
async fn rejected_toggle_rolls_back_page() {
    let (app, base) = start().await;
    let token = seed_user(&app, "observer", &[Capability::AddInstance], Context::Course(42)).await;

    let html = get_view(&base, Some(&token), "courseid=42").await.text().await.unwrap();
    let args = init_args_from(&html);
    let transport = HttpTransport::new(&args.wwwroot).with_session_token(token);
    let mut controller = Controller::new(args, app.state.config.labels.clone(), transport);
    let mut page = PageModel::with_slots(&Slot::ALL);
    controller.render(&mut page);

    let err = controller.toggle(&mut page).await.unwrap_err();
    assert!(matches!(err, ToggleError::RolledBack(TransportError::Status { status: 403, .. })));
    assert!(controller.active());
    assert_eq!(page.get(Slot::StatusText).unwrap().text.as_deref(), Some("Active"));
    assert_eq!(stored(&app, 42).await, None);
}

#[tokio::test]
async fn transport_posts_course_and_state() {
    let (app, base) = start().await;
    let token = seed_user(&app, "teacher", MANAGER, Context::Course(7)).await;
    let transport = HttpTransport::new(&format!("{base}/")).with_session_token(token);

    transport.set_state(7, false).await.unwrap();
    assert_eq!(stored(&app, 7).await.as_deref(), Some("0"));
    transport.set_state(7, true).await.unwrap();
    assert_eq!(stored(&app, 7).await.as_deref(), Some("1"));
}
