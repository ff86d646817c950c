use std::sync::Arc;

use coursemsg::config::AppConfig;
use coursemsg::services::access::{AccessControl, Capability, Context, MemoryAccessControl, PgAccessControl};
use coursemsg::services::store::{ConfigStore, MemoryConfigStore, PgConfigStore};
use coursemsg::state::AppState;
use coursemsg::{db, routes};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env().expect("invalid configuration");
    let port = config.port;

    let (store, access): (Arc<dyn ConfigStore>, Arc<dyn AccessControl>) = match &config.database_url {
        Some(url) => {
            let pool = db::init_pool(url, config.db_max_connections).await.expect("database init failed");
            (Arc::new(PgConfigStore::new(pool.clone())), Arc::new(PgAccessControl::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory stores");
            (Arc::new(MemoryConfigStore::new()), Arc::new(dev_access().await))
        }
    };

    let state = AppState::new(store, access, config);
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "coursemsg listening");
    axum::serve(listener, app).await.expect("server failed");
}

/// Directory with one site-wide manager, for running without a database.
async fn dev_access() -> MemoryAccessControl {
    let access = MemoryAccessControl::new();
    let user_id = access.add_user("dev").await;
    access.grant(user_id, Capability::ManageActivities, Context::Site).await;
    access.grant(user_id, Capability::AddInstance, Context::Site).await;
    let token = access.issue_session(user_id).await;
    tracing::info!(%token, "development session issued (cookie `session_token`)");
    access
}
