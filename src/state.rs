//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the plugin config store, the host's access-control lookups and
//! the parsed server configuration. Nothing here caches the messaging flag;
//! every request reads or writes the store directly.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::access::AccessControl;
use crate::services::store::ConfigStore;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ConfigStore>,
    pub access: Arc<dyn AccessControl>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn ConfigStore>, access: Arc<dyn AccessControl>, config: AppConfig) -> Self {
        Self { store, access, config: Arc::new(config) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
