//! Identity and capability checks.
//!
//! DESIGN
//! ======
//! The host platform owns users, sessions and role assignments. This module
//! only asks two questions of it: who does this session token belong to, and
//! does that user hold a named capability in a given context. Both sit
//! behind [`AccessControl`] so routes never touch the backing tables.
//!
//! Contexts nest: site > course > module. A grant at an outer level covers
//! every inner context, so a course-level grant applies to all of the
//! course's activity pages.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};

use sqlx::PgPool;
use tokio::sync::RwLock;

use super::session;

// =============================================================================
// TYPES
// =============================================================================

/// Capabilities this block checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Required to change the messaging flag.
    ManageActivities,
    /// Required to see the toggle widget at all.
    AddInstance,
}

impl Capability {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ManageActivities => "moodle/course:manageactivities",
            Self::AddInstance => "block/coursemessaging:addinstance",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextLevel {
    Site,
    Course,
    Module,
}

impl ContextLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Site => "site",
            Self::Course => "course",
            Self::Module => "module",
        }
    }
}

/// Authorization scope of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    Site,
    Course(i64),
    Module { course_id: i64, cmid: i64 },
}

impl Context {
    /// The context itself followed by every enclosing context, innermost first.
    #[must_use]
    pub fn lineage(self) -> Vec<(ContextLevel, i64)> {
        match self {
            Self::Site => vec![(ContextLevel::Site, 0)],
            Self::Course(course_id) => vec![(ContextLevel::Course, course_id), (ContextLevel::Site, 0)],
            Self::Module { course_id, cmid } => vec![
                (ContextLevel::Module, cmid),
                (ContextLevel::Course, course_id),
                (ContextLevel::Site, 0),
            ],
        }
    }
}

/// Authenticated user behind a session.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Viewer {
    pub user_id: i64,
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("missing capability {}", .0.as_str())]
    Forbidden(Capability),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// =============================================================================
// ACCESS CONTROL TRAIT
// =============================================================================

/// Identity and permission lookups supplied by the host. Enables mocking in tests.
#[async_trait::async_trait]
pub trait AccessControl: Send + Sync {
    /// Resolve a session token. `None` means the caller is not authenticated.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Database`] if the lookup fails.
    async fn resolve_session(&self, token: &str) -> Result<Option<Viewer>, AccessError>;

    /// Whether `user_id` holds `capability` in `context` or any enclosing context.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Database`] if the lookup fails.
    async fn has_capability(&self, user_id: i64, capability: Capability, context: Context) -> Result<bool, AccessError>;
}

/// Fail with [`AccessError::Forbidden`] unless the viewer holds `capability`.
///
/// # Errors
///
/// Returns [`AccessError::Forbidden`] on a missing grant, or the backend error.
pub async fn require_capability(
    access: &dyn AccessControl,
    viewer: &Viewer,
    capability: Capability,
    context: Context,
) -> Result<(), AccessError> {
    if access.has_capability(viewer.user_id, capability, context).await? {
        Ok(())
    } else {
        Err(AccessError::Forbidden(capability))
    }
}

// =============================================================================
// POSTGRES
// =============================================================================

pub struct PgAccessControl {
    pool: PgPool,
}

impl PgAccessControl {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AccessControl for PgAccessControl {
    async fn resolve_session(&self, token: &str) -> Result<Option<Viewer>, AccessError> {
        Ok(session::validate_session(&self.pool, token).await?)
    }

    async fn has_capability(&self, user_id: i64, capability: Capability, context: Context) -> Result<bool, AccessError> {
        let (levels, instances): (Vec<&str>, Vec<i64>) = context
            .lineage()
            .into_iter()
            .map(|(level, id)| (level.as_str(), id))
            .unzip();

        let granted = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (
                 SELECT 1 FROM capability_grants g
                 JOIN UNNEST($3::text[], $4::bigint[]) AS c(context_level, instance_id)
                   ON g.context_level = c.context_level AND g.instance_id = c.instance_id
                 WHERE g.user_id = $1 AND g.capability = $2
             )",
        )
        .bind(user_id)
        .bind(capability.as_str())
        .bind(levels)
        .bind(instances)
        .fetch_one(&self.pool)
        .await?;

        Ok(granted)
    }
}

// =============================================================================
// IN-MEMORY
// =============================================================================

/// Process-local user directory. Backs tests and database-less runs.
pub struct MemoryAccessControl {
    next_user_id: AtomicI64,
    users: RwLock<HashMap<i64, Viewer>>,
    sessions: RwLock<HashMap<String, i64>>,
    grants: RwLock<HashSet<(i64, Capability, ContextLevel, i64)>>,
}

impl MemoryAccessControl {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_user_id: AtomicI64::new(1),
            users: RwLock::new(HashMap::new()),
            sessions: RwLock::new(HashMap::new()),
            grants: RwLock::new(HashSet::new()),
        }
    }

    /// Register a user and return its id.
    pub async fn add_user(&self, name: &str) -> i64 {
        let user_id = self.next_user_id.fetch_add(1, Ordering::Relaxed);
        self.users
            .write()
            .await
            .insert(user_id, Viewer { user_id, name: name.to_owned() });
        user_id
    }

    /// Issue a fresh session token for an existing user.
    pub async fn issue_session(&self, user_id: i64) -> String {
        let token = session::generate_token();
        self.sessions.write().await.insert(token.clone(), user_id);
        token
    }

    /// Grant `capability` to `user_id` at exactly one context.
    pub async fn grant(&self, user_id: i64, capability: Capability, context: Context) {
        let Some(&(level, instance)) = context.lineage().first() else {
            return;
        };
        self.grants
            .write()
            .await
            .insert((user_id, capability, level, instance));
    }
}

impl Default for MemoryAccessControl {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AccessControl for MemoryAccessControl {
    async fn resolve_session(&self, token: &str) -> Result<Option<Viewer>, AccessError> {
        let Some(user_id) = self.sessions.read().await.get(token).copied() else {
            return Ok(None);
        };
        Ok(self.users.read().await.get(&user_id).cloned())
    }

    async fn has_capability(&self, user_id: i64, capability: Capability, context: Context) -> Result<bool, AccessError> {
        let grants = self.grants.read().await;
        Ok(context
            .lineage()
            .into_iter()
            .any(|(level, instance)| grants.contains(&(user_id, capability, level, instance))))
    }
}

#[cfg(test)]
#[path = "access_test.rs"]
mod tests;
