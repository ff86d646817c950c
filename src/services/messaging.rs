//! Course messaging flag: key derivation, fail-open reads, single-key writes.
//!
//! DESIGN
//! ======
//! The flag lives in the plugin's config namespace under `course_{id}`.
//! Writes store the requested state as its decimal text. Reads treat only
//! the exact text `"0"` as disabled; a missing row or any other text means
//! enabled.

use serde::Serialize;

use super::store::{ConfigStore, StoreError};

/// Config namespace owned by this block.
pub const PLUGIN: &str = "block_coursemessaging";

/// The only stored value that disables messaging.
pub const DISABLED_SENTINEL: &str = "0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CourseMessagingFlag {
    pub course_id: i64,
    pub enabled: bool,
}

#[must_use]
pub fn course_key(course_id: i64) -> String {
    format!("course_{course_id}")
}

/// Interpret a raw stored value.
#[must_use]
pub fn enabled_from_stored(value: Option<&str>) -> bool {
    value != Some(DISABLED_SENTINEL)
}

/// Read the messaging flag for a course.
///
/// # Errors
///
/// Returns a [`StoreError`] if the store cannot be read.
pub async fn read_flag(store: &dyn ConfigStore, course_id: i64) -> Result<CourseMessagingFlag, StoreError> {
    let raw = store.get(PLUGIN, &course_key(course_id)).await?;
    Ok(CourseMessagingFlag { course_id, enabled: enabled_from_stored(raw.as_deref()) })
}

/// Persist a requested state for a course and return the resulting flag.
///
/// `state` is stored verbatim; it is not range-checked.
///
/// # Errors
///
/// Returns a [`StoreError`] if the write fails. Nothing is written in that case.
pub async fn write_state(
    store: &dyn ConfigStore,
    course_id: i64,
    state: i64,
) -> Result<CourseMessagingFlag, StoreError> {
    let value = state.to_string();
    store.set(PLUGIN, &course_key(course_id), &value).await?;
    Ok(CourseMessagingFlag { course_id, enabled: enabled_from_stored(Some(&value)) })
}

#[cfg(test)]
#[path = "messaging_test.rs"]
mod tests;
