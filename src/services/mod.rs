//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own persistence and permission concerns so route
//! handlers can stay focused on request parsing and status mapping.

pub mod access;
pub mod messaging;
pub mod session;
pub mod store;
