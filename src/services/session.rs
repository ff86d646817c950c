//! Session tokens and session lookup.
//!
//! DESIGN
//! ======
//! Sessions are opaque random tokens carried in the `session_token` cookie.
//! The host platform issues them at login; this service only resolves a
//! token to the user it belongs to, ignoring expired rows.

use std::fmt::Write;

use rand::Rng;
use sqlx::{PgPool, Row};

use super::access::Viewer;

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

/// Validate a session token and return the associated user.
///
/// # Errors
///
/// Returns a database error if the lookup fails.
pub async fn validate_session(pool: &PgPool, token: &str) -> Result<Option<Viewer>, sqlx::Error> {
    let row = sqlx::query(
        r"SELECT u.id, u.name
          FROM sessions s
          JOIN users u ON u.id = s.user_id
          WHERE s.token = $1 AND s.expires_at > now()",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| Viewer { user_id: r.get("id"), name: r.get("name") }))
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
