//! Server configuration parsed from environment variables.

use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_ACTIVE_LABEL: &str = "Active";
pub const DEFAULT_INACTIVE_LABEL: &str = "Inactive";
pub const DEFAULT_DESCRIPTION: &str = "Allow participants to exchange messages.";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Labels shown by the toggle widget. Deployments override them to match
/// the site language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
    pub active: String,
    pub inactive: String,
    pub description: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            active: DEFAULT_ACTIVE_LABEL.to_owned(),
            inactive: DEFAULT_INACTIVE_LABEL.to_owned(),
            description: DEFAULT_DESCRIPTION.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    /// Postgres connection string. `None` runs the server on in-memory stores.
    pub database_url: Option<String>,
    /// Upper bound of the Postgres pool.
    pub db_max_connections: u32,
    /// Public base URL of the site (`wwwroot`), without trailing slash.
    pub public_url: String,
    /// Directory holding the toggle icons.
    pub pix_dir: PathBuf,
    pub labels: Labels,
}

impl AppConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `DATABASE_URL`: in-memory mode when absent
    /// - `DB_MAX_CONNECTIONS`: default 5
    /// - `PUBLIC_URL`: default `http://localhost:{PORT}`
    /// - `PIX_DIR`: default `pix/` next to the manifest
    /// - `MESSAGING_ACTIVE_LABEL`, `MESSAGING_INACTIVE_LABEL`, `MESSAGING_DESCRIPTION`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `PORT` is not a valid port number
    /// or `DB_MAX_CONNECTIONS` is not a positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { key: "PORT", value: raw })?,
            None => DEFAULT_PORT,
        };

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        let db_max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::Invalid { key: "DB_MAX_CONNECTIONS", value: raw })?,
            None => DEFAULT_DB_MAX_CONNECTIONS,
        };
        let public_url = lookup("PUBLIC_URL")
            .unwrap_or_else(|| format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_owned();
        let pix_dir = lookup("PIX_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("pix"));

        let defaults = Labels::default();
        let labels = Labels {
            active: lookup("MESSAGING_ACTIVE_LABEL").unwrap_or(defaults.active),
            inactive: lookup("MESSAGING_INACTIVE_LABEL").unwrap_or(defaults.inactive),
            description: lookup("MESSAGING_DESCRIPTION").unwrap_or(defaults.description),
        };

        Ok(Self { port, database_url, db_max_connections, public_url, pix_dir, labels })
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
