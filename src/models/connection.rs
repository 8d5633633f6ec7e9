//! Connection-related data models.
//!
//! This module defines the database backend type and the parsed connection
//! configuration.

use crate::db::IsolationLevel;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Default timeout for establishing a connection.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Query parameters consumed by this crate and stripped before the URL reaches the driver.
const CRATE_OPTIONS: &[&str] = &["isolation_level", "connect_timeout"];

/// Supported database types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    PostgreSQL,
    /// Includes MariaDB
    MySQL,
    SQLite,
}

impl DatabaseType {
    /// Parse database type from a connection string.
    pub fn from_connection_string(connection_string: &str) -> Option<Self> {
        let lower = connection_string.to_lowercase();
        if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
            Some(Self::PostgreSQL)
        } else if lower.starts_with("mysql://") || lower.starts_with("mariadb://") {
            Some(Self::MySQL)
        } else if lower.starts_with("sqlite://") || lower.starts_with("sqlite:") {
            Some(Self::SQLite)
        } else {
            None
        }
    }

    /// Get the display name for this database type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PostgreSQL => "PostgreSQL",
            Self::MySQL => "MySQL",
            Self::SQLite => "SQLite",
        }
    }

    /// Maximum number of bind parameters accepted in one statement.
    pub fn max_bind_params(&self) -> usize {
        match self {
            Self::PostgreSQL | Self::MySQL => 65_535,
            Self::SQLite => 32_766,
        }
    }

    /// Quote an identifier for this backend.
    pub fn quote_identifier(&self, ident: &str) -> String {
        match self {
            Self::MySQL => format!("`{}`", ident.replace('`', "``")),
            Self::PostgreSQL | Self::SQLite => format!("\"{}\"", ident.replace('"', "\"\"")),
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Configuration for opening connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub db_type: DatabaseType,
    /// Driver URL with crate options removed. Contains sensitive data - never log
    #[serde(skip_serializing)]
    pub connection_string: String,
    /// Isolation level used when none is given explicitly
    #[serde(default)]
    pub isolation_level: IsolationLevel,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

impl ConnectionConfig {
    /// Parse a connection URL.
    ///
    /// Recognized query parameters (removed from the driver URL):
    /// - `isolation_level`: default isolation level, e.g. `serializable`
    /// - `connect_timeout`: seconds to wait for the connection
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ConfigError::Empty);
        }

        let db_type = DatabaseType::from_connection_string(input)
            .ok_or_else(|| ConfigError::UnknownDatabaseType(mask_password(input)))?;

        let mut url = Url::parse(input).map_err(|e| ConfigError::InvalidUrl(e.to_string()))?;
        let mut opts = Self::extract_options(&mut url, CRATE_OPTIONS);

        let isolation_level = match opts.remove("isolation_level") {
            Some(v) => v
                .parse()
                .map_err(|_| ConfigError::InvalidOption("isolation_level", v))?,
            None => IsolationLevel::default(),
        };

        let connect_timeout_secs = match opts.remove("connect_timeout") {
            Some(v) => match v.parse::<u64>() {
                Ok(0) | Err(_) => return Err(ConfigError::InvalidOption("connect_timeout", v)),
                Ok(secs) => secs,
            },
            None => DEFAULT_CONNECT_TIMEOUT_SECS,
        };

        if db_type == DatabaseType::SQLite
            && url.host_str().unwrap_or_default().is_empty()
            && url.path().trim_matches('/').is_empty()
        {
            return Err(ConfigError::MissingSqlitePath);
        }

        Ok(Self {
            db_type,
            connection_string: url.to_string(),
            isolation_level,
            connect_timeout_secs,
        })
    }

    /// Get the connect timeout as a Duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Get a display-safe version of the connection string (credentials masked).
    pub fn masked_connection_string(&self) -> String {
        mask_password(&self.connection_string)
    }

    /// Extract crate-specific options from URL query params, keeping others for the driver.
    /// Uses proper URL encoding to preserve special characters in remaining params.
    fn extract_options(url: &mut Url, keys: &[&str]) -> HashMap<String, String> {
        let mut opts = HashMap::new();
        let remaining: Vec<(String, String)> = url
            .query_pairs()
            .filter_map(|(k, v)| {
                let key_lower = k.to_ascii_lowercase();
                if keys.contains(&key_lower.as_str()) {
                    opts.insert(key_lower, v.into_owned());
                    None
                } else {
                    Some((k.into_owned(), v.into_owned()))
                }
            })
            .collect();

        if remaining.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(remaining);
        }
        opts
    }
}

fn mask_password(connection_string: &str) -> String {
    if let Some(at_pos) = connection_string.find('@') {
        if let Some(colon_pos) = connection_string[..at_pos].rfind(':') {
            // Skip the scheme separator in "scheme://user@host"
            if !connection_string[colon_pos..].starts_with("://") {
                let prefix = &connection_string[..colon_pos + 1];
                let suffix = &connection_string[at_pos..];
                return format!("{}****{}", prefix, suffix);
            }
        }
    }
    connection_string.to_string()
}

/// Errors that can occur when parsing a connection configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Connection string cannot be empty")]
    Empty,

    #[error("Unknown database type in connection string: {0}")]
    UnknownDatabaseType(String),

    #[error("Invalid connection URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid value for '{0}': {1}")]
    InvalidOption(&'static str, String),

    #[error("SQLite requires a database file path")]
    MissingSqlitePath,
}
