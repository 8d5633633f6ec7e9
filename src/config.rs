//! Command-line configuration for the `db-table-mapper` binary.
//!
//! Options come from CLI arguments or environment variables.

use crate::models::{ConfigError, ConnectionConfig};
use clap::Parser;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Run one query and print the result set as a JSON table.
#[derive(Parser, Debug, Clone)]
#[command(name = "db-table-mapper", version, about)]
pub struct Config {
    /// Database connection URL.
    /// Accepts ?isolation_level=<level> and ?connect_timeout=<secs>.
    #[arg(short = 'd', long = "database", value_name = "URL", env = "DB_MAPPER_DATABASE")]
    pub database: String,

    /// SQL query to run
    #[arg(short, long, value_name = "SQL")]
    pub query: String,

    /// Run the query inside a transaction at the connection's isolation level
    #[arg(long)]
    pub transactional: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = DEFAULT_LOG_LEVEL, env = "DB_MAPPER_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "DB_MAPPER_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            database: String::new(),
            query: String::new(),
            transactional: false,
            pretty: false,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            json_logs: false,
        }
    }

    /// Parse the database URL.
    pub fn connection_config(&self) -> Result<ConnectionConfig, ConfigError> {
        ConnectionConfig::parse(&self.database)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::IsolationLevel;
    use crate::models::DatabaseType;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, "info");
        assert!(!config.json_logs);
        assert!(!config.transactional);
    }

    #[test]
    fn test_parse_args() {
        let config = Config::try_parse_from([
            "db-table-mapper",
            "--database",
            "sqlite://data.db?isolation_level=serializable",
            "--query",
            "SELECT 1",
            "--pretty",
        ])
        .unwrap();
        assert_eq!(config.query, "SELECT 1");
        assert!(config.pretty);

        let conn = config.connection_config().unwrap();
        assert_eq!(conn.db_type, DatabaseType::SQLite);
        assert_eq!(conn.isolation_level, IsolationLevel::Serializable);
    }

    #[test]
    fn test_query_is_required() {
        let result = Config::try_parse_from(["db-table-mapper", "--database", "sqlite://x.db"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_connection_config_rejects_unknown_scheme() {
        let config = Config {
            database: "oracle://host/db".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            config.connection_config(),
            Err(ConfigError::UnknownDatabaseType(_))
        ));
    }
}
