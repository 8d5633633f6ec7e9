//! Connection provider.
//!
//! `DbProvider` owns the connection settings and the column mapper. Record
//! types are registered on the builder, before the first connection exists,
//! and the mapper is shared read-only afterwards.

use crate::db::DbConnection;
use crate::error::{DbError, DbResult};
use crate::mapping::ColumnMapper;
use crate::models::{ConnectionConfig, Record};
use crate::table::{DataTable, project};
use futures_util::future::BoxFuture;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct DbProvider {
    config: ConnectionConfig,
    mapper: Arc<ColumnMapper>,
}

/// Builder for [`DbProvider`].
#[derive(Debug)]
pub struct DbProviderBuilder {
    config: ConnectionConfig,
    mapper: ColumnMapper,
}

impl DbProviderBuilder {
    /// Register a record type (and the record types nested in it).
    pub fn register<T: Record>(mut self) -> Self {
        let added = self.mapper.register::<T>();
        debug!(
            record = T::shape().type_name,
            added, "Registered record type"
        );
        self
    }

    /// Use an already populated mapper; later `register` calls add to it.
    pub fn mapper(mut self, mapper: ColumnMapper) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn build(self) -> DbProvider {
        DbProvider {
            config: self.config,
            mapper: Arc::new(self.mapper),
        }
    }
}

impl DbProvider {
    pub fn builder(config: ConnectionConfig) -> DbProviderBuilder {
        DbProviderBuilder {
            config,
            mapper: ColumnMapper::new(),
        }
    }

    /// Build a provider from a connection URL, registering no record types.
    pub fn from_url(url: &str) -> DbResult<Self> {
        let config = ConnectionConfig::parse(url).map_err(|e| {
            DbError::connection(
                e.to_string(),
                "Use a postgres://, mysql:// or sqlite: connection URL",
            )
        })?;
        Ok(Self::builder(config).build())
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn mapper(&self) -> &ColumnMapper {
        &self.mapper
    }

    /// Open a new connection; the caller closes it.
    pub async fn open_connection(&self) -> DbResult<DbConnection> {
        DbConnection::open(&self.config, Arc::clone(&self.mapper)).await
    }

    /// Open a connection, run `work` on it, and close it.
    ///
    /// The connection is closed whether `work` succeeds or fails. A failure
    /// to close is logged and never replaces the result of `work`.
    pub fn connect<'a, T, F>(&'a self, work: F) -> BoxFuture<'a, DbResult<T>>
    where
        F: for<'c> FnOnce(&'c mut DbConnection) -> BoxFuture<'c, DbResult<T>> + Send + 'a,
        T: Send + 'a,
    {
        Box::pin(async move {
            let mut conn = self.open_connection().await?;
            let result = work(&mut conn).await;

            if let Err(e) = conn.close().await {
                warn!(
                    database = %self.config.db_type,
                    error = %e,
                    "Failed to close connection"
                );
            }

            result
        })
    }

    /// Project records into a table with this provider's column naming.
    pub fn create_table<T: Record>(&self, records: Option<&[T]>) -> DbResult<DataTable> {
        project(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::record! {
        #[derive(Debug, Clone, Default)]
        struct Team {
            id: i64 => "TeamId",
            name: String,
        }
    }

    crate::record! {
        #[derive(Debug, Clone, Default)]
        struct Player {
            id: i64,
            team: Option<Team> as nested,
        }
    }

    fn config() -> ConnectionConfig {
        ConnectionConfig::parse("sqlite://unused.db").unwrap()
    }

    #[test]
    fn test_builder_registers_nested_types() {
        let provider = DbProvider::builder(config()).register::<Player>().build();
        assert!(provider.mapper().is_registered::<Player>());
        assert!(provider.mapper().is_registered::<Team>());
        assert_eq!(provider.mapper().len(), 2);
    }

    #[test]
    fn test_create_table() {
        let provider = DbProvider::builder(config()).build();
        let teams = vec![Team {
            id: 7,
            name: "Ravens".into(),
        }];
        let table = provider.create_table(Some(teams.as_slice())).unwrap();
        assert_eq!(table.column_names(), vec!["TeamId", "name"]);
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_from_url_rejects_bad_url() {
        let err = DbProvider::from_url("ftp://nowhere").unwrap_err();
        assert!(matches!(err, DbError::Connection { .. }));
    }
}
