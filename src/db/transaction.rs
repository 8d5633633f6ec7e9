//! Transactions with an explicit isolation level.
//!
//! A `DbTransaction` borrows its connection for as long as it is open. It is
//! finished with `commit` or `rollback`; dropping it without either rolls the
//! work back.

use crate::db::connection::RawConnection;
use crate::db::executor::ConnRef;
use crate::error::DbResult;
use crate::mapping::ColumnMapper;
use crate::models::{CellValue, DatabaseType, FromFields};
use crate::table::DataTable;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use sqlx::{Connection, MySql, Postgres, Sqlite, Transaction};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Transaction isolation levels, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    ReadUncommitted,
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// SQL spelling, as used in `SET TRANSACTION ISOLATION LEVEL`.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::ReadUncommitted => "READ UNCOMMITTED",
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Error for unrecognized isolation level names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown isolation level '{0}'; expected read_uncommitted, read_committed, repeatable_read or serializable")]
pub struct ParseIsolationLevelError(pub String);

impl FromStr for IsolationLevel {
    type Err = ParseIsolationLevelError;

    /// Accepts `read_committed`, `read-committed`, `READ COMMITTED` and
    /// `ReadCommitted` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "readuncommitted" => Ok(Self::ReadUncommitted),
            "readcommitted" => Ok(Self::ReadCommitted),
            "repeatableread" => Ok(Self::RepeatableRead),
            "serializable" => Ok(Self::Serializable),
            _ => Err(ParseIsolationLevelError(s.to_string())),
        }
    }
}

pub(crate) enum RawTransaction<'c> {
    MySql(Transaction<'c, MySql>),
    Postgres(Transaction<'c, Postgres>),
    SQLite(Transaction<'c, Sqlite>),
}

/// An open transaction on a borrowed connection.
pub struct DbTransaction<'c> {
    inner: RawTransaction<'c>,
    mapper: Arc<ColumnMapper>,
    isolation: IsolationLevel,
    id: String,
    started: Instant,
}

impl<'c> DbTransaction<'c> {
    /// Begin a transaction at `isolation`.
    ///
    /// PostgreSQL takes the level as the first statement inside the
    /// transaction, MySQL as a statement just before `BEGIN`. SQLite
    /// transactions are always serializable, so the level is only logged.
    pub(crate) fn begin(
        conn: &'c mut RawConnection,
        mapper: Arc<ColumnMapper>,
        isolation: IsolationLevel,
    ) -> BoxFuture<'c, DbResult<Self>> {
        Box::pin(async move {
            let set_level = format!("SET TRANSACTION ISOLATION LEVEL {}", isolation.as_sql());

            let inner = match conn {
                RawConnection::MySql(c) => {
                    sqlx::Executor::execute(&mut *c, sqlx::raw_sql(&set_level)).await?;
                    RawTransaction::MySql(c.begin().await?)
                }
                RawConnection::Postgres(c) => {
                    let mut tx = c.begin().await?;
                    sqlx::Executor::execute(&mut *tx, sqlx::raw_sql(&set_level)).await?;
                    RawTransaction::Postgres(tx)
                }
                RawConnection::SQLite(c) => {
                    if isolation != IsolationLevel::Serializable {
                        debug!(
                            isolation = %isolation,
                            "SQLite runs every transaction as SERIALIZABLE"
                        );
                    }
                    RawTransaction::SQLite(c.begin().await?)
                }
            };

            let tx = Self {
                inner,
                mapper,
                isolation,
                id: generate_transaction_id(),
                started: Instant::now(),
            };

            info!(
                transaction_id = %tx.id,
                database = %tx.db_type(),
                isolation = %isolation,
                "Transaction started"
            );

            Ok(tx)
        })
    }

    /// Get the database type for this transaction.
    pub fn db_type(&self) -> DatabaseType {
        match self.inner {
            RawTransaction::MySql(_) => DatabaseType::MySQL,
            RawTransaction::Postgres(_) => DatabaseType::PostgreSQL,
            RawTransaction::SQLite(_) => DatabaseType::SQLite,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    fn conn(&mut self) -> ConnRef<'_> {
        match &mut self.inner {
            RawTransaction::MySql(tx) => ConnRef::MySql(&mut **tx),
            RawTransaction::Postgres(tx) => ConnRef::Postgres(&mut **tx),
            RawTransaction::SQLite(tx) => ConnRef::SQLite(&mut **tx),
        }
    }

    /// Execute a statement and return the number of affected rows.
    pub fn execute<'a>(
        &'a mut self,
        sql: &'a str,
        params: &'a [CellValue],
    ) -> BoxFuture<'a, DbResult<u64>> {
        self.conn().execute(sql, params)
    }

    /// Run a query and return its result set as a table.
    pub fn query_table<'a>(
        &'a mut self,
        sql: &'a str,
        params: &'a [CellValue],
    ) -> BoxFuture<'a, DbResult<DataTable>> {
        self.conn().query_table(sql, params)
    }

    /// Run a query and map every row onto a registered record type.
    pub fn query_as<'a, T>(
        &'a mut self,
        sql: &'a str,
        params: &'a [CellValue],
    ) -> BoxFuture<'a, DbResult<Vec<T>>>
    where
        T: FromFields + Send + 'a,
    {
        let mapper = Arc::clone(&self.mapper);
        self.conn().query_as(mapper, sql, params)
    }

    /// Insert every row of `table` into `target`.
    pub fn bulk_insert<'a>(
        &'a mut self,
        target: &'a str,
        table: &'a DataTable,
    ) -> BoxFuture<'a, DbResult<u64>> {
        self.conn().bulk_insert(target, table)
    }

    /// Commit the transaction.
    pub async fn commit(self) -> DbResult<()> {
        let Self {
            inner, id, started, ..
        } = self;
        impl_db_dispatch!(inner, RawTransaction, tx => tx.commit().await?);
        info!(
            transaction_id = %id,
            duration_ms = started.elapsed().as_millis() as u64,
            "Transaction committed"
        );
        Ok(())
    }

    /// Rollback the transaction.
    pub async fn rollback(self) -> DbResult<()> {
        let Self {
            inner, id, started, ..
        } = self;
        impl_db_dispatch!(inner, RawTransaction, tx => tx.rollback().await?);
        info!(
            transaction_id = %id,
            duration_ms = started.elapsed().as_millis() as u64,
            "Transaction rolled back"
        );
        Ok(())
    }
}

/// Generate a unique transaction ID for log correlation.
fn generate_transaction_id() -> String {
    format!("tx_{}", uuid::Uuid::new_v4().simple())
}
