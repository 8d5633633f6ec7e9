//! db-table-mapper
//!
//! Typed records to tables and back over sqlx (SQLite, PostgreSQL, MySQL):
//! - `record!` declares a struct with a static field-descriptor table
//! - `project` turns a slice of records into a `DataTable`
//! - `ColumnMapper` maps result-set columns onto record fields
//! - `DbProvider` opens connections and runs transactional work

#[macro_use]
mod macros;

pub mod config;
pub mod db;
pub mod error;
pub mod mapping;
pub mod models;
pub mod provider;
pub mod table;

pub use config::Config;
pub use db::{DbConnection, DbTransaction, IsolationLevel};
pub use error::{DbError, DbResult};
pub use mapping::ColumnMapper;
pub use models::{CellValue, ConnectionConfig, DatabaseType, Record, ValueKind};
pub use provider::{DbProvider, DbProviderBuilder};
pub use table::{Column, DataTable, Row, project, project_shape};

/// Boxed future returned by transactional and scoped work closures.
pub use futures_util::future::BoxFuture;
