//! Statement execution shared by connections and transactions.
//!
//! `ConnRef` borrows the live backend connection, either a plain connection
//! or the one held by an open transaction, and runs:
//! - statements returning a row count
//! - queries decoded into a `DataTable`
//! - queries mapped onto record types through the `ColumnMapper`
//! - chunked multi-row inserts of a `DataTable`

use crate::db::params::{bind_cell, push_cell};
use crate::db::types::{RowToCells, TypeCategory, table_columns};
use crate::error::{DbError, DbResult};
use crate::mapping::ColumnMapper;
use crate::models::{CellValue, DatabaseType, FromFields};
use crate::table::{DataTable, Row as TableRow};
use futures_util::future::BoxFuture;
use sqlx::mysql::MySqlConnection;
use sqlx::postgres::PgConnection;
use sqlx::query::Query;
use sqlx::sqlite::SqliteConnection;
use sqlx::{Connection, Database, Executor, QueryBuilder, Row, Statement};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Mutable borrow of a backend connection.
pub(crate) enum ConnRef<'a> {
    MySql(&'a mut MySqlConnection),
    Postgres(&'a mut PgConnection),
    SQLite(&'a mut SqliteConnection),
}

/// Start a query whose database type follows the connection it will run on.
fn typed_query<'q, C: Connection>(
    _conn: &C,
    sql: &'q str,
) -> Query<'q, C::Database, <C::Database as Database>::Arguments<'q>> {
    sqlx::query::<C::Database>(sql)
}

fn typed_builder<'args, C: Connection>(_conn: &C, init: String) -> QueryBuilder<'args, C::Database> {
    QueryBuilder::new(init)
}

impl<'a> ConnRef<'a> {
    pub fn db_type(&self) -> DatabaseType {
        match self {
            ConnRef::MySql(_) => DatabaseType::MySQL,
            ConnRef::Postgres(_) => DatabaseType::PostgreSQL,
            ConnRef::SQLite(_) => DatabaseType::SQLite,
        }
    }

    /// Execute a statement and return the number of affected rows.
    pub fn execute(self, sql: &'a str, params: &'a [CellValue]) -> BoxFuture<'a, DbResult<u64>> {
        Box::pin(async move {
            let start = Instant::now();

            let rows_affected = impl_db_dispatch!(self, ConnRef, conn => {
                let mut query = typed_query(&*conn, sql);
                for param in params {
                    query = bind_cell(query, param);
                }
                query.execute(&mut *conn).await?.rows_affected()
            });

            debug!(
                sql = %sql,
                params = params.len(),
                rows_affected,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Executed statement"
            );

            Ok(rows_affected)
        })
    }

    /// Run a query and return its result set as a table.
    ///
    /// Column kinds come from the database type of each column. Columns whose
    /// type is not known up front take the kind of their first non-null value.
    pub fn query_table(
        self,
        sql: &'a str,
        params: &'a [CellValue],
    ) -> BoxFuture<'a, DbResult<DataTable>> {
        Box::pin(async move {
            let start = Instant::now();
            let db_type = self.db_type();

            let (mut columns, categories, cells) = impl_db_dispatch!(self, ConnRef, conn => {
                let mut query = typed_query(&*conn, sql);
                for param in params {
                    query = bind_cell(query, param);
                }
                let rows = query.fetch_all(&mut *conn).await?;
                let (columns, categories) = match rows.first() {
                    Some(first) => table_columns(first.columns(), db_type),
                    None => {
                        // No rows to read metadata from; ask the server instead
                        let statement = (&mut *conn).prepare(sql).await?;
                        table_columns(statement.columns(), db_type)
                    }
                };
                let cells: Vec<Vec<CellValue>> = rows.iter().map(|r| r.to_cells()).collect();
                (columns, categories, cells)
            });

            for (idx, category) in categories.iter().enumerate() {
                if *category != TypeCategory::Unknown {
                    continue;
                }
                if let Some(kind) = cells
                    .iter()
                    .map(|row| &row[idx])
                    .find(|cell| !cell.is_null())
                    .and_then(|cell| cell.kind())
                {
                    columns[idx].kind = kind;
                }
            }

            let rows: Vec<TableRow> = cells.into_iter().map(TableRow::new).collect();

            debug!(
                sql = %sql,
                params = params.len(),
                columns = columns.len(),
                rows = rows.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Queried table"
            );

            Ok(DataTable::from_parts(columns, rows))
        })
    }

    /// Run a query and map every row onto `T`.
    pub fn query_as<T>(
        self,
        mapper: Arc<ColumnMapper>,
        sql: &'a str,
        params: &'a [CellValue],
    ) -> BoxFuture<'a, DbResult<Vec<T>>>
    where
        T: FromFields + Send + 'a,
    {
        Box::pin(async move {
            // Fail before touching the database when the type was never registered
            mapper.type_map::<T>()?;
            let start = Instant::now();

            let (names, cells) = impl_db_dispatch!(self, ConnRef, conn => {
                let mut query = typed_query(&*conn, sql);
                for param in params {
                    query = bind_cell(query, param);
                }
                let rows = query.fetch_all(&mut *conn).await?;
                let names = rows.first().map(|r| r.column_names()).unwrap_or_default();
                let cells: Vec<Vec<CellValue>> = rows.iter().map(|r| r.to_cells()).collect();
                (names, cells)
            });

            let names: Vec<&str> = names.iter().map(String::as_str).collect();
            let records = cells
                .into_iter()
                .map(|row| mapper.map_row::<T>(&names, row))
                .collect::<DbResult<Vec<T>>>()?;

            debug!(
                sql = %sql,
                record = T::shape().type_name,
                rows = records.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Mapped query results"
            );

            Ok(records)
        })
    }

    /// Insert every row of `table` into the database table `target`.
    ///
    /// Rows are sent as multi-row `INSERT ... VALUES` statements, each one
    /// carrying as many rows as fit under the backend's bind-parameter limit.
    pub fn bulk_insert(
        self,
        target: &'a str,
        table: &'a DataTable,
    ) -> BoxFuture<'a, DbResult<u64>> {
        Box::pin(async move {
            let db_type = self.db_type();
            let columns = table.columns();

            if columns.is_empty() {
                return Err(DbError::invalid_input(format!(
                    "cannot insert into '{}': the table has no columns",
                    target
                )));
            }
            if table.is_empty() {
                debug!(target_table = %target, "Nothing to insert");
                return Ok(0);
            }

            let prefix = insert_prefix(db_type, target, table)?;
            let rows_per_statement = (db_type.max_bind_params() / columns.len()).max(1);
            let start = Instant::now();
            let mut inserted = 0u64;
            let mut statements = 0usize;

            impl_db_dispatch!(self, ConnRef, conn => {
                for chunk in table.rows().chunks(rows_per_statement) {
                    let mut builder = typed_builder(&*conn, prefix.clone());
                    builder.push_values(chunk, |mut tuple, row| {
                        for (cell, column) in row.cells().iter().zip(columns) {
                            push_cell(&mut tuple, cell, column.kind);
                        }
                    });
                    inserted += builder.build().execute(&mut *conn).await?.rows_affected();
                    statements += 1;
                }
            });

            debug!(
                target_table = %target,
                rows = inserted,
                statements,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Bulk insert complete"
            );

            Ok(inserted)
        })
    }
}

/// `INSERT INTO "schema"."table" ("a", "b") ` with identifiers quoted for the backend.
fn insert_prefix(db_type: DatabaseType, target: &str, table: &DataTable) -> DbResult<String> {
    if target.trim().is_empty() || target.split('.').any(|part| part.is_empty()) {
        return Err(DbError::invalid_input(format!(
            "invalid target table name '{}'",
            target
        )));
    }

    let target = target
        .split('.')
        .map(|part| db_type.quote_identifier(part))
        .collect::<Vec<_>>()
        .join(".");
    let columns = table
        .columns()
        .iter()
        .map(|c| db_type.quote_identifier(&c.name))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!("INSERT INTO {} ({}) ", target, columns))
}
