//! Backend dispatch macro.
//!
//! Connections and transactions are enums with one variant per backend. The
//! macro expands the same body once per variant, so each arm type-checks
//! against its own concrete sqlx types with zero runtime overhead.

/// Generate match arms for the three backend variants of an enum.
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(&mut self.inner, RawConnection, conn => {
///     sqlx::query(sql).execute(&mut *conn).await
/// })
/// ```
#[macro_export]
macro_rules! impl_db_dispatch {
    ($target:expr, $enum:ident, $p:ident => $body:expr) => {
        match $target {
            $enum::MySql($p) => $body,
            $enum::Postgres($p) => $body,
            $enum::SQLite($p) => $body,
        }
    };
}
