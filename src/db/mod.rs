//! Database access layer.
//!
//! This module provides:
//! - Single connections over the three sqlx backends
//! - Transactions with an explicit isolation level
//! - Statement execution, table queries, typed queries and bulk inserts
//! - Row decoding and parameter binding per backend
//! - A dispatch macro for the per-backend enums

#[macro_use]
pub mod macros;
pub mod connection;
pub(crate) mod executor;
pub(crate) mod params;
pub mod transaction;
pub mod types;

pub use connection::DbConnection;
pub use transaction::{DbTransaction, IsolationLevel, ParseIsolationLevelError};
pub use types::{TypeCategory, categorize_type};
