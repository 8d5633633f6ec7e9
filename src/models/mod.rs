//! Data models for the mapper.
//!
//! This module re-exports all model types used throughout the crate.

pub mod connection;
pub mod record;
pub mod value;

// Re-export commonly used types
pub use connection::{ConfigError, ConnectionConfig, DEFAULT_CONNECT_TIMEOUT_SECS, DatabaseType};
pub use record::{
    DynamicRecord, FieldDescriptor, FieldSource, FieldType, FieldValues, FromFields,
    NestedRecord, Record, RecordShape, ShapeKey,
};
pub use value::{CellTypeError, CellValue, FieldValue, ScalarType, ValueKind, parse_timestamp};
