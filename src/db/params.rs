//! Parameter binding for database queries.
//!
//! Query parameters and bulk-insert values are `CellValue`s. The bounds below
//! hold for all three backends; SQLite encodes JSON as text.

use crate::models::{CellValue, ValueKind};
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::query::Query;
use sqlx::query_builder::Separated;
use sqlx::types::Json;
use sqlx::{Database, Encode, Type};

/// Bind one parameter to a query.
///
/// An untyped `Null` is sent as a text NULL, which every backend accepts in
/// comparisons and inserts into nullable columns.
pub(crate) fn bind_cell<'q, DB>(
    query: Query<'q, DB, <DB as Database>::Arguments<'q>>,
    param: &CellValue,
) -> Query<'q, DB, <DB as Database>::Arguments<'q>>
where
    DB: Database,
    Option<String>: Encode<'q, DB> + Type<DB>,
    bool: Encode<'q, DB> + Type<DB>,
    i64: Encode<'q, DB> + Type<DB>,
    f64: Encode<'q, DB> + Type<DB>,
    String: Encode<'q, DB> + Type<DB>,
    Vec<u8>: Encode<'q, DB> + Type<DB>,
    DateTime<Utc>: Encode<'q, DB> + Type<DB>,
    Json<JsonValue>: Encode<'q, DB> + Type<DB>,
{
    match param {
        CellValue::Null => query.bind(None::<String>),
        CellValue::Bool(v) => query.bind(*v),
        CellValue::Int(v) => query.bind(*v),
        CellValue::Float(v) => query.bind(*v),
        CellValue::Text(v) => query.bind(v.clone()),
        CellValue::Bytes(v) => query.bind(v.clone()),
        CellValue::Timestamp(v) => query.bind(*v),
        CellValue::Json(v) => query.bind(Json(v.clone())),
    }
}

/// Push one value into a `VALUES` tuple.
///
/// `Null` is bound with the column's type so strictly typed backends accept
/// it for any column kind.
pub(crate) fn push_cell<'qb, 'args, DB>(
    tuple: &mut Separated<'qb, 'args, DB, &'static str>,
    value: &CellValue,
    kind: ValueKind,
) where
    'args: 'qb,
    DB: Database,
    Option<bool>: Encode<'args, DB> + Type<DB>,
    Option<i64>: Encode<'args, DB> + Type<DB>,
    Option<f64>: Encode<'args, DB> + Type<DB>,
    Option<String>: Encode<'args, DB> + Type<DB>,
    Option<Vec<u8>>: Encode<'args, DB> + Type<DB>,
    Option<DateTime<Utc>>: Encode<'args, DB> + Type<DB>,
    Option<Json<JsonValue>>: Encode<'args, DB> + Type<DB>,
    bool: Encode<'args, DB> + Type<DB>,
    i64: Encode<'args, DB> + Type<DB>,
    f64: Encode<'args, DB> + Type<DB>,
    String: Encode<'args, DB> + Type<DB>,
    Vec<u8>: Encode<'args, DB> + Type<DB>,
    DateTime<Utc>: Encode<'args, DB> + Type<DB>,
    Json<JsonValue>: Encode<'args, DB> + Type<DB>,
{
    match value {
        CellValue::Null => match kind {
            ValueKind::Boolean => tuple.push_bind(None::<bool>),
            ValueKind::Integer => tuple.push_bind(None::<i64>),
            ValueKind::Float => tuple.push_bind(None::<f64>),
            ValueKind::Text => tuple.push_bind(None::<String>),
            ValueKind::Binary => tuple.push_bind(None::<Vec<u8>>),
            ValueKind::Timestamp => tuple.push_bind(None::<DateTime<Utc>>),
            ValueKind::Json => tuple.push_bind(None::<Json<JsonValue>>),
        },
        CellValue::Bool(v) => tuple.push_bind(*v),
        CellValue::Int(v) => tuple.push_bind(*v),
        CellValue::Float(v) => tuple.push_bind(*v),
        CellValue::Text(v) => tuple.push_bind(v.clone()),
        CellValue::Bytes(v) => tuple.push_bind(v.clone()),
        CellValue::Timestamp(v) => tuple.push_bind(*v),
        CellValue::Json(v) => tuple.push_bind(Json(v.clone())),
    };
}
