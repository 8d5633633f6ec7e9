//! Database-agnostic type mappings.
//!
//! Result rows are decoded into `CellValue`s in two phases:
//! 1. `TypeCategory` classifies the column's database type name
//! 2. A backend-specific decoder extracts the value for that category
//!
//! Values that are present but cannot be decoded become `Null` and are
//! logged, so one exotic column does not fail the whole result set.

use crate::models::{CellValue, DatabaseType, ValueKind};
use crate::table::Column as TableColumn;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueRef};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Decode, Row, Type, TypeInfo, ValueRef};

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Text,
    Binary,
    Json,
    Timestamp,
    Unknown,
}

impl TypeCategory {
    /// Column kind used in result tables.
    ///
    /// Decimals keep their exact text form.
    pub fn value_kind(self) -> Option<ValueKind> {
        match self {
            Self::Integer => Some(ValueKind::Integer),
            Self::Float => Some(ValueKind::Float),
            Self::Boolean => Some(ValueKind::Boolean),
            Self::Decimal | Self::Text => Some(ValueKind::Text),
            Self::Binary => Some(ValueKind::Binary),
            Self::Json => Some(ValueKind::Json),
            Self::Timestamp => Some(ValueKind::Timestamp),
            Self::Unknown => None,
        }
    }
}

/// Classify a database type name into a logical category.
pub fn categorize_type(type_name: &str, db: DatabaseType) -> TypeCategory {
    let lower = type_name.to_lowercase();

    // Decimal/Numeric - check first as it overlaps with "numeric" in float checks
    if lower.contains("decimal") || lower.contains("numeric") {
        // SQLite's NUMERIC is actually a float
        if db == DatabaseType::SQLite && lower == "numeric" {
            return TypeCategory::Float;
        }
        return TypeCategory::Decimal;
    }

    if lower.starts_with("timestamp") || lower == "datetime" {
        return TypeCategory::Timestamp;
    }

    // Integer types
    if lower.contains("int") || lower.contains("serial") || lower.contains("tiny") {
        return TypeCategory::Integer;
    }

    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }

    if lower.contains("float")
        || lower.contains("double")
        || lower == "real"
        || lower == "float4"
        || lower == "float8"
    {
        return TypeCategory::Float;
    }

    if lower == "json" || lower == "jsonb" {
        return TypeCategory::Json;
    }

    if lower.contains("blob") || lower.contains("binary") || lower == "bytea" {
        return TypeCategory::Binary;
    }

    if lower.contains("char") || lower.contains("text") || lower == "uuid" {
        return TypeCategory::Text;
    }

    // SQLite expression columns report "NULL"; other backends: date, time, enums...
    TypeCategory::Unknown
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Wrapper type for raw DECIMAL/NUMERIC values as strings.
/// This preserves the exact database representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

impl Type<sqlx::Postgres> for RawDecimal {
    fn type_info() -> PgTypeInfo {
        <String as Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("numeric") || name.contains("decimal")
    }
}

impl<'r> Decode<'r, sqlx::Postgres> for RawDecimal {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::Postgres>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

// =============================================================================
// Row to Cells Trait
// =============================================================================

/// Trait for converting database rows to table cells.
pub trait RowToCells {
    /// Decode every column of the row, in column order.
    fn to_cells(&self) -> Vec<CellValue>;

    /// Names of the row's columns, in order.
    fn column_names(&self) -> Vec<String>;
}

/// Build table columns from driver column metadata.
///
/// Also returns the per-column category so callers can refine `Unknown`
/// columns from the decoded values.
pub fn table_columns<C: Column>(
    columns: &[C],
    db: DatabaseType,
) -> (Vec<TableColumn>, Vec<TypeCategory>) {
    columns
        .iter()
        .map(|col| {
            let category = categorize_type(col.type_info().name(), db);
            let kind = category.value_kind().unwrap_or(ValueKind::Text);
            (TableColumn::new(col.name(), kind, true), category)
        })
        .unzip()
}

fn undecodable(db: DatabaseType, idx: usize, type_name: &str, err: sqlx::Error) -> CellValue {
    tracing::warn!(
        database = %db,
        column = idx,
        type_name = %type_name,
        error = %err,
        "Could not decode column value, using NULL"
    );
    CellValue::Null
}

impl RowToCells for MySqlRow {
    fn to_cells(&self) -> Vec<CellValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let type_name = col.type_info().name();
                let category = categorize_type(type_name, DatabaseType::MySQL);
                mysql::decode_column(self, idx, type_name, category)
            })
            .collect()
    }

    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }
}

impl RowToCells for PgRow {
    fn to_cells(&self) -> Vec<CellValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let type_name = col.type_info().name();
                let category = categorize_type(type_name, DatabaseType::PostgreSQL);
                postgres::decode_column(self, idx, type_name, category)
            })
            .collect()
    }

    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }
}

impl RowToCells for SqliteRow {
    fn to_cells(&self) -> Vec<CellValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let type_name = col.type_info().name();
                let category = categorize_type(type_name, DatabaseType::SQLite);
                sqlite::decode_column(self, idx, type_name, category)
            })
            .collect()
    }

    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }
}

// =============================================================================
// Database-Specific Decoders
// =============================================================================

mod mysql {
    use super::*;

    const DB: DatabaseType = DatabaseType::MySQL;

    pub fn decode_column(
        row: &MySqlRow,
        idx: usize,
        type_name: &str,
        category: TypeCategory,
    ) -> CellValue {
        // Check NULL first so the integer probing below only sees values
        if row.try_get_raw(idx).map(|v| v.is_null()).unwrap_or(true) {
            return CellValue::Null;
        }
        match category {
            TypeCategory::Decimal => match row.try_get::<Option<RawDecimal>, _>(idx) {
                Ok(v) => v.map(|d| CellValue::Text(d.0)).unwrap_or(CellValue::Null),
                Err(e) => undecodable(DB, idx, type_name, e),
            },
            TypeCategory::Integer => decode_integer(row, idx, type_name),
            TypeCategory::Boolean => match row.try_get::<Option<bool>, _>(idx) {
                Ok(v) => v.map(CellValue::Bool).unwrap_or(CellValue::Null),
                Err(e) => undecodable(DB, idx, type_name, e),
            },
            TypeCategory::Float => decode_float(row, idx, type_name),
            TypeCategory::Binary => match row.try_get::<Option<Vec<u8>>, _>(idx) {
                Ok(v) => v.map(CellValue::Bytes).unwrap_or(CellValue::Null),
                Err(e) => undecodable(DB, idx, type_name, e),
            },
            TypeCategory::Json => match row.try_get::<Option<JsonValue>, _>(idx) {
                Ok(v) => v.map(CellValue::Json).unwrap_or(CellValue::Null),
                Err(e) => undecodable(DB, idx, type_name, e),
            },
            TypeCategory::Timestamp => decode_timestamp(row, idx, type_name),
            _ => match row.try_get::<Option<String>, _>(idx) {
                Ok(v) => v.map(CellValue::Text).unwrap_or(CellValue::Null),
                Err(e) => undecodable(DB, idx, type_name, e),
            },
        }
    }

    fn decode_integer(row: &MySqlRow, idx: usize, type_name: &str) -> CellValue {
        if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(idx) {
            return CellValue::Int(v);
        }
        if let Ok(Some(v)) = row.try_get::<Option<i32>, _>(idx) {
            return CellValue::Int(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<i16>, _>(idx) {
            return CellValue::Int(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<i8>, _>(idx) {
            return CellValue::Int(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<u32>, _>(idx) {
            return CellValue::Int(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<u16>, _>(idx) {
            return CellValue::Int(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<u8>, _>(idx) {
            return CellValue::Int(v.into());
        }
        match row.try_get::<Option<u64>, _>(idx) {
            // BIGINT UNSIGNED beyond i64 keeps its digits as text
            Ok(Some(v)) => i64::try_from(v)
                .map(CellValue::Int)
                .unwrap_or_else(|_| CellValue::Text(v.to_string())),
            Ok(None) => CellValue::Null,
            Err(e) => undecodable(DB, idx, type_name, e),
        }
    }

    fn decode_float(row: &MySqlRow, idx: usize, type_name: &str) -> CellValue {
        if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
            return CellValue::Float(v);
        }
        match row.try_get::<Option<f32>, _>(idx) {
            Ok(v) => v.map(|f| CellValue::Float(f.into())).unwrap_or(CellValue::Null),
            Err(e) => undecodable(DB, idx, type_name, e),
        }
    }

    fn decode_timestamp(row: &MySqlRow, idx: usize, type_name: &str) -> CellValue {
        if let Ok(Some(v)) = row.try_get::<Option<DateTime<Utc>>, _>(idx) {
            return CellValue::Timestamp(v);
        }
        match row.try_get::<Option<NaiveDateTime>, _>(idx) {
            Ok(v) => v
                .map(|t| CellValue::Timestamp(t.and_utc()))
                .unwrap_or(CellValue::Null),
            Err(e) => undecodable(DB, idx, type_name, e),
        }
    }
}

mod postgres {
    use super::*;

    const DB: DatabaseType = DatabaseType::PostgreSQL;

    pub fn decode_column(
        row: &PgRow,
        idx: usize,
        type_name: &str,
        category: TypeCategory,
    ) -> CellValue {
        match category {
            TypeCategory::Decimal => match row.try_get::<Option<RawDecimal>, _>(idx) {
                Ok(v) => v.map(|d| CellValue::Text(d.0)).unwrap_or(CellValue::Null),
                Err(e) => undecodable(DB, idx, type_name, e),
            },
            TypeCategory::Integer => decode_integer(row, idx, type_name),
            TypeCategory::Boolean => match row.try_get::<Option<bool>, _>(idx) {
                Ok(v) => v.map(CellValue::Bool).unwrap_or(CellValue::Null),
                Err(e) => undecodable(DB, idx, type_name, e),
            },
            TypeCategory::Float => decode_float(row, idx, type_name),
            TypeCategory::Binary => match row.try_get::<Option<Vec<u8>>, _>(idx) {
                Ok(v) => v.map(CellValue::Bytes).unwrap_or(CellValue::Null),
                Err(e) => undecodable(DB, idx, type_name, e),
            },
            TypeCategory::Json => match row.try_get::<Option<JsonValue>, _>(idx) {
                Ok(v) => v.map(CellValue::Json).unwrap_or(CellValue::Null),
                Err(e) => undecodable(DB, idx, type_name, e),
            },
            TypeCategory::Timestamp => decode_timestamp(row, idx, type_name),
            _ => match row.try_get::<Option<String>, _>(idx) {
                Ok(v) => v.map(CellValue::Text).unwrap_or(CellValue::Null),
                Err(e) => undecodable(DB, idx, type_name, e),
            },
        }
    }

    fn decode_integer(row: &PgRow, idx: usize, type_name: &str) -> CellValue {
        if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(idx) {
            return CellValue::Int(v);
        }
        if let Ok(Some(v)) = row.try_get::<Option<i32>, _>(idx) {
            return CellValue::Int(v.into());
        }
        match row.try_get::<Option<i16>, _>(idx) {
            Ok(v) => v.map(|i| CellValue::Int(i.into())).unwrap_or(CellValue::Null),
            Err(e) => undecodable(DB, idx, type_name, e),
        }
    }

    fn decode_float(row: &PgRow, idx: usize, type_name: &str) -> CellValue {
        if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
            return CellValue::Float(v);
        }
        match row.try_get::<Option<f32>, _>(idx) {
            Ok(v) => v.map(|f| CellValue::Float(f.into())).unwrap_or(CellValue::Null),
            Err(e) => undecodable(DB, idx, type_name, e),
        }
    }

    fn decode_timestamp(row: &PgRow, idx: usize, type_name: &str) -> CellValue {
        if let Ok(Some(v)) = row.try_get::<Option<DateTime<Utc>>, _>(idx) {
            return CellValue::Timestamp(v);
        }
        match row.try_get::<Option<NaiveDateTime>, _>(idx) {
            Ok(v) => v
                .map(|t| CellValue::Timestamp(t.and_utc()))
                .unwrap_or(CellValue::Null),
            Err(e) => undecodable(DB, idx, type_name, e),
        }
    }
}

mod sqlite {
    use super::*;

    const DB: DatabaseType = DatabaseType::SQLite;

    pub fn decode_column(
        row: &SqliteRow,
        idx: usize,
        type_name: &str,
        category: TypeCategory,
    ) -> CellValue {
        let Ok(raw) = row.try_get_raw(idx) else {
            return CellValue::Null;
        };
        if raw.is_null() {
            return CellValue::Null;
        }

        // Columns without a declared type take the storage class of the value
        let category = if category == TypeCategory::Unknown {
            let storage = raw.type_info().name().to_string();
            categorize_type(&storage, DB)
        } else {
            category
        };

        match category {
            TypeCategory::Integer => match row.try_get::<i64, _>(idx) {
                Ok(v) => CellValue::Int(v),
                Err(e) => undecodable(DB, idx, type_name, e),
            },
            TypeCategory::Boolean => match row.try_get::<bool, _>(idx) {
                Ok(v) => CellValue::Bool(v),
                Err(e) => undecodable(DB, idx, type_name, e),
            },
            TypeCategory::Float | TypeCategory::Decimal => match row.try_get::<f64, _>(idx) {
                Ok(v) => CellValue::Float(v),
                Err(e) => undecodable(DB, idx, type_name, e),
            },
            TypeCategory::Binary => match row.try_get::<Vec<u8>, _>(idx) {
                Ok(v) => CellValue::Bytes(v),
                Err(e) => undecodable(DB, idx, type_name, e),
            },
            TypeCategory::Timestamp => decode_timestamp(row, idx, type_name),
            TypeCategory::Json => decode_text(row, idx, type_name, true),
            _ => decode_text(row, idx, type_name, false),
        }
    }

    fn decode_timestamp(row: &SqliteRow, idx: usize, type_name: &str) -> CellValue {
        if let Ok(v) = row.try_get::<DateTime<Utc>, _>(idx) {
            return CellValue::Timestamp(v);
        }
        if let Ok(v) = row.try_get::<NaiveDateTime, _>(idx) {
            return CellValue::Timestamp(v.and_utc());
        }
        // Free-form text in a DATETIME column stays as text
        decode_text(row, idx, type_name, false)
    }

    fn decode_text(row: &SqliteRow, idx: usize, type_name: &str, json: bool) -> CellValue {
        match row.try_get::<String, _>(idx) {
            Ok(v) if json => serde_json::from_str(&v)
                .map(CellValue::Json)
                .unwrap_or(CellValue::Text(v)),
            Ok(v) => CellValue::Text(v),
            Err(e) => undecodable(DB, idx, type_name, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_type_integer() {
        assert_eq!(
            categorize_type("INT", DatabaseType::MySQL),
            TypeCategory::Integer
        );
        assert_eq!(
            categorize_type("BIGINT", DatabaseType::PostgreSQL),
            TypeCategory::Integer
        );
        assert_eq!(
            categorize_type("INT8", DatabaseType::PostgreSQL),
            TypeCategory::Integer
        );
        assert_eq!(
            categorize_type("INTEGER", DatabaseType::SQLite),
            TypeCategory::Integer
        );
    }

    #[test]
    fn test_categorize_type_decimal() {
        assert_eq!(
            categorize_type("DECIMAL", DatabaseType::MySQL),
            TypeCategory::Decimal
        );
        assert_eq!(
            categorize_type("NUMERIC", DatabaseType::PostgreSQL),
            TypeCategory::Decimal
        );
        // SQLite NUMERIC is a float
        assert_eq!(
            categorize_type("numeric", DatabaseType::SQLite),
            TypeCategory::Float
        );
    }

    #[test]
    fn test_categorize_type_timestamp() {
        assert_eq!(
            categorize_type("TIMESTAMPTZ", DatabaseType::PostgreSQL),
            TypeCategory::Timestamp
        );
        assert_eq!(
            categorize_type("DATETIME", DatabaseType::SQLite),
            TypeCategory::Timestamp
        );
        // Plain dates are not instants
        assert_eq!(
            categorize_type("DATE", DatabaseType::PostgreSQL),
            TypeCategory::Unknown
        );
    }

    #[test]
    fn test_categorize_type_text_and_unknown() {
        assert_eq!(
            categorize_type("VARCHAR", DatabaseType::MySQL),
            TypeCategory::Text
        );
        assert_eq!(
            categorize_type("UUID", DatabaseType::PostgreSQL),
            TypeCategory::Text
        );
        assert_eq!(
            categorize_type("NULL", DatabaseType::SQLite),
            TypeCategory::Unknown
        );
    }

    #[test]
    fn test_categorize_type_json_and_binary() {
        assert_eq!(
            categorize_type("jsonb", DatabaseType::PostgreSQL),
            TypeCategory::Json
        );
        assert_eq!(
            categorize_type("BYTEA", DatabaseType::PostgreSQL),
            TypeCategory::Binary
        );
        assert_eq!(
            categorize_type("BLOB", DatabaseType::SQLite),
            TypeCategory::Binary
        );
    }

    #[test]
    fn test_category_value_kind() {
        assert_eq!(TypeCategory::Decimal.value_kind(), Some(ValueKind::Text));
        assert_eq!(
            TypeCategory::Timestamp.value_kind(),
            Some(ValueKind::Timestamp)
        );
        assert_eq!(TypeCategory::Unknown.value_kind(), None);
    }
}
