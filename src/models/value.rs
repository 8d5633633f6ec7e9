//! Cell values and the scalar types they belong to.
//!
//! `CellValue` is what lives in a `DataTable` cell, what a decoded result row
//! carries, and what gets bound as a statement parameter. `CellValue::Null` is
//! the missing marker: it is never equal to `0`, `""` or an empty byte string.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Logical value kind of a column or field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Boolean,
    Integer,
    Float,
    Text,
    Binary,
    Json,
    Timestamp,
}

impl ValueKind {
    /// Get the display name for this kind.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Text => "text",
            Self::Binary => "binary",
            Self::Json => "json",
            Self::Timestamp => "timestamp",
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Declared type of a scalar field: its kind plus whether it was wrapped in `Option`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScalarType {
    pub kind: ValueKind,
    pub nullable: bool,
}

impl ScalarType {
    pub const fn required(kind: ValueKind) -> Self {
        Self {
            kind,
            nullable: false,
        }
    }

    pub const fn nullable(kind: ValueKind) -> Self {
        Self {
            kind,
            nullable: true,
        }
    }
}

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Missing marker (SQL NULL)
    Null,
    Bool(bool),
    /// Stored as i64 for maximum range
    Int(i64),
    Float(f64),
    Text(String),
    /// Binary data (base64 encoded in JSON)
    #[serde(with = "base64_bytes")]
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
    Json(JsonValue),
}

impl CellValue {
    /// Check if this cell holds the missing marker.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The kind of value held, `None` for the missing marker.
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(ValueKind::Boolean),
            Self::Int(_) => Some(ValueKind::Integer),
            Self::Float(_) => Some(ValueKind::Float),
            Self::Text(_) => Some(ValueKind::Text),
            Self::Bytes(_) => Some(ValueKind::Binary),
            Self::Timestamp(_) => Some(ValueKind::Timestamp),
            Self::Json(_) => Some(ValueKind::Json),
        }
    }

    /// Get the type name of this value for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.kind().map_or("null", |k| k.display_name())
    }

    /// Coerce a value into a column of the given kind.
    ///
    /// The missing marker fits every kind. Integers widen into float columns;
    /// any other kind difference is an error.
    pub fn coerce_to(self, kind: ValueKind) -> Result<CellValue, CellTypeError> {
        match (self, kind) {
            (Self::Null, _) => Ok(Self::Null),
            (Self::Int(v), ValueKind::Float) => Ok(Self::Float(v as f64)),
            (value, kind) if value.kind() == Some(kind) => Ok(value),
            (value, kind) => Err(CellTypeError::new(kind, &value)),
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Text(v) => write!(f, "{}", v),
            Self::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Self::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            Self::Json(v) => write!(f, "{}", v),
        }
    }
}

/// A cell could not be converted to the requested kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected {expected} value, found {found}")]
pub struct CellTypeError {
    pub expected: ValueKind,
    pub found: &'static str,
}

impl CellTypeError {
    fn new(expected: ValueKind, found: &CellValue) -> Self {
        Self {
            expected,
            found: found.type_name(),
        }
    }
}

/// Conversion between a Rust field type and a cell.
///
/// `Option<T>` is nullable with the kind of `T`; every other implementation
/// is a required field.
pub trait FieldValue: Sized {
    const SCALAR: ScalarType;

    fn to_cell(&self) -> CellValue;

    fn from_cell(cell: CellValue) -> Result<Self, CellTypeError>;
}

impl<T: FieldValue> FieldValue for Option<T> {
    const SCALAR: ScalarType = ScalarType::nullable(T::SCALAR.kind);

    fn to_cell(&self) -> CellValue {
        match self {
            Some(v) => v.to_cell(),
            None => CellValue::Null,
        }
    }

    fn from_cell(cell: CellValue) -> Result<Self, CellTypeError> {
        match cell {
            CellValue::Null => Ok(None),
            other => T::from_cell(other).map(Some),
        }
    }
}

macro_rules! impl_integer_field {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl FieldValue for $ty {
                const SCALAR: ScalarType = ScalarType::required(ValueKind::Integer);

                fn to_cell(&self) -> CellValue {
                    CellValue::Int(i64::from(*self))
                }

                fn from_cell(cell: CellValue) -> Result<Self, CellTypeError> {
                    match cell {
                        CellValue::Int(v) => <$ty>::try_from(v)
                            .map_err(|_| CellTypeError::new(ValueKind::Integer, &CellValue::Int(v))),
                        CellValue::Bool(v) => Ok(<$ty>::from(v)),
                        other => Err(CellTypeError::new(ValueKind::Integer, &other)),
                    }
                }
            }
        )+
    };
}

impl_integer_field!(i8, i16, i32, i64, u8, u16, u32);

impl FieldValue for bool {
    const SCALAR: ScalarType = ScalarType::required(ValueKind::Boolean);

    fn to_cell(&self) -> CellValue {
        CellValue::Bool(*self)
    }

    fn from_cell(cell: CellValue) -> Result<Self, CellTypeError> {
        match cell {
            CellValue::Bool(v) => Ok(v),
            // SQLite and MySQL hand booleans back as integers
            CellValue::Int(v) => Ok(v != 0),
            other => Err(CellTypeError::new(ValueKind::Boolean, &other)),
        }
    }
}

impl FieldValue for f64 {
    const SCALAR: ScalarType = ScalarType::required(ValueKind::Float);

    fn to_cell(&self) -> CellValue {
        CellValue::Float(*self)
    }

    fn from_cell(cell: CellValue) -> Result<Self, CellTypeError> {
        match cell {
            CellValue::Float(v) => Ok(v),
            CellValue::Int(v) => Ok(v as f64),
            CellValue::Text(ref s) => s
                .parse()
                .map_err(|_| CellTypeError::new(ValueKind::Float, &cell)),
            other => Err(CellTypeError::new(ValueKind::Float, &other)),
        }
    }
}

impl FieldValue for f32 {
    const SCALAR: ScalarType = ScalarType::required(ValueKind::Float);

    fn to_cell(&self) -> CellValue {
        CellValue::Float(f64::from(*self))
    }

    fn from_cell(cell: CellValue) -> Result<Self, CellTypeError> {
        f64::from_cell(cell).map(|v| v as f32)
    }
}

impl FieldValue for String {
    const SCALAR: ScalarType = ScalarType::required(ValueKind::Text);

    fn to_cell(&self) -> CellValue {
        CellValue::Text(self.clone())
    }

    fn from_cell(cell: CellValue) -> Result<Self, CellTypeError> {
        match cell {
            CellValue::Text(v) => Ok(v),
            other => Err(CellTypeError::new(ValueKind::Text, &other)),
        }
    }
}

impl FieldValue for Vec<u8> {
    const SCALAR: ScalarType = ScalarType::required(ValueKind::Binary);

    fn to_cell(&self) -> CellValue {
        CellValue::Bytes(self.clone())
    }

    fn from_cell(cell: CellValue) -> Result<Self, CellTypeError> {
        match cell {
            CellValue::Bytes(v) => Ok(v),
            CellValue::Text(v) => Ok(v.into_bytes()),
            other => Err(CellTypeError::new(ValueKind::Binary, &other)),
        }
    }
}

impl FieldValue for DateTime<Utc> {
    const SCALAR: ScalarType = ScalarType::required(ValueKind::Timestamp);

    fn to_cell(&self) -> CellValue {
        CellValue::Timestamp(*self)
    }

    fn from_cell(cell: CellValue) -> Result<Self, CellTypeError> {
        match cell {
            CellValue::Timestamp(v) => Ok(v),
            // SQLite stores timestamps as text
            CellValue::Text(ref s) => parse_timestamp(s)
                .ok_or_else(|| CellTypeError::new(ValueKind::Timestamp, &cell)),
            other => Err(CellTypeError::new(ValueKind::Timestamp, &other)),
        }
    }
}

impl FieldValue for JsonValue {
    const SCALAR: ScalarType = ScalarType::required(ValueKind::Json);

    fn to_cell(&self) -> CellValue {
        CellValue::Json(self.clone())
    }

    fn from_cell(cell: CellValue) -> Result<Self, CellTypeError> {
        match cell {
            CellValue::Json(v) => Ok(v),
            CellValue::Text(ref s) => serde_json::from_str(s)
                .map_err(|_| CellTypeError::new(ValueKind::Json, &cell)),
            other => Err(CellTypeError::new(ValueKind::Json, &other)),
        }
    }
}

/// Parse RFC 3339 or `YYYY-MM-DD HH:MM:SS[.f]` (assumed UTC) text.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Custom serialization for binary data as base64.
mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        STANDARD.encode(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_is_distinct_from_defaults() {
        assert_ne!(CellValue::Null, CellValue::Int(0));
        assert_ne!(CellValue::Null, CellValue::Text(String::new()));
        assert_ne!(CellValue::Null, CellValue::Bytes(Vec::new()));
        assert!(CellValue::Null.is_null());
        assert_eq!(CellValue::Null.kind(), None);
    }

    #[test]
    fn test_coerce_widens_integer_to_float() {
        assert_eq!(
            CellValue::Int(3).coerce_to(ValueKind::Float),
            Ok(CellValue::Float(3.0))
        );
        assert_eq!(
            CellValue::Null.coerce_to(ValueKind::Integer),
            Ok(CellValue::Null)
        );
    }

    #[test]
    fn test_coerce_rejects_other_kinds() {
        let err = CellValue::Text("5".into())
            .coerce_to(ValueKind::Integer)
            .unwrap_err();
        assert_eq!(err.expected, ValueKind::Integer);
        assert_eq!(err.found, "text");
    }

    #[test]
    fn test_option_unwraps_one_level() {
        assert_eq!(<Option<i64>>::SCALAR, ScalarType::nullable(ValueKind::Integer));
        assert_eq!(<i32>::SCALAR, ScalarType::required(ValueKind::Integer));
        assert_eq!(<Option<String>>::from_cell(CellValue::Null), Ok(None));
        assert_eq!(<Option<i64>>::from_cell(CellValue::Int(5)), Ok(Some(5)));
        assert_eq!(Some(5_i64).to_cell(), CellValue::Int(5));
        assert_eq!(None::<i64>.to_cell(), CellValue::Null);
    }

    #[test]
    fn test_integer_narrowing_checks_range() {
        assert_eq!(i16::from_cell(CellValue::Int(42)), Ok(42));
        assert!(i8::from_cell(CellValue::Int(1_000)).is_err());
        assert!(u32::from_cell(CellValue::Int(-1)).is_err());
    }

    #[test]
    fn test_bool_from_integer() {
        assert_eq!(bool::from_cell(CellValue::Int(1)), Ok(true));
        assert_eq!(bool::from_cell(CellValue::Int(0)), Ok(false));
        assert!(bool::from_cell(CellValue::Text("yes".into())).is_err());
    }

    #[test]
    fn test_timestamp_from_text() {
        let ts = DateTime::<Utc>::from_cell(CellValue::Text("2024-03-01 12:30:00".into())).unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-03-01T12:30:00+00:00");

        let ts = DateTime::<Utc>::from_cell(CellValue::Text("2024-03-01T12:30:00+02:00".into()))
            .unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-03-01T10:30:00+00:00");
    }

    #[test]
    fn test_json_from_text() {
        let v = JsonValue::from_cell(CellValue::Text(r#"{"a":1}"#.into())).unwrap();
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn test_cell_serializes_untagged() {
        let cells = vec![
            CellValue::Null,
            CellValue::Int(7),
            CellValue::Text("x".into()),
            CellValue::Bytes(b"hi".to_vec()),
        ];
        let json = serde_json::to_string(&cells).unwrap();
        assert_eq!(json, r#"[null,7,"x","aGk="]"#);
    }

    #[test]
    fn test_display() {
        assert_eq!(CellValue::Null.to_string(), "NULL");
        assert_eq!(CellValue::Bytes(vec![1, 2, 3]).to_string(), "<3 bytes>");
        assert_eq!(ValueKind::Timestamp.to_string(), "timestamp");
    }
}
