//! Record descriptors.
//!
//! A record type carries a static, ordered table of field descriptors (its
//! `RecordShape`) instead of being inspected at runtime. The `record!` macro
//! generates the table together with the value accessors; hand-written
//! implementations of the traits below work the same way.

use crate::error::{DbError, DbResult};
use crate::models::value::{CellValue, FieldValue, ScalarType};
use std::collections::HashMap;

/// Declared type of a field.
#[derive(Debug, Clone, Copy)]
pub enum FieldType {
    /// Scalar value, possibly nullable.
    Scalar(ScalarType),
    /// Another record type, reached directly or through `Option`/`Box`/`Vec`.
    Nested(fn() -> &'static RecordShape),
}

impl FieldType {
    /// The scalar type, if this is not a nested record.
    pub fn scalar(&self) -> Option<ScalarType> {
        match self {
            Self::Scalar(scalar) => Some(*scalar),
            Self::Nested(_) => None,
        }
    }
}

/// One field of a record type.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    /// Field name as declared on the struct
    pub name: &'static str,
    pub field_type: FieldType,
    /// Column-name override
    pub column: Option<&'static str>,
}

impl FieldDescriptor {
    pub const fn new(
        name: &'static str,
        field_type: FieldType,
        column: Option<&'static str>,
    ) -> Self {
        Self {
            name,
            field_type,
            column,
        }
    }

    /// Column name for this field: the override if present, else the field name.
    pub fn column_name(&self) -> &'static str {
        self.column.unwrap_or(self.name)
    }
}

/// Ordered field layout of a record type.
#[derive(Debug)]
pub struct RecordShape {
    pub type_name: &'static str,
    pub fields: &'static [FieldDescriptor],
}

/// Identity of a `RecordShape`, stable for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeKey(usize);

impl RecordShape {
    pub const fn new(type_name: &'static str, fields: &'static [FieldDescriptor]) -> Self {
        Self { type_name, fields }
    }

    /// Identity key. Shapes live in statics, so the address is unique per type.
    pub fn key(&'static self) -> ShapeKey {
        ShapeKey(self as *const RecordShape as usize)
    }

    /// Look up a field by its declared name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Nested record shapes referenced directly by this shape, in field order.
    pub fn nested(&self) -> impl Iterator<Item = &'static RecordShape> + '_ {
        self.fields.iter().filter_map(|f| match f.field_type {
            FieldType::Nested(shape) => Some(shape()),
            FieldType::Scalar(_) => None,
        })
    }
}

/// Anything that can hand out its own field values by name.
///
/// The projector matches these names against the declared shape, so an item
/// whose fields differ from the shape is detected instead of being read
/// positionally.
pub trait FieldSource {
    /// Scalar field values in the instance's own order.
    fn field_values(&self) -> Vec<(&str, CellValue)>;
}

impl<T: FieldSource + ?Sized> FieldSource for &T {
    fn field_values(&self) -> Vec<(&str, CellValue)> {
        (**self).field_values()
    }
}

impl<T: FieldSource + ?Sized> FieldSource for Box<T> {
    fn field_values(&self) -> Vec<(&str, CellValue)> {
        (**self).field_values()
    }
}

/// A record type with a static shape.
pub trait Record: FieldSource {
    fn shape() -> &'static RecordShape
    where
        Self: Sized;
}

/// A record type that can be built from mapped field values.
pub trait FromFields: Record + Sized {
    fn from_fields(fields: &mut FieldValues) -> DbResult<Self>;
}

/// Field types that hold another record type.
///
/// Implemented by `record!` for each record, and for the usual wrappers so a
/// self-referencing type can be declared through `Option<Box<T>>`.
pub trait NestedRecord {
    fn nested_shape() -> &'static RecordShape;
}

impl<T: NestedRecord> NestedRecord for Option<T> {
    fn nested_shape() -> &'static RecordShape {
        T::nested_shape()
    }
}

impl<T: NestedRecord> NestedRecord for Box<T> {
    fn nested_shape() -> &'static RecordShape {
        T::nested_shape()
    }
}

impl<T: NestedRecord> NestedRecord for Vec<T> {
    fn nested_shape() -> &'static RecordShape {
        T::nested_shape()
    }
}

/// Field values of one result row, keyed by field name.
#[derive(Debug, Clone, Default)]
pub struct FieldValues {
    record: &'static str,
    values: HashMap<&'static str, CellValue>,
}

impl FieldValues {
    pub fn new(record: &'static str) -> Self {
        Self {
            record,
            values: HashMap::new(),
        }
    }

    pub fn insert(&mut self, field: &'static str, value: CellValue) {
        self.values.insert(field, value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Take a field value and convert it to the field's Rust type.
    ///
    /// A field with no column in the result behaves as `NULL`: fine for
    /// `Option` fields, a mapping error otherwise.
    pub fn take<T: FieldValue>(&mut self, field: &'static str) -> DbResult<T> {
        let present = self.values.contains_key(field);
        let cell = self.values.remove(field).unwrap_or(CellValue::Null);
        T::from_cell(cell).map_err(|e| {
            if present {
                DbError::mapping(self.record, format!("field '{}': {}", field, e))
            } else {
                DbError::mapping(
                    self.record,
                    format!("no column in the result maps to required field '{}'", field),
                )
            }
        })
    }
}

/// A record whose field set is only known at runtime.
///
/// Useful for rows coming from outside the type system, and for feeding the
/// projector items that may not match the shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicRecord {
    fields: Vec<(String, CellValue)>,
}

impl DynamicRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field value.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }
}

impl FieldSource for DynamicRecord {
    fn field_values(&self) -> Vec<(&str, CellValue)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.clone()))
            .collect()
    }
}

impl<T: FieldValue> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.to_cell()
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Int(value.into())
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::value::ValueKind;

    static ADDRESS_FIELDS: [FieldDescriptor; 1] = [FieldDescriptor::new(
        "city",
        FieldType::Scalar(ScalarType::required(ValueKind::Text)),
        Some("City"),
    )];
    static ADDRESS: RecordShape = RecordShape::new("Address", &ADDRESS_FIELDS);

    fn address_shape() -> &'static RecordShape {
        &ADDRESS
    }

    static PERSON_FIELDS: [FieldDescriptor; 2] = [
        FieldDescriptor::new(
            "id",
            FieldType::Scalar(ScalarType::required(ValueKind::Integer)),
            None,
        ),
        FieldDescriptor::new("home", FieldType::Nested(address_shape), None),
    ];
    static PERSON: RecordShape = RecordShape::new("Person", &PERSON_FIELDS);

    #[test]
    fn test_column_name_resolution() {
        assert_eq!(ADDRESS_FIELDS[0].column_name(), "City");
        assert_eq!(PERSON_FIELDS[0].column_name(), "id");
    }

    #[test]
    fn test_shape_key_is_identity() {
        assert_eq!(ADDRESS.key(), address_shape().key());
        assert_ne!(ADDRESS.key(), PERSON.key());
    }

    #[test]
    fn test_nested_shapes() {
        let nested: Vec<_> = PERSON.nested().map(|s| s.type_name).collect();
        assert_eq!(nested, vec!["Address"]);
        assert!(PERSON.field("home").unwrap().field_type.scalar().is_none());
    }

    #[test]
    fn test_field_values_take() {
        let mut values = FieldValues::new("Person");
        values.insert("id", CellValue::Int(3));

        assert_eq!(values.take::<i64>("id").unwrap(), 3);
        assert_eq!(values.take::<Option<String>>("name").unwrap(), None);
        assert!(values.is_empty());

        let err = values.take::<String>("name").unwrap_err();
        assert!(err.to_string().contains("required field 'name'"));
    }

    #[test]
    fn test_field_values_take_wrong_kind() {
        let mut values = FieldValues::new("Person");
        values.insert("id", CellValue::Text("abc".into()));
        let err = values.take::<i64>("id").unwrap_err();
        assert!(matches!(err, DbError::Mapping { .. }));
        assert!(err.to_string().contains("field 'id'"));
    }

    #[test]
    fn test_dynamic_record_field_values() {
        let record = DynamicRecord::new()
            .with("id", 1_i64)
            .with("name", None::<String>);
        let values = record.field_values();
        assert_eq!(values[0], ("id", CellValue::Int(1)));
        assert_eq!(values[1], ("name", CellValue::Null));
    }
}
