//! Column-to-field mapping registry.
//!
//! A `ColumnMapper` records, per record type, which result-set column feeds
//! which field, using the same rule as the projector: the column override if
//! present, else the field name. Registering a type also registers every
//! record type reachable through its nested fields. A visited set keyed by
//! shape identity keeps self-referencing types from recursing forever.
//!
//! The registry is built once, before first use, and then shared read-only.

use crate::error::{DbError, DbResult};
use crate::models::{CellValue, FieldValues, FromFields, Record, RecordShape, ShapeKey};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Column lookup for one record type.
#[derive(Debug, Clone)]
pub struct TypeMap {
    shape: &'static RecordShape,
    /// Resolved column name -> field name
    exact: HashMap<&'static str, &'static str>,
    /// Lower-cased column name -> field name
    folded: HashMap<String, &'static str>,
}

impl TypeMap {
    fn new(shape: &'static RecordShape) -> Self {
        let mut exact = HashMap::new();
        let mut folded = HashMap::new();
        for field in shape.fields.iter().filter(|f| f.field_type.scalar().is_some()) {
            let column = field.column_name();
            exact.entry(column).or_insert(field.name);
            folded
                .entry(column.to_ascii_lowercase())
                .or_insert(field.name);
        }
        Self {
            shape,
            exact,
            folded,
        }
    }

    pub fn shape(&self) -> &'static RecordShape {
        self.shape
    }

    /// Find the field fed by a result column.
    ///
    /// Exact match on the resolved column name first, then an ASCII
    /// case-insensitive match.
    pub fn resolve(&self, column: &str) -> Option<&'static str> {
        self.exact
            .get(column)
            .copied()
            .or_else(|| self.folded.get(&column.to_ascii_lowercase()).copied())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ColumnMapper {
    maps: HashMap<ShapeKey, TypeMap>,
}

impl ColumnMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record type and every record type nested in it.
    ///
    /// Returns the number of types newly registered; registering a type a
    /// second time returns 0 and changes nothing.
    pub fn register<T: Record>(&mut self) -> usize {
        self.register_shape(T::shape())
    }

    /// Register a shape and its nested shapes.
    pub fn register_shape(&mut self, root: &'static RecordShape) -> usize {
        let mut visited: HashSet<ShapeKey> = HashSet::new();
        let mut pending = vec![root];
        let mut added = 0;

        while let Some(shape) = pending.pop() {
            let key = shape.key();
            if !visited.insert(key) {
                continue;
            }
            if !self.maps.contains_key(&key) {
                debug!(record = shape.type_name, "Registering column map");
                self.maps.insert(key, TypeMap::new(shape));
                added += 1;
            }
            pending.extend(shape.nested().filter(|n| !visited.contains(&n.key())));
        }

        added
    }

    /// Builder-style registration.
    pub fn with<T: Record>(mut self) -> Self {
        self.register::<T>();
        self
    }

    pub fn is_registered<T: Record>(&self) -> bool {
        self.maps.contains_key(&T::shape().key())
    }

    /// Number of registered record types.
    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// Get the column map for a record type.
    pub fn type_map<T: Record>(&self) -> DbResult<&TypeMap> {
        let shape = T::shape();
        self.maps.get(&shape.key()).ok_or_else(|| {
            DbError::mapping(
                shape.type_name,
                "type is not registered; register record types before querying",
            )
        })
    }

    /// Map one decoded result row onto a record.
    ///
    /// Columns that feed no field are ignored.
    pub fn map_row<T: FromFields>(&self, columns: &[&str], cells: Vec<CellValue>) -> DbResult<T> {
        let map = self.type_map::<T>()?;
        let mut fields = FieldValues::new(map.shape.type_name);
        for (column, cell) in columns.iter().zip(cells) {
            if let Some(field) = map.resolve(column) {
                fields.insert(field, cell);
            }
        }
        T::from_fields(&mut fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::record! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Department {
            id: i64 => "DeptId",
            title: String,
        }
    }

    crate::record! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Employee {
            id: i64 => "EmployeeId",
            full_name: String => "FullName",
            age: Option<i32>,
            department: Option<Department> as nested,
            manager: Option<Box<Employee>> as nested,
            reports: Vec<Employee> as nested,
        }
    }

    crate::record! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct NodeA {
            id: i64,
            peer: Option<Box<NodeB>> as nested,
        }
    }

    crate::record! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct NodeB {
            id: i64,
            peer: Option<Box<NodeA>> as nested,
        }
    }

    #[test]
    fn test_register_walks_nested_types() {
        let mut mapper = ColumnMapper::new();
        assert_eq!(mapper.register::<Employee>(), 2);
        assert!(mapper.is_registered::<Employee>());
        assert!(mapper.is_registered::<Department>());
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut mapper = ColumnMapper::new();
        mapper.register::<Department>();
        assert_eq!(mapper.register::<Employee>(), 1);
        assert_eq!(mapper.register::<Employee>(), 0);
        assert_eq!(mapper.len(), 2);
    }

    #[test]
    fn test_mutual_recursion_terminates() {
        let mapper = ColumnMapper::new().with::<NodeA>();
        assert_eq!(mapper.len(), 2);
        assert!(mapper.is_registered::<NodeB>());
    }

    #[test]
    fn test_resolve_override_and_field_name() {
        let mapper = ColumnMapper::new().with::<Employee>();
        let map = mapper.type_map::<Employee>().unwrap();
        assert_eq!(map.resolve("EmployeeId"), Some("id"));
        assert_eq!(map.resolve("FullName"), Some("full_name"));
        assert_eq!(map.resolve("age"), Some("age"));
        // Overridden fields answer only to their column name
        assert_eq!(map.resolve("full_name"), None);
        assert_eq!(map.resolve("department"), None);
    }

    #[test]
    fn test_resolve_case_insensitive_fallback() {
        let mapper = ColumnMapper::new().with::<Employee>();
        let map = mapper.type_map::<Employee>().unwrap();
        assert_eq!(map.resolve("employeeid"), Some("id"));
        assert_eq!(map.resolve("AGE"), Some("age"));
    }

    #[test]
    fn test_map_row() {
        let mapper = ColumnMapper::new().with::<Employee>();
        let employee: Employee = mapper
            .map_row(
                &["EmployeeId", "FullName", "age", "ignored"],
                vec![
                    CellValue::Int(4),
                    CellValue::Text("Lin".into()),
                    CellValue::Null,
                    CellValue::Int(99),
                ],
            )
            .unwrap();
        assert_eq!(employee.id, 4);
        assert_eq!(employee.full_name, "Lin");
        assert_eq!(employee.age, None);
        assert!(employee.reports.is_empty());
    }

    #[test]
    fn test_map_row_missing_required_column() {
        let mapper = ColumnMapper::new().with::<Department>();
        let err = mapper
            .map_row::<Department>(&["DeptId"], vec![CellValue::Int(1)])
            .unwrap_err();
        assert!(err.to_string().contains("required field 'title'"));
    }

    #[test]
    fn test_unregistered_type() {
        let mapper = ColumnMapper::new();
        let err = mapper.map_row::<Department>(&[], vec![]).unwrap_err();
        assert!(matches!(err, DbError::Mapping { .. }));
        assert!(err.to_string().contains("not registered"));
    }
}
