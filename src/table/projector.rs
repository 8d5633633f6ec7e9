//! Record-to-table projection.
//!
//! Turns a sequence of records into a `DataTable` whose columns follow the
//! record shape: names from the column override (else the field name), kinds
//! from the declared field type with `Option` unwrapped. Rows keep input
//! order and store `CellValue::Null` for absent values.

use crate::error::{DbError, DbResult};
use crate::models::{FieldSource, FieldType, Record, RecordShape};
use crate::table::{Column, DataTable, Row};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Project typed records into a table.
///
/// `None` means no collection was supplied at all; the result still carries
/// the columns, with zero rows.
pub fn project<T: Record>(records: Option<&[T]>) -> DbResult<DataTable> {
    project_shape(T::shape(), records.map(|r| r.iter()))
}

/// Project any field sources against an explicit shape.
///
/// Every item must expose exactly the fields of `shape`, matched by name.
/// Items with missing, extra or repeated fields, or with values that do not
/// fit the column kind, fail with `ShapeMismatch`.
pub fn project_shape<I>(shape: &RecordShape, records: Option<I>) -> DbResult<DataTable>
where
    I: IntoIterator,
    I::Item: FieldSource,
{
    let columns = build_columns(shape)?;

    let Some(records) = records else {
        debug!(
            record = shape.type_name,
            columns = columns.len(),
            "No record collection supplied, returning empty table"
        );
        return Ok(DataTable::from_parts(columns, Vec::new()));
    };

    let index: HashMap<&str, usize> = shape
        .fields
        .iter()
        .enumerate()
        .map(|(idx, field)| (field.name, idx))
        .collect();

    let rows = records
        .into_iter()
        .enumerate()
        .map(|(position, record)| build_row(shape, &columns, &index, position, &record))
        .collect::<DbResult<Vec<_>>>()?;

    debug!(
        record = shape.type_name,
        columns = columns.len(),
        rows = rows.len(),
        "Projected records into table"
    );

    Ok(DataTable::from_parts(columns, rows))
}

fn build_columns(shape: &RecordShape) -> DbResult<Vec<Column>> {
    let mut seen = HashSet::with_capacity(shape.fields.len());
    shape
        .fields
        .iter()
        .map(|field| {
            let name = field.column_name();
            if !seen.insert(name) {
                return Err(DbError::mapping(
                    shape.type_name,
                    format!("duplicate column name '{}'", name),
                ));
            }
            match field.field_type {
                FieldType::Scalar(scalar) => Ok(Column::new(name, scalar.kind, scalar.nullable)),
                FieldType::Nested(nested) => Err(DbError::mapping(
                    shape.type_name,
                    format!(
                        "field '{}' holds record type '{}' and cannot be projected into a column",
                        field.name,
                        nested().type_name
                    ),
                )),
            }
        })
        .collect()
}

fn build_row<R: FieldSource>(
    shape: &RecordShape,
    columns: &[Column],
    index: &HashMap<&str, usize>,
    position: usize,
    record: &R,
) -> DbResult<Row> {
    let mut cells = vec![None; columns.len()];

    for (name, value) in record.field_values() {
        let Some(&idx) = index.get(name) else {
            return Err(DbError::shape_mismatch(
                shape.type_name,
                format!("record {} has unexpected field '{}'", position, name),
            ));
        };
        if cells[idx].is_some() {
            return Err(DbError::shape_mismatch(
                shape.type_name,
                format!("record {} repeats field '{}'", position, name),
            ));
        }
        let cell = value.coerce_to(columns[idx].kind).map_err(|e| {
            DbError::shape_mismatch(
                shape.type_name,
                format!("record {} field '{}': {}", position, name, e),
            )
        })?;
        cells[idx] = Some(cell);
    }

    let cells = cells
        .into_iter()
        .zip(shape.fields)
        .map(|(cell, field)| {
            cell.ok_or_else(|| {
                DbError::shape_mismatch(
                    shape.type_name,
                    format!("record {} is missing field '{}'", position, field.name),
                )
            })
        })
        .collect::<DbResult<Vec<_>>>()?;

    Ok(Row::new(cells))
}
