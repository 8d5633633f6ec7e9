//! In-memory tables.
//!
//! A `DataTable` is an ordered list of typed columns and an ordered list of
//! rows, each row holding exactly one cell per column. Tables come from the
//! projector (typed records) or from `query_table` (result sets) and are read
//! only once built.

pub mod projector;

pub use projector::{project, project_shape};

use crate::models::{CellValue, ValueKind};
use serde::Serialize;

/// A table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    /// Underlying kind; `Option` fields contribute the kind of their inner type
    pub kind: ValueKind,
    pub nullable: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ValueKind, nullable: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable,
        }
    }
}

/// One row; cells are in column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Row {
    cells: Vec<CellValue>,
}

impl Row {
    pub(crate) fn new(cells: Vec<CellValue>) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[CellValue] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DataTable {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl DataTable {
    /// Build a table from columns and rows.
    ///
    /// Callers inside the crate guarantee every row has one cell per column.
    pub(crate) fn from_parts(columns: Vec<Column>, rows: Vec<Row>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get a cell by row index and column name.
    pub fn cell(&self, row: usize, column: &str) -> Option<&CellValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r.cells[idx])
    }

    /// A row as `(column name, cell)` pairs in column order.
    pub fn row_entries(&self, row: usize) -> Option<Vec<(&str, &CellValue)>> {
        self.rows.get(row).map(|r| {
            self.columns
                .iter()
                .map(|c| c.name.as_str())
                .zip(r.cells.iter())
                .collect()
        })
    }
}
