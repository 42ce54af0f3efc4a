//! Read-only access to columnar tables.
//!
//! A MeasurementSet is a main table plus named sub-tables (ANTENNA,
//! OBSERVATION, ...). The extractor only needs row counts and typed cell
//! reads, so that is all [`Table`] exposes. Readers for concrete storage
//! formats implement [`Table`] and [`TableSource`]; [`memory`] provides an
//! in-memory set loadable from a YAML/JSON dump.

pub mod memory;

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::{MemoryTable, MemoryTableSet};

pub type TableResult<T> = Result<T, TableError>;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("table {table} has no column {column}")]
    NoSuchColumn { table: String, column: String },

    #[error("row {row} out of range for table {table} ({nrows} rows)")]
    RowOutOfRange { table: String, row: usize, nrows: usize },

    #[error("{table}.{column}[{row}]: expected {expected}")]
    TypeMismatch {
        table: String,
        column: String,
        row: usize,
        expected: &'static str,
    },

    #[error("table {table}: {reason}")]
    Shape { table: String, reason: String },

    #[error("failed to load tables from {source_name}: {reason}")]
    Load { source_name: String, reason: String },
}

impl TableError {
    pub fn shape(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Shape {
            table: table.into(),
            reason: reason.into(),
        }
    }

    pub fn load(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Load {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}

/// A single cell value. Array cells may nest (e.g. POINTING.TARGET).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Text(String),
    Array(Vec<Cell>),
}

impl Cell {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Cell]> {
        match self {
            Self::Array(v) => Some(v),
            _ => None,
        }
    }
}

/// One table: named columns of equal length.
pub trait Table {
    fn name(&self) -> &str;

    fn nrows(&self) -> usize;

    fn cell(&self, column: &str, row: usize) -> TableResult<&Cell>;

    fn get_f64(&self, column: &str, row: usize) -> TableResult<f64> {
        self.cell(column, row)?
            .as_f64()
            .ok_or_else(|| mismatch(self.name(), column, row, "number"))
    }

    fn get_i64(&self, column: &str, row: usize) -> TableResult<i64> {
        self.cell(column, row)?
            .as_i64()
            .ok_or_else(|| mismatch(self.name(), column, row, "integer"))
    }

    fn get_string(&self, column: &str, row: usize) -> TableResult<String> {
        self.cell(column, row)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch(self.name(), column, row, "string"))
    }

    fn get_f64_array(&self, column: &str, row: usize) -> TableResult<Vec<f64>> {
        let items = self
            .cell(column, row)?
            .as_array()
            .ok_or_else(|| mismatch(self.name(), column, row, "array of numbers"))?;
        items
            .iter()
            .map(|c| {
                c.as_f64()
                    .ok_or_else(|| mismatch(self.name(), column, row, "array of numbers"))
            })
            .collect()
    }

    fn get_i64_array(&self, column: &str, row: usize) -> TableResult<Vec<i64>> {
        let items = self
            .cell(column, row)?
            .as_array()
            .ok_or_else(|| mismatch(self.name(), column, row, "array of integers"))?;
        items
            .iter()
            .map(|c| {
                c.as_i64()
                    .ok_or_else(|| mismatch(self.name(), column, row, "array of integers"))
            })
            .collect()
    }

    /// A two-dimensional numeric cell, outer index first.
    fn get_f64_matrix(&self, column: &str, row: usize) -> TableResult<Vec<Vec<f64>>> {
        let expected = "2-d array of numbers";
        let outer = self
            .cell(column, row)?
            .as_array()
            .ok_or_else(|| mismatch(self.name(), column, row, expected))?;
        outer
            .iter()
            .map(|inner| -> TableResult<Vec<f64>> {
                inner
                    .as_array()
                    .ok_or_else(|| mismatch(self.name(), column, row, expected))?
                    .iter()
                    .map(|c| c.as_f64().ok_or_else(|| mismatch(self.name(), column, row, expected)))
                    .collect()
            })
            .collect()
    }
}

/// A dataset: the main table plus named sub-tables.
pub trait TableSource {
    /// Dataset name for logs, usually the directory name.
    fn name(&self) -> &str;

    fn main_table(&self) -> &dyn Table;

    /// `Ok(None)` when the dataset has no sub-table of that name.
    fn subtable(&self, name: &str) -> TableResult<Option<&dyn Table>>;

    /// Names of the sub-tables present.
    fn subtable_names(&self) -> Vec<String>;

    /// Directory holding the dataset on disk, if there is one.
    fn location(&self) -> Option<&Path>;
}

fn mismatch(table: &str, column: &str, row: usize, expected: &'static str) -> TableError {
    TableError::TypeMismatch {
        table: table.to_string(),
        column: column.to_string(),
        row,
        expected,
    }
}
