//! In-memory tables.
//!
//! A dump lists the main table and each sub-table as a map of column name to
//! per-row cells:
//!
//! ```yaml
//! name: AA05LOW.ms
//! main:
//!   INTERVAL: [0.9, 0.9]
//! subtables:
//!   ANTENNA:
//!     DISH_DIAMETER: [38.0, 38.0]
//!   POINTING: {}
//! ```
//!
//! All columns of one table must have the same length. A table with no columns
//! has zero rows.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{Cell, Table, TableError, TableResult, TableSource};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryTable {
    #[serde(skip)]
    name: String,
    #[serde(flatten)]
    columns: BTreeMap<String, Vec<Cell>>,
}

impl MemoryTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: BTreeMap::new(),
        }
    }

    pub fn with_column(mut self, column: impl Into<String>, cells: Vec<Cell>) -> Self {
        self.columns.insert(column.into(), cells);
        self
    }

    fn check_shape(&self) -> TableResult<()> {
        let mut lens = self.columns.iter().map(|(c, v)| (c, v.len()));
        if let Some((first_col, n)) = lens.next() {
            for (col, len) in lens {
                if len != n {
                    return Err(TableError::shape(
                        &self.name,
                        format!("column {col} has {len} rows, column {first_col} has {n}"),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl Table for MemoryTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn nrows(&self) -> usize {
        self.columns.values().next().map_or(0, Vec::len)
    }

    fn cell(&self, column: &str, row: usize) -> TableResult<&Cell> {
        let cells = self.columns.get(column).ok_or_else(|| TableError::NoSuchColumn {
            table: self.name.clone(),
            column: column.to_string(),
        })?;
        cells.get(row).ok_or(TableError::RowOutOfRange {
            table: self.name.clone(),
            row,
            nrows: cells.len(),
        })
    }
}

/// A main table and its sub-tables held in memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryTableSet {
    #[serde(default)]
    name: String,
    #[serde(default)]
    location: Option<PathBuf>,
    #[serde(default)]
    main: MemoryTable,
    #[serde(default)]
    subtables: BTreeMap<String, MemoryTable>,
}

impl MemoryTableSet {
    pub fn new(name: impl Into<String>, main: MemoryTable) -> Self {
        let mut set = Self {
            name: name.into(),
            location: None,
            main,
            subtables: BTreeMap::new(),
        };
        set.main.name = set.name.clone();
        set
    }

    pub fn with_subtable(mut self, name: impl Into<String>, mut table: MemoryTable) -> Self {
        let name = name.into();
        table.name = name.clone();
        self.subtables.insert(name, table);
        self
    }

    /// Directory the dataset lives in, used for its on-disk size.
    pub fn with_location(mut self, location: impl Into<PathBuf>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn from_yaml_str(source_name: &str, text: &str) -> TableResult<Self> {
        let set: Self =
            serde_yaml::from_str(text).map_err(|e| TableError::load(source_name, e.to_string()))?;
        set.finish(source_name)
    }

    pub fn from_json_str(source_name: &str, text: &str) -> TableResult<Self> {
        let set: Self =
            serde_json::from_str(text).map_err(|e| TableError::load(source_name, e.to_string()))?;
        set.finish(source_name)
    }

    /// Load a dump, choosing JSON for `.json` files and YAML otherwise.
    pub fn load(path: &Path) -> TableResult<Self> {
        let source_name = path.display().to_string();
        let text = std::fs::read_to_string(path)
            .map_err(|e| TableError::load(&source_name, e.to_string()))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&source_name, &text),
            _ => Self::from_yaml_str(&source_name, &text),
        }
    }

    fn finish(mut self, source_name: &str) -> TableResult<Self> {
        if self.name.is_empty() {
            self.name = source_name.to_string();
        }
        self.main.name = self.name.clone();
        for (name, table) in self.subtables.iter_mut() {
            table.name = name.clone();
        }
        self.main.check_shape()?;
        for table in self.subtables.values() {
            table.check_shape()?;
        }
        Ok(self)
    }
}

impl TableSource for MemoryTableSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn main_table(&self) -> &dyn Table {
        &self.main
    }

    fn subtable(&self, name: &str) -> TableResult<Option<&dyn Table>> {
        Ok(self.subtables.get(name).map(|t| t as &dyn Table))
    }

    fn subtable_names(&self) -> Vec<String> {
        self.subtables.keys().cloned().collect()
    }

    fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }
}
