//! Tabular DataType (spec §4.E `BinaryTable`).
//!
//! Grounded in `original_source/base/ionetcdf/rNetcdfBinaryTable.cc`: each
//! `TableInfo` drives both a NetCDF dimension (one per table, sized to the
//! declared row count) and its per-column typed variables. A short-integer
//! reader that returns fewer/more rows than declared is truncated/padded
//! with a logged warning (`validateLength` in the original).

use crate::error::{RapioError, Result};

/// The four column element types a `BinaryTable` column may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Str,
    Float,
    UShort,
    UChar,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Str(Vec<String>),
    Float(Vec<f32>),
    UShort(Vec<u16>),
    UChar(Vec<u8>),
}

impl ColumnData {
    pub fn column_type(&self) -> ColumnType {
        match self {
            ColumnData::Str(_) => ColumnType::Str,
            ColumnData::Float(_) => ColumnType::Float,
            ColumnData::UShort(_) => ColumnType::UShort,
            ColumnData::UChar(_) => ColumnType::UChar,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Str(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::UShort(v) => v.len(),
            ColumnData::UChar(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Truncates or pads (with the type's default value) to `size`,
    /// logging a warning when the length changes -- mirrors
    /// `validateLength` in `rNetcdfBinaryTable.cc`.
    pub fn resize_with_warning(&mut self, name: &str, size: usize) {
        if self.len() == size {
            return;
        }
        tracing::warn!(
            target: "rapio::binary_table",
            column = name,
            actual = self.len(),
            declared = size,
            "binary table column row length mismatch, padding/truncating"
        );
        match self {
            ColumnData::Str(v) => v.resize(size, String::new()),
            ColumnData::Float(v) => v.resize(size, 0.0),
            ColumnData::UShort(v) => v.resize(size, 0),
            ColumnData::UChar(v) => v.resize(size, 0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub units: String,
    pub data: ColumnData,
}

/// One table within a `BinaryTable`: a declared row count and its typed,
/// named columns.
#[derive(Debug, Clone)]
pub struct TableInfo {
    pub table_name: String,
    pub row_count: usize,
    pub columns: Vec<Column>,
}

impl TableInfo {
    pub fn new(table_name: impl Into<String>, row_count: usize) -> Self {
        TableInfo { table_name: table_name.into(), row_count, columns: Vec::new() }
    }

    pub fn add_column(&mut self, name: impl Into<String>, units: impl Into<String>, mut data: ColumnData) {
        let name = name.into();
        data.resize_with_warning(&name, self.row_count);
        self.columns.push(Column { name, units: units.into(), data });
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// A vector of `TableInfo` records (spec §4.E): the tabular counterpart to
/// `DataGrid`'s array-of-arrays model.
#[derive(Debug, Clone, Default)]
pub struct BinaryTable {
    pub tables: Vec<TableInfo>,
}

impl BinaryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(&mut self, table: TableInfo) {
        self.tables.push(table);
    }

    pub fn table(&self, name: &str) -> Option<&TableInfo> {
        self.tables.iter().find(|t| t.table_name == name)
    }

    /// Fetches a named column from a named table (spec §4.E "columns are
    /// fetched by name from typed column vectors").
    pub fn column(&self, table_name: &str, column_name: &str) -> Result<&Column> {
        let table = self
            .table(table_name)
            .ok_or_else(|| RapioError::semantic(format!("no such binary table '{table_name}'")))?;
        table
            .column(column_name)
            .ok_or_else(|| RapioError::semantic(format!("table '{table_name}' has no column '{column_name}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_fetch_by_name() {
        let mut bt = BinaryTable::new();
        let mut t = TableInfo::new("Observations", 3);
        t.add_column("value", "dBZ", ColumnData::Float(vec![1.0, 2.0, 3.0]));
        bt.add_table(t);
        let col = bt.column("Observations", "value").unwrap();
        assert_eq!(col.data, ColumnData::Float(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn short_column_is_padded_with_warning() {
        let mut t = TableInfo::new("Observations", 5);
        t.add_column("value", "dBZ", ColumnData::Float(vec![1.0, 2.0]));
        assert_eq!(t.column("value").unwrap().data.len(), 5);
    }

    #[test]
    fn missing_column_is_an_error() {
        let bt = BinaryTable::new();
        assert!(bt.column("Observations", "value").is_err());
    }
}
