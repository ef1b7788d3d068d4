//! In-memory table model.
//!
//! A [`Table`] is an ordered list of uniquely named [`Column`]s of equal
//! length. Tables are plain values: operations that change data build a new
//! table and leave the original untouched.

use std::collections::HashSet;

use crate::{
    data::{Cell, ColumnType, Value},
    error::ParseError,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data_type: ColumnType,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: ColumnType, cells: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            data_type,
            cells,
        }
    }

    pub fn integers(name: impl Into<String>, values: &[Option<i64>]) -> Self {
        let cells = values.iter().map(|v| v.map(Value::Integer)).collect();
        Self::new(name, ColumnType::Integer, cells)
    }

    pub fn floats(name: impl Into<String>, values: &[Option<f64>]) -> Self {
        let cells = values.iter().map(|v| v.map(Value::Float)).collect();
        Self::new(name, ColumnType::Float, cells)
    }

    pub fn texts(name: impl Into<String>, values: &[Option<&str>]) -> Self {
        let cells = values
            .iter()
            .map(|v| v.map(|s| Value::Text(s.to_string())))
            .collect();
        Self::new(name, ColumnType::Text, cells)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn missing_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_none()).count()
    }

    pub fn has_values(&self) -> bool {
        self.cells.iter().any(Option::is_some)
    }

    pub fn display_cell(&self, row: usize) -> String {
        self.cells
            .get(row)
            .and_then(|cell| cell.as_ref())
            .map(Value::as_display)
            .unwrap_or_default()
    }

    /// Keeps the cells at `rows`, in order.
    pub fn take(&self, rows: &[usize]) -> Column {
        Column {
            name: self.name.clone(),
            data_type: self.data_type,
            cells: rows.iter().map(|&row| self.cells[row].clone()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// Builds a table, rejecting duplicate names and columns of unequal length.
    pub fn new(columns: Vec<Column>) -> Result<Self, ParseError> {
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(ParseError::DuplicateHeader(column.name.clone()));
            }
        }
        let row_count = columns.first().map(Column::len).unwrap_or(0);
        if let Some(column) = columns.iter().find(|c| c.len() != row_count) {
            return Err(ParseError::ColumnLength {
                column: column.name.clone(),
                expected: row_count,
                found: column.len(),
            });
        }
        Ok(Self { columns, row_count })
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn row_display(&self, row: usize) -> Vec<String> {
        self.columns.iter().map(|c| c.display_cell(row)).collect()
    }

    /// First `limit` rows rendered as display strings.
    pub fn head(&self, limit: usize) -> Vec<Vec<String>> {
        (0..self.row_count.min(limit))
            .map(|row| self.row_display(row))
            .collect()
    }

    /// New table with only the given rows, in order.
    pub fn select_rows(&self, rows: &[usize]) -> Table {
        Table {
            columns: self.columns.iter().map(|c| c.take(rows)).collect(),
            row_count: rows.len(),
        }
    }

    /// New table with `column` replacing the column of the same name, or appended.
    pub fn with_column(&self, column: Column) -> Result<Table, ParseError> {
        if !self.columns.is_empty() && column.len() != self.row_count {
            let found = column.len();
            return Err(ParseError::ColumnLength {
                column: column.name,
                expected: self.row_count,
                found,
            });
        }
        let mut columns = self.columns.clone();
        match columns.iter().position(|c| c.name == column.name) {
            Some(idx) => columns[idx] = column,
            None => columns.push(column),
        }
        Table::new(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_duplicate_names() {
        let err = Table::new(vec![
            Column::integers("a", &[Some(1)]),
            Column::integers("a", &[Some(2)]),
        ])
        .unwrap_err();
        assert_eq!(err, ParseError::DuplicateHeader("a".into()));
    }

    #[test]
    fn new_rejects_ragged_columns() {
        let err = Table::new(vec![
            Column::integers("a", &[Some(1), Some(2)]),
            Column::texts("b", &[Some("x")]),
        ])
        .unwrap_err();
        assert!(matches!(err, ParseError::ColumnLength { found: 1, .. }));
    }

    #[test]
    fn with_column_rejects_wrong_length() {
        let table = Table::new(vec![Column::integers("a", &[Some(1), Some(2)])]).unwrap();
        let err = table
            .with_column(Column::integers("b", &[Some(3)]))
            .unwrap_err();
        assert_eq!(
            err,
            ParseError::ColumnLength {
                column: "b".into(),
                expected: 2,
                found: 1,
            }
        );
    }

    #[test]
    fn with_column_overwrites_in_place() {
        let table = Table::new(vec![
            Column::integers("a", &[Some(1)]),
            Column::integers("b", &[Some(2)]),
        ])
        .unwrap();
        let updated = table
            .with_column(Column::texts("a", &[Some("z")]))
            .unwrap();
        assert_eq!(updated.headers(), vec!["a", "b"]);
        assert_eq!(updated.row_display(0), vec!["z", "2"]);
        assert_eq!(table.row_display(0), vec!["1", "2"]);
    }
}
