//! In-memory tabular result container.
//!
//! Metadata queries return a [`RowSet`]: ordered rows of named, typed cells.
//! The presentation layer consumes it as plain data; nothing in here holds a
//! live cursor.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use uuid::Uuid;

/// A single typed cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Decimal(Decimal),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
    Uuid(Uuid),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Borrow the cell as a string if it is textual.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Cell as an integer, if it carries one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            CellValue::Int(v) => Some(*v),
            CellValue::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Render the cell for display. NULL renders as the empty string.
    pub fn display(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Int(v) => v.to_string(),
            CellValue::Float(v) => v.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Bytes(b) => format!("<{} bytes>", b.len()),
            CellValue::Decimal(d) => d.to_string(),
            CellValue::Timestamp(t) => t.to_string(),
            CellValue::Date(d) => d.to_string(),
            CellValue::Time(t) => t.to_string(),
            CellValue::Uuid(u) => u.to_string(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Int(v)
    }
}

impl From<Option<String>> for CellValue {
    fn from(v: Option<String>) -> Self {
        v.map(CellValue::Text).unwrap_or(CellValue::Null)
    }
}

/// Ordered rows of named cells.
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl RowSet {
    /// Create an empty row set with the given column names.
    pub fn new<S: Into<String>>(columns: Vec<S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a named column, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Append a row. Short rows are padded with NULL, long rows truncated.
    pub fn add_row(&mut self, mut cells: Vec<CellValue>) -> usize {
        cells.resize(self.columns.len(), CellValue::Null);
        self.rows.push(cells);
        self.rows.len() - 1
    }

    pub fn value(&self, row: usize, col: usize) -> &CellValue {
        &self.rows[row][col]
    }

    /// Cell rendered as a display string (NULL becomes "").
    pub fn value_as_string(&self, row: usize, col: usize) -> String {
        self.rows[row][col].display()
    }

    pub fn set_value(&mut self, row: usize, col: usize, value: CellValue) {
        self.rows[row][col] = value;
    }

    /// Drop all rows, keeping the column definitions.
    pub fn reset(&mut self) {
        self.rows.clear();
    }

    /// Sort rows by the display value of one column.
    pub fn sort_by_column(&mut self, col: usize, ascending: bool) {
        self.rows.sort_by(|a, b| {
            let ord = a[col].display().cmp(&b[col].display());
            if ascending {
                ord
            } else {
                ord.reverse()
            }
        });
    }

    pub fn rows(&self) -> impl Iterator<Item = &[CellValue]> {
        self.rows.iter().map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_row_pads_and_truncates() {
        let mut rs = RowSet::new(vec!["A", "B", "C"]);
        rs.add_row(vec![CellValue::from("x")]);
        rs.add_row(vec![
            CellValue::from("1"),
            CellValue::from("2"),
            CellValue::from("3"),
            CellValue::from("4"),
        ]);
        assert_eq!(rs.row_count(), 2);
        assert!(rs.value(0, 2).is_null());
        assert_eq!(rs.value_as_string(1, 2), "3");
    }

    #[test]
    fn column_lookup_by_name() {
        let rs = RowSet::new(vec!["NAME", "TYPE"]);
        assert_eq!(rs.column_index("TYPE"), Some(1));
        assert_eq!(rs.column_index("MISSING"), None);
    }

    #[test]
    fn sort_orders_by_display_value() {
        let mut rs = RowSet::new(vec!["NAME"]);
        rs.add_row(vec![CellValue::from("zeta")]);
        rs.add_row(vec![CellValue::from("alpha")]);
        rs.sort_by_column(0, true);
        assert_eq!(rs.value_as_string(0, 0), "alpha");
    }
}
