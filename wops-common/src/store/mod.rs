//! Row Store Gateway
//!
//! Tabular backend addressed by (table name, column name). The services only
//! issue the operations of [`RowStore`]; how the store keeps its rows is its
//! own business.
//!
//! Row numbers follow spreadsheet convention: the header is row 1, the first
//! data row is row 2.

use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

pub mod columns;
pub mod memory;
pub mod sheets;

pub use columns::{ColumnMap, Field};
pub use memory::MemoryStore;
pub use sheets::{SheetsConnection, SheetsStore};

/// Column values for a row to append, keyed by physical header
pub type Fields = HashMap<String, String>;

/// One data row read from a table
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    number: usize,
    headers: Arc<[String]>,
    values: Vec<String>,
}

impl Row {
    /// Build a row; `values` is padded or truncated to the header width
    pub fn new(number: usize, headers: Arc<[String]>, mut values: Vec<String>) -> Self {
        values.resize(headers.len(), String::new());
        Self {
            number,
            headers,
            values,
        }
    }

    /// 1-based row number in the table (header is row 1)
    pub fn number(&self) -> usize {
        self.number
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Cell values in header order
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Value of `column`, or "" when the table has no such column
    pub fn get(&self, column: &str) -> &str {
        self.position(column)
            .map(|i| self.values[i].as_str())
            .unwrap_or("")
    }

    /// Set `column`; returns false when the table has no such column
    pub fn set(&mut self, column: &str, value: impl Into<String>) -> bool {
        match self.position(column) {
            Some(i) => {
                self.values[i] = value.into();
                true
            }
            None => false,
        }
    }

    /// True when every cell is empty or whitespace
    pub fn is_blank(&self) -> bool {
        self.values.iter().all(|v| v.trim().is_empty())
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }
}

/// Full contents of a table
#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub headers: Arc<[String]>,
    pub rows: Vec<Row>,
}

impl Table {
    /// Build a table from a raw grid whose first line is the header row
    pub fn from_grid(name: &str, grid: Vec<Vec<String>>) -> Self {
        let mut lines = grid.into_iter();
        let headers: Arc<[String]> = lines
            .next()
            .unwrap_or_default()
            .into_iter()
            .map(|h| h.trim().to_string())
            .collect();

        let rows = lines
            .enumerate()
            .map(|(i, values)| Row::new(i + 2, Arc::clone(&headers), values))
            .collect();

        Self {
            name: name.to_string(),
            headers,
            rows,
        }
    }

    /// Lay out `fields` in header order; unknown keys are dropped
    pub fn layout(headers: &[String], fields: &Fields) -> Vec<String> {
        headers
            .iter()
            .map(|h| fields.get(h).cloned().unwrap_or_default())
            .collect()
    }
}

/// Operations the services issue against the backing tabular store
///
/// Implementations make no isolation promise: a read followed by a write may
/// interleave with another request's writes.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Read the header row and every data row, in store order
    async fn get_all_rows(&self, table: &str) -> Result<Table>;

    /// Append one row
    async fn append_row(&self, table: &str, fields: Fields) -> Result<()> {
        self.append_rows(table, vec![fields]).await
    }

    /// Append rows in one call, preserving order
    async fn append_rows(&self, table: &str, rows: Vec<Fields>) -> Result<()>;

    /// Overwrite the row at `row.number()` with `row`'s values
    async fn update_row(&self, table: &str, row: &Row) -> Result<()> {
        self.update_rows(table, std::slice::from_ref(row)).await
    }

    /// Overwrite several rows in one call
    async fn update_rows(&self, table: &str, rows: &[Row]) -> Result<()>;

    /// Delete the row at `row.number()`
    async fn delete_row(&self, table: &str, row: &Row) -> Result<()>;

    /// Create `table` with `headers` when it does not exist yet
    async fn ensure_table(&self, table: &str, headers: &[&str]) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(lines: &[&[&str]]) -> Vec<Vec<String>> {
        lines
            .iter()
            .map(|l| l.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_table_from_grid_numbers_rows() {
        let table = Table::from_grid(
            "Base",
            grid(&[&["Nome", "Status"], &["Joao", "Presente"], &[], &["Rosa"]]),
        );

        assert_eq!(table.headers.len(), 2);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0].number(), 2);
        assert_eq!(table.rows[2].number(), 4);
        assert!(table.rows[1].is_blank());
        assert_eq!(table.rows[2].get("Status"), "");
    }

    #[test]
    fn test_row_get_set() {
        let table = Table::from_grid("Cargas", grid(&[&["Carga", "Box"], &["C1", ""]]));
        let mut row = table.rows[0].clone();

        assert_eq!(row.get("Carga"), "C1");
        assert_eq!(row.get("Missing"), "");
        assert!(row.set("Box", "7"));
        assert!(!row.set("Missing", "x"));
        assert_eq!(row.values(), &["C1".to_string(), "7".to_string()]);
    }

    #[test]
    fn test_layout_follows_header_order() {
        let headers = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let mut fields = Fields::new();
        fields.insert("C".to_string(), "3".to_string());
        fields.insert("A".to_string(), "1".to_string());
        fields.insert("Z".to_string(), "dropped".to_string());

        assert_eq!(Table::layout(&headers, &fields), vec!["1", "", "3"]);
    }
}
