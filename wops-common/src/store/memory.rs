//! In-memory row store
//!
//! Same row numbering and header semantics as the spreadsheet store. Used by
//! the test suites and by `--memory-store` development runs.

use super::{Fields, Row, RowStore, Table};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone, Default)]
struct MemTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Row store held in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, MemTable>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a table from a header row and data rows (test and dev fixtures)
    pub async fn insert_table(&self, table: &str, headers: &[&str], rows: &[&[&str]]) {
        let mem = MemTable {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|v| v.to_string()).collect())
                .collect(),
        };
        self.tables.write().await.insert(table.to_string(), mem);
    }

    /// Number of data rows in `table` (0 when absent)
    pub async fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .await
            .get(table)
            .map(|t| t.rows.len())
            .unwrap_or(0)
    }
}

fn missing(table: &str) -> Error {
    Error::NotFound(format!("table '{}'", table))
}

#[async_trait]
impl RowStore for MemoryStore {
    async fn get_all_rows(&self, table: &str) -> Result<Table> {
        let tables = self.tables.read().await;
        let mem = tables.get(table).ok_or_else(|| missing(table))?;

        let headers: Arc<[String]> = mem.headers.iter().map(|h| h.trim().to_string()).collect();
        let rows = mem
            .rows
            .iter()
            .enumerate()
            .map(|(i, values)| Row::new(i + 2, Arc::clone(&headers), values.clone()))
            .collect();

        Ok(Table {
            name: table.to_string(),
            headers,
            rows,
        })
    }

    async fn append_rows(&self, table: &str, rows: Vec<Fields>) -> Result<()> {
        let mut tables = self.tables.write().await;
        let mem = tables.get_mut(table).ok_or_else(|| missing(table))?;
        let headers: Vec<String> = mem.headers.iter().map(|h| h.trim().to_string()).collect();

        debug!(table, count = rows.len(), "Appending rows");
        for fields in &rows {
            mem.rows.push(Table::layout(&headers, fields));
        }
        Ok(())
    }

    async fn update_rows(&self, table: &str, rows: &[Row]) -> Result<()> {
        let mut tables = self.tables.write().await;
        let mem = tables.get_mut(table).ok_or_else(|| missing(table))?;

        for row in rows {
            let slot = row
                .number()
                .checked_sub(2)
                .and_then(|i| mem.rows.get_mut(i))
                .ok_or_else(|| {
                    Error::Store(format!("row {} out of range in '{}'", row.number(), table))
                })?;
            *slot = row.values().to_vec();
        }
        Ok(())
    }

    async fn delete_row(&self, table: &str, row: &Row) -> Result<()> {
        let mut tables = self.tables.write().await;
        let mem = tables.get_mut(table).ok_or_else(|| missing(table))?;

        let index = row
            .number()
            .checked_sub(2)
            .filter(|i| *i < mem.rows.len())
            .ok_or_else(|| {
                Error::Store(format!("row {} out of range in '{}'", row.number(), table))
            })?;
        mem.rows.remove(index);
        Ok(())
    }

    async fn ensure_table(&self, table: &str, headers: &[&str]) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.entry(table.to_string()).or_insert_with(|| MemTable {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        });
        Ok(())
    }
}
