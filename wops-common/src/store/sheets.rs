//! Spreadsheet REST client (Sheets API v4)
//!
//! One [`SheetsStore`] is one spreadsheet document; each tab is a table.
//! The handle is created with [`SheetsStore::connect`], which verifies the
//! document and caches tab ids, and shut down with [`SheetsStore::close`].
//! There is no implicit connection on first use.

use super::{Fields, Row, RowStore, Table};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

const USER_AGENT: &str = concat!("wops/", env!("CARGO_PKG_VERSION"));

/// Connection parameters shared by every document handle
#[derive(Debug, Clone)]
pub struct SheetsConnection {
    /// API root, e.g. `https://sheets.googleapis.com/v4`
    pub api_base: String,
    /// OAuth bearer access token
    pub token: String,
    /// Per-request transport timeout
    pub timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct DocumentMetadata {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

/// Handle to one spreadsheet document
pub struct SheetsStore {
    http: reqwest::Client,
    api_base: Url,
    token: String,
    document_id: String,
    sheet_ids: RwLock<HashMap<String, i64>>,
}

impl SheetsStore {
    /// Open a handle to `document_id` and cache its tab ids
    ///
    /// Fails with `Error::Store` when the document cannot be read with the
    /// given token.
    pub async fn connect(connection: &SheetsConnection, document_id: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(connection.timeout)
            .build()?;

        let api_base = Url::parse(connection.api_base.trim_end_matches('/'))
            .map_err(|e| Error::Config(format!("Invalid sheets API base URL: {}", e)))?;

        let store = Self {
            http,
            api_base,
            token: connection.token.clone(),
            document_id: document_id.to_string(),
            sheet_ids: RwLock::new(HashMap::new()),
        };

        store.refresh_sheet_ids().await?;
        let tabs = store.sheet_ids.read().await.len();
        info!(document = %store.document_id, tabs, "✓ Connected to spreadsheet document");
        Ok(store)
    }

    /// Drop cached metadata; the handle must not be used afterwards
    pub async fn close(&self) {
        self.sheet_ids.write().await.clear();
        info!(document = %self.document_id, "Closed spreadsheet document");
    }

    async fn refresh_sheet_ids(&self) -> Result<()> {
        let url = self.url(&[self.document_id.as_str()])?;
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .query(&[("fields", "sheets.properties(sheetId,title)")])
            .send()
            .await?;
        let metadata: DocumentMetadata = expect_success(response, "read document metadata")
            .await?
            .json()
            .await?;

        let mut ids = self.sheet_ids.write().await;
        ids.clear();
        for sheet in metadata.sheets {
            ids.insert(sheet.properties.title, sheet.properties.sheet_id);
        }
        Ok(())
    }

    async fn sheet_id(&self, table: &str) -> Result<i64> {
        if let Some(id) = self.sheet_ids.read().await.get(table) {
            return Ok(*id);
        }
        self.refresh_sheet_ids().await?;
        self.sheet_ids
            .read()
            .await
            .get(table)
            .copied()
            .ok_or_else(|| Error::NotFound(format!("tab '{}' in {}", table, self.document_id)))
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config("Sheets API base URL cannot carry a path".to_string()))?
            .push("spreadsheets")
            .extend(segments);
        Ok(url)
    }

    async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let url = self.url(&[self.document_id.as_str(), "values", range])?;
        debug!(range, "Reading range");
        let response = self.http.get(url).bearer_auth(&self.token).send().await?;
        let values: ValueRange = expect_success(response, &format!("read {}", range))
            .await?
            .json()
            .await?;
        Ok(values.values)
    }

    async fn header_row(&self, table: &str) -> Result<Vec<String>> {
        let mut grid = self.read_range(&header_range(table)).await?;
        Ok(if grid.is_empty() {
            Vec::new()
        } else {
            grid.swap_remove(0)
                .into_iter()
                .map(|h| h.trim().to_string())
                .collect()
        })
    }

    async fn write_range(&self, range: &str, values: Vec<Vec<String>>) -> Result<()> {
        let url = self.url(&[self.document_id.as_str(), "values", range])?;
        let response = self
            .http
            .put(url)
            .bearer_auth(&self.token)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({ "values": values }))
            .send()
            .await?;
        expect_success(response, &format!("write {}", range)).await?;
        Ok(())
    }

    async fn batch_update(&self, requests: serde_json::Value, context: &str) -> Result<()> {
        let url = self.url(&[format!("{}:batchUpdate", self.document_id).as_str()])?;
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(&json!({ "requests": requests }))
            .send()
            .await?;
        expect_success(response, context).await?;
        Ok(())
    }
}

async fn expect_success(response: reqwest::Response, context: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::Store(format!(
        "{} failed: HTTP {} {}",
        context,
        status.as_u16(),
        body.trim()
    )))
}

/// Quote a tab title for A1 notation: `'It''s'`
fn quote_title(table: &str) -> String {
    format!("'{}'", table.replace('\'', "''"))
}

fn header_range(table: &str) -> String {
    format!("{}!1:1", quote_title(table))
}

fn row_range(table: &str, number: usize) -> String {
    format!("{}!A{}", quote_title(table), number)
}

#[async_trait]
impl RowStore for SheetsStore {
    async fn get_all_rows(&self, table: &str) -> Result<Table> {
        let grid = self.read_range(&quote_title(table)).await?;
        let table = Table::from_grid(table, grid);
        debug!(table = %table.name, rows = table.rows.len(), "Read table");
        Ok(table)
    }

    async fn append_rows(&self, table: &str, rows: Vec<Fields>) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let headers = self.header_row(table).await?;
        let values: Vec<Vec<String>> = rows.iter().map(|f| Table::layout(&headers, f)).collect();

        let url = self.url(&[
            self.document_id.as_str(),
            "values",
            format!("{}:append", quote_title(table)).as_str(),
        ])?;
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .query(&[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({ "values": values }))
            .send()
            .await?;
        expect_success(response, &format!("append to {}", table)).await?;
        debug!(table, count = values.len(), "Appended rows");
        Ok(())
    }

    async fn update_rows(&self, table: &str, rows: &[Row]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let data: Vec<serde_json::Value> = rows
            .iter()
            .map(|row| {
                json!({
                    "range": row_range(table, row.number()),
                    "values": [row.values()],
                })
            })
            .collect();

        let url = self.url(&[self.document_id.as_str(), "values:batchUpdate"])?;
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(&json!({ "valueInputOption": "USER_ENTERED", "data": data }))
            .send()
            .await?;
        expect_success(response, &format!("update rows in {}", table)).await?;
        debug!(table, count = rows.len(), "Updated rows");
        Ok(())
    }

    async fn delete_row(&self, table: &str, row: &Row) -> Result<()> {
        let sheet_id = self.sheet_id(table).await?;
        let start = row.number().saturating_sub(1);
        self.batch_update(
            json!([{
                "deleteDimension": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "ROWS",
                        "startIndex": start,
                        "endIndex": start + 1,
                    }
                }
            }]),
            &format!("delete row {} in {}", row.number(), table),
        )
        .await
    }

    async fn ensure_table(&self, table: &str, headers: &[&str]) -> Result<()> {
        let exists = match self.sheet_id(table).await {
            Ok(_) => true,
            Err(Error::NotFound(_)) => false,
            Err(e) => return Err(e),
        };

        if !exists {
            info!(table, "Creating missing tab");
            self.batch_update(
                json!([{ "addSheet": { "properties": { "title": table } } }]),
                &format!("create tab {}", table),
            )
            .await?;
            self.refresh_sheet_ids().await?;
        }

        if self.header_row(table).await?.iter().all(|h| h.is_empty()) {
            let header_row: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
            self.write_range(&header_range(table), vec![header_row]).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_title_escapes_apostrophes() {
        assert_eq!(quote_title("Base"), "'Base'");
        assert_eq!(quote_title("Joe's"), "'Joe''s'");
    }

    #[test]
    fn test_ranges() {
        assert_eq!(header_range("Cargas"), "'Cargas'!1:1");
        assert_eq!(row_range("Buffer", 7), "'Buffer'!A7");
    }

    #[test]
    fn test_value_range_without_values() {
        let parsed: ValueRange = serde_json::from_str(r#"{"range":"'Base'!A1:Z1000"}"#).unwrap();
        assert!(parsed.values.is_empty());
    }

    #[test]
    fn test_metadata_parsing() {
        let body = r#"{"sheets":[{"properties":{"sheetId":0,"title":"Base"}},
                                 {"properties":{"sheetId":812,"title":"Buffer"}}]}"#;
        let parsed: DocumentMetadata = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.sheets.len(), 2);
        assert_eq!(parsed.sheets[1].properties.sheet_id, 812);
        assert_eq!(parsed.sheets[1].properties.title, "Buffer");
    }
}
