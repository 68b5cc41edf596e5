//! Configuration loading
//!
//! Resolution priority, highest first:
//! 1. Command-line arguments (applied by the binary)
//! 2. Environment variables (`WOPS_*`)
//! 3. TOML config file
//! 4. Compiled defaults
//!
//! A missing TOML file is not an error: defaults are used. Loading happens
//! before logging is set up, so the file actually read is kept in
//! [`ServiceConfig::source`] for the binary to report. Missing spreadsheet
//! credentials are only an error once a real store is requested (see
//! [`SheetsConfig::require`]).

use crate::store::SheetsConnection;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5740;

/// Default Sheets API root
pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com/v4";

/// Store categories whose cargo is handled by the box allocator
pub const DEFAULT_STORE_SEGMENTS: &[&str] = &["LJ COMPER", "LJ FORT", "LJ PERTO"];

/// Complete service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Bind address
    pub bind: String,

    /// HTTP server port
    pub port: u16,

    /// Spreadsheet connection and documents
    pub sheets: SheetsConfig,

    /// Tab names inside the documents
    pub tables: TableNames,

    /// Allow-list of store segments/types for box allocation
    pub store_segments: Vec<String>,

    /// Maximum rows per batched write
    pub write_chunk_size: usize,

    /// Config file this was loaded from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Spreadsheet connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    pub api_base: String,
    pub token: Option<String>,
    pub attendance_document: Option<String>,
    pub cargo_document: Option<String>,
    pub collectors_document: Option<String>,
    /// Defaults to the attendance document when unset
    pub users_document: Option<String>,
    pub request_timeout_secs: u64,
}

/// Tab names
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TableNames {
    pub base: String,
    pub buffer: String,
    pub cargo: String,
    pub collectors: String,
    pub users: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

/// Validated spreadsheet settings: every required value present
#[derive(Debug, Clone)]
pub struct ResolvedSheets {
    pub connection: SheetsConnection,
    pub attendance_document: String,
    pub cargo_document: String,
    pub collectors_document: String,
    pub users_document: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            sheets: SheetsConfig::default(),
            tables: TableNames::default(),
            store_segments: DEFAULT_STORE_SEGMENTS.iter().map(|s| s.to_string()).collect(),
            write_chunk_size: 200,
            source: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            token: None,
            attendance_document: None,
            cargo_document: None,
            collectors_document: None,
            users_document: None,
            request_timeout_secs: 30,
        }
    }
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            base: "Base".to_string(),
            buffer: "Buffer".to_string(),
            cargo: "Cargas".to_string(),
            collectors: "Coletores".to_string(),
            users: "Usuarios".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Parse a TOML document; absent keys take defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load config: explicit file (must exist) or default locations, then
    /// environment overrides
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = explicit.map(Path::to_path_buf).or_else(default_config_path);
        let mut config = match &path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.source = path;

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Read config {} failed: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Apply `WOPS_*` overrides using `lookup` to read variables
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(bind) = get("WOPS_BIND") {
            self.bind = bind;
        }
        if let Some(port) = get("WOPS_PORT") {
            self.port = port
                .parse()
                .map_err(|_| Error::Config(format!("WOPS_PORT is not a port number: {}", port)))?;
        }
        if let Some(api_base) = get("WOPS_SHEETS_API_BASE") {
            self.sheets.api_base = api_base;
        }
        if let Some(token) = get("WOPS_SHEETS_TOKEN") {
            self.sheets.token = Some(token);
        }
        if let Some(doc) = get("WOPS_ATTENDANCE_DOCUMENT") {
            self.sheets.attendance_document = Some(doc);
        }
        if let Some(doc) = get("WOPS_CARGO_DOCUMENT") {
            self.sheets.cargo_document = Some(doc);
        }
        if let Some(doc) = get("WOPS_COLLECTORS_DOCUMENT") {
            self.sheets.collectors_document = Some(doc);
        }
        if let Some(doc) = get("WOPS_USERS_DOCUMENT") {
            self.sheets.users_document = Some(doc);
        }
        if let Some(segments) = get("WOPS_STORE_SEGMENTS") {
            self.store_segments = segments
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(size) = get("WOPS_WRITE_CHUNK_SIZE") {
            self.write_chunk_size = size.parse().map_err(|_| {
                Error::Config(format!("WOPS_WRITE_CHUNK_SIZE is not a number: {}", size))
            })?;
        }
        if let Some(level) = get("WOPS_LOG_LEVEL") {
            self.logging.level = level;
        }

        if self.write_chunk_size == 0 {
            return Err(Error::Config("write_chunk_size must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl SheetsConfig {
    /// Check that the token and every document id are configured
    pub fn require(&self) -> Result<ResolvedSheets> {
        fn required(value: &Option<String>, env_var: &str) -> Result<String> {
            value.clone().ok_or_else(|| {
                Error::Config(format!(
                    "{} is not set. Configure it in the environment or in the \
                     [sheets] section of ~/.config/wops/config.toml",
                    env_var
                ))
            })
        }

        let token = required(&self.token, "WOPS_SHEETS_TOKEN")?;
        let attendance_document = required(&self.attendance_document, "WOPS_ATTENDANCE_DOCUMENT")?;
        let cargo_document = required(&self.cargo_document, "WOPS_CARGO_DOCUMENT")?;
        let collectors_document = required(&self.collectors_document, "WOPS_COLLECTORS_DOCUMENT")?;
        let users_document = self
            .users_document
            .clone()
            .unwrap_or_else(|| attendance_document.clone());

        Ok(ResolvedSheets {
            connection: SheetsConnection {
                api_base: self.api_base.clone(),
                token,
                timeout: Duration::from_secs(self.request_timeout_secs),
            },
            attendance_document,
            cargo_document,
            collectors_document,
            users_document,
        })
    }
}

/// First existing config file among the per-user and system locations
fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("wops").join("config.toml"));
    let system_config = PathBuf::from("/etc/wops/config.toml");

    user_config
        .into_iter()
        .chain(std::iter::once(system_config))
        .find(|p| p.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.tables.base, "Base");
        assert_eq!(config.tables.buffer, "Buffer");
        assert_eq!(config.write_chunk_size, 200);
        assert_eq!(config.store_segments.len(), 3);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ServiceConfig::from_toml_str(
            r#"
            port = 8080
            store_segments = ["LJ COMPER"]

            [tables]
            cargo = "Cargas 2024"

            [sheets]
            attendance_document = "doc-a"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.tables.cargo, "Cargas 2024");
        assert_eq!(config.tables.base, "Base");
        assert_eq!(config.sheets.attendance_document.as_deref(), Some("doc-a"));
        assert_eq!(config.sheets.request_timeout_secs, 30);
        assert_eq!(config.store_segments, vec!["LJ COMPER"]);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = ServiceConfig::from_toml_str("port = \"eighty\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_env_overrides_toml() {
        let mut config = ServiceConfig::from_toml_str("port = 8080").unwrap();
        config
            .apply_env(env(&[
                ("WOPS_PORT", "9090"),
                ("WOPS_SHEETS_TOKEN", " tok "),
                ("WOPS_STORE_SEGMENTS", "LJ A, ,LJ B"),
                ("WOPS_CARGO_DOCUMENT", ""),
            ]))
            .unwrap();

        assert_eq!(config.port, 9090);
        assert_eq!(config.sheets.token.as_deref(), Some("tok"));
        assert_eq!(config.store_segments, vec!["LJ A", "LJ B"]);
        assert_eq!(config.sheets.cargo_document, None);
    }

    #[test]
    fn test_env_rejects_bad_numbers() {
        let mut config = ServiceConfig::default();
        assert!(config.apply_env(env(&[("WOPS_PORT", "http")])).is_err());

        let mut config = ServiceConfig::default();
        assert!(config.apply_env(env(&[("WOPS_WRITE_CHUNK_SIZE", "0")])).is_err());
    }

    #[test]
    fn test_require_names_missing_variable() {
        let mut sheets = SheetsConfig {
            token: Some("tok".to_string()),
            attendance_document: Some("doc-a".to_string()),
            cargo_document: Some("doc-c".to_string()),
            ..SheetsConfig::default()
        };

        let err = sheets.require().unwrap_err();
        assert!(err.to_string().contains("WOPS_COLLECTORS_DOCUMENT"));

        sheets.collectors_document = Some("doc-k".to_string());
        let resolved = sheets.require().unwrap();
        assert_eq!(resolved.users_document, "doc-a");
        assert_eq!(resolved.connection.timeout, Duration::from_secs(30));
    }
}
