//! Tests for configuration file loading and environment priority
//!
//! Tests that touch `WOPS_*` variables are marked #[serial] so they never
//! run in parallel with each other.

use serial_test::serial;
use std::env;
use std::io::Write;
use wops_common::config::{ServiceConfig, DEFAULT_PORT};
use wops_common::Error;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create temp config");
    file.write_all(content.as_bytes()).expect("write temp config");
    file
}

fn clear_wops_env() {
    for key in [
        "WOPS_PORT",
        "WOPS_BIND",
        "WOPS_SHEETS_TOKEN",
        "WOPS_ATTENDANCE_DOCUMENT",
        "WOPS_CARGO_DOCUMENT",
        "WOPS_COLLECTORS_DOCUMENT",
        "WOPS_USERS_DOCUMENT",
        "WOPS_STORE_SEGMENTS",
        "WOPS_WRITE_CHUNK_SIZE",
        "WOPS_LOG_LEVEL",
        "WOPS_SHEETS_API_BASE",
    ] {
        env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_load_explicit_file() {
    clear_wops_env();
    let file = write_config(
        r#"
        port = 7001
        write_chunk_size = 50

        [sheets]
        token = "file-token"
        attendance_document = "doc-a"
        cargo_document = "doc-c"
        collectors_document = "doc-k"

        [logging]
        level = "debug"
        "#,
    );

    let config = ServiceConfig::load(Some(file.path())).unwrap();

    assert_eq!(config.source.as_deref(), Some(file.path()));
    assert_eq!(config.port, 7001);
    assert_eq!(config.write_chunk_size, 50);
    assert_eq!(config.logging.level, "debug");
    let sheets = config.sheets.require().unwrap();
    assert_eq!(sheets.connection.token, "file-token");
    assert_eq!(sheets.users_document, "doc-a");
}

#[test]
#[serial]
fn test_missing_explicit_file_is_error() {
    clear_wops_env();
    let err = ServiceConfig::load(Some(std::path::Path::new("/nonexistent/wops.toml"))).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
#[serial]
fn test_environment_beats_file() {
    clear_wops_env();
    let file = write_config("port = 7001\n[sheets]\ntoken = \"file-token\"\n");

    env::set_var("WOPS_PORT", "7002");
    env::set_var("WOPS_SHEETS_TOKEN", "env-token");
    let config = ServiceConfig::load(Some(file.path())).unwrap();
    clear_wops_env();

    assert_eq!(config.port, 7002);
    assert_eq!(config.sheets.token.as_deref(), Some("env-token"));
}

#[test]
#[serial]
fn test_defaults_when_file_is_empty() {
    clear_wops_env();
    let file = write_config("");
    let config = ServiceConfig::load(Some(file.path())).unwrap();

    assert_eq!(config.port, DEFAULT_PORT);
    assert!(config.sheets.require().is_err());
}
