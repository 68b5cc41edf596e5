//! wops-api - Warehouse Operations HTTP service
//!
//! Startup order: arguments, configuration, logging, store handles, router.
//! Store handles are opened explicitly here and closed after the server has
//! drained.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use wops_api::{build_router, AppState, Stores};
use wops_common::config::ServiceConfig;
use wops_common::records::{AttendanceRecord, CargoRecord, CollectorRecord, TableRecord, UserCredential};
use wops_common::store::columns::canonical_headers;
use wops_common::store::{MemoryStore, RowStore, SheetsStore};

/// Command-line arguments for wops-api
#[derive(Parser, Debug)]
#[command(name = "wops-api")]
#[command(about = "Warehouse operations service over spreadsheet tables")]
#[command(version)]
struct Args {
    /// Config file (TOML); must exist when given
    #[arg(short, long, env = "WOPS_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config and WOPS_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Bind address (overrides config and WOPS_BIND)
    #[arg(long)]
    bind: Option<String>,

    /// Keep every table in process memory instead of the spreadsheet API
    #[arg(long)]
    memory_store: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServiceConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(bind) = args.bind {
        config.bind = bind;
    }

    // RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!(
        "Starting WOPS API (wops-api) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config.source {
        Some(path) => info!("Loaded config file: {}", path.display()),
        None => warn!("No config file found, using defaults"),
    }

    let (stores, handles) = if args.memory_store {
        warn!("Using in-memory store: data is lost on exit");
        (memory_stores(&config).await?, Vec::new())
    } else {
        sheets_stores(&config).await?
    };

    let state = AppState::new(stores, &config);
    state
        .roster
        .ensure_buffer()
        .await
        .context("Failed to prepare buffer table")?;
    info!("✓ Buffer table ready ({})", config.tables.buffer);

    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.bind, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.bind, config.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("wops-api listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    for handle in handles {
        handle.close().await;
    }
    info!("Server shutdown complete");
    Ok(())
}

/// Every table in one memory store, created with canonical headers
async fn memory_stores(config: &ServiceConfig) -> Result<Stores> {
    let store = MemoryStore::new();
    let tables = &config.tables;
    store
        .ensure_table(&tables.base, &canonical_headers(AttendanceRecord::FIELDS))
        .await?;
    store
        .ensure_table(&tables.cargo, &canonical_headers(CargoRecord::FIELDS))
        .await?;
    store
        .ensure_table(&tables.collectors, &canonical_headers(CollectorRecord::FIELDS))
        .await?;
    store
        .ensure_table(&tables.users, &canonical_headers(UserCredential::FIELDS))
        .await?;
    Ok(Stores::shared(Arc::new(store)))
}

/// Connect once per distinct document; roles sharing a document share a handle
async fn sheets_stores(config: &ServiceConfig) -> Result<(Stores, Vec<Arc<SheetsStore>>)> {
    let sheets = config.sheets.require()?;
    let mut handles: HashMap<String, Arc<SheetsStore>> = HashMap::new();

    for document in [
        &sheets.attendance_document,
        &sheets.cargo_document,
        &sheets.collectors_document,
        &sheets.users_document,
    ] {
        if handles.contains_key(document) {
            continue;
        }
        let store = SheetsStore::connect(&sheets.connection, document)
            .await
            .with_context(|| format!("Failed to open spreadsheet {}", document))?;
        handles.insert(document.clone(), Arc::new(store));
    }

    let handle = |document: &String| -> Result<Arc<dyn RowStore>> {
        let store = handles
            .get(document)
            .with_context(|| format!("No handle for spreadsheet {}", document))?;
        Ok(Arc::clone(store) as Arc<dyn RowStore>)
    };

    let stores = Stores {
        attendance: handle(&sheets.attendance_document)?,
        cargo: handle(&sheets.cargo_document)?,
        collectors: handle(&sheets.collectors_document)?,
        users: handle(&sheets.users_document)?,
    };
    let handles = handles.into_values().collect();
    Ok((stores, handles))
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
