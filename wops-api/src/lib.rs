//! wops-api library - Warehouse Operations HTTP service
//!
//! Attendance summaries, the draft roster, box allocation and collector
//! lending over spreadsheet-backed tables.

use axum::Router;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use wops_common::config::ServiceConfig;
use wops_common::store::RowStore;

pub mod api;
pub mod error;
pub mod services;

use services::{AttendanceService, AuthService, BoxAllocator, CollectorRegistry, RosterService};

/// One store handle per spreadsheet document
///
/// Several roles may share one handle when they live in the same document.
#[derive(Clone)]
pub struct Stores {
    pub attendance: Arc<dyn RowStore>,
    pub cargo: Arc<dyn RowStore>,
    pub collectors: Arc<dyn RowStore>,
    pub users: Arc<dyn RowStore>,
}

impl Stores {
    /// Every table in one store
    pub fn shared(store: Arc<dyn RowStore>) -> Self {
        Self {
            attendance: Arc::clone(&store),
            cargo: Arc::clone(&store),
            collectors: Arc::clone(&store),
            users: store,
        }
    }
}

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub attendance: AttendanceService,
    pub roster: RosterService,
    pub allocator: BoxAllocator,
    pub collectors: CollectorRegistry,
    pub auth: AuthService,
}

impl AppState {
    /// Create new application state
    pub fn new(stores: Stores, config: &ServiceConfig) -> Self {
        let tables = &config.tables;
        Self {
            attendance: AttendanceService::new(Arc::clone(&stores.attendance), &tables.base),
            roster: RosterService::new(
                Arc::clone(&stores.attendance),
                &tables.buffer,
                &tables.base,
                config.write_chunk_size,
            ),
            allocator: BoxAllocator::new(
                stores.cargo,
                &tables.cargo,
                config.store_segments.clone(),
            ),
            collectors: CollectorRegistry::new(stores.collectors, &tables.collectors),
            auth: AuthService::new(stores.users, &tables.users),
        }
    }
}

/// Build application router
///
/// CORS is permissive: browser clients are served from other origins and
/// preflight requests are answered by the CORS layer.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::login_routes())
        .merge(api::attendance_routes())
        .merge(api::buffer_routes())
        .merge(api::cargo_routes())
        .merge(api::collector_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
