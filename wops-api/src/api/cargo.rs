//! Cargo and box endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use wops_common::records::CargoRecord;

use super::reply::Reply;
use crate::error::ApiResult;
use crate::services::CargoFilter;
use crate::AppState;

#[derive(Debug, Serialize)]
struct CargoList {
    count: usize,
    cargo: Vec<CargoRecord>,
}

#[derive(Debug, Serialize)]
struct BoxList {
    count: usize,
    boxes: Vec<CargoRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum BoxAction {
    #[serde(rename_all = "camelCase")]
    Allocate { box_id: String, cargo_id: String },
    #[serde(rename_all = "camelCase")]
    Release { box_id: String },
}

/// GET /api/cargo/unboxed?store=&type=&segment=
pub async fn list_unboxed(
    State(state): State<AppState>,
    query: Result<Query<CargoFilter>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(filter) = query?;
    let cargo = state.allocator.list_unboxed_cargo(&filter).await?;
    Ok(Reply::ok(CargoList {
        count: cargo.len(),
        cargo,
    })
    .into_response())
}

/// GET /api/boxes
pub async fn list_boxes(State(state): State<AppState>) -> ApiResult<Response> {
    let boxes = state.allocator.list_occupied_boxes().await?;
    Ok(Reply::ok(BoxList {
        count: boxes.len(),
        boxes,
    })
    .into_response())
}

/// POST /api/boxes
pub async fn box_action(
    State(state): State<AppState>,
    payload: Result<Json<BoxAction>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(action) = payload?;

    let reply = match action {
        BoxAction::Allocate { box_id, cargo_id } => {
            let outcome = state.allocator.allocate(&box_id, &cargo_id).await?;
            Reply::from_outcome(outcome, "Cargo allocated", "Cargo not found")
        }
        BoxAction::Release { box_id } => {
            let outcome = state.allocator.release(&box_id).await?;
            Reply::from_outcome(outcome, "Box released", "Box not found")
        }
    };
    Ok(reply.into_response())
}

pub fn cargo_routes() -> Router<AppState> {
    Router::new()
        .route("/api/cargo/unboxed", get(list_unboxed))
        .route("/api/boxes", get(list_boxes).post(box_action))
}
