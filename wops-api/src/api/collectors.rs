//! Collector endpoints

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
use wops_common::records::{CollectorRecord, CollectorState};

use super::reply::Reply;
use crate::error::ApiResult;
use crate::services::CollectorCounts;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CollectorQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
struct CollectorList {
    collectors: Vec<CollectorRecord>,
    counts: CollectorCounts,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum CollectorAction {
    #[serde(rename_all = "camelCase")]
    CheckOut {
        collector_id: String,
        operator: String,
    },
    #[serde(rename_all = "camelCase")]
    CheckIn { collector_id: String },
}

/// Accept bucket names (`inUse`) as well as sheet wording (`Em uso`)
fn parse_state(raw: &str) -> CollectorState {
    match raw.trim().to_lowercase().as_str() {
        "available" => CollectorState::Available,
        "inuse" | "in_use" => CollectorState::InUse,
        "maintenance" => CollectorState::Maintenance,
        "other" => CollectorState::Other,
        _ => CollectorState::classify(raw),
    }
}

/// GET /api/collectors?status=
///
/// Counts always cover every collector, whatever the filter.
pub async fn list_collectors(
    State(state): State<AppState>,
    query: Result<Query<CollectorQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(query) = query?;
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(parse_state);

    let all = state.collectors.list(None).await?;
    let counts = CollectorCounts::tally(&all);
    let collectors = all
        .into_iter()
        .filter(|c| status.map_or(true, |s| c.state == s))
        .collect();

    Ok(Reply::ok(CollectorList { collectors, counts }).into_response())
}

/// POST /api/collectors
pub async fn collector_action(
    State(state): State<AppState>,
    payload: Result<Json<CollectorAction>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(action) = payload?;

    let reply = match action {
        CollectorAction::CheckOut {
            collector_id,
            operator,
        } => {
            let outcome = state.collectors.check_out(&collector_id, &operator).await?;
            Reply::from_outcome(outcome, "Collector checked out", "Collector not found")
        }
        CollectorAction::CheckIn { collector_id } => {
            let outcome = state.collectors.check_in(&collector_id).await?;
            Reply::from_outcome(outcome, "Collector checked in", "Collector not found")
        }
    };
    Ok(reply.into_response())
}

pub fn collector_routes() -> Router<AppState> {
    Router::new().route("/api/collectors", get(list_collectors).post(collector_action))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_state() {
        assert_eq!(parse_state("inUse"), CollectorState::InUse);
        assert_eq!(parse_state("Em uso"), CollectorState::InUse);
        assert_eq!(parse_state("Disponível"), CollectorState::Available);
        assert_eq!(parse_state("maintenance"), CollectorState::Maintenance);
    }
}
