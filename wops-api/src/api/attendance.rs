//! Daily attendance summary and CSV export

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use wops_common::normalize::parse_date_query_param;
use wops_common::time;

use super::reply::Reply;
use crate::error::ApiResult;
use crate::services::summary::shift_filter;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    /// `YYYY-MM-DD`; today when absent
    pub date: Option<String>,
    pub shift: Option<String>,
}

/// `DD/MM/YYYY` for the requested date, or today
fn reference_date(date: Option<&str>) -> String {
    match date.map(str::trim).filter(|d| !d.is_empty()) {
        Some(date) => parse_date_query_param(date),
        None => time::today(),
    }
}

/// GET /api/attendance/summary?date=YYYY-MM-DD&shift=
pub async fn get_summary(
    State(state): State<AppState>,
    query: Result<Query<SummaryQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(query) = query?;
    let date = reference_date(query.date.as_deref());
    let shift = shift_filter(query.shift.as_deref());

    let summary = state.attendance.daily_summary(&date, shift.as_ref()).await?;
    Ok(Reply::ok(summary).into_response())
}

/// GET /api/attendance/export?date=YYYY-MM-DD
pub async fn export_csv(
    State(state): State<AppState>,
    query: Result<Query<SummaryQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(query) = query?;
    let date = reference_date(query.date.as_deref());
    let body = state.attendance.export_csv(&date).await?;
    let filename = format!("attachment; filename=\"presenca-{}.csv\"", date.replace('/', "-"));

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, filename),
        ],
        body,
    )
        .into_response())
}

pub fn attendance_routes() -> Router<AppState> {
    Router::new()
        .route("/api/attendance/summary", get(get_summary))
        .route("/api/attendance/export", get(export_csv))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_date() {
        assert_eq!(reference_date(Some("2024-01-10")), "10/01/2024");
        assert_eq!(reference_date(Some(" ")), time::today());
        assert_eq!(reference_date(None), time::today());
    }
}
