//! Error types for wops-api
//!
//! Every failure leaves the service as `{ok: false, msg}` with a status code
//! chosen by error kind. Lookups that find nothing never come through here;
//! they are answered with 200 by the handlers.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("{0}")]
    BadRequest(String),

    /// wops-common error, status chosen by variant
    #[error(transparent)]
    Common(#[from] wops_common::Error),
}

/// Result alias for handlers
pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        use wops_common::Error;

        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Common(err) => match err {
                Error::Validation(_) => StatusCode::BAD_REQUEST,
                Error::Store(_) | Error::Http(_) | Error::NotFound(_) => StatusCode::BAD_GATEWAY,
                Error::Config(_)
                | Error::Io(_)
                | Error::Csv(_)
                | Error::Json(_)
                | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            error!(status = status.as_u16(), "{}", message);
        } else {
            warn!(status = status.as_u16(), "{}", message);
        }

        let body = Json(json!({
            "ok": false,
            "msg": message,
        }));

        (status, body).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
