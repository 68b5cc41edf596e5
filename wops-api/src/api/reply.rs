//! Response envelope shared by every JSON endpoint
//!
//! `{ "ok": bool, "msg"?: string, ...payload }`

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use wops_common::Outcome;

/// Payload with no fields of its own
#[derive(Debug, Default, Serialize)]
pub struct Empty {}

#[derive(Debug, Serialize)]
pub struct Reply<T: Serialize> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(flatten)]
    pub payload: T,
}

impl<T: Serialize> Reply<T> {
    pub fn ok(payload: T) -> Self {
        Self {
            ok: true,
            msg: None,
            payload,
        }
    }

    pub fn with_msg(mut self, msg: impl Into<String>) -> Self {
        self.msg = Some(msg.into());
        self
    }
}

impl Reply<Empty> {
    pub fn done(msg: impl Into<String>) -> Self {
        Reply::ok(Empty {}).with_msg(msg)
    }

    /// Lookup miss: still a 200, reported through `ok: false`
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            msg: Some(msg.into()),
            payload: Empty {},
        }
    }

    pub fn from_outcome(outcome: Outcome, applied: &str, not_found: &str) -> Self {
        match outcome {
            Outcome::Applied => Self::done(applied),
            Outcome::NotFound => Self::not_found(not_found),
        }
    }
}

impl<T: Serialize> IntoResponse for Reply<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
