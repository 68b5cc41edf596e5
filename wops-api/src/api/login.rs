//! POST /api/login

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::reply::Reply;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: Uuid,
    pub name: String,
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(req) = payload?;

    Ok(match state.auth.authenticate(&req.username, &req.password).await? {
        Some(session) => Reply::ok(LoginResponse {
            token: session.token,
            name: session.name,
        })
        .into_response(),
        None => Reply::not_found("Invalid username or password").into_response(),
    })
}

pub fn login_routes() -> Router<AppState> {
    Router::new().route("/api/login", post(login))
}
