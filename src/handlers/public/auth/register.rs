// handlers/public/auth/register.rs - POST /api/auth/register handler

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::Deserialize;

use crate::error::ApiError;
use crate::handlers::utils::present;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::LoginResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// POST /api/auth/register - Create an account and log it in
///
/// Expected Input:
/// ```json
/// { "username": "string", "password": "string" }
/// ```
///
/// Expected Output (201):
/// ```json
/// {
///   "token": "64 hex chars",
///   "user": { "id": "uuid", "username": "alice", "avatar": null, "createdAt": "..." }
/// }
/// ```
pub async fn register_post(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<LoginResult> {
    let Json(body) = body?;
    let (Some(username), Some(password)) = (present(&body.username), present(&body.password)) else {
        return Err(ApiError::bad_request("Username and password cannot be empty."));
    };

    state.sessions.register(username, password).await?;
    let login = state.sessions.login(username, password).await?;

    Ok(ApiResponse::created(login))
}
