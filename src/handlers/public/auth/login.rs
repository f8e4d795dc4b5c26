// handlers/public/auth/login.rs - POST /api/auth/login handler

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::Deserialize;

use crate::error::ApiError;
use crate::handlers::utils::present;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::LoginResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// POST /api/auth/login - Authenticate and receive a session token
///
/// Unknown usernames and wrong passwords both answer 401
/// "Invalid username or password.".
pub async fn login_post(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<LoginResult> {
    let Json(body) = body?;
    let (Some(username), Some(password)) = (present(&body.username), present(&body.password)) else {
        return Err(ApiError::bad_request("Username and password cannot be empty."));
    };

    let login = state.sessions.login(username, password).await?;
    Ok(ApiResponse::success(login))
}
