// handlers/public/auth/check_username.rs - GET /api/auth/check-username handler

use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::handlers::utils::present;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckUsernameQuery {
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckUsernameResponse {
    pub available: bool,
    pub message: &'static str,
}

pub async fn check_username_get(
    State(state): State<AppState>,
    Query(query): Query<CheckUsernameQuery>,
) -> ApiResult<CheckUsernameResponse> {
    let username = present(&query.username).ok_or_else(|| ApiError::bad_request("Username is required"))?;

    let available = state.sessions.is_username_available(username).await?;
    Ok(ApiResponse::success(CheckUsernameResponse {
        available,
        message: if available {
            "Username is available"
        } else {
            "Username already exists"
        },
    }))
}
