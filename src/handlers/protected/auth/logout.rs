// handlers/protected/auth/logout.rs - POST /api/auth/logout handler

use axum::{extract::State, Extension};
use serde::Serialize;

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: &'static str,
}

/// POST /api/auth/logout - Revoke the presented token
pub async fn logout_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<LogoutResponse> {
    state.sessions.logout(&auth.token).await?;
    Ok(ApiResponse::success(LogoutResponse { message: "Logout" }))
}
