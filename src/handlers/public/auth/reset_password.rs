// handlers/public/auth/reset_password.rs - POST /api/auth/reset-password handler

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::handlers::utils::{present, rejection_as_bad_request};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub username: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResetPasswordResponse {
    pub message: &'static str,
    pub user: ResetUser,
}

#[derive(Debug, Serialize)]
pub struct ResetUser {
    pub id: Uuid,
    pub username: String,
}

/// POST /api/auth/reset-password - Set a new password by username
///
/// Every existing session of the account is revoked.
///
/// Expected Input:
/// ```json
/// { "username": "string", "newPassword": "string" }
/// ```
pub async fn reset_password_post(
    State(state): State<AppState>,
    body: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> ApiResult<ResetPasswordResponse> {
    let Json(body) = body?;
    let (Some(username), Some(new_password)) = (present(&body.username), present(&body.new_password)) else {
        return Err(ApiError::bad_request("Username and new password are required."));
    };

    let user = state
        .sessions
        .reset_password(username, new_password)
        .await
        .map_err(rejection_as_bad_request)?;

    Ok(ApiResponse::success(ResetPasswordResponse {
        message: "Password reset successfully. Please login with your new password.",
        user: ResetUser {
            id: user.id,
            username: user.username,
        },
    }))
}
