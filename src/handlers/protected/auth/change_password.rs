// handlers/protected/auth/change_password.rs - POST /api/auth/change-password handler

use axum::{extract::rejection::JsonRejection, extract::State, Extension, Json};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::handlers::utils::{present, rejection_as_bad_request};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChangePasswordResponse {
    pub message: &'static str,
}

/// POST /api/auth/change-password - Replace the password, given the current one
///
/// Sessions stay logged in. A wrong current password answers 400.
pub async fn change_password_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    body: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> ApiResult<ChangePasswordResponse> {
    let Json(body) = body?;
    let (Some(old_password), Some(new_password)) = (present(&body.old_password), present(&body.new_password)) else {
        return Err(ApiError::bad_request("Old password and new password are required."));
    };

    state
        .sessions
        .change_password(auth.user_id, old_password, new_password)
        .await
        .map_err(rejection_as_bad_request)?;

    Ok(ApiResponse::success(ChangePasswordResponse {
        message: "Password changed successfully",
    }))
}
