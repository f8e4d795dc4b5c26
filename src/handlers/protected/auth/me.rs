// handlers/protected/auth/me.rs - GET/PUT /api/auth/me handlers

use axum::{extract::rejection::JsonRejection, extract::State, Extension, Json};
use serde::{Deserialize, Deserializer};

use crate::database::models::UserSummary;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::UserUpdate;
use crate::state::AppState;

/// Body of `PUT /api/auth/me`. `"avatar": null` clears the avatar, an
/// absent field leaves it alone.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateMeRequest {
    pub username: Option<String>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub avatar: Option<Option<String>>,
}

fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// GET /api/auth/me - Current user's public profile
pub async fn me_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<UserSummary> {
    let user = state
        .sessions
        .get_user(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(ApiResponse::success(user))
}

/// PUT /api/auth/me - Change username and/or avatar
///
/// A new username is applied to every live session of the account.
///
/// Expected Input:
/// ```json
/// { "username": "string?", "avatar": "data:image/...|null?" }
/// ```
pub async fn me_put(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    body: Result<Json<UpdateMeRequest>, JsonRejection>,
) -> ApiResult<UserSummary> {
    let Json(body) = body?;
    if body.username.is_none() && body.avatar.is_none() {
        return Err(ApiError::bad_request("No fields to update"));
    }

    let update = UserUpdate {
        username: body.username,
        avatar: body.avatar,
    };
    let user = state.sessions.update_user(auth.user_id, update).await?;

    Ok(ApiResponse::success(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avatar_absent_null_and_set() {
        let absent: UpdateMeRequest = serde_json::from_str(r#"{"username":"bob"}"#).unwrap();
        assert_eq!(absent.avatar, None);

        let null: UpdateMeRequest = serde_json::from_str(r#"{"avatar":null}"#).unwrap();
        assert_eq!(null.avatar, Some(None));

        let set: UpdateMeRequest = serde_json::from_str(r#"{"avatar":"data:image/png;base64,AA"}"#).unwrap();
        assert_eq!(set.avatar, Some(Some("data:image/png;base64,AA".to_string())));
    }
}
