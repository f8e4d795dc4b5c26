use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::database::models::SessionIdentity;
use crate::error::ApiError;
use crate::state::AppState;

const LOGIN_REQUIRED: &str = "Unauthorized, please log in first.";
const SESSION_EXPIRED: &str = "Your login has expired. Please log in again.";

/// Authenticated user context resolved from the session token
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    /// The presented token, kept so logout can revoke it.
    pub token: String,
}

impl AuthUser {
    fn new(identity: SessionIdentity, token: String) -> Self {
        Self {
            user_id: identity.user_id,
            username: identity.username,
            token,
        }
    }
}

/// Session authentication middleware: validates the token and injects [`AuthUser`]
pub async fn session_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers(), request.uri().query())
        .ok_or_else(|| ApiError::unauthorized(LOGIN_REQUIRED))?;

    let identity = state
        .sessions
        .verify_token(&token)
        .await?
        .ok_or_else(|| ApiError::unauthorized(SESSION_EXPIRED))?;

    request.extensions_mut().insert(AuthUser::new(identity, token));

    Ok(next.run(request).await)
}

/// Token from `Authorization: Bearer`, then `x-auth-token`, then `?token=`.
fn extract_token(headers: &HeaderMap, query: Option<&str>) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);

    let header = || {
        headers
            .get("x-auth-token")
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
    };

    let from_query = || {
        query.and_then(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .find(|(key, _)| key == "token")
                .map(|(_, value)| value.into_owned())
        })
    };

    bearer
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .or_else(|| header().filter(|t| !t.is_empty()).map(str::to_string))
        .or_else(|| from_query().filter(|t| !t.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert("x-auth-token", HeaderValue::from_static("def"));
        assert_eq!(extract_token(&headers, Some("token=ghi")).as_deref(), Some("abc"));
    }

    #[test]
    fn falls_back_to_custom_header_then_query() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_token(&headers, Some("a=1&token=ghi")).as_deref(), Some("ghi"));

        headers.insert("x-auth-token", HeaderValue::from_static("def"));
        assert_eq!(extract_token(&headers, Some("token=ghi")).as_deref(), Some("def"));
    }

    #[test]
    fn missing_or_blank_token() {
        let mut headers = HeaderMap::new();
        assert!(extract_token(&headers, None).is_none());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert!(extract_token(&headers, Some("token=")).is_none());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert!(extract_token(&headers, None).is_none());
    }
}
