// handlers/utils.rs - Request helpers shared by handlers

use crate::error::ApiError;
use crate::services::AuthError;

/// A body field counts as present only when it is a non-empty string.
pub fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Endpoints whose every business rejection is a 400 (password changes).
/// Backend failures still surface as 500.
pub fn rejection_as_bad_request(err: AuthError) -> ApiError {
    if matches!(err, AuthError::Hashing(_) | AuthError::Storage(_)) {
        return err.into();
    }
    ApiError::bad_request(err.to_string())
}
