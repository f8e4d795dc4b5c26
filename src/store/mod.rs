//! Persistence for accounts and sessions.
//!
//! [`Store`] is the capability set the session manager needs. Two backends
//! implement it: [`PgStore`] (primary, Postgres) and [`FileStore`] (JSON files
//! on disk). [`StoreSelector`] decides which one a call should use.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Session, User};

pub mod file;
pub mod postgres;
pub mod selector;

pub use file::FileStore;
pub use postgres::PgStore;
pub use selector::StoreSelector;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Another user already holds this (normalized) username.
    #[error("Username already exists: {0}")]
    DuplicateUsername(String),

    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt data file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Failures of the backend itself, as opposed to deterministic rejections.
    pub fn is_infrastructure(&self) -> bool {
        !matches!(self, StoreError::DuplicateUsername(_) | StoreError::UserNotFound(_))
    }
}

impl From<DatabaseError> for StoreError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Sqlx(e) => StoreError::Database(e),
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

/// Storage operations for users and sessions.
///
/// Usernames passed in are already normalized. Each method is atomic with
/// respect to the backend; `insert_user` and `update_user` enforce username
/// uniqueness themselves and report [`StoreError::DuplicateUsername`].
#[async_trait]
pub trait Store: Send + Sync {
    /// Short backend name for logs and health output.
    fn name(&self) -> &'static str;

    /// Whether the backend can currently serve requests.
    fn is_available(&self) -> bool {
        true
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    /// Replace the stored record with the same id.
    async fn update_user(&self, user: &User) -> Result<(), StoreError>;

    async fn find_session_by_token(&self, token: &str) -> Result<Option<Session>, StoreError>;

    async fn insert_session(&self, session: &Session) -> Result<(), StoreError>;

    /// Returns whether a session was removed.
    async fn delete_session(&self, token: &str) -> Result<bool, StoreError>;

    /// Returns the number of sessions removed.
    async fn delete_sessions_by_user(&self, user_id: Uuid) -> Result<u64, StoreError>;

    /// Rewrite the denormalized username on every session of `user_id`.
    async fn rename_sessions(&self, user_id: Uuid, username: &str) -> Result<u64, StoreError>;

    /// Remove every session whose expiry is at or before `now`.
    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_outcomes_are_not_infrastructure() {
        assert!(!StoreError::DuplicateUsername("bob".into()).is_infrastructure());
        assert!(!StoreError::UserNotFound(Uuid::new_v4()).is_infrastructure());
        assert!(StoreError::Unavailable("down".into()).is_infrastructure());
        assert!(StoreError::Io(std::io::Error::other("disk")).is_infrastructure());
    }

    #[test]
    fn disconnected_database_maps_to_unavailable() {
        let err: StoreError = DatabaseError::NotConnected.into();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
