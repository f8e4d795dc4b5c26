use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::database::manager::DatabaseManager;
use crate::database::models::{Session, User};

/// Postgres SQLSTATE for unique_violation.
const UNIQUE_VIOLATION: &str = "23505";

/// Primary backend. Relies on Postgres for per-row atomicity and on the
/// `users.username` unique index for uniqueness.
pub struct PgStore {
    db: Arc<DatabaseManager>,
}

impl PgStore {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }
}

fn map_username_conflict(err: sqlx::Error, username: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            StoreError::DuplicateUsername(username.to_string())
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl Store for PgStore {
    fn name(&self) -> &'static str {
        "database"
    }

    fn is_available(&self) -> bool {
        self.db.is_available()
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, avatar, created_at
             FROM users
             WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(self.db.pool()?)
        .await?;

        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, avatar, created_at
             FROM users
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.db.pool()?)
        .await?;

        Ok(user)
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO users (id, username, password_hash, avatar, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.avatar)
        .bind(user.created_at)
        .execute(self.db.pool()?)
        .await
        .map_err(|e| map_username_conflict(e, &user.username))?;

        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE users
             SET username = $2, password_hash = $3, avatar = $4
             WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.avatar)
        .execute(self.db.pool()?)
        .await
        .map_err(|e| map_username_conflict(e, &user.username))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::UserNotFound(user.id));
        }
        Ok(())
    }

    async fn find_session_by_token(&self, token: &str) -> Result<Option<Session>, StoreError> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT token, user_id, username, created_at, expires_at
             FROM sessions
             WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(self.db.pool()?)
        .await?;

        Ok(session)
    }

    async fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO sessions (token, user_id, username, created_at, expires_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&session.token)
        .bind(session.user_id)
        .bind(&session.username)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(self.db.pool()?)
        .await?;

        Ok(())
    }

    async fn delete_session(&self, token: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(self.db.pool()?)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_sessions_by_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(self.db.pool()?)
            .await?;

        Ok(result.rows_affected())
    }

    async fn rename_sessions(&self, user_id: Uuid, username: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("UPDATE sessions SET username = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(username)
            .execute(self.db.pool()?)
            .await?;

        Ok(result.rows_affected())
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(self.db.pool()?)
            .await?;

        Ok(result.rows_affected())
    }
}
