//! Account and session operations.
//!
//! Every operation runs as one logical unit against a single backend. When
//! the primary backend is connected it goes first; if it fails for an
//! infrastructure reason the whole operation is logged and replayed against
//! the file backend. Business rejections (bad input, taken username, wrong
//! password, unknown user) return immediately and never fall back.

use chrono::{Duration, Utc};
use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::{generate_token, HashError, PasswordHasher};
use crate::database::models::{normalize_username, Session, SessionIdentity, User, UserSummary};
use crate::store::{Store, StoreError, StoreSelector};

pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 20;
pub const MIN_PASSWORD_LEN: usize = 6;
pub const SESSION_TTL_HOURS: i64 = 24;

const USERNAME_LENGTH: &str = "Username must be between 3 and 20 characters.";
const PASSWORD_LENGTH: &str = "Password must be at least 6 characters.";
const NEW_PASSWORD_LENGTH: &str = "New password must be at least 6 characters.";
const USERNAME_TAKEN: &str = "Username already exists.";
const INVALID_CREDENTIALS: &str = "Invalid username or password.";
const WRONG_CURRENT_PASSWORD: &str = "Current password is incorrect.";
const USER_NOT_FOUND: &str = "User not found";
const USERNAME_NOT_FOUND: &str = "Username not found.";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Storage failure: {0}")]
    Storage(StoreError),
}

impl AuthError {
    /// Whether the failure came from a backend and may succeed elsewhere.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, AuthError::Storage(e) if e.is_infrastructure())
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateUsername(_) => AuthError::Conflict(USERNAME_TAKEN.to_string()),
            StoreError::UserNotFound(_) => AuthError::NotFound(USER_NOT_FOUND.to_string()),
            other => AuthError::Storage(other),
        }
    }
}

impl From<HashError> for AuthError {
    fn from(err: HashError) -> Self {
        AuthError::Hashing(err.to_string())
    }
}

/// Token plus public user fields returned by a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub token: String,
    pub user: UserSummary,
}

/// Profile fields to change. `avatar: Some(None)` clears the avatar.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub avatar: Option<Option<String>>,
}

pub struct SessionManager {
    stores: StoreSelector,
    hasher: PasswordHasher,
    session_ttl: Duration,
    /// Verified against when the username is unknown so both login
    /// failures cost one hash computation.
    decoy_hash: String,
}

impl SessionManager {
    pub fn new(stores: StoreSelector, hasher: PasswordHasher) -> Result<Self, AuthError> {
        let decoy_hash = hasher.hash(&generate_token())?;
        Ok(Self {
            stores,
            hasher,
            session_ttl: Duration::hours(SESSION_TTL_HOURS),
            decoy_hash,
        })
    }

    /// Override the session lifetime (tests use this to mint expired sessions).
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn stores(&self) -> &StoreSelector {
        &self.stores
    }

    /// Run `op` on the primary backend if connected, replaying it on the
    /// file backend after an infrastructure failure.
    async fn run<'a, T, F>(&'a self, operation: &'static str, op: F) -> Result<T, AuthError>
    where
        F: Fn(&'a dyn Store) -> BoxFuture<'a, Result<T, AuthError>>,
    {
        let fallback = self.stores.fallback();

        if let Some(primary) = self.stores.primary() {
            match op(primary).await {
                Err(e) if e.is_infrastructure() => {
                    warn!(
                        operation,
                        backend = primary.name(),
                        error = %e,
                        "Primary backend failed, retrying on {} backend",
                        fallback.name()
                    );
                }
                other => return other,
            }
        }

        op(fallback).await
    }

    fn new_session(&self, user: &User) -> Session {
        let now = Utc::now();
        Session {
            token: generate_token(),
            user_id: user.id,
            username: user.username.clone(),
            created_at: now,
            expires_at: now + self.session_ttl,
        }
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<UserSummary, AuthError> {
        let username = validate_username(username)?;
        validate_password(password, PASSWORD_LENGTH)?;

        let user = User {
            id: Uuid::new_v4(),
            username,
            password_hash: self.hasher.hash(password)?,
            avatar: None,
            created_at: Utc::now(),
        };
        let user = &user;

        let summary = self
            .run("register", move |store| {
                async move {
                    if store.find_user_by_username(&user.username).await?.is_some() {
                        return Err(AuthError::Conflict(USERNAME_TAKEN.to_string()));
                    }
                    store.insert_user(user).await?;
                    Ok(UserSummary::from(user))
                }
                .boxed()
            })
            .await?;

        info!(user_id = %summary.id, username = %summary.username, "Registered user");
        Ok(summary)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResult, AuthError> {
        let username = normalize_username(username);
        let username = username.as_str();

        let result = self
            .run("login", move |store| {
                async move {
                    let user = match store.find_user_by_username(username).await? {
                        Some(user) if self.hasher.verify(password, &user.password_hash) => user,
                        Some(_) => return Err(invalid_credentials()),
                        None => {
                            let _ = self.hasher.verify(password, &self.decoy_hash);
                            return Err(invalid_credentials());
                        }
                    };

                    let session = self.new_session(&user);
                    store.insert_session(&session).await?;
                    Ok(LoginResult {
                        token: session.token,
                        user: UserSummary::from(&user),
                    })
                }
                .boxed()
            })
            .await?;

        info!(user_id = %result.user.id, "User logged in");
        Ok(result)
    }

    /// Resolve a token to its owner. Unknown and expired tokens yield `None`;
    /// an expired session is deleted on the way out.
    pub async fn verify_token(&self, token: &str) -> Result<Option<SessionIdentity>, AuthError> {
        if token.is_empty() {
            return Ok(None);
        }

        self.run("verify_token", move |store| {
            async move {
                let Some(session) = store.find_session_by_token(token).await? else {
                    return Ok(None);
                };

                if !session.is_valid_at(Utc::now()) {
                    store.delete_session(token).await?;
                    debug!(user_id = %session.user_id, "Removed expired session");
                    return Ok(None);
                }

                Ok(Some(SessionIdentity::from(&session)))
            }
            .boxed()
        })
        .await
    }

    /// Idempotent: unknown tokens are not an error.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        let removed = self
            .run("logout", move |store| {
                async move { Ok(store.delete_session(token).await?) }.boxed()
            })
            .await?;

        if removed {
            debug!("Session revoked by logout");
        }
        Ok(())
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<UserSummary>, AuthError> {
        self.run("get_user", move |store| {
            async move {
                Ok(store
                    .find_user_by_id(user_id)
                    .await?
                    .as_ref()
                    .map(UserSummary::from))
            }
            .boxed()
        })
        .await
    }

    pub async fn update_user(&self, user_id: Uuid, update: UserUpdate) -> Result<UserSummary, AuthError> {
        let new_username = update
            .username
            .as_deref()
            .map(validate_username)
            .transpose()?;
        let new_username = new_username.as_deref();
        let avatar = update.avatar.as_ref();

        self.run("update_user", move |store| {
            async move {
                let mut user = store
                    .find_user_by_id(user_id)
                    .await?
                    .ok_or_else(|| AuthError::NotFound(USER_NOT_FOUND.to_string()))?;

                if let Some(name) = new_username {
                    if let Some(holder) = store.find_user_by_username(name).await? {
                        if holder.id != user_id {
                            return Err(AuthError::Conflict(USERNAME_TAKEN.to_string()));
                        }
                    }
                    user.username = name.to_string();
                }
                if let Some(avatar) = avatar {
                    user.avatar = avatar.clone();
                }

                store.update_user(&user).await?;

                if let Some(name) = new_username {
                    let renamed = store.rename_sessions(user_id, name).await?;
                    debug!(user_id = %user_id, renamed, "Propagated username to sessions");
                }

                Ok(UserSummary::from(&user))
            }
            .boxed()
        })
        .await
    }

    /// Replace the password after checking the current one. Existing
    /// sessions stay valid.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        self.run("change_password", move |store| {
            async move {
                let mut user = store
                    .find_user_by_id(user_id)
                    .await?
                    .ok_or_else(|| AuthError::NotFound(USER_NOT_FOUND.to_string()))?;

                if !self.hasher.verify(old_password, &user.password_hash) {
                    return Err(AuthError::Unauthorized(WRONG_CURRENT_PASSWORD.to_string()));
                }
                validate_password(new_password, NEW_PASSWORD_LENGTH)?;

                user.password_hash = self.hasher.hash(new_password)?;
                store.update_user(&user).await?;
                Ok(())
            }
            .boxed()
        })
        .await?;

        info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    /// Replace the password without the old one and revoke every session.
    pub async fn reset_password(&self, username: &str, new_password: &str) -> Result<UserSummary, AuthError> {
        validate_password(new_password, NEW_PASSWORD_LENGTH)?;
        let username = normalize_username(username);
        let username = username.as_str();
        let password_hash = self.hasher.hash(new_password)?;
        let password_hash = password_hash.as_str();

        let (summary, revoked) = self
            .run("reset_password", move |store| {
                async move {
                    let mut user = store
                        .find_user_by_username(username)
                        .await?
                        .ok_or_else(|| AuthError::NotFound(USERNAME_NOT_FOUND.to_string()))?;

                    // Revoke first: a failure before the new hash lands
                    // leaves the old password and no live sessions.
                    let revoked = store.delete_sessions_by_user(user.id).await?;
                    user.password_hash = password_hash.to_string();
                    store.update_user(&user).await?;
                    Ok((UserSummary::from(&user), revoked))
                }
                .boxed()
            })
            .await?;

        info!(user_id = %summary.id, revoked, "Password reset, sessions revoked");
        Ok(summary)
    }

    /// Case-insensitive. Blank names are never available.
    pub async fn is_username_available(&self, username: &str) -> Result<bool, AuthError> {
        let username = normalize_username(username);
        if username.is_empty() {
            return Ok(false);
        }
        let username = username.as_str();

        self.run("is_username_available", move |store| {
            async move { Ok(store.find_user_by_username(username).await?.is_none()) }.boxed()
        })
        .await
    }

    /// Delete expired sessions on every connected backend. A failing
    /// primary is logged and skipped; the file backend's error is returned.
    pub async fn purge_expired(&self) -> Result<u64, AuthError> {
        let now = Utc::now();
        let mut total = 0;

        if let Some(primary) = self.stores.primary() {
            match primary.purge_expired_sessions(now).await {
                Ok(n) => total += n,
                Err(e) => warn!(backend = primary.name(), error = %e, "Expired-session purge failed"),
            }
        }
        total += self.stores.fallback().purge_expired_sessions(now).await?;

        if total > 0 {
            info!(removed = total, "Purged expired sessions");
        }
        Ok(total)
    }
}

fn invalid_credentials() -> AuthError {
    AuthError::Unauthorized(INVALID_CREDENTIALS.to_string())
}

/// Normalize and length-check a username.
pub fn validate_username(username: &str) -> Result<String, AuthError> {
    let normalized = normalize_username(username);
    let len = normalized.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
        return Err(AuthError::Validation(USERNAME_LENGTH.to_string()));
    }
    Ok(normalized)
}

fn validate_password(password: &str, message: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(message.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FileStore;
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(8 * 1024, 1).unwrap()
    }

    fn file_manager() -> (TempDir, SessionManager) {
        let dir = tempfile::tempdir().unwrap();
        let stores = StoreSelector::fallback_only(Arc::new(FileStore::new(dir.path())));
        (dir, SessionManager::new(stores, hasher()).unwrap())
    }

    /// Primary backend that is always down.
    struct BrokenStore {
        available: bool,
        calls: AtomicUsize,
    }

    impl BrokenStore {
        fn new(available: bool) -> Self {
            Self { available, calls: AtomicUsize::new(0) }
        }

        fn fail<T>(&self) -> Result<T, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Unavailable("connection reset".to_string()))
        }
    }

    #[async_trait]
    impl Store for BrokenStore {
        fn name(&self) -> &'static str {
            "broken"
        }
        fn is_available(&self) -> bool {
            self.available
        }
        async fn find_user_by_username(&self, _: &str) -> Result<Option<User>, StoreError> {
            self.fail()
        }
        async fn find_user_by_id(&self, _: Uuid) -> Result<Option<User>, StoreError> {
            self.fail()
        }
        async fn insert_user(&self, _: &User) -> Result<(), StoreError> {
            self.fail()
        }
        async fn update_user(&self, _: &User) -> Result<(), StoreError> {
            self.fail()
        }
        async fn find_session_by_token(&self, _: &str) -> Result<Option<Session>, StoreError> {
            self.fail()
        }
        async fn insert_session(&self, _: &Session) -> Result<(), StoreError> {
            self.fail()
        }
        async fn delete_session(&self, _: &str) -> Result<bool, StoreError> {
            self.fail()
        }
        async fn delete_sessions_by_user(&self, _: Uuid) -> Result<u64, StoreError> {
            self.fail()
        }
        async fn rename_sessions(&self, _: Uuid, _: &str) -> Result<u64, StoreError> {
            self.fail()
        }
        async fn purge_expired_sessions(&self, _: DateTime<Utc>) -> Result<u64, StoreError> {
            self.fail()
        }
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Step {
        UpdateUser,
        DeleteSessionsByUser,
    }

    /// Working file backend whose `failing` step is down, so a multi-step
    /// operation breaks partway through.
    struct FlakyStore {
        inner: FileStore,
        failing: Step,
    }

    impl FlakyStore {
        fn check(&self, step: Step) -> Result<(), StoreError> {
            if step == self.failing {
                return Err(StoreError::Unavailable("connection reset".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Store for FlakyStore {
        fn name(&self) -> &'static str {
            "flaky"
        }
        async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
            self.inner.find_user_by_username(username).await
        }
        async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
            self.inner.find_user_by_id(id).await
        }
        async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
            self.inner.insert_user(user).await
        }
        async fn update_user(&self, user: &User) -> Result<(), StoreError> {
            self.check(Step::UpdateUser)?;
            self.inner.update_user(user).await
        }
        async fn find_session_by_token(&self, token: &str) -> Result<Option<Session>, StoreError> {
            self.inner.find_session_by_token(token).await
        }
        async fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
            self.inner.insert_session(session).await
        }
        async fn delete_session(&self, token: &str) -> Result<bool, StoreError> {
            self.inner.delete_session(token).await
        }
        async fn delete_sessions_by_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
            self.check(Step::DeleteSessionsByUser)?;
            self.inner.delete_sessions_by_user(user_id).await
        }
        async fn rename_sessions(&self, user_id: Uuid, username: &str) -> Result<u64, StoreError> {
            self.inner.rename_sessions(user_id, username).await
        }
        async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
            self.inner.purge_expired_sessions(now).await
        }
    }

    /// Manager over a flaky primary and an empty file fallback.
    fn flaky_manager(failing: Step) -> (TempDir, TempDir, SessionManager) {
        let primary_dir = tempfile::tempdir().unwrap();
        let fallback_dir = tempfile::tempdir().unwrap();
        let primary = Arc::new(FlakyStore {
            inner: FileStore::new(primary_dir.path()),
            failing,
        });
        let stores = StoreSelector::new(Some(primary), Arc::new(FileStore::new(fallback_dir.path())));
        let manager = SessionManager::new(stores, hasher()).unwrap();
        (primary_dir, fallback_dir, manager)
    }

    #[tokio::test]
    async fn register_then_login_yields_verifiable_token() {
        let (_dir, manager) = file_manager();
        let user = manager.register("Bob", "secret1").await.unwrap();
        assert_eq!(user.username, "bob");

        let login = manager.login("BOB", "secret1").await.unwrap();
        assert_eq!(login.user.id, user.id);

        let identity = manager.verify_token(&login.token).await.unwrap().unwrap();
        assert_eq!(identity.user_id, user.id);
        assert_eq!(identity.username, "bob");
    }

    #[tokio::test]
    async fn username_length_boundaries() {
        let (_dir, manager) = file_manager();
        for bad in ["ab", "abcdefghijklmnopqrstu"] {
            assert!(matches!(
                manager.register(bad, "secret1").await,
                Err(AuthError::Validation(_))
            ));
        }
        manager.register("abc", "secret1").await.unwrap();
        manager.register("abcdefghijklmnopqrst", "secret1").await.unwrap();
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let (_dir, manager) = file_manager();
        let err = manager.register("carol", "12345").await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(ref m) if m == PASSWORD_LENGTH));
    }

    #[tokio::test]
    async fn duplicate_username_any_case_conflicts() {
        let (_dir, manager) = file_manager();
        manager.register("Alice", "secret1").await.unwrap();
        let err = manager.register("alice", "secret2").await.unwrap_err();
        assert!(matches!(err, AuthError::Conflict(ref m) if m == USERNAME_TAKEN));
    }

    #[tokio::test]
    async fn login_failures_share_one_message() {
        let (_dir, manager) = file_manager();
        manager.register("dave", "secret1").await.unwrap();

        let wrong_password = manager.login("dave", "nope123").await.unwrap_err();
        let unknown_user = manager.login("nobody", "secret1").await.unwrap_err();
        assert_eq!(wrong_password.to_string(), INVALID_CREDENTIALS);
        assert_eq!(unknown_user.to_string(), INVALID_CREDENTIALS);
        assert!(matches!(unknown_user, AuthError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn unknown_empty_and_logged_out_tokens_are_absent() {
        let (_dir, manager) = file_manager();
        manager.register("erin", "secret1").await.unwrap();
        let login = manager.login("erin", "secret1").await.unwrap();

        assert!(manager.verify_token("").await.unwrap().is_none());
        assert!(manager.verify_token("never-issued").await.unwrap().is_none());

        manager.logout(&login.token).await.unwrap();
        assert!(manager.verify_token(&login.token).await.unwrap().is_none());
        manager.logout(&login.token).await.unwrap();
    }

    #[tokio::test]
    async fn expired_session_is_absent_and_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let files = Arc::new(FileStore::new(dir.path()));
        let manager = SessionManager::new(StoreSelector::fallback_only(files.clone()), hasher())
            .unwrap()
            .with_session_ttl(Duration::seconds(-1));

        manager.register("frank", "secret1").await.unwrap();
        let login = manager.login("frank", "secret1").await.unwrap();
        assert!(files.find_session_by_token(&login.token).await.unwrap().is_some());

        assert!(manager.verify_token(&login.token).await.unwrap().is_none());
        assert!(files.find_session_by_token(&login.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rename_propagates_then_reset_revokes() {
        let (_dir, manager) = file_manager();
        let bob = manager.register("bob", "secret1").await.unwrap();
        let t1 = manager.login("bob", "secret1").await.unwrap().token;

        let updated = manager
            .update_user(bob.id, UserUpdate { username: Some("robert".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(updated.username, "robert");
        assert_eq!(manager.verify_token(&t1).await.unwrap().unwrap().username, "robert");

        manager.reset_password("robert", "newpass1").await.unwrap();
        assert!(manager.verify_token(&t1).await.unwrap().is_none());
        assert!(manager.login("robert", "secret1").await.is_err());
        let fresh = manager.login("robert", "newpass1").await.unwrap();
        assert!(manager.verify_token(&fresh.token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn update_rejects_taken_name_and_unknown_user() {
        let (_dir, manager) = file_manager();
        manager.register("alice", "secret1").await.unwrap();
        let bob = manager.register("bob", "secret1").await.unwrap();

        let taken = UserUpdate { username: Some("ALICE".into()), ..Default::default() };
        assert!(matches!(manager.update_user(bob.id, taken).await, Err(AuthError::Conflict(_))));

        let same = UserUpdate { username: Some("Bob".into()), ..Default::default() };
        assert_eq!(manager.update_user(bob.id, same).await.unwrap().username, "bob");

        let short = UserUpdate { username: Some("x".into()), ..Default::default() };
        assert!(matches!(manager.update_user(bob.id, short).await, Err(AuthError::Validation(_))));

        let avatar = UserUpdate { avatar: Some(Some("data:image/png;base64,AA".into())), ..Default::default() };
        assert!(matches!(
            manager.update_user(Uuid::new_v4(), avatar).await,
            Err(AuthError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn avatar_can_be_set_and_cleared() {
        let (_dir, manager) = file_manager();
        let gina = manager.register("gina", "secret1").await.unwrap();

        let set = UserUpdate { avatar: Some(Some("data:image/png;base64,AA".into())), ..Default::default() };
        let updated = manager.update_user(gina.id, set).await.unwrap();
        assert_eq!(updated.avatar.as_deref(), Some("data:image/png;base64,AA"));

        let clear = UserUpdate { avatar: Some(None), ..Default::default() };
        assert!(manager.update_user(gina.id, clear).await.unwrap().avatar.is_none());
        assert!(manager.get_user(gina.id).await.unwrap().unwrap().avatar.is_none());
    }

    #[tokio::test]
    async fn change_password_checks_old_and_keeps_sessions() {
        let (_dir, manager) = file_manager();
        let hank = manager.register("hank", "secret1").await.unwrap();
        let token = manager.login("hank", "secret1").await.unwrap().token;

        let err = manager.change_password(hank.id, "wrong11", "newpass1").await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized(_)));
        manager.login("hank", "secret1").await.unwrap();

        let err = manager.change_password(hank.id, "secret1", "short").await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(ref m) if m == NEW_PASSWORD_LENGTH));

        manager.change_password(hank.id, "secret1", "newpass1").await.unwrap();
        manager.login("hank", "newpass1").await.unwrap();
        assert!(manager.verify_token(&token).await.unwrap().is_some());

        assert!(matches!(
            manager.change_password(Uuid::new_v4(), "secret1", "newpass1").await,
            Err(AuthError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn reset_password_unknown_user_and_short_password() {
        let (_dir, manager) = file_manager();
        assert!(matches!(
            manager.reset_password("ghost", "newpass1").await,
            Err(AuthError::NotFound(ref m)) if m == USERNAME_NOT_FOUND
        ));
        assert!(matches!(
            manager.reset_password("ghost", "x").await,
            Err(AuthError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn username_availability() {
        let (_dir, manager) = file_manager();
        assert!(!manager.is_username_available("").await.unwrap());
        assert!(!manager.is_username_available("   ").await.unwrap());
        assert!(manager.is_username_available("ivan").await.unwrap());

        manager.register("Ivan", "secret1").await.unwrap();
        assert!(!manager.is_username_available("IVAN").await.unwrap());
        assert!(!manager.is_username_available(" ivan ").await.unwrap());
    }

    #[tokio::test]
    async fn infrastructure_failure_falls_back_to_files() {
        let dir = tempfile::tempdir().unwrap();
        let broken = Arc::new(BrokenStore::new(true));
        let stores = StoreSelector::new(Some(broken.clone()), Arc::new(FileStore::new(dir.path())));
        let manager = SessionManager::new(stores, hasher()).unwrap();

        let user = manager.register("judy", "secret1").await.unwrap();
        let login = manager.login("judy", "secret1").await.unwrap();
        assert_eq!(manager.verify_token(&login.token).await.unwrap().unwrap().user_id, user.id);
        assert!(broken.calls.load(Ordering::SeqCst) >= 3);

        // The file backend now holds the account.
        let files = FileStore::new(dir.path());
        assert!(files.find_user_by_username("judy").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn reset_interrupted_before_revocation_keeps_old_password() {
        let (_p, _f, manager) = flaky_manager(Step::DeleteSessionsByUser);
        manager.register("bob", "secret1").await.unwrap();
        manager.login("bob", "secret1").await.unwrap();

        assert!(manager.reset_password("bob", "newpass1").await.is_err());

        // Nothing changed, so the new password must not work
        assert!(matches!(
            manager.login("bob", "newpass1").await,
            Err(AuthError::Unauthorized(_))
        ));
        manager.login("bob", "secret1").await.unwrap();
    }

    #[tokio::test]
    async fn reset_interrupted_after_revocation_leaves_no_old_tokens() {
        let (_p, _f, manager) = flaky_manager(Step::UpdateUser);
        manager.register("carl", "secret1").await.unwrap();
        let old = manager.login("carl", "secret1").await.unwrap().token;

        assert!(manager.reset_password("carl", "newpass1").await.is_err());

        assert!(manager.verify_token(&old).await.unwrap().is_none());
        assert!(manager.login("carl", "newpass1").await.is_err());
        manager.login("carl", "secret1").await.unwrap();
    }

    #[tokio::test]
    async fn disconnected_primary_is_never_called() {
        let dir = tempfile::tempdir().unwrap();
        let offline = Arc::new(BrokenStore::new(false));
        let stores = StoreSelector::new(Some(offline.clone()), Arc::new(FileStore::new(dir.path())));
        let manager = SessionManager::new(stores, hasher()).unwrap();

        manager.register("kate", "secret1").await.unwrap();
        manager.login("kate", "secret1").await.unwrap();
        manager.purge_expired().await.unwrap();
        assert_eq!(offline.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn business_rejection_does_not_fall_back() {
        let primary_dir = tempfile::tempdir().unwrap();
        let fallback_dir = tempfile::tempdir().unwrap();
        let primary = Arc::new(FileStore::new(primary_dir.path()));
        let fallback = Arc::new(FileStore::new(fallback_dir.path()));
        let manager = SessionManager::new(StoreSelector::new(Some(primary.clone()), fallback.clone()), hasher())
            .unwrap();

        manager.register("leo", "secret1").await.unwrap();
        assert!(matches!(manager.register("LEO", "secret1").await, Err(AuthError::Conflict(_))));
        assert!(manager.login("leo", "wrongpw").await.is_err());

        assert!(fallback.find_user_by_username("leo").await.unwrap().is_none());
        assert!(primary.find_user_by_username("leo").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn both_backends_failing_surfaces_storage_error() {
        let stores = StoreSelector::new(
            Some(Arc::new(BrokenStore::new(true))),
            Arc::new(BrokenStore::new(true)),
        );
        let manager = SessionManager::new(stores, hasher()).unwrap();
        let err = manager.login("mia", "secret1").await.unwrap_err();
        assert!(err.is_infrastructure());
    }

    #[tokio::test]
    async fn purge_removes_expired_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let files = Arc::new(FileStore::new(dir.path()));
        let expired = SessionManager::new(StoreSelector::fallback_only(files.clone()), hasher())
            .unwrap()
            .with_session_ttl(Duration::seconds(-1));
        expired.register("nina", "secret1").await.unwrap();
        expired.login("nina", "secret1").await.unwrap();
        expired.login("nina", "secret1").await.unwrap();

        assert_eq!(expired.purge_expired().await.unwrap(), 2);
        assert_eq!(expired.purge_expired().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn legacy_accounts_log_in() {
        let dir = tempfile::tempdir().unwrap();
        let files = Arc::new(FileStore::new(dir.path()));
        files
            .insert_user(&User {
                id: Uuid::new_v4(),
                username: "oscar".into(),
                password_hash: crate::auth::legacy_digest("secret1"),
                avatar: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        let manager = SessionManager::new(StoreSelector::fallback_only(files), hasher()).unwrap();
        assert!(manager.login("oscar", "secret1").await.is_ok());
        assert!(manager.login("oscar", "secret2").await.is_err());
    }
}
