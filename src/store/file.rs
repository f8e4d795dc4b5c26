//! Flat-file backend: `users.json` holds an array of users, `sessions.json`
//! an object keyed by token. Every operation is a whole-file
//! read-modify-write under one async mutex, so concurrent requests in this
//! process never lose each other's updates.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::database::models::{Session, User};

const USERS_FILE: &str = "users.json";
const SESSIONS_FILE: &str = "sessions.json";

/// Session as stored in `sessions.json`; the token is the map key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionEntry {
    user_id: Uuid,
    username: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl SessionEntry {
    fn into_session(self, token: &str) -> Session {
        Session {
            token: token.to_string(),
            user_id: self.user_id,
            username: self.username,
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

impl From<&Session> for SessionEntry {
    fn from(session: &Session) -> Self {
        Self {
            user_id: session.user_id,
            username: session.username.clone(),
            created_at: session.created_at,
            expires_at: session.expires_at,
        }
    }
}

type SessionMap = BTreeMap<String, SessionEntry>;

pub struct FileStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    fn users_path(&self) -> PathBuf {
        self.dir.join(USERS_FILE)
    }

    fn sessions_path(&self) -> PathBuf {
        self.dir.join(SESSIONS_FILE)
    }

    async fn read_users(&self) -> Result<Vec<User>, StoreError> {
        read_json(&self.users_path()).await
    }

    async fn write_users(&self, users: &[User]) -> Result<(), StoreError> {
        write_json(&self.users_path(), &users).await
    }

    async fn read_sessions(&self) -> Result<SessionMap, StoreError> {
        read_json(&self.sessions_path()).await
    }

    async fn write_sessions(&self, sessions: &SessionMap) -> Result<(), StoreError> {
        write_json(&self.sessions_path(), sessions).await
    }
}

/// Missing files read as the empty value.
pub(crate) async fn read_json<T>(path: &Path) -> Result<T, StoreError>
where
    T: DeserializeOwned + Default,
{
    match tokio::fs::read(path).await {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(T::default()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e.into()),
    }
}

/// Write to a sibling temp file, then rename over the target.
pub(crate) async fn write_json<T>(path: &Path, value: &T) -> Result<(), StoreError>
where
    T: Serialize + ?Sized,
{
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl Store for FileStore {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let _guard = self.lock.lock().await;
        let users = self.read_users().await?;
        Ok(users
            .into_iter()
            .find(|u| u.username.eq_ignore_ascii_case(username)))
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let _guard = self.lock.lock().await;
        let users = self.read_users().await?;
        Ok(users.into_iter().find(|u| u.id == id))
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut users = self.read_users().await?;
        if users
            .iter()
            .any(|u| u.username.eq_ignore_ascii_case(&user.username))
        {
            return Err(StoreError::DuplicateUsername(user.username.clone()));
        }
        users.push(user.clone());
        self.write_users(&users).await
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut users = self.read_users().await?;
        if users
            .iter()
            .any(|u| u.id != user.id && u.username.eq_ignore_ascii_case(&user.username))
        {
            return Err(StoreError::DuplicateUsername(user.username.clone()));
        }
        let slot = users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or(StoreError::UserNotFound(user.id))?;
        *slot = user.clone();
        self.write_users(&users).await
    }

    async fn find_session_by_token(&self, token: &str) -> Result<Option<Session>, StoreError> {
        let _guard = self.lock.lock().await;
        let mut sessions = self.read_sessions().await?;
        Ok(sessions.remove(token).map(|entry| entry.into_session(token)))
    }

    async fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut sessions = self.read_sessions().await?;
        sessions.insert(session.token.clone(), SessionEntry::from(session));
        self.write_sessions(&sessions).await
    }

    async fn delete_session(&self, token: &str) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().await;
        let mut sessions = self.read_sessions().await?;
        if sessions.remove(token).is_none() {
            return Ok(false);
        }
        self.write_sessions(&sessions).await?;
        Ok(true)
    }

    async fn delete_sessions_by_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let _guard = self.lock.lock().await;
        let mut sessions = self.read_sessions().await?;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.user_id != user_id);
        let removed = (before - sessions.len()) as u64;
        if removed > 0 {
            self.write_sessions(&sessions).await?;
        }
        Ok(removed)
    }

    async fn rename_sessions(&self, user_id: Uuid, username: &str) -> Result<u64, StoreError> {
        let _guard = self.lock.lock().await;
        let mut sessions = self.read_sessions().await?;
        let mut renamed = 0;
        for entry in sessions.values_mut().filter(|e| e.user_id == user_id) {
            entry.username = username.to_string();
            renamed += 1;
        }
        if renamed > 0 {
            self.write_sessions(&sessions).await?;
        }
        Ok(renamed)
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let _guard = self.lock.lock().await;
        let mut sessions = self.read_sessions().await?;
        let before = sessions.len();
        sessions.retain(|_, entry| now < entry.expires_at);
        let removed = (before - sessions.len()) as u64;
        if removed > 0 {
            self.write_sessions(&sessions).await?;
        }
        Ok(removed)
    }
}
