use anyhow::{anyhow, Context};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::PasswordHasher;
use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::middleware::RateLimiter;
use crate::services::{SessionManager, WardrobeService};
use crate::store::{FileStore, PgStore, Store, StoreSelector};

/// Shared handles passed to every handler and middleware.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub wardrobe: Arc<WardrobeService>,
    pub rate_limiter: Arc<RateLimiter>,
    pub database: Arc<DatabaseManager>,
}

impl AppState {
    /// Wire up storage and services from configuration. A database that is
    /// configured but unreachable is logged and left disconnected; the file
    /// backend serves every request until the process restarts.
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let database = Arc::new(DatabaseManager::new(&config.storage));
        database.try_connect().await;

        let data_dir = &config.storage.data_dir;
        tokio::fs::create_dir_all(data_dir)
            .await
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let primary: Option<Arc<dyn Store>> = database
            .is_configured()
            .then(|| Arc::new(PgStore::new(database.clone())) as Arc<dyn Store>);
        let stores = StoreSelector::new(primary, Arc::new(FileStore::new(data_dir)));

        let hasher = PasswordHasher::from_config(&config.security)
            .map_err(|e| anyhow!("invalid password hashing parameters: {e}"))?;
        let sessions = SessionManager::new(stores, hasher)?;

        let rate_limiter = if config.api.enable_rate_limiting {
            RateLimiter::new(
                config.api.auth_rate_limit_requests,
                Duration::from_secs(config.api.auth_rate_limit_window_secs),
            )
        } else {
            RateLimiter::disabled()
        };

        tracing::info!(
            backend = sessions.stores().active().name(),
            data_dir = %data_dir.display(),
            "Storage ready"
        );

        Ok(Self {
            sessions: Arc::new(sessions),
            wardrobe: Arc::new(WardrobeService::new(data_dir)),
            rate_limiter: Arc::new(rate_limiter),
            database,
        })
    }

    /// Name of the backend new requests start on.
    pub fn active_backend(&self) -> &'static str {
        self.sessions.stores().active().name()
    }
}
