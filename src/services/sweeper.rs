use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::session_service::SessionManager;

/// Periodically purges expired sessions until shut down.
pub struct SessionSweeper {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl SessionSweeper {
    /// Spawn the sweep loop. The first sweep happens one `interval` after start.
    pub fn start(sessions: Arc<SessionManager>, interval: Duration) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            info!(interval_secs = interval.as_secs(), "Session sweeper started");

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        match sessions.purge_expired().await {
                            Ok(removed) => debug!(removed, "Session sweep finished"),
                            Err(e) => warn!(error = %e, "Session sweep failed"),
                        }
                    }
                }
            }

            info!("Session sweeper stopped");
        });

        Self { cancel, handle }
    }

    /// Stop the loop and wait for an in-flight sweep to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Session sweeper task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::PasswordHasher;
    use crate::store::{FileStore, Store, StoreSelector};

    #[tokio::test]
    async fn sweeps_expired_sessions_then_stops() {
        let dir = tempfile::tempdir().unwrap();
        let files = Arc::new(FileStore::new(dir.path()));
        let manager = SessionManager::new(
            StoreSelector::fallback_only(files.clone()),
            PasswordHasher::new(8 * 1024, 1).unwrap(),
        )
        .unwrap()
        .with_session_ttl(chrono::Duration::seconds(-1));

        manager.register("sweepy", "secret1").await.unwrap();
        let token = manager.login("sweepy", "secret1").await.unwrap().token;
        assert!(files.find_session_by_token(&token).await.unwrap().is_some());

        let sweeper = SessionSweeper::start(Arc::new(manager), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(200)).await;
        sweeper.shutdown().await;

        assert!(files.find_session_by_token(&token).await.unwrap().is_none());
    }
}
