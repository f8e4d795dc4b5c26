use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::error::ApiError;
use crate::state::AppState;

const SWEEP_INTERVAL: Duration = Duration::from_secs(300);
pub const RATE_LIMITED_MESSAGE: &str = "Too many login attempts, please try again later.";

/// Per-client sliding window. A limit of 0 disables limiting.
#[derive(Debug)]
pub struct RateLimiter {
    limit_per_window: u32,
    window: Duration,
    requests: Mutex<(HashMap<String, Vec<Instant>>, Instant)>,
}

impl RateLimiter {
    pub fn new(limit_per_window: u32, window: Duration) -> Self {
        Self {
            limit_per_window,
            window,
            requests: Mutex::new((HashMap::new(), Instant::now())),
        }
    }

    pub fn disabled() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn is_enabled(&self) -> bool {
        self.limit_per_window > 0
    }

    /// Record a request from `key`; false once the window is full.
    pub fn allow(&self, key: &str) -> bool {
        if !self.is_enabled() {
            return true;
        }

        let now = Instant::now();
        let cutoff = now.checked_sub(self.window);
        let live = |t: &Instant| cutoff.map_or(true, |c| *t > c);

        let mut guard = self.requests.lock().unwrap_or_else(PoisonError::into_inner);
        let (requests, last_sweep) = &mut *guard;

        // Drop clients that have gone quiet
        if last_sweep.elapsed() >= SWEEP_INTERVAL {
            requests.retain(|_, timestamps| {
                timestamps.retain(live);
                !timestamps.is_empty()
            });
            *last_sweep = now;
        }

        let entry = requests.entry(key.to_owned()).or_default();
        entry.retain(live);

        if entry.len() >= self.limit_per_window as usize {
            return false;
        }

        entry.push(now);
        true
    }
}

/// Rejects credential requests past the per-client limit with 429.
pub async fn auth_rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if state.rate_limiter.is_enabled() {
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        let client = client_key(request.headers(), peer);

        if !state.rate_limiter.allow(&client) {
            tracing::warn!(client = %client, path = %request.uri().path(), "Auth rate limit exceeded");
            return Err(ApiError::too_many_requests(RATE_LIMITED_MESSAGE));
        }
    }

    Ok(next.run(request).await)
}

/// First `X-Forwarded-For` hop, else the peer address, else "unknown".
fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}
