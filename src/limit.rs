//! Request rate limiting.
//!
//! A sliding-window limiter keyed by client network origin. Every inbound
//! request passes through [`rate_limit_middleware`] before routing; a client
//! that has been admitted `max_calls` times within the trailing `period` is
//! rejected with 429.
//!
//! Admission bookkeeping is atomic per key: the check and the record happen
//! under one lock, so two simultaneous requests from the same client cannot
//! both observe "under limit" and overshoot the cap. The critical section
//! does no I/O and never awaits. Rejected requests are not recorded and so
//! consume no quota.
//!
//! Keys whose windows have fully drained are swept out at most once per
//! window, so the table tracks only clients seen within the last period
//! rather than every client key ever presented.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::ApiError;

// =============================================================================
// Rate Limiter
// =============================================================================

/// Admission decision for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allow,
    Reject,
}

/// Sliding-window request counter keyed by client identity.
pub struct RateLimiter {
    /// Admitted requests allowed per window (> 0)
    max_calls: u32,

    /// Window length
    period: Duration,

    state: Mutex<LimiterState>,
}

struct LimiterState {
    /// Per-key admission timestamps, oldest first
    table: HashMap<String, VecDeque<Instant>>,

    /// When the table was last swept for fully-drained keys
    last_sweep: Instant,
}

impl RateLimiter {
    /// Create a limiter admitting `max_calls` requests per `period`.
    pub fn new(max_calls: u32, period: Duration) -> Self {
        Self {
            max_calls,
            period,
            state: Mutex::new(LimiterState {
                table: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }

    /// Decide whether to admit a request from `client_key` at `now`.
    ///
    /// Timestamps older than the trailing window are pruned first, so a
    /// client regains one slot as soon as its oldest admitted request falls
    /// outside the window. The key is client-supplied (X-Forwarded-For), so
    /// stale keys are evicted rather than kept forever: at most once per
    /// window the whole table is swept and drained keys are dropped.
    pub async fn admit(&self, client_key: &str, now: Instant) -> Admission {
        let mut state = self.state.lock().await;

        if now.duration_since(state.last_sweep) >= self.period {
            let period = self.period;
            state.table.retain(|_, entries| {
                Self::prune(entries, now, period);
                !entries.is_empty()
            });
            state.last_sweep = now;
        }

        let entries = state.table.entry(client_key.to_string()).or_default();
        Self::prune(entries, now, self.period);

        if (entries.len() as u32) < self.max_calls {
            entries.push_back(now);
            Admission::Allow
        } else {
            Admission::Reject
        }
    }

    fn prune(entries: &mut VecDeque<Instant>, now: Instant, period: Duration) {
        while let Some(&oldest) = entries.front() {
            if now.duration_since(oldest) >= period {
                entries.pop_front();
            } else {
                break;
            }
        }
    }

    /// Number of admissions currently recorded for a key (test hook).
    pub async fn recorded(&self, client_key: &str) -> usize {
        let state = self.state.lock().await;
        state.table.get(client_key).map(|e| e.len()).unwrap_or(0)
    }

    /// Number of client keys currently resident in the table (test hook).
    pub async fn tracked_keys(&self) -> usize {
        let state = self.state.lock().await;
        state.table.len()
    }
}

// =============================================================================
// Axum Middleware
// =============================================================================

/// Derive the rate-limit key for a request.
///
/// Prefers the first hop of `X-Forwarded-For` (proxy deployments), then the
/// peer address, then a shared fallback bucket.
pub fn client_key(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    "unknown".to_string()
}

/// Axum middleware applying the rate limiter to every request.
///
/// Installed ahead of routing and authentication so that rejected clients
/// cannot reach any handler, including the auth surface.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = client_key(&request);

    match limiter.admit(&key, Instant::now()).await {
        Admission::Allow => Ok(next.run(request).await),
        Admission::Reject => {
            debug!(client_key = %key, "rate limit exceeded");
            Err(ApiError::RateLimited)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
