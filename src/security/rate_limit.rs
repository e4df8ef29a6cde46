//! Per-client rate limiting for the auth endpoints.
//!
//! Fixed windows: the first request from a client opens a window of
//! `window_secs`; up to `max_requests` are admitted inside it. Every response
//! carries `X-RateLimit-Remaining` and `X-RateLimit-Reset` (RFC 3339), and a
//! rejection is a 429 with `Retry-After`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{SecondsFormat, Utc};
use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::http::ApiError;
use crate::observability::metrics;

pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";

/// Past this many tracked clients, expired windows are swept on insert.
const SWEEP_THRESHOLD: usize = 10_000;

struct Window {
    count: u32,
    reset_at: Instant,
}

/// Outcome of one [`RateLimiter::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_after: Duration,
}

/// Fixed-window request counter keyed by client.
pub struct RateLimiter {
    windows: DashMap<String, Window>,
    max_requests: u32,
    window: Duration,
    trust_proxy_headers: bool,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests: config.max_requests,
            window: config.window(),
            trust_proxy_headers: config.trust_proxy_headers,
        }
    }

    /// Count one request from `key`.
    pub fn check(&self, key: &str) -> Decision {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Decision {
        if self.windows.len() >= SWEEP_THRESHOLD {
            self.evict_expired_at(now);
        }

        let mut entry = self.windows.entry(key.to_string()).or_insert_with(|| Window {
            count: 0,
            reset_at: now + self.window,
        });
        if now >= entry.reset_at {
            entry.count = 0;
            entry.reset_at = now + self.window;
        }
        entry.count = entry.count.saturating_add(1);

        Decision {
            allowed: entry.count <= self.max_requests,
            remaining: self.max_requests.saturating_sub(entry.count),
            reset_after: entry.reset_at.saturating_duration_since(now),
        }
    }

    /// Forget a client's window.
    pub fn reset(&self, key: &str) {
        self.windows.remove(key);
    }

    /// Drop windows that have already closed. Returns how many were removed.
    fn evict_expired_at(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, w| w.reset_at > now);
        before.saturating_sub(self.windows.len())
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    /// Identify the caller: proxy headers when trusted, then the peer address.
    pub fn client_key(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
        if self.trust_proxy_headers {
            let forwarded = headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty());
            let real_ip = headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty());
            if let Some(ip) = forwarded.or(real_ip) {
                return ip.to_string();
            }
        }
        peer.map(|addr| addr.ip().to_string()).unwrap_or_else(|| "unknown".to_string())
    }
}

/// Middleware applied to the auth routes.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = limiter.client_key(request.headers(), peer);
    let decision = limiter.check(&key);

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        tracing::warn!(
            client = %key,
            retry_after_secs = decision.reset_after.as_secs(),
            "Rate limit exceeded"
        );
        metrics::record_rate_limited("auth");
        let mut response = ApiError::rate_limited().into_response();
        let retry_after = decision.reset_after.as_secs().max(1);
        response
            .headers_mut()
            .insert("retry-after", HeaderValue::from(retry_after));
        response
    };

    let headers = response.headers_mut();
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
    let reset_at = chrono::Duration::from_std(decision.reset_after)
        .map(|d| Utc::now() + d)
        .unwrap_or_else(|_| Utc::now())
        .to_rfc3339_opts(SecondsFormat::Millis, true);
    if let Ok(value) = HeaderValue::from_str(&reset_at) {
        headers.insert(X_RATELIMIT_RESET, value);
    }
    response
}
