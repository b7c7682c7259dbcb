//! Fixed-window rate limiting of generation requests per client IP.
//!
//! Each IP gets `max` requests per window. Allowed responses carry
//! `RateLimit-Limit` / `RateLimit-Remaining` / `RateLimit-Reset` headers;
//! rejected ones get a 429 with `Retry-After`.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::AppError;
use crate::state::AppState;

/// Windows are pruned once the table grows past this many clients.
const PRUNE_THRESHOLD: usize = 1024;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Quota state after an allowed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub limit: u32,
    pub remaining: u32,
    /// Seconds until the window resets.
    pub reset_secs: u64,
}

/// Per-IP fixed-window counter.
pub struct RateLimiter {
    max: u32,
    window: Duration,
    clients: Mutex<HashMap<IpAddr, Window>>,
}

impl RateLimiter {
    pub fn new(max: u32, window: Duration) -> Self {
        Self {
            max,
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Count one request from `ip`.
    ///
    /// Returns the remaining quota, or the seconds to wait when exhausted.
    pub async fn check(&self, ip: IpAddr) -> Result<Quota, u64> {
        let now = Instant::now();
        let mut clients = self.clients.lock().await;

        if clients.len() > PRUNE_THRESHOLD {
            let window = self.window;
            clients.retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = clients.entry(ip).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        let reset_secs = self
            .window
            .saturating_sub(now.duration_since(entry.started))
            .as_secs()
            .max(1);

        if entry.count >= self.max {
            return Err(reset_secs);
        }
        entry.count += 1;

        Ok(Quota {
            limit: self.max,
            remaining: self.max - entry.count,
            reset_secs,
        })
    }
}

/// Client address from the connection, or loopback when unavailable
/// (e.g. when the router is driven without a listener).
fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

/// Middleware enforcing [`RateLimiter`] from the app state.
pub async fn limit_generation(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&request);

    match state.rate_limiter.check(ip).await {
        Ok(quota) => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(
                HeaderName::from_static("ratelimit-limit"),
                HeaderValue::from(quota.limit),
            );
            headers.insert(
                HeaderName::from_static("ratelimit-remaining"),
                HeaderValue::from(quota.remaining),
            );
            headers.insert(
                HeaderName::from_static("ratelimit-reset"),
                HeaderValue::from(quota.reset_secs),
            );
            response
        }
        Err(retry_after_secs) => {
            tracing::warn!(client_ip = %ip, "Generation rate limit exceeded");
            AppError::RateLimited { retry_after_secs }.into_response()
        }
    }
}
