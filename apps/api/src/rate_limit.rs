//! Per-client request limiter: each IP gets a fixed number of requests per
//! window. A client's window opens with its first request and closes
//! `window` later; the count resets when the next window opens.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{bail, Result};
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Copy)]
struct ClientWindow {
    opened_at: Instant,
    count: u32,
}

pub struct RequestLimiter {
    max_requests: u32,
    window: Duration,
    clients: Mutex<HashMap<IpAddr, ClientWindow>>,
}

impl RequestLimiter {
    /// Allows at most `max_requests` per `window` for each client.
    pub fn new(max_requests: u32, window: Duration) -> Result<Self> {
        if max_requests == 0 {
            bail!("rate limit must allow at least one request");
        }
        if window.is_zero() {
            bail!("rate limit window must be non-zero");
        }

        Ok(Self {
            max_requests,
            window,
            clients: Mutex::new(HashMap::new()),
        })
    }

    /// Records one request from `ip`. Returns false once the client is over quota;
    /// rejected requests are not counted.
    pub fn check(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let mut clients = self.clients();

        let entry = clients.entry(ip).or_insert(ClientWindow {
            opened_at: now,
            count: 0,
        });
        if now.duration_since(entry.opened_at) >= self.window {
            *entry = ClientWindow {
                opened_at: now,
                count: 0,
            };
        }

        if entry.count >= self.max_requests {
            return false;
        }
        entry.count += 1;
        true
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.clients().len()
    }

    /// Forgets clients whose window has closed.
    fn prune(&self) {
        let now = Instant::now();
        let mut clients = self.clients();
        clients.retain(|_, w| now.duration_since(w.opened_at) < self.window);
        clients.shrink_to_fit();
    }

    /// A panic while the lock was held cannot leave a window half-updated, so a
    /// poisoned map is still usable.
    fn clients(&self) -> MutexGuard<'_, HashMap<IpAddr, ClientWindow>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Periodically forgets clients whose window has closed.
    /// The returned handle is aborted at shutdown.
    pub fn spawn_housekeeping(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                limiter.prune();
                debug!(clients = limiter.tracked_clients(), "pruned request limiter");
            }
        })
    }
}

/// Middleware rejecting requests from clients over their quota.
/// Requests without connection info (e.g. in-process calls) share one bucket.
pub async fn enforce_rate_limit(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = connect_info
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    if !state.limiter.check(ip) {
        warn!(%ip, path = %request.uri().path(), "request rejected by rate limiter");
        return AppError::TooManyRequests.into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(raw: &str) -> IpAddr {
        raw.parse().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_limiter_allows_quota_then_rejects() {
        let limiter = RequestLimiter::new(3, Duration::from_secs(60)).unwrap();
        let client = ip("203.0.113.7");

        assert!(limiter.check(client));
        assert!(limiter.check(client));
        assert!(limiter.check(client));
        assert!(!limiter.check(client));
    }

    #[tokio::test(start_paused = true)]
    async fn test_limiter_tracks_clients_independently() {
        let limiter = RequestLimiter::new(1, Duration::from_secs(60)).unwrap();
        let a = ip("203.0.113.7");
        let b = ip("2001:db8::1");

        assert!(limiter.check(a));
        assert!(!limiter.check(a));
        assert!(limiter.check(b));
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[test]
    fn test_limiter_rejects_zero_quota() {
        assert!(RequestLimiter::new(0, Duration::from_secs(60)).is_err());
        assert!(RequestLimiter::new(10, Duration::ZERO).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_window_allows_one_hundred_requests() {
        let limiter = RequestLimiter::new(100, Duration::from_secs(15 * 60)).unwrap();
        let client = ip("198.51.100.1");

        for _ in 0..100 {
            assert!(limiter.check(client));
        }
        assert!(!limiter.check(client));
    }

    #[tokio::test(start_paused = true)]
    async fn test_steady_client_never_exceeds_quota_within_a_window() {
        let window = Duration::from_secs(2);
        let limiter = RequestLimiter::new(2, window).unwrap();
        let client = ip("203.0.113.9");

        // One request every 50 ms for just under one window.
        let mut admitted = 0;
        for _ in 0..38 {
            if limiter.check(client) {
                admitted += 1;
            }
            tokio::time::advance(Duration::from_millis(50)).await;
        }
        assert_eq!(admitted, 2);

        // 1.9 s elapsed; the window closes at 2 s.
        tokio::time::advance(Duration::from_millis(100)).await;
        assert!(limiter.check(client));
        assert!(limiter.check(client));
        assert!(!limiter.check(client));
    }

    #[tokio::test(start_paused = true)]
    async fn test_admissions_per_window_over_fifteen_minutes() {
        let window = Duration::from_secs(15 * 60);
        let limiter = RequestLimiter::new(100, window).unwrap();
        let client = ip("198.51.100.2");

        // A request every second for three windows: 100 admitted per window.
        let mut admitted_per_window = [0u32; 3];
        for second in 0..3 * 15 * 60 {
            if limiter.check(client) {
                admitted_per_window[second / (15 * 60)] += 1;
            }
            tokio::time::advance(Duration::from_secs(1)).await;
        }
        assert_eq!(admitted_per_window, [100, 100, 100]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prune_drops_closed_windows_only() {
        let limiter = RequestLimiter::new(5, Duration::from_secs(10)).unwrap();
        assert!(limiter.check(ip("203.0.113.1")));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(limiter.check(ip("203.0.113.2")));

        tokio::time::advance(Duration::from_secs(5)).await;
        limiter.prune();
        assert_eq!(limiter.tracked_clients(), 1);
    }
}
