//! Fixed-window rate limiting and the API key gate (§6).
//!
//! Three tiers, each its own window: general reads, mutating writes, and the
//! discovery trigger, which gets the tightest budget since a pass is the
//! expensive one. Counted per client IP; the window simply resets once it has
//! elapsed rather than sliding, which is what the spec's "N per window"
//! phrasing describes.

use super::error::ApiError;
use crate::config::WebserverConfig;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
enum Tier {
    General,
    Mutating,
    Discovery,
}

fn tier_for(method: &Method, path: &str) -> Tier {
    if method == Method::POST {
        if path == "/api/discover" {
            return Tier::Discovery;
        }
        if path == "/api/track" || path.ends_with("/status") || path.ends_with("/promote") {
            return Tier::Mutating;
        }
    }
    Tier::General
}

struct Window {
    count: u32,
    started: Instant,
}

pub struct RateLimiter {
    window_general: Duration,
    max_general: u32,
    max_mutating: u32,
    max_discovery: u32,
    windows: Mutex<HashMap<(String, Tier), Window>>,
}

impl RateLimiter {
    pub fn new(config: &WebserverConfig) -> Self {
        Self {
            window_general: Duration::from_millis(config.rate_limit_window_ms),
            max_general: config.rate_limit_max_general,
            max_mutating: config.rate_limit_max_mutating,
            max_discovery: config.rate_limit_max_discovery,
            windows: Mutex::new(HashMap::new()),
        }
    }

    fn window_len(&self, tier: Tier) -> Duration {
        match tier {
            Tier::General | Tier::Mutating => self.window_general,
            Tier::Discovery => Duration::from_secs(3600),
        }
    }

    fn limit(&self, tier: Tier) -> u32 {
        match tier {
            Tier::General => self.max_general,
            Tier::Mutating => self.max_mutating,
            Tier::Discovery => self.max_discovery,
        }
    }

    /// `true` if this request is allowed to proceed, bumping the counter.
    fn check(&self, key: &str, tier: Tier) -> bool {
        let mut windows = self.windows.lock().unwrap();
        let now = Instant::now();
        let len = self.window_len(tier);
        let limit = self.limit(tier);

        let entry = windows.entry((key.to_string(), tier)).or_insert_with(|| Window { count: 0, started: now });
        if now.duration_since(entry.started) >= len {
            entry.count = 0;
            entry.started = now;
        }
        if entry.count >= limit {
            return false;
        }
        entry.count += 1;
        true
    }
}

/// Axum middleware entry point: resolves the tier from method + path, checks
/// the per-IP counter, and rejects with 429 before the handler ever runs.
pub async fn enforce(
    State(limiter): State<Arc<RateLimiter>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Response {
    let tier = tier_for(req.method(), req.uri().path());
    if !limiter.check(&addr.ip().to_string(), tier) {
        return ApiError::TooManyRequests.into_response();
    }
    next.run(req).await
}

/// Checks the `x-api-key` header against the configured key for every
/// state-mutating endpoint. A no-op (always passes) when no key is
/// configured, matching the spec's "when one is configured" wording.
pub async fn require_api_key(State(api_key): State<Option<Arc<String>>>, req: Request, next: Next) -> Response {
    let is_mutating = req.method() != Method::GET;
    if is_mutating {
        if let Some(expected) = &api_key {
            let provided = req.headers().get("x-api-key").and_then(|v| v.to_str().ok());
            if provided != Some(expected.as_str()) {
                return ApiError::Unauthorized.into_response();
            }
        }
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_general: u32) -> WebserverConfig {
        WebserverConfig { rate_limit_max_general: max_general, ..WebserverConfig::default() }
    }

    #[test]
    fn the_general_tier_blocks_once_its_budget_is_spent() {
        let limiter = RateLimiter::new(&config(2));
        assert!(limiter.check("1.2.3.4", Tier::General));
        assert!(limiter.check("1.2.3.4", Tier::General));
        assert!(!limiter.check("1.2.3.4", Tier::General));
    }

    #[test]
    fn different_clients_get_independent_budgets() {
        let limiter = RateLimiter::new(&config(1));
        assert!(limiter.check("1.2.3.4", Tier::General));
        assert!(limiter.check("5.6.7.8", Tier::General));
    }

    #[test]
    fn tier_for_discover_post_is_the_discovery_tier() {
        assert_eq!(tier_for(&Method::POST, "/api/discover"), Tier::Discovery);
        assert_eq!(tier_for(&Method::POST, "/api/wallets/0xabc/status"), Tier::Mutating);
        assert_eq!(tier_for(&Method::GET, "/api/wallets"), Tier::General);
    }
}
