//! Request admission: per-client fixed-window rate limiting
//!
//! Two budgets are layered. The default budget covers every route, the
//! stricter generation budget covers `/get_task` only. A denied request
//! leaves its window untouched.

use super::metrics::Metrics;
use crate::error::ApiError;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Identity used when the peer address is unknown
pub const UNKNOWN_CLIENT: &str = "unknown";

/// A request budget: at most `max_requests` per `window` per client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    pub name: &'static str,
    pub max_requests: u32,
    pub window: Duration,
}

impl Budget {
    pub fn new(name: &'static str, max_requests: u32, window: Duration) -> Self {
        Self {
            name,
            max_requests,
            window,
        }
    }
}

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted { remaining: u32 },
    Denied { retry_after: Duration },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted { .. })
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Rate limiter state, cheap to clone
#[derive(Clone)]
pub struct RateLimiter {
    budget: Budget,
    windows: Arc<Mutex<HashMap<String, Window>>>,
    metrics: Option<Metrics>,
}

impl RateLimiter {
    pub fn new(budget: Budget) -> Self {
        Self {
            budget,
            windows: Arc::new(Mutex::new(HashMap::new())),
            metrics: None,
        }
    }

    pub fn new_with_metrics(budget: Budget, metrics: Metrics) -> Self {
        Self {
            metrics: Some(metrics),
            ..Self::new(budget)
        }
    }

    pub fn budget(&self) -> &Budget {
        &self.budget
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Window>> {
        // The map holds plain counters, so a poisoned lock is still consistent
        self.windows.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Check and, if admitted, count a request for `identity`
    pub fn check(&self, identity: &str) -> Admission {
        let now = Instant::now();
        let mut windows = self.lock();

        let window = windows.entry(identity.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        let elapsed = now.duration_since(window.started);
        if elapsed >= self.budget.window {
            window.started = now;
            window.count = 0;
        }

        if window.count >= self.budget.max_requests {
            let retry_after = self
                .budget
                .window
                .saturating_sub(now.duration_since(window.started));
            drop(windows);

            warn!(
                "Rate limit exceeded for {} ({} budget, {} per {}s)",
                identity,
                self.budget.name,
                self.budget.max_requests,
                self.budget.window.as_secs()
            );
            if let Some(ref metrics) = self.metrics {
                metrics.record_rate_limit_rejection(self.budget.name);
            }
            return Admission::Denied { retry_after };
        }

        window.count += 1;
        Admission::Admitted {
            remaining: self.budget.max_requests - window.count,
        }
    }

    /// True iff the request is admitted
    pub fn admit(&self, identity: &str) -> bool {
        self.check(identity).is_admitted()
    }

    /// Requests counted for `identity` in its current window
    pub fn request_count(&self, identity: &str) -> u32 {
        let now = Instant::now();
        self.lock()
            .get(identity)
            .filter(|w| now.duration_since(w.started) < self.budget.window)
            .map(|w| w.count)
            .unwrap_or(0)
    }

    /// Number of identities currently tracked
    pub fn tracked_clients(&self) -> usize {
        self.lock().len()
    }

    /// Drop windows that have rolled over; returns how many were removed
    pub fn prune_expired(&self) -> usize {
        let now = Instant::now();
        let mut windows = self.lock();
        let before = windows.len();
        windows.retain(|_, w| now.duration_since(w.started) < self.budget.window);
        let removed = before - windows.len();
        drop(windows);

        debug!(
            "Rate limiter cleanup ({}): removed {} expired windows",
            self.budget.name, removed
        );
        removed
    }
}

/// Periodically prune expired windows of every limiter
pub fn spawn_sweeper(limiters: Vec<RateLimiter>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            for limiter in &limiters {
                limiter.prune_expired();
            }
        }
    })
}

/// Middleware state: a limiter plus how to identify clients
#[derive(Clone)]
pub struct RateLimitGate {
    pub limiter: RateLimiter,
    pub trust_forwarded_for: bool,
}

/// Rate limit middleware
///
/// Rejects with 429 and a Retry-After hint when the client's budget is spent.
pub async fn rate_limit_middleware(
    State(gate): State<RateLimitGate>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = client_identity(&request, gate.trust_forwarded_for);

    match gate.limiter.check(&identity) {
        Admission::Admitted { remaining } => {
            debug!(
                "Rate limit OK for {} ({} budget, {} remaining)",
                identity,
                gate.limiter.budget().name,
                remaining
            );
            Ok(next.run(request).await)
        }
        Admission::Denied { retry_after } => Err(ApiError::AdmissionDenied {
            budget: gate.limiter.budget().name,
            retry_after,
        }),
    }
}

/// Client identity derived from the network origin
pub fn client_identity(request: &Request, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}
