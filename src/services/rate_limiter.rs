//! Fixed-window admission control.
//!
//! Counters are keyed by `(principal, route, window)`. The increment and the
//! ceiling comparison happen while holding the map entry's shard lock, so
//! concurrent requests for the same key observe a linear sequence of counts
//! and can never overshoot the ceiling.
//!
//! Counters live in process memory: they reset on restart and expire as their
//! window elapses. [`RateLimiter::spawn_janitor`] drops expired counters so
//! memory does not grow with the number of distinct principals.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::debug;

const MINUTE: Duration = Duration::from_secs(60);

/// Routes with their own admission policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Register,
    Login,
    Refresh,
    HistoryRead,
    HistoryDeleteAll,
    HistoryDeleteOne,
    Predict,
    FoodLookup,
    /// Any route without a dedicated policy
    Default,
}

/// A ceiling over a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub ceiling: u32,
    pub window: Duration,
}

impl Quota {
    pub const fn per_minute(ceiling: u32) -> Self {
        Self {
            ceiling,
            window: MINUTE,
        }
    }

    pub const fn new(ceiling: u32, window: Duration) -> Self {
        Self { ceiling, window }
    }
}

impl Route {
    /// Quota for this route given the caller's authentication state.
    ///
    /// `None` means no admission check applies: routes that require
    /// authentication leave anonymous callers to the auth check.
    pub fn quota(self, authenticated: bool) -> Option<Quota> {
        match (self, authenticated) {
            (Route::Register, _) => Some(Quota::per_minute(5)),
            (Route::Login, _) => Some(Quota::per_minute(10)),
            (Route::Refresh, _) => Some(Quota::per_minute(20)),
            (Route::HistoryRead, true) => Some(Quota::per_minute(30)),
            (Route::HistoryDeleteAll, true) => Some(Quota::per_minute(5)),
            (Route::HistoryDeleteOne, true) => Some(Quota::per_minute(20)),
            (Route::HistoryRead | Route::HistoryDeleteAll | Route::HistoryDeleteOne, false) => {
                None
            }
            (Route::Predict, false) => Some(Quota::new(5, 10 * MINUTE)),
            (Route::Predict, true) => Some(Quota::new(30, 10 * MINUTE)),
            (Route::FoodLookup, _) => Some(Quota::per_minute(60)),
            (Route::Default, _) => Some(Quota::new(200, 60 * MINUTE)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Route::Register => "register",
            Route::Login => "login",
            Route::Refresh => "refresh",
            Route::HistoryRead => "history_read",
            Route::HistoryDeleteAll => "history_delete_all",
            Route::HistoryDeleteOne => "history_delete_one",
            Route::Predict => "predict",
            Route::FoodLookup => "food_lookup",
            Route::Default => "default",
        }
    }
}

/// Who a request is counted against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Principal {
    User(String),
    Ip(String),
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Principal::User(name) => write!(f, "user:{name}"),
            Principal::Ip(addr) => write!(f, "ip:{addr}"),
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CounterKey {
    principal: Principal,
    route: Route,
    window: Duration,
}

#[derive(Debug)]
struct WindowCounter {
    started: Instant,
    count: u32,
}

/// In-memory fixed-window rate limiter.
#[derive(Debug, Default)]
pub struct RateLimiter {
    counters: DashMap<CounterKey, WindowCounter>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request for `(principal, route, quota.window)`.
    ///
    /// Admitted when the count before this request is below the ceiling.
    /// Rejected requests are not counted.
    pub fn check_and_consume(&self, principal: &Principal, route: Route, quota: Quota) -> Admission {
        self.check_and_consume_at(principal, route, quota, Instant::now())
    }

    pub(crate) fn check_and_consume_at(
        &self,
        principal: &Principal,
        route: Route,
        quota: Quota,
        now: Instant,
    ) -> Admission {
        let key = CounterKey {
            principal: principal.clone(),
            route,
            window: quota.window,
        };

        let mut counter = self.counters.entry(key).or_insert_with(|| WindowCounter {
            started: now,
            count: 0,
        });

        let elapsed = now.saturating_duration_since(counter.started);
        if elapsed >= quota.window {
            counter.started = now;
            counter.count = 0;
        }

        if counter.count < quota.ceiling {
            counter.count += 1;
            Admission::Allowed {
                remaining: quota.ceiling - counter.count,
            }
        } else {
            let retry_after = quota
                .window
                .saturating_sub(now.saturating_duration_since(counter.started));
            debug!(
                principal = %principal,
                route = route.as_str(),
                ceiling = quota.ceiling,
                "rate limit exceeded"
            );
            Admission::Limited { retry_after }
        }
    }

    /// Drop counters whose window has elapsed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    fn purge_expired_at(&self, now: Instant) -> usize {
        let before = self.counters.len();
        self.counters
            .retain(|key, counter| now.saturating_duration_since(counter.started) < key.window);
        before.saturating_sub(self.counters.len())
    }

    /// Number of live counters.
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Periodically purge expired counters in the background.
    pub fn spawn_janitor(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let purged = limiter.purge_expired();
                if purged > 0 {
                    debug!(purged, remaining = limiter.len(), "purged expired rate limit counters");
                }
            }
        })
    }
}
