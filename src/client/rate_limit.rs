//! Fixed-window admission gate with a punitive block period.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::warn;

use super::clock::{Clock, SystemClock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Admissions allowed per window.
    pub max_requests: u32,
    pub window: Duration,
    /// How long an identity stays rejected after exceeding the window.
    pub block_duration: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60),
            block_duration: Duration::from_secs(5 * 60),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RateLimitEntry {
    count: u32,
    window_reset_at: DateTime<Utc>,
    blocked_until: Option<DateTime<Utc>>,
}

impl RateLimitEntry {
    fn is_blocked_at(&self, now: DateTime<Utc>) -> bool {
        self.blocked_until.is_some_and(|until| now < until)
    }

    fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.window_reset_at && !self.is_blocked_at(now)
    }
}

/// Per-identity request counter.
///
/// Check and update happen under one lock, so no more than
/// `max_requests` calls are admitted per window even under contention.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, RateLimitEntry>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Record one attempt for `identity` and return whether it is admitted.
    pub fn is_allowed(&self, identity: &str) -> bool {
        let now = self.clock.now();
        let mut entries = self.lock();
        entries.retain(|_, entry| !entry.is_stale_at(now));

        let Some(entry) = entries.get_mut(identity) else {
            entries.insert(identity.to_owned(), self.fresh_window(now));
            return true;
        };

        if entry.is_blocked_at(now) {
            return false;
        }
        if now >= entry.window_reset_at {
            *entry = self.fresh_window(now);
            return true;
        }
        if entry.count >= self.config.max_requests {
            entry.blocked_until = Some(after(now, self.config.block_duration));
            warn!(
                max_requests = self.config.max_requests,
                block_secs = self.config.block_duration.as_secs(),
                "rate limit exceeded, blocking identity"
            );
            return false;
        }
        entry.count += 1;
        true
    }

    /// Admissions left for `identity` in its current window (`0` while blocked).
    pub fn remaining(&self, identity: &str) -> u32 {
        let now = self.clock.now();
        let entries = self.lock();
        match entries.get(identity) {
            Some(entry) if entry.is_blocked_at(now) => 0,
            Some(entry) if now < entry.window_reset_at => {
                self.config.max_requests.saturating_sub(entry.count)
            }
            _ => self.config.max_requests,
        }
    }

    /// Forget the window and any block for `identity`.
    pub fn reset(&self, identity: &str) {
        self.lock().remove(identity);
    }

    pub fn reset_all(&self) {
        self.lock().clear();
    }

    fn fresh_window(&self, now: DateTime<Utc>) -> RateLimitEntry {
        RateLimitEntry {
            count: 1,
            window_reset_at: after(now, self.config.window),
            blocked_until: None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RateLimitEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn after(now: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|duration| now.checked_add_signed(duration))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::client::clock::ManualClock;

    fn limiter(max_requests: u32, clock: &ManualClock) -> RateLimiter {
        RateLimiter::with_clock(
            RateLimitConfig {
                max_requests,
                window: Duration::from_secs(60),
                block_duration: Duration::from_secs(300),
            },
            Arc::new(clock.clone()),
        )
    }

    #[test]
    fn fourth_call_is_rejected_and_blocks() {
        let clock = ManualClock::at(1_700_000_000);
        let limiter = limiter(3, &clock);

        let admitted: Vec<bool> = (0..4).map(|_| limiter.is_allowed("x")).collect();
        assert_eq!(admitted, [true, true, true, false]);
        assert!(!limiter.is_allowed("x"));
        assert_eq!(limiter.remaining("x"), 0);
    }

    #[test]
    fn block_outlives_window_reset() {
        let clock = ManualClock::at(1_700_000_000);
        let limiter = limiter(1, &clock);
        assert!(limiter.is_allowed("x"));
        assert!(!limiter.is_allowed("x"));

        clock.advance(chrono::Duration::seconds(61));
        assert!(!limiter.is_allowed("x"), "still blocked after window reset");

        clock.advance(chrono::Duration::seconds(300));
        assert!(limiter.is_allowed("x"));
    }

    #[test]
    fn window_expiry_starts_a_fresh_count() {
        let clock = ManualClock::at(1_700_000_000);
        let limiter = limiter(2, &clock);
        assert!(limiter.is_allowed("x"));
        assert!(limiter.is_allowed("x"));
        assert_eq!(limiter.remaining("x"), 0);

        clock.advance(chrono::Duration::seconds(60));
        assert_eq!(limiter.remaining("x"), 2);
        assert!(limiter.is_allowed("x"));
        assert_eq!(limiter.remaining("x"), 1);
    }

    #[test]
    fn identities_are_independent_and_resettable() {
        let clock = ManualClock::at(1_700_000_000);
        let limiter = limiter(1, &clock);
        assert!(limiter.is_allowed("a"));
        assert!(!limiter.is_allowed("a"));
        assert!(limiter.is_allowed("b"));

        limiter.reset("a");
        assert!(limiter.is_allowed("a"));

        limiter.reset_all();
        assert_eq!(limiter.remaining("a"), 1);
        assert_eq!(limiter.remaining("b"), 1);
    }

    proptest! {
        #[test]
        fn admissions_never_exceed_ceiling(max in 1u32..20, calls in 0usize..60) {
            let clock = ManualClock::at(1_700_000_000);
            let limiter = limiter(max, &clock);
            let admitted = (0..calls).filter(|_| limiter.is_allowed("k")).count();
            prop_assert_eq!(admitted, calls.min(max as usize));
        }
    }
}
