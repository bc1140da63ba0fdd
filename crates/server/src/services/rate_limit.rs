//! Per-client throttle for the login-code exchange.
//!
//! Each client key keeps a request counter and the time of its last allowed
//! request. A client that has sent [`THRESHOLD`] requests and is still inside
//! the [`WINDOW`] is blocked until [`BLOCK`] has passed since that last
//! request. After more than [`BLOCK`] of silence the counter resets.
//!
//! This is a fixed-window counter with a cooldown, not a sliding window. A
//! client that spaces requests just over [`WINDOW`] apart keeps its count
//! without being blocked, and bursts that straddle a reset can exceed the
//! nominal rate. That is accepted behavior.

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Window in which the threshold applies.
pub const WINDOW: Duration = Duration::from_secs(10);

/// Requests allowed before blocking.
pub const THRESHOLD: u32 = 15;

/// Block length, and the idle time after which a client is forgotten.
pub const BLOCK: Duration = Duration::from_secs(60);

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    /// Rejected; retry after this long.
    Limited { retry_after: Duration },
}

#[derive(Debug, Clone, Copy)]
struct ClientState {
    count: u32,
    last_request: Instant,
}

/// Per-client rate limiter keyed by client address.
#[derive(Debug, Default)]
pub struct RateLimiter {
    clients: DashMap<String, ClientState>,
}

impl RateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check and record a request from `client_key` now.
    pub fn check(&self, client_key: &str) -> RateDecision {
        self.check_at(client_key, Instant::now())
    }

    /// Check and record a request from `client_key` at `now`.
    pub fn check_at(&self, client_key: &str, now: Instant) -> RateDecision {
        let mut entry = self
            .clients
            .entry(client_key.to_owned())
            .or_insert(ClientState {
                count: 0,
                last_request: now,
            });

        let elapsed = now.saturating_duration_since(entry.last_request);
        if elapsed > BLOCK {
            entry.count = 0;
        }

        if elapsed < WINDOW && entry.count >= THRESHOLD {
            let retry_after = (entry.last_request + BLOCK).saturating_duration_since(now);
            return RateDecision::Limited { retry_after };
        }

        entry.count += 1;
        entry.last_request = now;
        RateDecision::Allowed
    }

    /// Drop clients idle for longer than [`BLOCK`].
    pub fn prune(&self) {
        self.prune_at(Instant::now());
    }

    fn prune_at(&self, now: Instant) {
        self.clients
            .retain(|_, state| now.saturating_duration_since(state.last_request) <= BLOCK);
    }

    /// Number of tracked clients.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.clients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sixteenth_request_in_window_is_limited() {
        let limiter = RateLimiter::new();
        let start = Instant::now();

        for i in 0..THRESHOLD {
            let at = start + Duration::from_millis(u64::from(i) * 100);
            assert_eq!(limiter.check_at("1.2.3.4", at), RateDecision::Allowed);
        }

        let at = start + Duration::from_secs(2);
        match limiter.check_at("1.2.3.4", at) {
            RateDecision::Limited { retry_after } => {
                assert!(retry_after > Duration::ZERO);
                assert!(retry_after <= BLOCK);
            }
            RateDecision::Allowed => panic!("16th request should be limited"),
        }
    }

    #[test]
    fn test_retry_after_counts_from_last_allowed_request() {
        let limiter = RateLimiter::new();
        let start = Instant::now();
        for _ in 0..THRESHOLD {
            limiter.check_at("k", start);
        }

        let decision = limiter.check_at("k", start + Duration::from_secs(5));
        assert_eq!(
            decision,
            RateDecision::Limited {
                retry_after: Duration::from_secs(55)
            }
        );
    }

    #[test]
    fn test_counter_resets_after_block_of_silence() {
        let limiter = RateLimiter::new();
        let start = Instant::now();
        for _ in 0..THRESHOLD {
            limiter.check_at("k", start);
        }
        assert!(matches!(
            limiter.check_at("k", start + Duration::from_secs(1)),
            RateDecision::Limited { .. }
        ));

        let later = start + BLOCK + Duration::from_secs(1);
        for _ in 0..THRESHOLD {
            assert_eq!(limiter.check_at("k", later), RateDecision::Allowed);
        }
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = RateLimiter::new();
        let now = Instant::now();
        for _ in 0..THRESHOLD {
            limiter.check_at("a", now);
        }
        assert!(matches!(
            limiter.check_at("a", now),
            RateDecision::Limited { .. }
        ));
        assert_eq!(limiter.check_at("b", now), RateDecision::Allowed);
    }

    #[test]
    fn test_prune_drops_idle_clients() {
        let limiter = RateLimiter::new();
        let now = Instant::now();
        limiter.check_at("a", now);
        limiter.check_at("b", now + BLOCK);

        limiter.prune_at(now + BLOCK + Duration::from_secs(1));
        assert_eq!(limiter.tracked(), 1);
    }
}
