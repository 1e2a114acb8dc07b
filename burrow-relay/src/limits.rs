//! Rate limiting for burrow-relay.
//!
//! A challenge-response handshake invites online guessing, so `auth` and
//! `connect` are limited per account name. All tunnel endpoints additionally
//! share a global per-second limit.

use crate::config::LimitsConfig;
use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Type alias for a keyed rate limiter using DashMap.
type KeyedLimiter<K> = RateLimiter<
    K,
    dashmap::DashMap<K, InMemoryState>,
    DefaultClock,
    NoOpMiddleware<governor::clock::QuantaInstant>,
>;

/// Type alias for a direct (non-keyed) rate limiter.
type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Rate limiters for the relay server.
#[derive(Clone)]
pub struct RateLimits {
    /// Limits `auth` + `connect` requests per account name.
    account_limiter: Arc<KeyedLimiter<String>>,

    /// Global rate limiter across all clients and endpoints.
    global_limiter: Arc<DirectLimiter>,
}

impl std::fmt::Debug for RateLimits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimits")
            .field("account_limiter", &"KeyedLimiter<String>")
            .field("global_limiter", &"DirectLimiter")
            .finish()
    }
}

impl RateLimits {
    /// Create rate limiters from configuration.
    ///
    /// Zero values are treated as 1.
    pub fn new(config: &LimitsConfig) -> Self {
        let per_account = NonZeroU32::new(config.auth_per_minute).unwrap_or(NonZeroU32::MIN);
        let global_rps =
            NonZeroU32::new(config.global_requests_per_second).unwrap_or(NonZeroU32::MIN);

        Self {
            account_limiter: Arc::new(RateLimiter::keyed(Quota::per_minute(per_account))),
            global_limiter: Arc::new(RateLimiter::direct(Quota::per_second(global_rps))),
        }
    }

    /// Check if a handshake request for `account` is allowed.
    pub fn check_account(&self, account: &str) -> Result<(), RateLimitError> {
        self.account_limiter
            .check_key(&account.to_string())
            .map_err(|_| RateLimitError::AccountLimitExceeded)
    }

    /// Check if the global request rate is within limits.
    pub fn check_global(&self) -> Result<(), RateLimitError> {
        self.global_limiter
            .check()
            .map_err(|_| RateLimitError::GlobalLimitExceeded)
    }

    /// Get the number of tracked account keys (for metrics).
    pub fn account_keys_count(&self) -> usize {
        self.account_limiter.len()
    }

    /// Evict entries whose quota has fully recharged. Call from the cleanup task.
    pub fn shrink(&self) {
        self.account_limiter.retain_recent();
    }
}

/// Rate limit error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitError {
    /// Too many handshake requests for this account.
    AccountLimitExceeded,
    /// Global request rate exceeded across all clients.
    GlobalLimitExceeded,
}

impl std::fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AccountLimitExceeded => {
                write!(f, "account rate limit exceeded")
            }
            Self::GlobalLimitExceeded => {
                write!(f, "global rate limit exceeded")
            }
        }
    }
}

impl std::error::Error for RateLimitError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(auth_per_minute: u32, global_requests_per_second: u32) -> LimitsConfig {
        LimitsConfig {
            auth_per_minute,
            global_requests_per_second,
        }
    }

    #[test]
    fn create_rate_limits() {
        let limits = RateLimits::new(&LimitsConfig::default());
        assert_eq!(limits.account_keys_count(), 0);
    }

    #[test]
    fn account_limit_allows_within_quota() {
        let limits = RateLimits::new(&config(5, 1000));

        // First 5 should succeed
        for _ in 0..5 {
            assert!(limits.check_account("alice").is_ok());
        }

        // 6th should fail
        assert_eq!(
            limits.check_account("alice"),
            Err(RateLimitError::AccountLimitExceeded)
        );
    }

    #[test]
    fn different_accounts_have_independent_limits() {
        let limits = RateLimits::new(&config(2, 1000));

        assert!(limits.check_account("alice").is_ok());
        assert!(limits.check_account("alice").is_ok());
        assert!(limits.check_account("alice").is_err());

        // Bob still has full quota
        assert!(limits.check_account("bob").is_ok());
        assert!(limits.check_account("bob").is_ok());
        assert!(limits.check_account("bob").is_err());
    }

    #[test]
    fn global_rate_limiter_rejects_excess() {
        let limits = RateLimits::new(&config(100, 5));

        for _ in 0..5 {
            assert!(limits.check_global().is_ok());
        }

        assert_eq!(
            limits.check_global(),
            Err(RateLimitError::GlobalLimitExceeded)
        );
    }

    #[test]
    fn zero_quota_is_clamped_to_one() {
        let limits = RateLimits::new(&config(0, 0));
        assert!(limits.check_account("alice").is_ok());
        assert!(limits.check_account("alice").is_err());
        assert!(limits.check_global().is_ok());
    }

    #[test]
    fn rate_limit_error_display() {
        assert_eq!(
            RateLimitError::AccountLimitExceeded.to_string(),
            "account rate limit exceeded"
        );
        assert_eq!(
            RateLimitError::GlobalLimitExceeded.to_string(),
            "global rate limit exceeded"
        );
    }

    #[test]
    fn shrink_does_not_panic() {
        let limits = RateLimits::new(&LimitsConfig::default());
        let _ = limits.check_account("alice");
        let _ = limits.check_account("bob");
        assert!(limits.account_keys_count() > 0);

        // Freshly used entries may or may not be evicted depending on timing.
        limits.shrink();
    }
}
