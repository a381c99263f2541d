//! Rate-limit record - progressive failure counter per (identifier, endpoint).

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// One row per (identifier, endpoint) pair.
///
/// A still-future `blocked_until_utc` overrides the counter: the record is
/// blocked no matter what `fail_count` says.
#[derive(Debug, Clone, FromRow)]
pub struct RateLimitRecord {
    pub identifier: String,
    pub endpoint: String,
    pub fail_count: i64,
    pub last_attempt_utc: DateTime<Utc>,
    pub blocked_until_utc: Option<DateTime<Utc>>,
}

impl RateLimitRecord {
    pub fn is_blocked(&self, now: DateTime<Utc>) -> bool {
        matches!(self.blocked_until_utc, Some(until) if until > now)
    }

    /// Whole seconds until the block lifts, rounded up so a caller never
    /// retries a hair too early.
    pub fn retry_after_seconds(&self, now: DateTime<Utc>) -> Option<u64> {
        let until = self.blocked_until_utc?;
        if until <= now {
            return None;
        }
        let millis = (until - now).num_milliseconds().max(0) as u64;
        Some(millis.div_ceil(1000))
    }
}
