//! Progressive, store-backed rate limiter for the PIN verification gate.
//!
//! Unlike the in-process IP throttle in front of the router, this one counts
//! *failures* per (identifier, endpoint) in the record store, so the block
//! survives restarts and is shared by every worker. The check runs strictly
//! before any secret comparison so a brute-forcer pays nothing but the
//! lookup.

use chrono::{Duration, Utc};

use crate::models::RateLimitRecord;
use crate::services::database::Database;
use ethereal_core::error::AppError;

/// Outcome of a limiter consultation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Blocked { retry_after: u64 },
}

#[derive(Clone)]
pub struct ProgressiveRateLimiter {
    db: Database,
    max_failures: i64,
    block: Duration,
}

impl ProgressiveRateLimiter {
    pub fn new(db: Database, max_failures: i64, block_seconds: i64) -> Self {
        Self {
            db,
            max_failures,
            block: Duration::seconds(block_seconds),
        }
    }

    /// Consult the limiter before doing any verification work.
    ///
    /// A record with a future block is denied with the remaining seconds. A
    /// record whose block has lapsed gets its counter reset and is allowed.
    pub async fn check(&self, identifier: &str, endpoint: &str) -> Result<Decision, AppError> {
        let now = Utc::now();
        let Some(record) = self.db.find_rate_limit(identifier, endpoint).await? else {
            return Ok(Decision::Allowed);
        };

        if record.is_blocked(now) {
            return Ok(Decision::Blocked {
                retry_after: record.retry_after_seconds(now).unwrap_or(1),
            });
        }

        if record.blocked_until_utc.is_some() {
            // Block window lapsed; the slate is wiped.
            let reset = RateLimitRecord {
                fail_count: 0,
                last_attempt_utc: now,
                blocked_until_utc: None,
                ..record
            };
            self.db.upsert_rate_limit(&reset).await?;
        }

        Ok(Decision::Allowed)
    }

    /// Record a failed attempt; at the threshold the identifier is blocked
    /// for the configured window.
    pub async fn record_failure(
        &self,
        identifier: &str,
        endpoint: &str,
    ) -> Result<Decision, AppError> {
        let now = Utc::now();
        let current = self.db.find_rate_limit(identifier, endpoint).await?;

        let fail_count = current.as_ref().map(|r| r.fail_count).unwrap_or(0) + 1;
        let blocked_until_utc = if fail_count >= self.max_failures {
            Some(now + self.block)
        } else {
            None
        };

        let record = RateLimitRecord {
            identifier: identifier.to_string(),
            endpoint: endpoint.to_string(),
            fail_count,
            last_attempt_utc: now,
            blocked_until_utc,
        };
        self.db.upsert_rate_limit(&record).await?;

        match blocked_until_utc {
            Some(_) => {
                tracing::warn!(identifier, endpoint, fail_count, "identifier blocked");
                Ok(Decision::Blocked {
                    retry_after: record.retry_after_seconds(now).unwrap_or(1),
                })
            }
            None => Ok(Decision::Allowed),
        }
    }

    /// Forget an identifier entirely. Called on successful authentication so
    /// earlier typos never penalize a legitimate device.
    pub async fn clear(&self, identifier: &str, endpoint: &str) -> Result<(), AppError> {
        self.db.delete_rate_limit(identifier, endpoint).await
    }
}
