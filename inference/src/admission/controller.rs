//! Concurrent bucket map keyed by `(subject, operation)`.
//!
//! Buckets are created lazily on first use and live for the life of the
//! controller. Refill-then-deduct for one key runs under that key's shard
//! lock, so two callers racing on the same subject and operation can never
//! both spend the last token. Unrelated keys do not share a lock.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use super::bucket::{AdmissionOutcome, TokenBucket};
use super::config::RateLimitPolicy;

pub type SharedAdmissionController = Arc<AdmissionController>;

#[derive(Debug, Default)]
pub struct AdmissionController {
    policy: RateLimitPolicy,
    buckets: DashMap<BucketKey, TokenBucket>,
}

/// `(subject_id, operation)`, kept as a pair so no separator can collide.
type BucketKey = (String, String);

fn bucket_key(subject_id: &str, operation: &str) -> BucketKey {
    (subject_id.to_string(), operation.to_string())
}

impl AdmissionController {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            buckets: DashMap::new(),
        }
    }

    /// Controller using the built-in policy tuned by `RATE_LIMIT_*` env vars.
    pub fn from_env() -> Self {
        Self::new(RateLimitPolicy::from_env())
    }

    pub fn shared(self) -> SharedAdmissionController {
        Arc::new(self)
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Try to spend `cost` (or the operation's default cost) right now.
    pub fn try_consume(
        &self,
        subject_id: &str,
        operation: &str,
        cost: Option<f64>,
    ) -> AdmissionOutcome {
        self.try_consume_at(subject_id, operation, cost, Utc::now())
    }

    /// [`Self::try_consume`] against an explicit clock reading.
    ///
    /// A negative or non-finite `cost` falls back to the operation default.
    pub fn try_consume_at(
        &self,
        subject_id: &str,
        operation: &str,
        cost: Option<f64>,
        now: DateTime<Utc>,
    ) -> AdmissionOutcome {
        let config = self.policy.for_operation(operation);
        let cost = cost
            .filter(|c| c.is_finite() && *c >= 0.0)
            .unwrap_or(config.cost_per_request);

        let mut bucket = self
            .buckets
            .entry(bucket_key(subject_id, operation))
            .or_insert_with(|| {
                TokenBucket::new(config.capacity, config.refill_rate_per_minute, now)
            });
        let outcome = bucket.try_consume(cost, now);
        drop(bucket);

        if outcome.allowed {
            debug!(
                subject_id,
                operation,
                cost,
                remaining = outcome.remaining_tokens,
                "admission granted"
            );
        } else {
            debug!(
                subject_id,
                operation,
                cost,
                retry_after = ?outcome.retry_after_seconds,
                "admission denied"
            );
        }
        outcome
    }

    /// Current standing without consuming. Unknown keys report a full bucket
    /// and are not created.
    pub fn status(&self, subject_id: &str, operation: &str) -> AdmissionOutcome {
        self.status_at(subject_id, operation, Utc::now())
    }

    pub fn status_at(
        &self,
        subject_id: &str,
        operation: &str,
        now: DateTime<Utc>,
    ) -> AdmissionOutcome {
        match self.buckets.get_mut(&bucket_key(subject_id, operation)) {
            Some(mut bucket) => bucket.peek(now),
            None => {
                let config = self.policy.for_operation(operation);
                TokenBucket::new(config.capacity, config.refill_rate_per_minute, now).peek(now)
            }
        }
    }

    /// Drop one bucket; the next access starts full. Returns whether it existed.
    pub fn reset(&self, subject_id: &str, operation: &str) -> bool {
        self.buckets
            .remove(&bucket_key(subject_id, operation))
            .is_some()
    }

    /// Number of live buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}
