//! Lazily refilled token bucket.
//!
//! There is no background timer. Every access first refills linearly for the
//! time elapsed since the last access, then clamps to `[0, capacity]`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Result of an admission attempt or status probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionOutcome {
    pub allowed: bool,
    /// Whole tokens left after this attempt.
    pub remaining_tokens: u64,
    /// Seconds until the requested cost becomes affordable (denials only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
    /// Wall-clock time the request becomes affordable (denials only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_at: Option<DateTime<Utc>>,
}

impl AdmissionOutcome {
    /// Outcome used when rate limiting is switched off.
    pub fn unlimited() -> Self {
        Self {
            allowed: true,
            remaining_tokens: u64::MAX,
            retry_after_seconds: None,
            reset_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBucket {
    capacity: f64,
    refill_rate_per_minute: f64,
    tokens: f64,
    last_refill: DateTime<Utc>,
}

impl TokenBucket {
    /// A full bucket.
    pub fn new(capacity: f64, refill_rate_per_minute: f64, now: DateTime<Utc>) -> Self {
        Self {
            capacity,
            refill_rate_per_minute,
            tokens: capacity,
            last_refill: now,
        }
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn refill_rate_per_minute(&self) -> f64 {
        self.refill_rate_per_minute
    }

    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    /// Add tokens for the time elapsed since the last refill.
    ///
    /// A clock that moves backwards adds nothing and does not rewind
    /// `last_refill`.
    pub fn refill(&mut self, now: DateTime<Utc>) {
        let elapsed = now - self.last_refill;
        // num_nanoseconds overflows past ~292 years.
        let elapsed_minutes = match elapsed.num_nanoseconds() {
            Some(ns) => ns as f64 / 60e9,
            None => elapsed.num_milliseconds() as f64 / 60_000.0,
        };
        if elapsed_minutes > 0.0 {
            self.tokens += elapsed_minutes * self.refill_rate_per_minute;
            self.last_refill = now;
        }
        self.tokens = self.tokens.clamp(0.0, self.capacity);
    }

    /// Refill, then deduct `cost` if affordable.
    ///
    /// A denied attempt leaves the token count untouched. A cost above
    /// capacity can never be granted and reports `u64::MAX` retry with no
    /// `reset_at`, the same as a bucket that never refills.
    pub fn try_consume(&mut self, cost: f64, now: DateTime<Utc>) -> AdmissionOutcome {
        self.refill(now);

        if self.tokens >= cost {
            self.tokens -= cost;
            return AdmissionOutcome {
                allowed: true,
                remaining_tokens: self.whole_tokens(),
                retry_after_seconds: None,
                reset_at: None,
            };
        }

        let retry = self.retry_after_seconds(cost);
        AdmissionOutcome {
            allowed: false,
            remaining_tokens: self.whole_tokens(),
            retry_after_seconds: Some(retry),
            reset_at: i64::try_from(retry)
                .ok()
                .and_then(Duration::try_seconds)
                .and_then(|d| now.checked_add_signed(d)),
        }
    }

    /// Refill and report without consuming.
    pub fn peek(&mut self, now: DateTime<Utc>) -> AdmissionOutcome {
        self.refill(now);
        AdmissionOutcome {
            allowed: self.tokens >= 1.0,
            remaining_tokens: self.whole_tokens(),
            retry_after_seconds: None,
            reset_at: None,
        }
    }

    /// `ceil(60 · (cost − tokens) / rate)`. A zero rate never refills.
    fn retry_after_seconds(&self, cost: f64) -> u64 {
        if self.refill_rate_per_minute <= 0.0 || cost > self.capacity {
            return u64::MAX;
        }
        let deficit = (cost - self.tokens).max(0.0);
        (60.0 * deficit / self.refill_rate_per_minute).ceil() as u64
    }

    fn whole_tokens(&self) -> u64 {
        self.tokens.floor() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_drain_then_reject() {
        let mut b = TokenBucket::new(60.0, 1.0, t0());
        for _ in 0..60 {
            assert!(b.try_consume(1.0, t0()).allowed);
        }
        let denied = b.try_consume(1.0, t0());
        assert!(!denied.allowed);
        assert_eq!(denied.remaining_tokens, 0);
        assert_eq!(denied.retry_after_seconds, Some(60));
        assert_eq!(denied.reset_at, Some(t0() + Duration::seconds(60)));
    }

    #[test]
    fn test_one_unit_returns_after_refill_interval() {
        let mut b = TokenBucket::new(10.0, 0.5, t0());
        for _ in 0..10 {
            assert!(b.try_consume(1.0, t0()).allowed);
        }
        // 60 / 0.5 = 120s per token
        assert!(!b.try_consume(1.0, t0() + Duration::seconds(119)).allowed);
        assert!(b.try_consume(1.0, t0() + Duration::seconds(120)).allowed);
        assert!(!b.try_consume(1.0, t0() + Duration::seconds(120)).allowed);
    }

    #[test]
    fn test_frequent_refills_match_one_long_refill() {
        let mut polled = TokenBucket::new(5.0, 1.0, t0());
        let mut idle = TokenBucket::new(5.0, 1.0, t0());
        polled.try_consume(5.0, t0());
        idle.try_consume(5.0, t0());

        // 1.9 ms steps for one minute
        let step = Duration::microseconds(1_900);
        let mut t = t0();
        while t + step <= t0() + Duration::seconds(60) {
            t += step;
            polled.peek(t);
        }
        polled.peek(t0() + Duration::seconds(60));
        idle.peek(t0() + Duration::seconds(60));

        assert!((polled.tokens() - idle.tokens()).abs() < 1e-6);
        assert!((idle.tokens() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cost_above_capacity_never_resets() {
        let mut b = TokenBucket::new(5.0, 1.0, t0());
        let denied = b.try_consume(6.0, t0());
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after_seconds, Some(u64::MAX));
        assert_eq!(denied.reset_at, None);
        assert_eq!(b.tokens(), 5.0);
    }

    #[test]
    fn test_denial_does_not_deduct() {
        let mut b = TokenBucket::new(5.0, 1.0, t0());
        assert!(b.try_consume(3.0, t0()).allowed);
        let denied = b.try_consume(4.0, t0());
        assert!(!denied.allowed);
        assert_eq!(b.tokens(), 2.0);
        // deficit 2 tokens at 1/min
        assert_eq!(denied.retry_after_seconds, Some(120));
    }

    #[test]
    fn test_refill_clamps_to_capacity() {
        let mut b = TokenBucket::new(5.0, 1.0, t0());
        b.try_consume(5.0, t0());
        b.refill(t0() + Duration::hours(3));
        assert_eq!(b.tokens(), 5.0);
    }

    #[test]
    fn test_backwards_clock_adds_nothing() {
        let mut b = TokenBucket::new(5.0, 1.0, t0());
        b.try_consume(5.0, t0());
        b.refill(t0() - Duration::minutes(10));
        assert_eq!(b.tokens(), 0.0);
        b.refill(t0() + Duration::minutes(2));
        assert_eq!(b.tokens(), 2.0);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut b = TokenBucket::new(3.0, 1.0, t0());
        let s = b.peek(t0());
        assert!(s.allowed);
        assert_eq!(s.remaining_tokens, 3);
        assert_eq!(b.tokens(), 3.0);
    }

    #[test]
    fn test_zero_rate_never_recovers() {
        let mut b = TokenBucket::new(1.0, 0.0, t0());
        assert!(b.try_consume(1.0, t0()).allowed);
        let denied = b.try_consume(1.0, t0() + Duration::days(1));
        assert_eq!(denied.retry_after_seconds, Some(u64::MAX));
        assert_eq!(denied.reset_at, None);
    }
}
