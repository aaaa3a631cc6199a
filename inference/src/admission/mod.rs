//! Admission Controller — per (subject, operation) token buckets
//!
//! Governs how often the deep layer may actually run, independent of
//! whether the escalation policy wants it to. Cheap layers are never gated.
//!
//! # Environment Variables
//!
//! | Variable | Description |
//! |---|---|
//! | `RATE_LIMIT_<OP>_CAPACITY` | Bucket capacity for operation `<op>` |
//! | `RATE_LIMIT_<OP>_REFILL_PER_MINUTE` | Linear refill rate |
//! | `RATE_LIMIT_<OP>_COST` | Default cost per request |
//!
//! `<OP>` is the operation name uppercased (`DEEP_INFERENCE`), or `DEFAULT`
//! to tune the fallback applied to every unlisted operation.

pub mod bucket;
pub mod config;
pub mod controller;

pub use bucket::{AdmissionOutcome, TokenBucket};
pub use config::{RateLimitConfig, RateLimitPolicy};
pub use controller::{AdmissionController, SharedAdmissionController};
