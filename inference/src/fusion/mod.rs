//! Fusion Engine — confidence-weighted voting across layers
//!
//! Each layer "votes" for the value it reported per indicator key,
//! weighted by its confidence. The heaviest
//! value wins; on equal weight the value seen first (heuristic, then fast
//! tier, then deep) is kept.

pub mod engine;

pub use engine::{FusedProfile, FusionEngine, MAX_FUSED_CONFIDENCE, MIN_FUSED_CONFIDENCE};
