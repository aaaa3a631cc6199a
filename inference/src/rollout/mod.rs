//! Runtime flags that switch whole layers or behavior variants on and off
//! without redeploying logic.

pub mod feature_flags;

pub use feature_flags::{
    FeatureFlags, KnownFlag, FLAG_DEEP_LAYER, FLAG_ENV_PREFIX, FLAG_ESCALATION, FLAG_FAST_TIER,
    FLAG_HEURISTIC_LAYER, FLAG_RATE_LIMITING, FLAG_SEQ_EMBEDDING, KNOWN_FLAGS,
};
