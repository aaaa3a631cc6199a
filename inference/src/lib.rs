//! Psyche Inference Library
//!
//! Escalation and fusion core for layered psychographic inference:
//! - Feature extraction over a bounded window of behavioral events
//! - A deterministic fast-tier predictor and a proxy for externally produced
//!   heuristic output
//! - An escalation policy deciding when the expensive deep layer is worth it
//! - Per-subject token-bucket admission control and credit cost estimation
//! - Confidence-weighted fusion of every layer that ran into one profile
//!
//! # Data Flow
//!
//! ```text
//! events ─► extract_features ─► fast tier ─┐
//!                   heuristic (external) ──┼─► escalation ─► admission ─► deep
//!                                          └────────► fusion ◄─────────────┘
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Description |
//! |---|---|
//! | `FEATURE_FLAG_<NAME>` | `true` enables a flag, anything else disables it |
//! | `RATE_LIMIT_<OP>_*` | Per-operation bucket tuning, see [`admission`] |
//! | `PSYCHE_DEEP_TIMEOUT_SECS` | Upper bound on one deep-layer call (default 30) |

#![allow(clippy::uninlined_format_args)]

pub mod admission;
pub mod cost;
pub mod escalation;
pub mod events;
pub mod features;
pub mod fusion;
pub mod layers;
pub mod pipeline;
pub mod rollout;

// Re-export event types
pub use events::{Event, EventPayload, EventWindow, DEFAULT_WINDOW_CAPACITY};

// Re-export feature types
pub use features::{extract_features, make_seq_embedding, FeatureRecord, UrlCategory};

// Re-export layer types
pub use layers::{
    DeepLayer, DeepLayerError, DeepRequest, FastTierPredictor, HeuristicProxy, Indicator,
    IndicatorKey, IndicatorValue, InferenceLayer, LayerKind, LayerOutput, StaticDeepLayer,
};

// Re-export escalation types
pub use escalation::{EscalationConfig, EscalationDecision, EscalationPolicy, EscalationReasons};

// Re-export admission types
pub use admission::{
    AdmissionController, AdmissionOutcome, RateLimitConfig, RateLimitPolicy,
    SharedAdmissionController,
};

// Re-export cost types
pub use cost::{CostError, CostEstimator, CostResult, CreditEstimate};

// Re-export fusion types
pub use fusion::{FusedProfile, FusionEngine};

// Re-export rollout types
pub use rollout::FeatureFlags;

// Re-export pipeline types
pub use pipeline::{
    DeepStatus, PipelineConfig, PipelineOutcome, ProfilePipeline, ProfileRequest,
};
