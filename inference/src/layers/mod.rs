//! Inference layers and the shape they all share.
//!
//! Every layer, cheap or expensive, reports a [`LayerOutput`]. Escalation and
//! fusion only ever look at that shape, never at which layer produced it.
//!
//! ```text
//! Heuristic (external, opaque) ─┐
//! FastTier  (ml@v1-lite)       ─┼─► LayerOutput ─► escalation / fusion
//! Deep      (external, gated)  ─┘
//! ```

pub mod deep;
pub mod fast_tier;
pub mod heuristic;
pub mod types;

pub use deep::{DeepLayer, DeepLayerError, DeepRequest, StaticDeepLayer};
pub use fast_tier::{FastTierPredictor, FAST_TIER_MODEL_ID};
pub use heuristic::HeuristicProxy;
pub use types::{
    Indicator, IndicatorKey, IndicatorValue, InferenceLayer, LayerKind, LayerOutput,
    TRACKED_KEYS,
};
