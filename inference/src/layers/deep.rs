//! Seam for the expensive deep-inference layer.
//!
//! The actual model call lives outside this crate. This module only defines
//! what the pipeline hands it and what it must hand back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::escalation::EscalationReasons;
use crate::events::Event;
use crate::features::FeatureRecord;
use crate::layers::types::{LayerKind, LayerOutput};

/// Errors a deep-layer implementation may report.
#[derive(Debug, Error)]
pub enum DeepLayerError {
    #[error("deep layer timed out after {0}s")]
    Timeout(u64),

    #[error("deep layer unavailable: {0}")]
    Unavailable(String),

    #[error("deep layer returned an unusable response: {0}")]
    InvalidResponse(String),
}

/// Everything the deep layer gets to see for one invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeepRequest {
    pub subject_id: String,
    pub events: Vec<Event>,
    pub features: FeatureRecord,
    pub reasons: EscalationReasons,
    /// Reserved sequence embedding, attached only when its flag is on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f64>>,
}

#[async_trait]
pub trait DeepLayer: Send + Sync {
    fn model_id(&self) -> &str;

    /// Run the expensive inference. May block for a long time; callers wrap
    /// it in a timeout.
    async fn infer(&self, request: &DeepRequest) -> Result<LayerOutput, DeepLayerError>;
}

/// Deep layer that replays a recorded output.
///
/// Used for offline runs and tests where the real model is not reachable.
#[derive(Debug, Clone)]
pub struct StaticDeepLayer {
    output: LayerOutput,
}

impl StaticDeepLayer {
    pub fn new(mut output: LayerOutput) -> Self {
        output.layer = LayerKind::Deep;
        Self { output }
    }
}

#[async_trait]
impl DeepLayer for StaticDeepLayer {
    fn model_id(&self) -> &str {
        &self.output.model_id
    }

    async fn infer(&self, _request: &DeepRequest) -> Result<LayerOutput, DeepLayerError> {
        Ok(self.output.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::types::{Indicator, IndicatorKey};

    #[tokio::test]
    async fn test_static_layer_replays_as_deep() {
        let layer = StaticDeepLayer::new(LayerOutput {
            layer: LayerKind::Heuristic,
            indicators: vec![Indicator::new(IndicatorKey::Mood, "calm", 0.9)],
            confidence: 0.9,
            model_id: "deep@replay".to_string(),
            summary: "recorded".to_string(),
        });
        let req = DeepRequest {
            subject_id: "s-1".to_string(),
            events: Vec::new(),
            features: FeatureRecord::default(),
            reasons: EscalationReasons::default(),
            embedding: None,
        };
        let out = layer.infer(&req).await.unwrap();
        assert_eq!(out.layer, LayerKind::Deep);
        assert_eq!(layer.model_id(), "deep@replay");
    }
}
