//! Proxy for the externally owned heuristic layer.
//!
//! The heuristic producer runs outside this core. Its output is handed in
//! as-is and exposed through [`InferenceLayer`] so it is interchangeable
//! with the fast tier.

use crate::events::Event;
use crate::layers::types::{InferenceLayer, LayerKind, LayerOutput};

#[derive(Debug, Clone)]
pub struct HeuristicProxy {
    output: LayerOutput,
}

impl HeuristicProxy {
    /// Wrap an output produced by the external heuristic layer.
    ///
    /// The output is re-tagged as [`LayerKind::Heuristic`] regardless of what
    /// the producer wrote.
    pub fn from_output(mut output: LayerOutput) -> Self {
        output.layer = LayerKind::Heuristic;
        Self { output }
    }

    pub fn output(&self) -> &LayerOutput {
        &self.output
    }
}

impl InferenceLayer for HeuristicProxy {
    fn kind(&self) -> LayerKind {
        LayerKind::Heuristic
    }

    fn model_id(&self) -> &str {
        &self.output.model_id
    }

    fn infer(&self, _events: &[Event]) -> LayerOutput {
        self.output.clone()
    }
}
