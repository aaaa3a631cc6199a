//! Weighted vote per `(key, value)` pair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::layers::{Indicator, IndicatorKey, IndicatorValue, LayerKind, LayerOutput};

pub const MIN_FUSED_CONFIDENCE: f64 = 0.1;
pub const MAX_FUSED_CONFIDENCE: f64 = 1.0;

/// Weight used when neither the indicator nor its layer carries a usable
/// confidence.
const FALLBACK_WEIGHT: f64 = 0.5;

/// Result of combining one to three layer outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedProfile {
    /// One indicator per key, in first-seen order. Confidence is the
    /// normalized vote weight, never a raw layer confidence.
    pub indicators: Vec<Indicator>,
    pub explanation: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub layers_used: Vec<LayerKind>,
}

impl FusedProfile {
    pub fn indicator(&self, key: &IndicatorKey) -> Option<&Indicator> {
        self.indicators.iter().find(|i| &i.key == key)
    }

    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }

    /// Nest indicators into a JSON document by dotted key.
    ///
    /// `emotional_state.mood` becomes `{"emotional_state": {"mood": ...}}`.
    /// A later key that would descend through an existing leaf replaces it.
    pub fn to_profile_json(&self) -> serde_json::Value {
        let mut root = serde_json::Map::new();
        'indicators: for indicator in &self.indicators {
            let segments: Vec<&str> = indicator.key.segments().collect();
            let Some((leaf, parents)) = segments.split_last() else {
                continue;
            };
            let mut node = &mut root;
            for segment in parents {
                let child = node
                    .entry(segment.to_string())
                    .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
                if !child.is_object() {
                    *child = serde_json::Value::Object(serde_json::Map::new());
                }
                let Some(map) = child.as_object_mut() else {
                    continue 'indicators;
                };
                node = map;
            }
            node.insert(leaf.to_string(), indicator.value.to_json());
        }
        serde_json::Value::Object(root)
    }
}

/// One accumulated vote.
struct Tally {
    key: IndicatorKey,
    value: IndicatorValue,
    weight: f64,
}

#[derive(Debug, Clone, Default)]
pub struct FusionEngine;

impl FusionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Fuse whatever layers produced output. `None` entries are skipped.
    pub fn fuse(&self, layers: &[Option<&LayerOutput>]) -> FusedProfile {
        self.fuse_at(layers, Utc::now())
    }

    pub fn fuse_at(&self, layers: &[Option<&LayerOutput>], now: DateTime<Utc>) -> FusedProfile {
        let present: Vec<&LayerOutput> = layers.iter().flatten().copied().collect();

        if present.is_empty() {
            return FusedProfile {
                indicators: Vec::new(),
                explanation: "No inference layers produced output; profile left empty".to_string(),
                updated_at: now,
                layers_used: Vec::new(),
            };
        }

        // Linear scan keeps accumulation order stable; layer counts are tiny.
        let mut tallies: Vec<Tally> = Vec::new();
        for layer in &present {
            let layer_weight = if layer.confidence.is_finite() {
                layer.confidence
            } else {
                FALLBACK_WEIGHT
            };
            for indicator in &layer.indicators {
                let weight = indicator.finite_confidence().unwrap_or(layer_weight);
                match tallies
                    .iter_mut()
                    .find(|t| t.key == indicator.key && t.value == indicator.value)
                {
                    Some(tally) => tally.weight += weight,
                    None => tallies.push(Tally {
                        key: indicator.key.clone(),
                        value: indicator.value.clone(),
                        weight,
                    }),
                }
            }
        }

        let layer_count = present.len() as f64;
        let mut indicators: Vec<Indicator> = Vec::new();
        let mut winners: Vec<&Tally> = Vec::new();
        for tally in &tallies {
            match winners.iter_mut().find(|w| w.key == tally.key) {
                // Strictly greater only: the first maximal entry keeps ties.
                Some(best) if tally.weight > best.weight => *best = tally,
                Some(_) => {}
                None => winners.push(tally),
            }
        }
        for winner in winners {
            let confidence =
                (winner.weight / layer_count).clamp(MIN_FUSED_CONFIDENCE, MAX_FUSED_CONFIDENCE);
            indicators.push(Indicator {
                key: winner.key.clone(),
                value: winner.value.clone(),
                confidence: Some(confidence),
            });
        }

        let layers_used: Vec<LayerKind> = present.iter().map(|l| l.layer).collect();
        let names: Vec<String> = present
            .iter()
            .map(|l| format!("{} ({})", l.layer, l.model_id))
            .collect();
        let explanation = format!(
            "Fused {} indicator(s) from {} layer(s): {}",
            indicators.len(),
            present.len(),
            names.join(", ")
        );

        debug!(
            layers = present.len(),
            indicators = indicators.len(),
            "fusion complete"
        );

        FusedProfile {
            indicators,
            explanation,
            updated_at: now,
            layers_used,
        }
    }
}
