//! Fixed base-credit table with an input-size step multiplier.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_CREDITS: u32 = 1;
pub const MAX_CREDITS: u32 = 100;

/// Characters per input token when estimating from a size hint.
const CHARS_PER_TOKEN: f64 = 4.0;

static OPERATION_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("OPERATION_ID regex should compile")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CostError {
    #[error("invalid operation type {0:?}: expected a non-empty identifier")]
    InvalidOperation(String),

    #[error("unknown operation type: {0}")]
    UnknownOperation(String),
}

pub type CostResult<T> = Result<T, CostError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditEstimate {
    /// Always within `[MIN_CREDITS, MAX_CREDITS]`
    pub credits: u32,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_tokens_estimate: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostEstimator {
    base_credits: BTreeMap<String, u32>,
}

impl Default for CostEstimator {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CostEstimator {
    /// Built-in table. Multi-signal and batch work cost more than a single
    /// sentiment call.
    pub fn builtin() -> Self {
        let base_credits = [
            ("sentiment_analysis", 1),
            ("heuristic_analysis", 1),
            ("fast_tier_prediction", 1),
            ("emotion_detection", 2),
            ("psychographic_analysis", 5),
            ("deep_inference", 10),
            ("multi_signal_analysis", 15),
            ("batch_analysis", 25),
        ]
        .into_iter()
        .map(|(op, credits)| (op.to_string(), credits))
        .collect();
        Self { base_credits }
    }

    /// Add or replace one operation's base cost.
    pub fn with_operation(mut self, operation: impl Into<String>, base_credits: u32) -> Self {
        self.base_credits.insert(operation.into(), base_credits);
        self
    }

    /// Known operations and their base credits.
    pub fn operations(&self) -> impl Iterator<Item = (&str, u32)> {
        self.base_credits.iter().map(|(op, c)| (op.as_str(), *c))
    }

    pub fn estimate(&self, operation: &str, input_size_hint: Option<u64>) -> CostResult<CreditEstimate> {
        if !OPERATION_ID.is_match(operation) {
            return Err(CostError::InvalidOperation(operation.to_string()));
        }
        let base = *self
            .base_credits
            .get(operation)
            .ok_or_else(|| CostError::UnknownOperation(operation.to_string()))?;

        let (credits, reasoning) = match input_size_hint {
            Some(size) => {
                let multiplier = size_multiplier(size);
                let scaled = (base as f64 * multiplier).ceil() as u32;
                let credits = scaled.clamp(MIN_CREDITS, MAX_CREDITS);
                (
                    credits,
                    format!(
                        "{operation}: base {base} x{multiplier:.1} for input size {size} = {credits} credits"
                    ),
                )
            }
            None => {
                let credits = base.clamp(MIN_CREDITS, MAX_CREDITS);
                (credits, format!("{operation}: base {base} = {credits} credits"))
            }
        };

        Ok(CreditEstimate {
            credits,
            reasoning,
            input_tokens_estimate: input_size_hint
                .map(|size| (size as f64 / CHARS_PER_TOKEN).ceil() as u64),
        })
    }
}

/// Step function over the input-size hint.
pub fn size_multiplier(size: u64) -> f64 {
    match size {
        0..=1_000 => 1.0,
        1_001..=5_000 => 1.5,
        5_001..=10_000 => 2.0,
        _ => 3.0,
    }
}
