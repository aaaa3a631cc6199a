//! Escalation Policy — decides whether the deep layer should run
//!
//! Three independent triggers, OR'd together:
//! - **high value**: pricing interest without purchase, a stalled checkout,
//!   or long dwell on pricing/product pages
//! - **disagree**: heuristic and fast tier report different values, or
//!   confidences far apart, for a tracked key
//! - **low confidence**: both cheap layers are unsure about a tracked key

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::events::Event;
use crate::features::{classify_url, is_checkout_complete, is_checkout_start, UrlCategory};
use crate::layers::{LayerOutput, TRACKED_KEYS};

/// Thresholds for the escalation triggers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationConfig {
    /// How many of the newest events the policy looks at
    pub lookback: usize,
    /// Pricing-page views (with no completed checkout) that count as high value
    pub pricing_view_threshold: u32,
    /// Minutes a checkout start may sit without completion
    pub stalled_checkout_minutes: i64,
    /// Cumulative pricing/product dwell, seconds
    pub dwell_threshold_secs: f64,
    /// Confidence gap between cheap layers that counts as disagreement
    pub disagreement_delta: f64,
    /// Both cheap layers below this for a key means low confidence
    pub low_confidence: f64,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            lookback: 20,
            pricing_view_threshold: 3,
            stalled_checkout_minutes: 10,
            dwell_threshold_secs: 120.0,
            disagreement_delta: 0.25,
            low_confidence: 0.55,
        }
    }
}

/// Which triggers fired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationReasons {
    pub high_value: bool,
    pub disagree: bool,
    pub low_conf: bool,
}

impl EscalationReasons {
    pub fn any(&self) -> bool {
        self.high_value || self.disagree || self.low_conf
    }

    /// Names of the triggers that fired, in a fixed order.
    pub fn fired(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.high_value {
            out.push("high_value");
        }
        if self.disagree {
            out.push("disagree");
        }
        if self.low_conf {
            out.push("low_conf");
        }
        out
    }
}

/// Decision produced by the policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationDecision {
    pub should_invoke: bool,
    pub reasons: EscalationReasons,
    /// Human-readable account of what fired
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct EscalationPolicy {
    config: EscalationConfig,
}

impl EscalationPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EscalationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EscalationConfig {
        &self.config
    }

    /// Decide whether the deep layer should run for this window.
    ///
    /// A missing cheap-layer output contributes neither disagreement nor
    /// low confidence.
    pub fn should_invoke(
        &self,
        events: &[Event],
        heuristic: Option<&LayerOutput>,
        fast_tier: Option<&LayerOutput>,
        now: DateTime<Utc>,
    ) -> EscalationDecision {
        let start = events.len().saturating_sub(self.config.lookback);
        let recent = &events[start..];

        let mut notes = Vec::new();
        let reasons = EscalationReasons {
            high_value: self.high_value(recent, now, &mut notes),
            disagree: self.disagree(heuristic, fast_tier, &mut notes),
            low_conf: self.low_conf(heuristic, fast_tier, &mut notes),
        };

        let reason = if notes.is_empty() {
            "cheap layers sufficient".to_string()
        } else {
            notes.join("; ")
        };

        debug!(
            lookback = recent.len(),
            high_value = reasons.high_value,
            disagree = reasons.disagree,
            low_conf = reasons.low_conf,
            "escalation evaluated"
        );

        EscalationDecision {
            should_invoke: reasons.any(),
            reasons,
            reason,
        }
    }

    fn high_value(&self, recent: &[Event], now: DateTime<Utc>, notes: &mut Vec<String>) -> bool {
        let mut pricing_views = 0u32;
        let mut completed = false;
        let mut latest_start: Option<&Event> = None;
        let mut focus_dwell = 0.0;

        for event in recent {
            let category = event.url().and_then(classify_url);
            if category == Some(UrlCategory::Pricing) {
                pricing_views += 1;
            }
            if matches!(category, Some(UrlCategory::Pricing | UrlCategory::Product)) {
                focus_dwell += event.duration_secs().unwrap_or(0.0);
            }
            if is_checkout_complete(&event.event_type) {
                completed = true;
            } else if is_checkout_start(&event.event_type) {
                latest_start = Some(event);
            }
        }

        let mut fired = false;

        if pricing_views >= self.config.pricing_view_threshold && !completed {
            notes.push(format!("{pricing_views} pricing views without purchase"));
            fired = true;
        }

        if let (Some(start), false) = (latest_start, completed) {
            // No usable timestamp counts as infinitely long ago.
            let stalled = match start.timestamp {
                Some(ts) => (now - ts).num_minutes() >= self.config.stalled_checkout_minutes,
                None => true,
            };
            if stalled {
                notes.push("checkout started but not completed".to_string());
                fired = true;
            }
        }

        if focus_dwell >= self.config.dwell_threshold_secs {
            notes.push(format!("{focus_dwell:.0}s dwell on pricing/product pages"));
            fired = true;
        }

        fired
    }

    fn disagree(
        &self,
        heuristic: Option<&LayerOutput>,
        fast_tier: Option<&LayerOutput>,
        notes: &mut Vec<String>,
    ) -> bool {
        let (Some(h), Some(f)) = (heuristic, fast_tier) else {
            return false;
        };

        let mut fired = false;
        for key in TRACKED_KEYS.iter() {
            let (Some(hi), Some(fi)) = (h.indicator(key), f.indicator(key)) else {
                continue;
            };
            let value_split = !hi.value.is_null() && !fi.value.is_null() && hi.value != fi.value;
            let conf_gap = match (h.confidence_for(key), f.confidence_for(key)) {
                (Some(a), Some(b)) => (a - b).abs() >= self.config.disagreement_delta,
                _ => false,
            };
            if value_split || conf_gap {
                notes.push(format!("layers disagree on {key}"));
                fired = true;
            }
        }
        fired
    }

    fn low_conf(
        &self,
        heuristic: Option<&LayerOutput>,
        fast_tier: Option<&LayerOutput>,
        notes: &mut Vec<String>,
    ) -> bool {
        let (Some(h), Some(f)) = (heuristic, fast_tier) else {
            return false;
        };

        let mut fired = false;
        for key in TRACKED_KEYS.iter() {
            if let (Some(a), Some(b)) = (h.confidence_for(key), f.confidence_for(key)) {
                if a < self.config.low_confidence && b < self.config.low_confidence {
                    notes.push(format!("low confidence on {key}"));
                    fired = true;
                }
            }
        }
        fired
    }
}
