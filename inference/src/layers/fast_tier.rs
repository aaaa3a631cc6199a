//! Fast-tier predictor — calibrated, deterministic scoring over features.
//!
//! No I/O and no randomness: identical windows always produce identical
//! indicators. Thresholds below are fixed contract values.

use chrono::Utc;

use crate::events::Event;
use crate::features::{extract_features, FeatureRecord};
use crate::layers::types::{Indicator, IndicatorKey, InferenceLayer, LayerKind, LayerOutput};

pub const FAST_TIER_MODEL_ID: &str = "ml@v1-lite";

/// Derived scores the indicator rules are written against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedScores {
    pub activity: f64,
    pub intent: f64,
    pub friction: f64,
}

impl DerivedScores {
    pub fn from_features(f: &FeatureRecord) -> Self {
        let n_click = f.count("click") as f64;
        let n_scroll = f.count("scroll") as f64;
        let n_hover = f.count("hover") as f64;
        let completes = f.checkout_completes as f64;

        Self {
            activity: f.n_events as f64 + 0.5 * n_click + 0.25 * n_scroll,
            intent: 1.2 * f.pricing_views as f64
                + 0.8 * f.product_views as f64
                + 2.0 * f.checkout_starts as f64
                + 3.0 * completes,
            friction: 0.2 * n_hover + 0.01 * f.dwell_avg - 1.5 * completes,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FastTierPredictor;

impl FastTierPredictor {
    pub fn new() -> Self {
        Self
    }

    /// Score a raw window.
    pub fn predict(&self, events: &[Event]) -> LayerOutput {
        // `last_minutes` is the only time-dependent feature and no rule reads it.
        self.predict_features(&extract_features(events, Utc::now()))
    }

    /// Score an already-extracted feature record.
    pub fn predict_features(&self, f: &FeatureRecord) -> LayerOutput {
        let scores = DerivedScores::from_features(f);
        let indicators = vec![risk_profile(f), cognitive_style(f), mood(f, &scores)];
        let confidence = indicators
            .iter()
            .filter_map(|i| i.confidence)
            .sum::<f64>()
            / indicators.len() as f64;

        LayerOutput {
            layer: LayerKind::FastTier,
            indicators,
            confidence,
            model_id: FAST_TIER_MODEL_ID.to_string(),
            summary: format!(
                "activity={:.2} intent={:.2} friction={:.2}",
                scores.activity, scores.intent, scores.friction
            ),
        }
    }
}

impl InferenceLayer for FastTierPredictor {
    fn kind(&self) -> LayerKind {
        LayerKind::FastTier
    }

    fn model_id(&self) -> &str {
        FAST_TIER_MODEL_ID
    }

    fn infer(&self, events: &[Event]) -> LayerOutput {
        self.predict(events)
    }
}

fn risk_profile(f: &FeatureRecord) -> Indicator {
    let key = IndicatorKey::RiskProfile;
    if f.checkout_completes >= 1 || f.checkout_starts >= 2 {
        let conf = (0.6 + 0.15 * f.checkout_completes as f64).min(0.9);
        Indicator::new(key, "aggressive", conf)
    } else if f.pricing_views >= 2 && f.checkout_starts == 0 {
        let conf = (0.5 + 0.1 * f.pricing_views as f64).min(0.85);
        Indicator::new(key, "conservative", conf)
    } else {
        Indicator::new(key, "moderate", 0.55)
    }
}

fn cognitive_style(f: &FeatureRecord) -> Indicator {
    let key = IndicatorKey::CognitiveStyle;
    let product_lead = f.product_views as i64 - f.pricing_views as i64;
    if product_lead > 1 && f.count("scroll") > f.count("click") {
        Indicator::new(key, "intuitive", 0.6)
    } else if f.pricing_views >= 1 {
        Indicator::new(key, "analytical", 0.65)
    } else {
        Indicator::new(key, "analytical", 0.55)
    }
}

fn mood(f: &FeatureRecord, s: &DerivedScores) -> Indicator {
    let key = IndicatorKey::Mood;
    if s.intent >= 3.0 && s.friction < 0.2 {
        Indicator::new(key, "confident", 0.7)
    } else if s.friction > 1.5 && f.checkout_completes == 0 {
        Indicator::new(key, "anxious", 0.65)
    } else {
        Indicator::new(key, "neutral", 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(out: &LayerOutput, key: IndicatorKey) -> (String, f64) {
        let i = out.indicator(&key).unwrap();
        (
            i.value.as_label().unwrap().to_string(),
            i.confidence.unwrap(),
        )
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_empty_window_defaults() {
        let out = FastTierPredictor::new().predict(&[]);
        assert_eq!(out.model_id, "ml@v1-lite");
        assert_eq!(out.layer, LayerKind::FastTier);
        assert_eq!(label(&out, IndicatorKey::RiskProfile), ("moderate".into(), 0.55));
        assert_eq!(label(&out, IndicatorKey::CognitiveStyle), ("analytical".into(), 0.55));
        assert_eq!(label(&out, IndicatorKey::Mood), ("neutral".into(), 0.5));
        assert!(approx(out.confidence, (0.55 + 0.55 + 0.5) / 3.0));
    }

    #[test]
    fn test_three_pricing_views_is_conservative() {
        let events: Vec<Event> = (0..3).map(|_| Event::page_view("/pricing", None)).collect();
        let out = FastTierPredictor::new().predict(&events);
        let (value, conf) = label(&out, IndicatorKey::RiskProfile);
        assert_eq!(value, "conservative");
        assert!(approx(conf, 0.8));
        assert_eq!(label(&out, IndicatorKey::CognitiveStyle), ("analytical".into(), 0.65));
        // intent = 3.6, friction = 0 → confident
        assert_eq!(label(&out, IndicatorKey::Mood), ("confident".into(), 0.7));
    }

    #[test]
    fn test_conservative_confidence_capped() {
        let events: Vec<Event> = (0..9).map(|_| Event::page_view("/pricing", None)).collect();
        let out = FastTierPredictor::new().predict(&events);
        assert!(approx(label(&out, IndicatorKey::RiskProfile).1, 0.85));
    }

    #[test]
    fn test_completed_checkout_is_aggressive() {
        let events = vec![
            Event::new("checkout_complete", None),
            Event::new("checkout_complete", None),
            Event::new("checkout_complete", None),
        ];
        let out = FastTierPredictor::new().predict(&events);
        let (value, conf) = label(&out, IndicatorKey::RiskProfile);
        assert_eq!(value, "aggressive");
        assert!(approx(conf, 0.9));
    }

    #[test]
    fn test_two_starts_is_aggressive_at_base_confidence() {
        let events = vec![
            Event::new("checkout_start", None),
            Event::new("checkout_start", None),
        ];
        let out = FastTierPredictor::new().predict(&events);
        let (value, conf) = label(&out, IndicatorKey::RiskProfile);
        assert_eq!(value, "aggressive");
        assert!(approx(conf, 0.6));
    }

    #[test]
    fn test_intuitive_browsing() {
        let events = vec![
            Event::page_view("/product/1", None),
            Event::page_view("/product/2", None),
            Event::page_view("/product/3", None),
            Event::new("scroll", None),
            Event::new("scroll", None),
            Event::new("click", None),
        ];
        let out = FastTierPredictor::new().predict(&events);
        assert_eq!(label(&out, IndicatorKey::CognitiveStyle), ("intuitive".into(), 0.6));
    }

    #[test]
    fn test_hover_heavy_window_is_anxious() {
        let events: Vec<Event> = (0..8).map(|_| Event::new("hover", None)).collect();
        let out = FastTierPredictor::new().predict(&events);
        // friction = 1.6, no completes
        assert_eq!(label(&out, IndicatorKey::Mood), ("anxious".into(), 0.65));
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let events = vec![
            Event::page_view("/pricing", None).with_field("duration", 40),
            Event::new("hover", None),
            Event::new("checkout_start", None),
            Event::page_view("/product/7", None),
        ];
        let p = FastTierPredictor::new();
        let a = p.predict(&events);
        let b = p.predict(&events);
        assert_eq!(a, b);
    }
}
