//! Property tests for the cheap inference path — features, fast tier,
//! escalation, admission, cost and fusion exercised through the public API.
//!
//! Tests verify:
//! - Empty windows extract to zeroed features
//! - The fast tier is deterministic
//! - Single-layer fusion reproduces the layer with clamped confidence
//! - Fusion ties go to the first-seen value
//! - Token buckets refill one unit per 60/rate seconds
//! - Large inputs apply the x3 multiplier and clamp to the credit ceiling
//! - Pricing interest escalates even when cheap layers agree

use chrono::{DateTime, Duration, TimeZone, Utc};
use psyche_inference::admission::{AdmissionController, RateLimitConfig, RateLimitPolicy};
use psyche_inference::{
    extract_features, CostEstimator, EscalationPolicy, Event, FastTierPredictor, FeatureRecord,
    FusionEngine, Indicator, IndicatorKey, IndicatorValue, LayerKind, LayerOutput,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

fn pricing_views(n: usize) -> Vec<Event> {
    (0..n)
        .map(|i| Event::page_view("https://shop.example/pricing", Some(now() - Duration::minutes(i as i64))))
        .collect()
}

fn layer(kind: LayerKind, confidence: f64, items: Vec<Indicator>) -> LayerOutput {
    LayerOutput {
        layer: kind,
        indicators: items,
        confidence,
        model_id: format!("{kind}@test"),
        summary: String::new(),
    }
}

#[test]
fn test_empty_window_extracts_zeroed_features() {
    let f = extract_features(&[], now());
    assert_eq!(f, FeatureRecord::default());
    assert_eq!(f.dwell_avg, 0.0);
}

#[test]
fn test_fast_tier_is_deterministic() {
    let events = vec![
        Event::page_view("/product/42", Some(now())),
        Event::new("scroll", Some(now())),
        Event::new("hover", Some(now())),
        Event::page_view("/pricing", Some(now())).with_field("duration", 45),
    ];
    let predictor = FastTierPredictor::new();
    let first = predictor.predict(&events);
    for _ in 0..10 {
        assert_eq!(predictor.predict(&events), first);
    }
}

#[test]
fn test_single_layer_fusion_reproduces_values() {
    let fast = FastTierPredictor::new().predict(&pricing_views(3));
    let fused = FusionEngine::new().fuse_at(&[None, Some(&fast), None], now());

    assert_eq!(fused.indicators.len(), fast.indicators.len());
    for original in &fast.indicators {
        let out = fused.indicator(&original.key).unwrap();
        assert_eq!(out.value, original.value);
        let expected = original.confidence.unwrap().clamp(0.1, 1.0);
        assert!((out.confidence.unwrap() - expected).abs() < 1e-9);
    }
}

#[test]
fn test_single_layer_low_confidence_is_floored() {
    let only = layer(
        LayerKind::Heuristic,
        0.02,
        vec![Indicator::new(IndicatorKey::Mood, "neutral", 0.02)],
    );
    let fused = FusionEngine::new().fuse_at(&[Some(&only)], now());
    assert_eq!(fused.indicators[0].confidence, Some(0.1));
}

#[test]
fn test_fusion_tie_keeps_first_seen_value() {
    let a = layer(
        LayerKind::Heuristic,
        0.7,
        vec![Indicator::new(IndicatorKey::Mood, "anxious", 0.7)],
    );
    let b = layer(
        LayerKind::FastTier,
        0.7,
        vec![Indicator::new(IndicatorKey::Mood, "confident", 0.7)],
    );
    let engine = FusionEngine::new();

    let ab = engine.fuse_at(&[Some(&a), Some(&b)], now());
    let ba = engine.fuse_at(&[Some(&b), Some(&a)], now());
    assert_eq!(
        ab.indicator(&IndicatorKey::Mood).unwrap().value,
        IndicatorValue::label("anxious")
    );
    assert_eq!(
        ba.indicator(&IndicatorKey::Mood).unwrap().value,
        IndicatorValue::label("confident")
    );
}

#[test]
fn test_numeric_and_string_values_do_not_collide() {
    let a = layer(
        LayerKind::Heuristic,
        0.6,
        vec![Indicator::new(IndicatorKey::from("engagement.level"), 0i64, 0.6)],
    );
    let b = layer(
        LayerKind::FastTier,
        0.5,
        vec![Indicator::new(IndicatorKey::from("engagement.level"), "0", 0.5)],
    );
    let fused = FusionEngine::new().fuse_at(&[Some(&a), Some(&b)], now());
    let level = fused.indicator(&IndicatorKey::from("engagement.level")).unwrap();
    // No pooling across the two representations: 0.6 / 2 layers.
    assert_eq!(level.value, IndicatorValue::Integer(0));
    assert!((level.confidence.unwrap() - 0.3).abs() < 1e-9);
}

#[test]
fn test_bucket_refills_one_unit_per_interval() {
    let policy = RateLimitPolicy::builtin().with_operation(
        "probe",
        RateLimitConfig {
            capacity: 5.0,
            refill_rate_per_minute: 2.0,
            cost_per_request: 1.0,
        },
    );
    let controller = AdmissionController::new(policy);
    let t0 = now();

    for _ in 0..5 {
        assert!(controller.try_consume_at("u", "probe", None, t0).allowed);
    }
    let denied = controller.try_consume_at("u", "probe", None, t0);
    assert!(!denied.allowed);
    assert_eq!(denied.retry_after_seconds, Some(30));

    let later = t0 + Duration::seconds(30);
    assert!(controller.try_consume_at("u", "probe", None, later).allowed);
    assert!(!controller.try_consume_at("u", "probe", None, later).allowed);
}

#[test]
fn test_large_input_applies_triple_multiplier_and_clamps() {
    let estimator = CostEstimator::builtin().with_operation("bulk_rescore", 40);

    let deep = estimator.estimate("deep_inference", Some(10_001)).unwrap();
    assert_eq!(deep.credits, 30);
    let batch = estimator.estimate("batch_analysis", Some(1_000_000)).unwrap();
    assert_eq!(batch.credits, 75);
    let bulk = estimator.estimate("bulk_rescore", Some(10_001)).unwrap();
    assert_eq!(bulk.credits, 100);
}

#[test]
fn test_pricing_interest_escalates_despite_agreement() {
    let events = pricing_views(3);
    let fast = FastTierPredictor::new().predict(&events);
    let mut heuristic = fast.clone();
    heuristic.layer = LayerKind::Heuristic;

    let decision =
        EscalationPolicy::new().should_invoke(&events, Some(&heuristic), Some(&fast), now());
    assert!(decision.should_invoke);
    assert!(decision.reasons.high_value);
    assert!(!decision.reasons.disagree);
    assert!(!decision.reasons.low_conf);
}

#[test]
fn test_old_pricing_views_fall_outside_lookback() {
    let mut events = pricing_views(3);
    events.extend((0..20).map(|_| Event::new("click", Some(now()))));
    let decision = EscalationPolicy::new().should_invoke(&events, None, None, now());
    assert!(!decision.reasons.high_value);
}
