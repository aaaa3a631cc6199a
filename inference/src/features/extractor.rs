//! Single-pass aggregation of raw events into a [`FeatureRecord`].
//!
//! Extraction never fails. Malformed or missing payload fields are simply
//! not counted, and an empty window yields an all-zero record.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::Event;

/// Coarse page category derived from `payload.url`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlCategory {
    Pricing,
    Product,
    Help,
}

const PRICING_MARKERS: &[&str] = &["pricing", "price", "plans"];
const PRODUCT_MARKERS: &[&str] = &["product", "item", "catalog"];
const HELP_MARKERS: &[&str] = &["help", "support", "faq", "docs"];

/// Classify a URL by case-insensitive substring. Pricing wins over product,
/// product over help.
pub fn classify_url(url: &str) -> Option<UrlCategory> {
    let lower = url.to_lowercase();
    let hit = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));
    if hit(PRICING_MARKERS) {
        Some(UrlCategory::Pricing)
    } else if hit(PRODUCT_MARKERS) {
        Some(UrlCategory::Product)
    } else if hit(HELP_MARKERS) {
        Some(UrlCategory::Help)
    } else {
        None
    }
}

pub fn is_checkout_start(event_type: &str) -> bool {
    matches!(event_type, "checkout_start" | "checkout_started")
}

pub fn is_checkout_complete(event_type: &str) -> bool {
    matches!(
        event_type,
        "checkout_complete" | "checkout_completed" | "purchase"
    )
}

/// Aggregate counts over one event window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    /// Per-type counters keyed `n_<type>`.
    pub type_counts: BTreeMap<String, u64>,
    pub n_events: u64,
    pub pricing_views: u64,
    pub product_views: u64,
    pub help_views: u64,
    /// Cumulative positive `payload.duration`, seconds.
    pub dwell_sum: f64,
    /// `dwell_sum / n_events`, zero for an empty window.
    pub dwell_avg: f64,
    /// Minutes from the earliest timestamped event to `now`, never negative.
    pub last_minutes: f64,
    pub checkout_starts: u64,
    pub checkout_completes: u64,
}

impl FeatureRecord {
    /// Counter for one event type, zero when unseen.
    pub fn count(&self, event_type: &str) -> u64 {
        self.type_counts
            .get(&counter_key(event_type))
            .copied()
            .unwrap_or(0)
    }
}

fn counter_key(event_type: &str) -> String {
    format!("n_{event_type}")
}

/// Aggregate `events` relative to `now`.
pub fn extract_features(events: &[Event], now: DateTime<Utc>) -> FeatureRecord {
    let mut record = FeatureRecord::default();
    let mut earliest: Option<DateTime<Utc>> = None;

    for event in events {
        record.n_events += 1;
        *record
            .type_counts
            .entry(counter_key(&event.event_type))
            .or_insert(0) += 1;

        match event.url().and_then(classify_url) {
            Some(UrlCategory::Pricing) => record.pricing_views += 1,
            Some(UrlCategory::Product) => record.product_views += 1,
            Some(UrlCategory::Help) => record.help_views += 1,
            None => {}
        }

        if let Some(secs) = event.duration_secs() {
            record.dwell_sum += secs;
        }

        if is_checkout_start(&event.event_type) {
            record.checkout_starts += 1;
        } else if is_checkout_complete(&event.event_type) {
            record.checkout_completes += 1;
        }

        if let Some(ts) = event.timestamp {
            earliest = Some(earliest.map_or(ts, |e| e.min(ts)));
        }
    }

    if record.n_events > 0 {
        record.dwell_avg = record.dwell_sum / record.n_events as f64;
    }
    if let Some(first) = earliest {
        let elapsed_ms = (now - first).num_milliseconds();
        record.last_minutes = (elapsed_ms as f64 / 60_000.0).max(0.0);
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_window_is_all_zero() {
        let r = extract_features(&[], now());
        assert_eq!(r, FeatureRecord::default());
        assert_eq!(r.dwell_avg, 0.0);
        assert_eq!(r.count("click"), 0);
    }

    #[test]
    fn test_counts_dynamic_types_and_url_buckets() {
        let events = vec![
            Event::page_view("https://shop.test/pricing", None),
            Event::page_view("https://shop.test/Products/42", None),
            Event::page_view("https://shop.test/help/returns", None),
            Event::new("click", None),
            Event::new("hover", None),
            Event::new("mystery_event", None),
        ];
        let r = extract_features(&events, now());
        assert_eq!(r.n_events, 6);
        assert_eq!(r.count("page_view"), 3);
        assert_eq!(r.count("mystery_event"), 1);
        assert_eq!(r.type_counts.get("n_hover"), Some(&1));
        assert_eq!(r.pricing_views, 1);
        assert_eq!(r.product_views, 1);
        assert_eq!(r.help_views, 1);
    }

    #[test]
    fn test_dwell_sum_and_average() {
        let events = vec![
            Event::new("page_view", None).with_field("duration", 30),
            Event::new("page_view", None).with_field("duration", 60),
            Event::new("page_view", None).with_field("duration", -10),
            Event::new("click", None),
        ];
        let r = extract_features(&events, now());
        assert_eq!(r.dwell_sum, 90.0);
        assert_eq!(r.dwell_avg, 22.5);
    }

    #[test]
    fn test_checkout_counts() {
        let events = vec![
            Event::new("checkout_start", None),
            Event::new("checkout_started", None),
            Event::new("checkout_complete", None),
        ];
        let r = extract_features(&events, now());
        assert_eq!(r.checkout_starts, 2);
        assert_eq!(r.checkout_completes, 1);
    }

    #[test]
    fn test_last_minutes_uses_earliest_valid_timestamp() {
        let events = vec![
            Event::new("click", Some(now() - Duration::minutes(5))),
            Event::new("click", None),
            Event::new("click", Some(now() - Duration::minutes(30))),
        ];
        let r = extract_features(&events, now());
        assert!((r.last_minutes - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_last_minutes_clamped_for_future_events() {
        let events = vec![Event::new("click", Some(now() + Duration::minutes(3)))];
        let r = extract_features(&events, now());
        assert_eq!(r.last_minutes, 0.0);
    }

    #[test]
    fn test_classify_url_precedence() {
        assert_eq!(classify_url("/product/pricing"), Some(UrlCategory::Pricing));
        assert_eq!(classify_url("/catalog/shoes"), Some(UrlCategory::Product));
        assert_eq!(classify_url("/FAQ"), Some(UrlCategory::Help));
        assert_eq!(classify_url("/about"), None);
    }
}
