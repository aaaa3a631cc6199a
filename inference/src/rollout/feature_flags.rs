//! Feature Flags — Independent Layer Toggles
//!
//! Each flag has a compiled-in default and can be overridden at process
//! start through the environment.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `FEATURE_FLAG_HEURISTIC_LAYER` | `true` | Feed the external heuristic output into escalation and fusion |
//! | `FEATURE_FLAG_FAST_TIER` | `true` | Run the calibrated fast-tier predictor |
//! | `FEATURE_FLAG_DEEP_LAYER` | `true` | Allow the deep layer to be invoked at all |
//! | `FEATURE_FLAG_ESCALATION` | `true` | Consult the escalation policy (off = never escalate) |
//! | `FEATURE_FLAG_RATE_LIMITING` | `true` | Gate deep calls through the admission controller |
//! | `FEATURE_FLAG_SEQ_EMBEDDING` | `false` | Attach the reserved sequence embedding to deep requests |
//!
//! A value of `true` (case-insensitive) enables a flag. Any other value
//! disables it. Resolution order is environment, then compiled default, then
//! `false`; lookups never fail.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const FLAG_ENV_PREFIX: &str = "FEATURE_FLAG_";

pub const FLAG_HEURISTIC_LAYER: &str = "heuristic_layer";
pub const FLAG_FAST_TIER: &str = "fast_tier";
pub const FLAG_DEEP_LAYER: &str = "deep_layer";
pub const FLAG_ESCALATION: &str = "escalation";
pub const FLAG_RATE_LIMITING: &str = "rate_limiting";
pub const FLAG_SEQ_EMBEDDING: &str = "seq_embedding";

/// A flag compiled into the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownFlag {
    pub name: &'static str,
    pub default: bool,
}

pub const KNOWN_FLAGS: &[KnownFlag] = &[
    KnownFlag { name: FLAG_HEURISTIC_LAYER, default: true },
    KnownFlag { name: FLAG_FAST_TIER, default: true },
    KnownFlag { name: FLAG_DEEP_LAYER, default: true },
    KnownFlag { name: FLAG_ESCALATION, default: true },
    KnownFlag { name: FLAG_RATE_LIMITING, default: true },
    KnownFlag { name: FLAG_SEQ_EMBEDDING, default: false },
];

/// Resolved flag set for the life of the process.
///
/// Environment overrides are captured once at construction; there is no
/// mutation API afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Overrides keyed by normalized (uppercase) flag name.
    overrides: BTreeMap<String, bool>,
}

impl FeatureFlags {
    /// Compiled-in defaults only.
    pub fn defaults() -> Self {
        Self::default()
    }

    /// Capture every `FEATURE_FLAG_*` variable from the environment.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Capture `FEATURE_FLAG_*` entries from the given key/value pairs.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let overrides = vars
            .into_iter()
            .filter_map(|(k, v)| {
                let name = k.as_ref().strip_prefix(FLAG_ENV_PREFIX)?;
                if name.is_empty() {
                    return None;
                }
                Some((normalize(name), parse_flag_value(v.as_ref())))
            })
            .collect();
        Self { overrides }
    }

    /// Resolve one flag: environment, then compiled default, then `false`.
    pub fn is_enabled(&self, name: &str) -> bool {
        if let Some(v) = self.overrides.get(&normalize(name)) {
            return *v;
        }
        KNOWN_FLAGS
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .map(|f| f.default)
            .unwrap_or(false)
    }

    /// Every known flag with its resolved value.
    pub fn list_all(&self) -> BTreeMap<&'static str, bool> {
        KNOWN_FLAGS
            .iter()
            .map(|f| (f.name, self.is_enabled(f.name)))
            .collect()
    }

    /// Names of enabled known flags, in declaration order.
    pub fn enabled_features(&self) -> Vec<&'static str> {
        KNOWN_FLAGS
            .iter()
            .filter(|f| self.is_enabled(f.name))
            .map(|f| f.name)
            .collect()
    }

    /// Whether an environment override exists for `name`.
    pub fn is_overridden(&self, name: &str) -> bool {
        self.overrides.contains_key(&normalize(name))
    }

    /// Format as a human-readable summary line.
    pub fn summary(&self) -> String {
        let enabled = self.enabled_features();
        if enabled.is_empty() {
            "Feature flags: all disabled".to_string()
        } else {
            format!(
                "Feature flags: {}/{} enabled [{}]",
                enabled.len(),
                KNOWN_FLAGS.len(),
                enabled.join(", ")
            )
        }
    }

    /// Resolved known flags as JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.list_all())
            .unwrap_or_else(|_| r#"{"error":"serialization failed"}"#.to_string())
    }
}

impl std::fmt::Display for FeatureFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = KNOWN_FLAGS
            .iter()
            .map(|flag| format!("{}={}", flag.name, flag_str(self.is_enabled(flag.name))))
            .collect();
        f.write_str(&parts.join(" "))
    }
}

/// `FEATURE_FLAG_` suffix form: uppercase, non-alphanumerics as `_`.
fn normalize(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect()
}

/// Only `true` (case-insensitive) enables.
fn parse_flag_value(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

/// Format a boolean as "ON" or "OFF" for display.
fn flag_str(enabled: bool) -> &'static str {
    if enabled {
        "ON"
    } else {
        "OFF"
    }
}
