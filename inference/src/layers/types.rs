//! Indicator and layer output types.

use serde::{Deserialize, Serialize};

use crate::events::Event;

/// Address of an indicator inside the eventual profile.
///
/// Round-trips through its dotted string form, e.g. `emotional_state.mood`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IndicatorKey {
    RiskProfile,
    CognitiveStyle,
    Mood,
    /// Any other dotted path a layer chooses to report.
    Other(String),
}

/// Keys compared by the escalation policy.
pub const TRACKED_KEYS: [IndicatorKey; 3] = [
    IndicatorKey::RiskProfile,
    IndicatorKey::CognitiveStyle,
    IndicatorKey::Mood,
];

impl IndicatorKey {
    pub fn as_path(&self) -> &str {
        match self {
            Self::RiskProfile => "risk_profile",
            Self::CognitiveStyle => "cognitive_style",
            Self::Mood => "emotional_state.mood",
            Self::Other(path) => path,
        }
    }

    /// Path segments for nesting into a profile document.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.as_path().split('.').filter(|s| !s.is_empty())
    }
}

impl From<&str> for IndicatorKey {
    fn from(path: &str) -> Self {
        match path {
            "risk_profile" => Self::RiskProfile,
            "cognitive_style" => Self::CognitiveStyle,
            "emotional_state.mood" => Self::Mood,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for IndicatorKey {
    fn from(path: String) -> Self {
        Self::from(path.as_str())
    }
}

impl From<IndicatorKey> for String {
    fn from(key: IndicatorKey) -> Self {
        key.as_path().to_string()
    }
}

impl std::fmt::Display for IndicatorKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_path())
    }
}

/// Value of an indicator.
///
/// Numbers compare by numeric value, so `1` and `1.0` are the same vote.
/// Otherwise kinds never compare equal: the integer `0` and the label `"0"`
/// are distinct votes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndicatorValue {
    /// Explicit `null` from a layer; never counts as a disagreement.
    Null,
    Flag(bool),
    Integer(i64),
    Number(f64),
    Label(String),
}

impl IndicatorValue {
    pub fn label(s: impl Into<String>) -> Self {
        Self::Label(s.into())
    }

    pub fn as_label(&self) -> Option<&str> {
        match self {
            Self::Label(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Flag(b) => serde_json::Value::Bool(*b),
            Self::Integer(i) => serde_json::Value::from(*i),
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Label(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl PartialEq for IndicatorValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Flag(a), Self::Flag(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Integer(i), Self::Number(n)) | (Self::Number(n), Self::Integer(i)) => {
                *i as f64 == *n
            }
            (Self::Label(a), Self::Label(b)) => a == b,
            _ => false,
        }
    }
}

impl From<&str> for IndicatorValue {
    fn from(s: &str) -> Self {
        Self::Label(s.to_string())
    }
}

impl From<String> for IndicatorValue {
    fn from(s: String) -> Self {
        Self::Label(s)
    }
}

impl From<bool> for IndicatorValue {
    fn from(b: bool) -> Self {
        Self::Flag(b)
    }
}

impl From<i64> for IndicatorValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for IndicatorValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl std::fmt::Display for IndicatorValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Flag(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Label(s) => write!(f, "\"{s}\""),
        }
    }
}

/// One labeled, confidence-scored inferred fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub key: IndicatorKey,
    pub value: IndicatorValue,
    /// Per-indicator confidence in `[0, 1]`. Absent means "use the layer's".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Indicator {
    pub fn new(key: IndicatorKey, value: impl Into<IndicatorValue>, confidence: f64) -> Self {
        Self {
            key,
            value: value.into(),
            confidence: Some(confidence.clamp(0.0, 1.0)),
        }
    }

    /// Indicator with no confidence of its own.
    pub fn unscored(key: IndicatorKey, value: impl Into<IndicatorValue>) -> Self {
        Self {
            key,
            value: value.into(),
            confidence: None,
        }
    }

    /// Own confidence if it is a finite number.
    pub fn finite_confidence(&self) -> Option<f64> {
        self.confidence.filter(|c| c.is_finite())
    }
}

/// Which inference strategy produced an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Heuristic,
    FastTier,
    Deep,
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Heuristic => write!(f, "heuristic"),
            Self::FastTier => write!(f, "fast_tier"),
            Self::Deep => write!(f, "deep"),
        }
    }
}

/// Output of one layer for one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerOutput {
    pub layer: LayerKind,
    pub indicators: Vec<Indicator>,
    pub confidence: f64,
    pub model_id: String,
    #[serde(default)]
    pub summary: String,
}

impl LayerOutput {
    /// First indicator reported for `key`.
    pub fn indicator(&self, key: &IndicatorKey) -> Option<&Indicator> {
        self.indicators.iter().find(|i| &i.key == key)
    }

    /// Confidence used for `key`: the indicator's own, else the layer's.
    pub fn confidence_for(&self, key: &IndicatorKey) -> Option<f64> {
        self.indicator(key)
            .map(|i| i.finite_confidence().unwrap_or(self.confidence))
    }
}

/// A synchronous, cheap layer. Cheap layers are never rate limited.
pub trait InferenceLayer: Send + Sync {
    fn kind(&self) -> LayerKind;

    fn model_id(&self) -> &str;

    /// Produce indicators for the given window. Must not fail or block.
    fn infer(&self, events: &[Event]) -> LayerOutput;
}
