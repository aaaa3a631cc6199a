//! Profile Pipeline — wires the layers, policy, admission and fusion together
//!
//! ```text
//! events ─► features ─► fast tier ─┐
//! heuristic output (external) ─────┼─► escalation ─► admission ─► deep layer
//!                                  │                                  │
//!                                  └──────────────► fusion ◄──────────┘
//! ```
//!
//! Everything except the deep call is synchronous. A failed, slow or
//! throttled deep call never fails the run: the outcome degrades to the
//! cheap fused profile and records why.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::admission::{AdmissionOutcome, SharedAdmissionController};
use crate::escalation::{EscalationDecision, EscalationPolicy, EscalationReasons};
use crate::events::{Event, EventWindow, DEFAULT_WINDOW_CAPACITY};
use crate::features::{extract_features, make_seq_embedding, FeatureRecord};
use crate::fusion::{FusedProfile, FusionEngine};
use crate::layers::{
    DeepLayer, DeepLayerError, DeepRequest, FastTierPredictor, HeuristicProxy, InferenceLayer,
    LayerKind, LayerOutput,
};
use crate::rollout::{
    FeatureFlags, FLAG_DEEP_LAYER, FLAG_ESCALATION, FLAG_FAST_TIER, FLAG_HEURISTIC_LAYER,
    FLAG_RATE_LIMITING, FLAG_SEQ_EMBEDDING,
};

const DEFAULT_DEEP_TIMEOUT_SECS: u64 = 30;

/// Pipeline tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Admission-controller operation name for deep calls
    pub deep_operation: String,
    /// Upper bound on a single deep call
    pub deep_timeout_secs: u64,
    /// Newest events kept per run
    pub window_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            deep_operation: "deep_inference".to_string(),
            deep_timeout_secs: DEFAULT_DEEP_TIMEOUT_SECS,
            window_capacity: DEFAULT_WINDOW_CAPACITY,
        }
    }
}

impl PipelineConfig {
    /// Defaults, with `PSYCHE_DEEP_TIMEOUT_SECS` applied when it parses.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var("PSYCHE_DEEP_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.deep_timeout_secs = secs,
                _ => warn!(value = %raw, "ignoring invalid PSYCHE_DEEP_TIMEOUT_SECS"),
            }
        }
        config
    }
}

/// One run's input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRequest {
    pub subject_id: String,
    /// Ordered oldest first.
    pub events: Vec<Event>,
    /// Output of the external heuristic layer, if it ran.
    #[serde(default)]
    pub heuristic: Option<LayerOutput>,
}

/// What happened to the deep layer on this run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeepStatus {
    /// Escalation did not ask for it
    NotRequested,
    /// Wanted, but the deep-layer flag is off
    Disabled,
    /// Wanted, but no deep layer is wired in
    Unavailable,
    /// Wanted, but the admission controller said no
    Throttled { retry_after_seconds: Option<u64> },
    /// Ran and its output was fused
    Invoked { model_id: String },
    /// Ran and failed or timed out
    Failed { error: String },
}

impl DeepStatus {
    pub fn invoked(&self) -> bool {
        matches!(self, Self::Invoked { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub subject_id: String,
    pub profile: FusedProfile,
    pub features: FeatureRecord,
    pub escalation: EscalationDecision,
    /// Present only when the admission controller was consulted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admission: Option<AdmissionOutcome>,
    pub deep: DeepStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

pub struct ProfilePipeline {
    flags: FeatureFlags,
    config: PipelineConfig,
    fast_tier: FastTierPredictor,
    policy: EscalationPolicy,
    admission: SharedAdmissionController,
    fusion: FusionEngine,
    deep: Option<Arc<dyn DeepLayer>>,
}

impl ProfilePipeline {
    pub fn new(flags: FeatureFlags, admission: SharedAdmissionController) -> Self {
        Self {
            flags,
            config: PipelineConfig::default(),
            fast_tier: FastTierPredictor::new(),
            policy: EscalationPolicy::new(),
            admission,
            fusion: FusionEngine::new(),
            deep: None,
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_policy(mut self, policy: EscalationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_deep_layer(mut self, deep: Arc<dyn DeepLayer>) -> Self {
        self.deep = Some(deep);
        self
    }

    pub fn flags(&self) -> &FeatureFlags {
        &self.flags
    }

    pub fn admission(&self) -> &SharedAdmissionController {
        &self.admission
    }

    pub async fn run(&self, request: ProfileRequest) -> PipelineOutcome {
        self.run_at(request, Utc::now()).await
    }

    /// Run against an explicit clock reading.
    pub async fn run_at(&self, request: ProfileRequest, now: DateTime<Utc>) -> PipelineOutcome {
        let ProfileRequest {
            subject_id,
            events,
            heuristic,
        } = request;
        let events = EventWindow::from_events(events, self.config.window_capacity).snapshot();
        let features = extract_features(&events, now);
        let mut warnings = Vec::new();

        let fast = self
            .flags
            .is_enabled(FLAG_FAST_TIER)
            .then(|| self.fast_tier.predict_features(&features));

        let heuristic = heuristic
            .filter(|_| self.flags.is_enabled(FLAG_HEURISTIC_LAYER))
            .map(|out| HeuristicProxy::from_output(out).infer(&events));

        let escalation = if self.flags.is_enabled(FLAG_ESCALATION) {
            self.policy
                .should_invoke(&events, heuristic.as_ref(), fast.as_ref(), now)
        } else {
            EscalationDecision {
                should_invoke: false,
                reasons: EscalationReasons::default(),
                reason: "escalation disabled".to_string(),
            }
        };

        let mut admission = None;
        let mut deep_output = None;
        let deep = if !escalation.should_invoke {
            DeepStatus::NotRequested
        } else if !self.flags.is_enabled(FLAG_DEEP_LAYER) {
            DeepStatus::Disabled
        } else if let Some(layer) = self.deep.as_ref() {
            let granted = if self.flags.is_enabled(FLAG_RATE_LIMITING) {
                self.admission
                    .try_consume_at(&subject_id, &self.config.deep_operation, None, now)
            } else {
                AdmissionOutcome::unlimited()
            };
            let allowed = granted.allowed;
            let retry_after_seconds = granted.retry_after_seconds;
            admission = Some(granted);

            if allowed {
                let request = DeepRequest {
                    subject_id: subject_id.clone(),
                    events: events.clone(),
                    features: features.clone(),
                    reasons: escalation.reasons,
                    embedding: self
                        .flags
                        .is_enabled(FLAG_SEQ_EMBEDDING)
                        .then(|| make_seq_embedding(&events).to_vec()),
                };
                match self.invoke_deep(layer.as_ref(), &request).await {
                    Ok(output) => {
                        let model_id = output.model_id.clone();
                        deep_output = Some(output);
                        DeepStatus::Invoked { model_id }
                    }
                    Err(e) => {
                        warn!(subject_id = %subject_id, error = %e, "deep layer failed, using cheap layers");
                        warnings.push(format!("deep layer failed: {e}"));
                        DeepStatus::Failed {
                            error: e.to_string(),
                        }
                    }
                }
            } else {
                debug!(subject_id = %subject_id, ?retry_after_seconds, "deep layer throttled");
                warnings.push("deep layer throttled by admission controller".to_string());
                DeepStatus::Throttled {
                    retry_after_seconds,
                }
            }
        } else {
            DeepStatus::Unavailable
        };

        let profile = self.fusion.fuse_at(
            &[heuristic.as_ref(), fast.as_ref(), deep_output.as_ref()],
            now,
        );

        PipelineOutcome {
            subject_id,
            profile,
            features,
            escalation,
            admission,
            deep,
            warnings,
        }
    }

    async fn invoke_deep(
        &self,
        layer: &dyn DeepLayer,
        request: &DeepRequest,
    ) -> Result<LayerOutput, DeepLayerError> {
        let timeout_secs = self.config.deep_timeout_secs;
        info!(
            subject_id = %request.subject_id,
            model = layer.model_id(),
            reasons = ?request.reasons.fired(),
            "invoking deep layer"
        );
        let mut output = tokio::time::timeout(Duration::from_secs(timeout_secs), layer.infer(request))
            .await
            .map_err(|_| DeepLayerError::Timeout(timeout_secs))??;
        output.layer = LayerKind::Deep;
        Ok(output)
    }
}
