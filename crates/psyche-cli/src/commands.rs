//! Subcommand implementations. Each returns the JSON document to print.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use psyche_inference::{
    AdmissionController, CostEstimator, Event, FeatureFlags, LayerOutput, PipelineConfig,
    ProfilePipeline, ProfileRequest, RateLimitPolicy, SharedAdmissionController, StaticDeepLayer,
};
use serde_json::{json, Value};
use tracing::info;

#[derive(Debug, Clone)]
pub struct ProfileArgs {
    pub events: PathBuf,
    pub subject: String,
    pub heuristic: Option<PathBuf>,
    pub deep: Option<PathBuf>,
}

/// Run the pipeline with flags, limits and timeouts taken from the environment.
pub async fn profile(args: &ProfileArgs) -> Result<Value> {
    profile_with(
        args,
        FeatureFlags::from_env(),
        AdmissionController::from_env().shared(),
        PipelineConfig::from_env(),
    )
    .await
}

pub async fn profile_with(
    args: &ProfileArgs,
    flags: FeatureFlags,
    admission: SharedAdmissionController,
    config: PipelineConfig,
) -> Result<Value> {
    let events = load_events(&args.events)?;
    let heuristic = args
        .heuristic
        .as_deref()
        .map(load_layer_output)
        .transpose()?;

    let mut pipeline = ProfilePipeline::new(flags, admission).with_config(config);
    if let Some(path) = args.deep.as_deref() {
        let replay = load_layer_output(path)?;
        pipeline = pipeline.with_deep_layer(Arc::new(StaticDeepLayer::new(replay)));
    }

    info!(
        subject = %args.subject,
        events = events.len(),
        flags = %pipeline.flags(),
        "profiling"
    );

    let outcome = pipeline
        .run(ProfileRequest {
            subject_id: args.subject.clone(),
            events,
            heuristic,
        })
        .await;

    Ok(json!({
        "profile": outcome.profile.to_profile_json(),
        "outcome": serde_json::to_value(&outcome)?,
    }))
}

pub fn estimate(operation: &str, size: Option<u64>) -> Result<Value> {
    let estimate = CostEstimator::builtin()
        .estimate(operation, size)
        .with_context(|| format!("cannot price operation {operation:?}"))?;
    Ok(serde_json::to_value(estimate)?)
}

pub fn costs() -> Value {
    let estimator = CostEstimator::builtin();
    let table: serde_json::Map<String, Value> = estimator
        .operations()
        .map(|(op, credits)| (op.to_string(), json!(credits)))
        .collect();
    Value::Object(table)
}

pub fn flags() -> Value {
    flags_json(&FeatureFlags::from_env())
}

fn flags_json(flags: &FeatureFlags) -> Value {
    json!({
        "flags": flags.list_all(),
        "enabled": flags.enabled_features(),
        "summary": flags.summary(),
    })
}

pub fn limits() -> Result<Value> {
    Ok(serde_json::to_value(RateLimitPolicy::from_env())?)
}

/// Accepts a JSON array of events or one event per line.
fn load_events(path: &Path) -> Result<Vec<Event>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read events from {}", path.display()))?;

    if raw.trim_start().starts_with('[') {
        return serde_json::from_str(&raw)
            .with_context(|| format!("invalid event array in {}", path.display()));
    }

    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("invalid event on line {} of {}", i + 1, path.display()))
        })
        .collect()
}

fn load_layer_output(path: &Path) -> Result<LayerOutput> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read layer output from {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("invalid layer output in {}", path.display()))
}
