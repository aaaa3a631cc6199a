//! Rate-limit policy: a default bucket shape plus per-operation overrides.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

const ENV_PREFIX: &str = "RATE_LIMIT_";

/// Shape of one bucket family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub capacity: f64,
    pub refill_rate_per_minute: f64,
    pub cost_per_request: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 60.0,
            refill_rate_per_minute: 1.0,
            cost_per_request: 1.0,
        }
    }
}

/// Default shape plus named per-operation overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    pub default: RateLimitConfig,
    pub operations: BTreeMap<String, RateLimitConfig>,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RateLimitPolicy {
    /// Compiled-in policy. Heavier operations get smaller buckets and a
    /// higher per-request cost.
    pub fn builtin() -> Self {
        let mut operations = BTreeMap::new();
        operations.insert(
            "deep_inference".to_string(),
            RateLimitConfig {
                capacity: 20.0,
                refill_rate_per_minute: 0.5,
                cost_per_request: 2.0,
            },
        );
        operations.insert(
            "psychographic_analysis".to_string(),
            RateLimitConfig {
                capacity: 30.0,
                refill_rate_per_minute: 0.5,
                cost_per_request: 1.0,
            },
        );
        operations.insert(
            "batch_analysis".to_string(),
            RateLimitConfig {
                capacity: 10.0,
                refill_rate_per_minute: 0.2,
                cost_per_request: 5.0,
            },
        );
        Self {
            default: RateLimitConfig::default(),
            operations,
        }
    }

    /// Built-in policy tuned by `RATE_LIMIT_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Built-in policy tuned by the given key/value pairs.
    ///
    /// Keys look like `RATE_LIMIT_<OP>_<FIELD>`. Unparseable or
    /// non-positive values are skipped with a warning.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut policy = Self::builtin();
        for (key, value) in vars {
            let key = key.as_ref();
            let Some(rest) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let Some((op, field)) = split_field(rest) else {
                continue;
            };
            let Some(parsed) = parse_positive(value.as_ref()) else {
                warn!(var = key, value = value.as_ref(), "ignoring invalid rate-limit override");
                continue;
            };

            let op = op.to_lowercase();
            let target = if op == "default" {
                &mut policy.default
            } else {
                let base = policy.default;
                policy.operations.entry(op).or_insert(base)
            };
            match field {
                Field::Capacity => target.capacity = parsed,
                Field::RefillPerMinute => target.refill_rate_per_minute = parsed,
                Field::Cost => target.cost_per_request = parsed,
            }
        }
        policy
    }

    /// Bucket shape for `operation`, falling back to the default.
    pub fn for_operation(&self, operation: &str) -> RateLimitConfig {
        self.operations
            .get(operation)
            .copied()
            .unwrap_or(self.default)
    }

    /// Add or replace one operation's shape.
    pub fn with_operation(mut self, operation: impl Into<String>, config: RateLimitConfig) -> Self {
        self.operations.insert(operation.into(), config);
        self
    }
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Capacity,
    RefillPerMinute,
    Cost,
}

fn split_field(rest: &str) -> Option<(&str, Field)> {
    const SUFFIXES: [(&str, Field); 3] = [
        ("_REFILL_PER_MINUTE", Field::RefillPerMinute),
        ("_CAPACITY", Field::Capacity),
        ("_COST", Field::Cost),
    ];
    SUFFIXES.iter().find_map(|(suffix, field)| {
        rest.strip_suffix(suffix)
            .filter(|op| !op.is_empty())
            .map(|op| (op, *field))
    })
}

fn parse_positive(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}
