//! Resolver configuration: JSON file with environment overrides.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::budget::BatchBudget;
use crate::error::ResolveError;

/// Overrides `budget.max_len`.
pub const ENV_MAX_LEN: &str = "REFBATCH_MAX_LEN";
/// Overrides `budget.per_key_overhead`.
pub const ENV_KEY_OVERHEAD: &str = "REFBATCH_KEY_OVERHEAD";
/// Overrides `timeout_ms`.
pub const ENV_TIMEOUT_MS: &str = "REFBATCH_TIMEOUT_MS";

/// Top-level configuration for a resolver and its lookup client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default)]
    pub budget: BatchBudget,
    /// Per-request timeout applied by the HTTP lookup client.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Page index sent with every lookup.
    #[serde(default)]
    pub page: u32,
    /// Optional bearer token for the lookup endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            budget: BatchBudget::default(),
            timeout_ms: default_timeout_ms(),
            page: 0,
            bearer_token: None,
        }
    }
}

impl ResolverConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ResolveError> {
        let config: Self = serde_json::from_str(s)?;
        config.budget.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ResolveError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ResolveError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&raw)
    }

    /// Apply `REFBATCH_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ResolveError> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn with_overrides<F>(mut self, var: F) -> Result<Self, ResolveError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = var(ENV_MAX_LEN) {
            self.budget.max_len = parse_var(ENV_MAX_LEN, &v)?;
        }
        if let Some(v) = var(ENV_KEY_OVERHEAD) {
            self.budget.per_key_overhead = parse_var(ENV_KEY_OVERHEAD, &v)?;
        }
        if let Some(v) = var(ENV_TIMEOUT_MS) {
            self.timeout_ms = parse_var(ENV_TIMEOUT_MS, &v)?;
        }
        self.budget.validate()?;
        Ok(self)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn parse_var<N: std::str::FromStr>(name: &str, value: &str) -> Result<N, ResolveError> {
    value
        .trim()
        .parse()
        .map_err(|_| ResolveError::Config(format!("{name}: not a number: {value:?}")))
}
