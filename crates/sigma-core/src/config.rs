//! Pipeline configuration: a TOML file plus environment overrides

use crate::error::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use sigma_types::EvaluationParams;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

pub const CONFIG_PATH_VAR: &str = "SIGMA_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "sigma.toml";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl GateConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self { max_in_flight: default_max_in_flight(), poll_interval_ms: default_poll_interval_ms() }
    }
}

/// Which result cache sits in front of the engine gateway
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Bounded, time-to-live cache
    #[default]
    Moka,
    /// Never evicts
    Unbounded,
    /// Every call reaches the engine
    Disabled,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,
    #[serde(default = "default_cache_capacity")]
    pub max_capacity: u64,
    #[serde(default = "default_cache_ttl_seconds")]
    pub time_to_live_seconds: u64,
}

impl CacheConfig {
    pub fn time_to_live(&self) -> Duration {
        Duration::from_secs(self.time_to_live_seconds)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            max_capacity: default_cache_capacity(),
            time_to_live_seconds: default_cache_ttl_seconds(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ClassifierConfig {
    /// Precision of the pre-calculation used to tell numeric from symbolic expressions
    #[serde(default = "default_pre_calculation_decimals")]
    pub pre_calculation_decimals: u32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self { pre_calculation_decimals: default_pre_calculation_decimals() }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LimitsConfig {
    #[serde(default = "default_max_expression_length")]
    pub max_expression_length: usize,
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_expression_length: default_max_expression_length(),
            max_batch_size: default_max_batch_size(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DefaultsConfig {
    #[serde(default = "default_decimals")]
    pub decimals: u32,
    #[serde(default = "default_origin")]
    pub origin: String,
    #[serde(default = "default_bound")]
    pub bound: String,
}

impl DefaultsConfig {
    pub fn params(&self) -> EvaluationParams {
        EvaluationParams::new(self.decimals, self.origin.clone(), self.bound.clone())
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self { decimals: default_decimals(), origin: default_origin(), bound: default_bound() }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SigmaConfig {
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

impl SigmaConfig {
    /// Load from `SIGMA_CONFIG_PATH` (default `sigma.toml`), then apply environment overrides.
    ///
    /// A missing file falls back to built-in defaults; an unreadable or malformed one is an error.
    pub fn load() -> PipelineResult<Self> {
        let path =
            std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let config = if Path::new(&path).exists() {
            Self::from_file(&path)?
        } else {
            warn!("Configuration file '{}' not found. Using default configuration.", path);
            Self::default()
        };

        let config = config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            PipelineError::configuration("path", format!("cannot read '{}': {e}", path.display()))
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> PipelineResult<Self> {
        toml::from_str(text).map_err(|e| PipelineError::Configuration {
            message: format!("invalid configuration: {e}"),
            setting: None,
        })
    }

    pub fn apply_env_overrides(mut self) -> Self {
        if let Some(value) = env_number("SIGMA_MAX_IN_FLIGHT") {
            self.gate.max_in_flight = value;
        }
        if let Some(value) = env_number("SIGMA_CACHE_CAPACITY") {
            self.cache.max_capacity = value;
        }
        if let Some(value) = env_number("SIGMA_CACHE_TTL_SECONDS") {
            self.cache.time_to_live_seconds = value;
        }
        if let Some(value) = env_number("SIGMA_MAX_EXPRESSION_LENGTH") {
            self.limits.max_expression_length = value;
        }
        if let Some(value) = env_number("SIGMA_MAX_BATCH_SIZE") {
            self.limits.max_batch_size = value;
        }

        info!(
            max_in_flight = self.gate.max_in_flight,
            cache_backend = ?self.cache.backend,
            cache_capacity = self.cache.max_capacity,
            "Configuration loaded"
        );
        self
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.gate.max_in_flight == 0 {
            return Err(PipelineError::configuration("gate.max_in_flight", "must be at least 1"));
        }
        if self.limits.max_batch_size == 0 {
            return Err(PipelineError::configuration("limits.max_batch_size", "must be at least 1"));
        }
        if self.limits.max_expression_length == 0 {
            return Err(PipelineError::configuration(
                "limits.max_expression_length",
                "must be at least 1",
            ));
        }
        if self.cache.backend == CacheBackend::Moka && self.cache.max_capacity == 0 {
            return Err(PipelineError::configuration(
                "cache.max_capacity",
                "must be at least 1 for the moka backend; use backend = \"disabled\" instead",
            ));
        }
        Ok(())
    }
}

fn env_number<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}='{}': not a valid number", name, raw);
            None
        }
    }
}

fn default_max_in_flight() -> usize {
    20
}
fn default_poll_interval_ms() -> u64 {
    25
}
fn default_cache_capacity() -> u64 {
    10_000
}
fn default_cache_ttl_seconds() -> u64 {
    3600
}
fn default_pre_calculation_decimals() -> u32 {
    1
}
fn default_max_expression_length() -> usize {
    2000
}
fn default_max_batch_size() -> usize {
    256
}
fn default_decimals() -> u32 {
    10
}
fn default_origin() -> String {
    "-10".to_string()
}
fn default_bound() -> String {
    "10".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = SigmaConfig::from_toml("").unwrap();
        assert_eq!(config, SigmaConfig::default());
        assert_eq!(config.gate.max_in_flight, 20);
        assert_eq!(config.classifier.pre_calculation_decimals, 1);
        assert_eq!(config.defaults.params(), EvaluationParams::default());
    }

    #[test]
    fn sections_override_defaults() {
        let config = SigmaConfig::from_toml(
            r#"
[gate]
max_in_flight = 4

[cache]
backend = "unbounded"

[limits]
max_batch_size = 8
"#,
        )
        .unwrap();

        assert_eq!(config.gate.max_in_flight, 4);
        assert_eq!(config.gate.poll_interval_ms, 25);
        assert_eq!(config.cache.backend, CacheBackend::Unbounded);
        assert_eq!(config.cache.max_capacity, 10_000);
        assert_eq!(config.limits.max_batch_size, 8);
        assert_eq!(config.limits.max_expression_length, 2000);
    }

    #[test]
    fn malformed_files_are_reported() {
        let err = SigmaConfig::from_toml("[cache]\nbackend = \"redis\"").unwrap_err();
        assert_eq!(err.category(), "configuration");
    }

    #[test]
    fn validation_rejects_zero_capacity() {
        let mut config = SigmaConfig::default();
        config.gate.max_in_flight = 0;
        assert_eq!(
            config.validate(),
            Err(PipelineError::configuration("gate.max_in_flight", "must be at least 1"))
        );

        let mut config = SigmaConfig::default();
        config.cache.backend = CacheBackend::Disabled;
        config.cache.max_capacity = 0;
        assert!(config.validate().is_ok());
    }
}
