//! Pipeline configuration
//!
//! Versioned YAML (`version: 1`) with three sections:
//!
//! ```yaml
//! version: 1
//! pipeline:
//!   validation_level: standard
//!   enable_rollback: true
//!   allow_partial_completion: true
//!   max_retries_per_stage: 2
//!   stage_backoff_base_secs: 60
//!   stage_backoff_cap_secs: 300
//! executor:
//!   workers: 4
//!   query_timeout_secs: 120.0
//!   max_retries: 2
//!   retry_delay_ms: 1000
//!   retry_delay_cap_ms: 30000
//! embedding:
//!   batch_size: 3
//!   max_retries: 3
//!   retry_delay_ms: 1000
//!   retry_delay_cap_ms: 30000
//!   dimension: 768
//! ```
//!
//! Every section and field is optional; omitted values take the defaults
//! above. `ASSESSMENT_ETL_*` environment variables override file values.
//! Parsing and overriding do not range-check; call [`EtlConfig::validate`]
//! once the final values are in place.

pub mod error;

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::validation::ValidationLevel;
pub use error::{ConfigError, ConfigResult};

const SUPPORTED_VERSIONS: [u32; 1] = [1];

/// Stage sequencing policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub validation_level: ValidationLevel,
    pub enable_rollback: bool,
    pub allow_partial_completion: bool,
    pub max_retries_per_stage: u32,
    pub stage_backoff_base_secs: u64,
    pub stage_backoff_cap_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            validation_level: ValidationLevel::Standard,
            enable_rollback: true,
            allow_partial_completion: true,
            max_retries_per_stage: 2,
            stage_backoff_base_secs: 60,
            stage_backoff_cap_secs: 300,
        }
    }
}

impl PipelineConfig {
    /// Delay before stage retry `n` (1-based): base * 2^(n-1), capped
    pub fn stage_backoff(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(31);
        let secs = self
            .stage_backoff_base_secs
            .saturating_mul(2u64.saturating_pow(exp))
            .min(self.stage_backoff_cap_secs);
        Duration::from_secs(secs)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_retries_per_stage > 10 {
            return Err(ConfigError::range_with_hint(
                "pipeline.max_retries_per_stage",
                self.max_retries_per_stage,
                0,
                10,
                "Stage retries multiply the whole stage runtime",
            ));
        }
        if self.stage_backoff_cap_secs < self.stage_backoff_base_secs {
            return Err(ConfigError::Conflict {
                issue: format!(
                    "stage_backoff_cap_secs ({}) is below stage_backoff_base_secs ({})",
                    self.stage_backoff_cap_secs, self.stage_backoff_base_secs
                ),
                fix: "raise the cap or lower the base".to_string(),
            });
        }
        Ok(())
    }
}

/// Concurrent query executor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutorConfig {
    /// Worker pool width
    pub workers: usize,
    /// Absolute timeout per query attempt
    pub query_timeout_secs: f64,
    /// Additional attempts after the first
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub retry_delay_cap_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            query_timeout_secs: 120.0,
            max_retries: 2,
            retry_delay_ms: 1000,
            retry_delay_cap_ms: 30_000,
        }
    }
}

impl ExecutorConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.query_timeout_secs)
    }

    /// Delay after failed attempt `attempt` (0-based): delay * 2^attempt, capped
    pub fn retry_backoff(&self, attempt: u32) -> Duration {
        let ms = self
            .retry_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt.min(31)))
            .min(self.retry_delay_cap_ms);
        Duration::from_millis(ms)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.workers == 0 || self.workers > 64 {
            return Err(ConfigError::range_with_hint(
                "executor.workers",
                self.workers,
                1,
                64,
                "The legacy database should not see more than a few concurrent queries",
            ));
        }
        if !(self.query_timeout_secs > 0.0 && self.query_timeout_secs <= 3600.0) {
            return Err(ConfigError::range_with_hint(
                "executor.query_timeout_secs",
                self.query_timeout_secs,
                "0 (exclusive)",
                3600,
                "Timeout must be positive and finite",
            ));
        }
        if self.max_retries > 10 {
            return Err(ConfigError::range_with_hint(
                "executor.max_retries",
                self.max_retries,
                0,
                10,
                "Each retry doubles the backoff",
            ));
        }
        if self.retry_delay_cap_ms < self.retry_delay_ms {
            return Err(ConfigError::Conflict {
                issue: format!(
                    "retry_delay_cap_ms ({}) is below retry_delay_ms ({})",
                    self.retry_delay_cap_ms, self.retry_delay_ms
                ),
                fix: "raise the cap or lower the delay".to_string(),
            });
        }
        Ok(())
    }
}

/// Embedding batching and fallback settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmbeddingConfig {
    pub batch_size: usize,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub retry_delay_cap_ms: u64,
    /// Vector length of the zero-vector fallback
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            batch_size: 3,
            max_retries: 3,
            retry_delay_ms: 1000,
            retry_delay_cap_ms: 30_000,
            dimension: 768,
        }
    }
}

impl EmbeddingConfig {
    /// Delay after failed attempt `attempt` (0-based): delay * 2^attempt, capped
    pub fn retry_backoff(&self, attempt: u32) -> Duration {
        let ms = self
            .retry_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt.min(31)))
            .min(self.retry_delay_cap_ms);
        Duration::from_millis(ms)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.batch_size == 0 || self.batch_size > 256 {
            return Err(ConfigError::range_with_hint(
                "embedding.batch_size",
                self.batch_size,
                1,
                256,
                "Batches are sent as one request",
            ));
        }
        if self.dimension == 0 || self.dimension > 8192 {
            return Err(ConfigError::range_with_hint(
                "embedding.dimension",
                self.dimension,
                1,
                8192,
                "Must match the embedding model output",
            ));
        }
        if self.max_retries > 10 {
            return Err(ConfigError::range_with_hint(
                "embedding.max_retries",
                self.max_retries,
                0,
                10,
                "Each retry doubles the backoff",
            ));
        }
        if self.retry_delay_cap_ms > 600_000 {
            return Err(ConfigError::range_with_hint(
                "embedding.retry_delay_cap_ms",
                self.retry_delay_cap_ms,
                0,
                600_000,
                "Embedding runs inside a stage that has its own retries",
            ));
        }
        if self.retry_delay_cap_ms < self.retry_delay_ms {
            return Err(ConfigError::Conflict {
                issue: format!(
                    "embedding retry_delay_cap_ms ({}) is below retry_delay_ms ({})",
                    self.retry_delay_cap_ms, self.retry_delay_ms
                ),
                fix: "raise the cap or lower the delay".to_string(),
            });
        }
        Ok(())
    }
}

/// Complete ETL configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EtlConfig {
    pub pipeline: PipelineConfig,
    pub executor: ExecutorConfig,
    pub embedding: EmbeddingConfig,
}

/// YAML schema v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFileV1 {
    /// Schema version (always 1 for v1)
    version: Option<u32>,
    #[serde(default)]
    pipeline: PipelineConfig,
    #[serde(default)]
    executor: ExecutorConfig,
    #[serde(default)]
    embedding: EmbeddingConfig,
}

impl EtlConfig {
    /// Parse YAML text and check its schema version
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let file: ConfigFileV1 = serde_yaml::from_str(content)?;

        let version = file.version.ok_or(ConfigError::MissingVersion)?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(ConfigError::UnsupportedVersion {
                found: version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        Ok(Self {
            pipeline: file.pipeline,
            executor: file.executor,
            embedding: file.embedding,
        })
    }

    /// Load from YAML file (v1 schema)
    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        let file = ConfigFileV1 {
            version: Some(1),
            pipeline: self.pipeline.clone(),
            executor: self.executor.clone(),
            embedding: self.embedding.clone(),
        };
        Ok(serde_yaml::to_string(&file)?)
    }

    /// Apply `ASSESSMENT_ETL_*` overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("ASSESSMENT_ETL_VALIDATION_LEVEL") {
            self.pipeline.validation_level = ValidationLevel::from_str(&v)
                .map_err(|e| ConfigError::invalid_env("ASSESSMENT_ETL_VALIDATION_LEVEL", &v, e))?;
        }
        override_parsed(&lookup, "ASSESSMENT_ETL_ENABLE_ROLLBACK", &mut self.pipeline.enable_rollback)?;
        override_parsed(
            &lookup,
            "ASSESSMENT_ETL_ALLOW_PARTIAL",
            &mut self.pipeline.allow_partial_completion,
        )?;
        override_parsed(
            &lookup,
            "ASSESSMENT_ETL_STAGE_RETRIES",
            &mut self.pipeline.max_retries_per_stage,
        )?;
        override_parsed(&lookup, "ASSESSMENT_ETL_WORKERS", &mut self.executor.workers)?;
        override_parsed(
            &lookup,
            "ASSESSMENT_ETL_QUERY_TIMEOUT_SECS",
            &mut self.executor.query_timeout_secs,
        )?;
        override_parsed(&lookup, "ASSESSMENT_ETL_QUERY_RETRIES", &mut self.executor.max_retries)?;
        override_parsed(
            &lookup,
            "ASSESSMENT_ETL_EMBEDDING_BATCH_SIZE",
            &mut self.embedding.batch_size,
        )?;
        override_parsed(
            &lookup,
            "ASSESSMENT_ETL_EMBEDDING_DIMENSION",
            &mut self.embedding.dimension,
        )?;
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.pipeline.validate()?;
        self.executor.validate()?;
        self.embedding.validate()
    }
}

fn override_parsed<F, T>(lookup: &F, var: &str, target: &mut T) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(var) {
        *target = raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::invalid_env(var, &raw, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = EtlConfig::default();
        assert_eq!(config.executor.workers, 4);
        assert_eq!(config.executor.query_timeout(), Duration::from_secs(120));
        assert_eq!(config.executor.max_retries, 2);
        assert_eq!(config.pipeline.max_retries_per_stage, 2);
        assert_eq!(config.pipeline.validation_level, ValidationLevel::Standard);
        assert_eq!(config.embedding.batch_size, 3);
        assert_eq!(config.embedding.dimension, 768);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_stage_backoff_doubles_and_caps() {
        let p = PipelineConfig::default();
        let delays: Vec<u64> = (1..=5).map(|n| p.stage_backoff(n).as_secs()).collect();
        assert_eq!(delays, vec![60, 120, 240, 300, 300]);
    }

    #[test]
    fn test_query_backoff_doubles_and_caps() {
        let e = ExecutorConfig {
            retry_delay_ms: 1000,
            retry_delay_cap_ms: 5000,
            ..Default::default()
        };
        let delays: Vec<u64> = (0..5).map(|n| e.retry_backoff(n).as_millis() as u64).collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 5000, 5000]);
    }

    #[test]
    fn test_yaml_partial_sections_use_defaults() {
        let yaml = r#"
version: 1
pipeline:
  validation_level: strict
executor:
  workers: 8
"#;
        let config = EtlConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.pipeline.validation_level, ValidationLevel::Strict);
        assert!(config.pipeline.enable_rollback);
        assert_eq!(config.executor.workers, 8);
        assert_eq!(config.executor.max_retries, 2);
        assert_eq!(config.embedding, EmbeddingConfig::default());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let mut config = EtlConfig::default();
        config.executor.workers = 6;
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("version: 1"));
        assert_eq!(EtlConfig::from_yaml_str(&yaml).unwrap(), config);
    }

    #[test]
    fn test_yaml_missing_version() {
        let err = EtlConfig::from_yaml_str("executor:\n  workers: 2\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingVersion));
    }

    #[test]
    fn test_yaml_unsupported_version() {
        let err = EtlConfig::from_yaml_str("version: 2\n").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedVersion { found: 2, .. }));
    }

    #[test]
    fn test_yaml_unknown_field_rejected() {
        let yaml = "version: 1\nexecutor:\n  wrokers: 2\n";
        assert!(matches!(
            EtlConfig::from_yaml_str(yaml),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_yaml_out_of_range() {
        let yaml = "version: 1\nexecutor:\n  workers: 0\n";
        let config = EtlConfig::from_yaml_str(yaml).unwrap();
        match config.validate() {
            Err(ConfigError::Range { field, .. }) => assert_eq!(field, "executor.workers"),
            other => panic!("Expected Range error, got {:?}", other),
        }
    }

    #[test]
    fn test_env_override_repairs_file_value_before_validation() {
        let yaml = "version: 1\nexecutor:\n  workers: 0\n";
        let mut config = EtlConfig::from_yaml_str(yaml).unwrap();
        config
            .apply_overrides_from(|k| (k == "ASSESSMENT_ETL_WORKERS").then(|| "3".to_string()))
            .unwrap();
        assert_eq!(config.executor.workers, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_override_out_of_range_caught_by_validate() {
        let mut config = EtlConfig::default();
        config
            .apply_overrides_from(|k| (k == "ASSESSMENT_ETL_WORKERS").then(|| "0".to_string()))
            .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Range { .. })));
    }

    #[test]
    fn test_embedding_backoff_doubles_and_caps() {
        let e = EmbeddingConfig {
            retry_delay_ms: 1000,
            retry_delay_cap_ms: 5000,
            ..Default::default()
        };
        let delays: Vec<u64> = (0..5).map(|n| e.retry_backoff(n).as_millis() as u64).collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 5000, 5000]);
        assert_eq!(e.retry_backoff(u32::MAX), Duration::from_millis(5000));
    }

    #[test]
    fn test_embedding_retry_settings_range_checked() {
        let too_many = EmbeddingConfig {
            max_retries: 11,
            ..Default::default()
        };
        match too_many.validate() {
            Err(ConfigError::Range { field, .. }) => assert_eq!(field, "embedding.max_retries"),
            other => panic!("Expected Range error, got {:?}", other),
        }

        let inverted = EmbeddingConfig {
            retry_delay_ms: 10_000,
            retry_delay_cap_ms: 1_000,
            ..Default::default()
        };
        assert!(matches!(inverted.validate(), Err(ConfigError::Conflict { .. })));

        let huge_cap = EmbeddingConfig {
            retry_delay_cap_ms: 3_600_000,
            ..Default::default()
        };
        assert!(matches!(huge_cap.validate(), Err(ConfigError::Range { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("ASSESSMENT_ETL_VALIDATION_LEVEL", "basic"),
            ("ASSESSMENT_ETL_WORKERS", "2"),
            ("ASSESSMENT_ETL_ALLOW_PARTIAL", "false"),
        ]
        .into_iter()
        .collect();

        let mut config = EtlConfig::default();
        config
            .apply_overrides_from(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.pipeline.validation_level, ValidationLevel::Basic);
        assert_eq!(config.executor.workers, 2);
        assert!(!config.pipeline.allow_partial_completion);
    }

    #[test]
    fn test_env_override_parse_error() {
        let mut config = EtlConfig::default();
        let err = config
            .apply_overrides_from(|k| (k == "ASSESSMENT_ETL_WORKERS").then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }
}
