//! YAML configuration for the plagiarism engine.
//!
//! One file carries every stage's knobs plus the job coordinator's. Sections
//! that are left out fall back to their defaults, so a minimal file is just
//! the version line.
//!
//! ```yaml
//! version: "1.0"
//!
//! perceptual:
//!   k: 5
//!   num_hashes: 64
//!
//! index:
//!   band_width: 4
//!   scope: assignment
//!   compression:
//!     codec: zstd
//!     level: 3
//!
//! matcher:
//!   report_threshold: 15.0
//!
//! patterns:
//!   rarity_threshold: 0.05
//!   enabled: [repetitive-structure, unusual-vocabulary, inconsistent-style, common-phrases]
//!
//! jobs:
//!   workers: 4
//!   queue_capacity: 256
//!   timeout_ms: 60000
//!   retry_ceiling: 3
//!
//! log_level: info
//! ```
//!
//! The job knobs and the log level can also be overridden from the
//! environment (`PLAGIARISM_WORKERS`, `PLAGIARISM_QUEUE_CAPACITY`,
//! `PLAGIARISM_TIMEOUT_MS`, `PLAGIARISM_RETRY_CEILING`,
//! `PLAGIARISM_LOG_LEVEL`); see [`EngineConfig::load`]. That layer is read
//! with the `config` crate; the file itself stays plain YAML.

use std::fs;
use std::path::Path;
use std::time::Duration;

use canonical::NormalizeConfig;
use index::IndexConfig;
use matcher::MatchConfig;
use patterns::PatternConfig;
use perceptual::SketchConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::retry::RetryPolicy;

/// Upper bound on the per-job deadline.
const MAX_TIMEOUT_MS: u64 = 24 * 60 * 60 * 1000;

/// Prefix of the environment overrides.
const ENV_PREFIX: &str = "PLAGIARISM";

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),

    #[error("invalid value {value} for {var}")]
    InvalidOverride { var: String, value: String },

    #[error("failed to read environment overrides: {0}")]
    Environment(#[from] config::ConfigError),
}

/// The `PLAGIARISM_*` layer; unset variables leave the file value alone.
#[derive(Debug, Default, Deserialize)]
struct EnvOverrides {
    workers: Option<usize>,
    queue_capacity: Option<usize>,
    timeout_ms: Option<u64>,
    retry_ceiling: Option<u32>,
    log_level: Option<String>,
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Configuration format version.
    pub version: String,

    /// Optional label, echoed in logs.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub canonical: NormalizeConfig,

    #[serde(default)]
    pub perceptual: SketchConfig,

    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub matcher: MatchConfig,

    #[serde(default)]
    pub patterns: PatternConfig,

    #[serde(default)]
    pub jobs: JobsConfig,

    /// Default `tracing` filter for the binary; `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a YAML configuration file from the given path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: EngineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// File (or defaults when `path` is `None`), then `PLAGIARISM_*`
    /// environment overrides, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigLoadError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(None)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `PLAGIARISM_*` overrides. `vars` replaces the process
    /// environment when given, keyed by variable name.
    pub fn apply_overrides(
        &mut self,
        vars: Option<config::Map<String, String>>,
    ) -> Result<(), ConfigLoadError> {
        let overrides: EnvOverrides = config::Config::builder()
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .source(vars),
            )
            .build()
            .and_then(|layer| layer.try_deserialize())
            .map_err(override_error)?;

        if let Some(workers) = overrides.workers {
            self.jobs.workers = workers;
        }
        if let Some(capacity) = overrides.queue_capacity {
            self.jobs.queue_capacity = capacity;
        }
        if let Some(timeout_ms) = overrides.timeout_ms {
            self.jobs.timeout_ms = timeout_ms;
        }
        if let Some(ceiling) = overrides.retry_ceiling {
            self.jobs.retry_ceiling = ceiling;
        }
        if let Some(level) = overrides.log_level {
            self.log_level = level;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.canonical
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("canonical: {e}")))?;
        self.perceptual
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("perceptual: {e}")))?;
        self.index
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("index: {e}")))?;
        self.matcher
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("matcher: {e}")))?;
        self.patterns
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("patterns: {e}")))?;
        self.jobs.validate()?;

        if self.log_level.trim().is_empty() {
            return Err(ConfigLoadError::Validation(
                "log_level must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn with_perceptual(mut self, perceptual: SketchConfig) -> Self {
        self.perceptual = perceptual;
        self
    }

    pub fn with_index(mut self, index: IndexConfig) -> Self {
        self.index = index;
        self
    }

    pub fn with_matcher(mut self, matcher: MatchConfig) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn with_patterns(mut self, patterns: PatternConfig) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn with_jobs(mut self, jobs: JobsConfig) -> Self {
        self.jobs = jobs;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            canonical: NormalizeConfig::default(),
            perceptual: SketchConfig::default(),
            index: IndexConfig::default(),
            matcher: MatchConfig::default(),
            patterns: PatternConfig::default(),
            jobs: JobsConfig::default(),
            log_level: default_log_level(),
        }
    }
}

/// Job coordinator settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct JobsConfig {
    /// Worker tasks; 0 means one per available core.
    pub workers: usize,
    /// Bounded queue slots. Admission waits for a free slot.
    pub queue_capacity: usize,
    /// Deadline for a job, measured from the request.
    pub timeout_ms: u64,
    /// Automatic retries of corpus failures before a job stays failed.
    pub retry_ceiling: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub backoff_jitter: bool,
}

impl JobsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis().min(u128::from(MAX_TIMEOUT_MS)) as u64;
        self
    }

    pub fn with_retry_ceiling(mut self, ceiling: u32) -> Self {
        self.retry_ceiling = ceiling;
        self
    }

    pub fn with_backoff(mut self, base: Duration, max: Duration, jitter: bool) -> Self {
        self.backoff_base_ms = base.as_millis() as u64;
        self.backoff_max_ms = max.as_millis() as u64;
        self.backoff_jitter = jitter;
        self
    }

    /// Effective worker count.
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            ceiling: self.retry_ceiling,
            base_delay: Duration::from_millis(self.backoff_base_ms),
            max_delay: Duration::from_millis(self.backoff_max_ms),
            jitter: self.backoff_jitter,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.queue_capacity == 0 {
            return Err(ConfigLoadError::Validation(
                "jobs.queue_capacity must be > 0".into(),
            ));
        }
        if self.timeout_ms == 0 || self.timeout_ms > MAX_TIMEOUT_MS {
            return Err(ConfigLoadError::Validation(format!(
                "jobs.timeout_ms must be in 1..={MAX_TIMEOUT_MS}"
            )));
        }
        if self.backoff_base_ms > self.backoff_max_ms {
            return Err(ConfigLoadError::Validation(
                "jobs.backoff_base_ms must not exceed jobs.backoff_max_ms".into(),
            ));
        }
        Ok(())
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            queue_capacity: 256,
            timeout_ms: 60_000,
            retry_ceiling: 3,
            backoff_base_ms: 100,
            backoff_max_ms: 5_000,
            backoff_jitter: true,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Name the variable behind a type error; anything else passes through.
fn override_error(err: config::ConfigError) -> ConfigLoadError {
    match err {
        config::ConfigError::Type {
            key: Some(key),
            unexpected,
            ..
        } => ConfigLoadError::InvalidOverride {
            var: format!("{ENV_PREFIX}_{}", key.to_uppercase()),
            value: unexpected.to_string(),
        },
        other => ConfigLoadError::Environment(other),
    }
}
