//! Engine configuration
//!
//! Loaded from YAML or TOML. Every field has a default, so an empty file is
//! a valid configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tsr_reconcile::MismatchPolicy;

use crate::state::Operation;

/// Default per-operation timeouts in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub create_secs: u64,
    pub read_secs: u64,
    pub update_secs: u64,
    pub delete_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create_secs: 1200,
            read_secs: 300,
            update_secs: 1200,
            delete_secs: 1200,
        }
    }
}

impl Timeouts {
    /// Bound applied to each fetch/send of an operation
    #[must_use]
    pub fn for_operation(&self, operation: Operation) -> Duration {
        Duration::from_secs(match operation {
            Operation::Create => self.create_secs,
            Operation::Read => self.read_secs,
            Operation::Update => self.update_secs,
            Operation::Restore => self.delete_secs,
        })
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub timeouts: Timeouts,
    /// Handling of configured/remote shape mismatches
    pub mismatch_policy: MismatchPolicy,
    /// `tracing_subscriber::EnvFilter` directive used by binaries
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeouts: Timeouts::default(),
            mismatch_policy: MismatchPolicy::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl EngineConfig {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_mismatch_policy(mut self, policy: MismatchPolicy) -> Self {
        self.mismatch_policy = policy;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// # Errors
    /// Returns error on malformed YAML.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// # Errors
    /// Returns error on malformed TOML.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a `.yaml`, `.yml` or `.toml` file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed, or has another
    /// extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let text = std::fs::read_to_string(path)?;
        match extension.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&text),
            "toml" => Self::from_toml_str(&text),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unsupported configuration format: {0} (expected .yaml, .yml or .toml)")]
    UnsupportedFormat(String),
}
