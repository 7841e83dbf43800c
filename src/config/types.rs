//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Project-level configuration lives in `.personaweave/config.toml`.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::generator::{GeneratorConfig, TimeoutConfig};
use crate::storage::PoolConfig;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Generator provider settings
    pub generator: GeneratorConfig,

    /// Storage settings
    pub storage: StorageConfig,

    /// Pipeline settings
    pub pipeline: PipelineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            generator: GeneratorConfig::default(),
            storage: StorageConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `PersonaError::Config` on validation failure.
    pub fn validate(&self) -> crate::types::Result<()> {
        if !(0.0..=2.0).contains(&self.generator.temperature) {
            return Err(crate::types::PersonaError::Config(format!(
                "Generator temperature must be between 0.0 and 2.0, got {}",
                self.generator.temperature
            )));
        }

        if self.generator.timeout_secs == 0 {
            return Err(crate::types::PersonaError::Config(
                "Generator timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.pipeline.stage_timeout_secs == 0 {
            return Err(crate::types::PersonaError::Config(
                "Pipeline stage_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.storage.max_connections == 0 {
            return Err(crate::types::PersonaError::Config(
                "Storage max_connections must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Per-stage deadlines derived from this configuration.
    pub fn timeouts(&self) -> TimeoutConfig {
        TimeoutConfig {
            generator_request: Duration::from_secs(self.generator.timeout_secs),
            stage: Duration::from_secs(self.pipeline.stage_timeout_secs),
        }
    }
}

// =============================================================================
// Storage Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database path
    pub database_path: PathBuf,

    /// Maximum pooled connections
    pub max_connections: u32,

    /// Timeout for acquiring a pooled connection (seconds)
    pub connection_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(".personaweave/profiles.db"),
            max_connections: 8,
            connection_timeout_secs: 30,
        }
    }
}

impl StorageConfig {
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            max_size: self.max_connections,
            connection_timeout_secs: self.connection_timeout_secs,
        }
    }
}

// =============================================================================
// Pipeline Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Deadline for one pipeline stage (seconds)
    pub stage_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stage_timeout_secs: crate::constants::pipeline::STAGE_DEADLINE_SECS,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_temperature_out_of_range_rejected() {
        let mut config = Config::default();
        config.generator.temperature = 3.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = Config::default();
        config.pipeline.stage_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeouts_derived_from_config() {
        let mut config = Config::default();
        config.pipeline.stage_timeout_secs = 77;
        assert_eq!(config.timeouts().stage, Duration::from_secs(77));
    }
}
