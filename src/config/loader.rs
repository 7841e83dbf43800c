//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Project config (.personaweave/config.toml)
//! 3. Environment variables (PERSONAWEAVE_* prefix, `__` as separator)

use std::fs;
use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use tracing::{debug, info};

use super::types::Config;
use crate::types::{PersonaError, Result};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with the full resolution chain:
    /// defaults -> project config -> env vars
    pub fn load() -> Result<Config> {
        Self::load_with_project_file(&Self::project_config_path())
    }

    fn load_with_project_file(project_path: &Path) -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(project_path));
        }

        // e.g. PERSONAWEAVE_GENERATOR__MODEL -> generator.model
        figment = figment.merge(Env::prefixed("PERSONAWEAVE_").split("__").lowercase(true));

        let config: Config = figment
            .extract()
            .map_err(|e| PersonaError::Config(format!("Configuration error: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| PersonaError::Config(format!("Configuration error: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        PathBuf::from(".personaweave/config.toml")
    }

    /// Get project data directory
    pub fn project_dir() -> PathBuf {
        PathBuf::from(".personaweave")
    }

    /// Check if project is initialized
    pub fn is_project_initialized() -> bool {
        Self::project_dir().exists()
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Initialize project configuration
    pub fn init_project(force: bool) -> Result<PathBuf> {
        let project_dir = Self::project_dir();
        fs::create_dir_all(&project_dir)?;

        let config_path = project_dir.join("config.toml");
        if !config_path.exists() || force {
            fs::write(&config_path, Self::default_project_config())?;
            info!("Created project config: {}", config_path.display());
        } else {
            info!("Project config exists: {}", config_path.display());
        }

        Ok(project_dir)
    }

    // =========================================================================
    // Internal
    // =========================================================================

    /// Generate default project config content (TOML)
    fn default_project_config() -> String {
        r#"# PersonaWeave Project Configuration

version = "1.0"

# Generator provider settings
[generator]
provider = "openai"
# model = "gpt-4o"
timeout_secs = 120
temperature = 0.7

# Storage settings
[storage]
database_path = ".personaweave/profiles.db"
max_connections = 8

# Pipeline settings
[pipeline]
stage_timeout_secs = 180
"#
        .to_string()
    }
}
