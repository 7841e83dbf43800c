//! Generator Abstraction
//!
//! Defines the Generator trait: given a text prompt, return free-form text.
//! This is the pipeline's only suspension point; providers are
//! network-bound, non-deterministic, and temperature-controlled, so every
//! call site wraps invocations in a bounded wait (see [`timeout`]).
//!
//! ## Modules
//!
//! - `openai`: OpenAI Chat Completions provider
//! - `ollama`: local Ollama provider
//! - `timeout`: deadline configuration and the `with_timeout` helper

mod ollama;
mod openai;
pub mod timeout;

pub use ollama::OllamaGenerator;
pub use openai::OpenAiGenerator;
pub use timeout::{TimeoutConfig, with_timeout};

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{GeneratorError, PersonaError, Result};

/// Shared generator handle for concurrent pipeline runs.
pub type SharedGenerator = Arc<dyn Generator>;

// =============================================================================
// Generator Trait
// =============================================================================

/// External text-generation service.
///
/// Implementations perform exactly one generation per `invoke` call and
/// surface upstream failures as typed [`GeneratorError`]s rather than
/// panicking or hanging.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce text for the given prompt.
    async fn invoke(&self, prompt: &str) -> std::result::Result<String, GeneratorError>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Check if the provider is reachable
    async fn health_check(&self) -> bool;
}

// =============================================================================
// Generator Configuration
// =============================================================================

/// Configuration for generator providers
///
/// API keys are handled securely: never serialized to output and redacted
/// in debug output. Providers convert the key to SecretString internally.
#[derive(Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Provider type: "openai", "ollama"
    pub provider: String,
    /// Model name (provider-specific)
    pub model: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Temperature for generation (0.0 = deterministic)
    pub temperature: f32,
    /// API key; never serialized back out
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// API base URL (for custom endpoints)
    #[serde(default)]
    pub api_base: Option<String>,
    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

impl std::fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

fn default_max_tokens() -> usize {
    4096
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: None,
            timeout_secs: crate::constants::network::DEFAULT_TIMEOUT_SECS,
            temperature: 0.7,
            api_key: None,
            api_base: None,
            max_tokens: 4096,
        }
    }
}

/// Create a shared generator from configuration
pub fn create_generator(config: &GeneratorConfig) -> Result<SharedGenerator> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiGenerator::new(config.clone())?)),
        "ollama" => Ok(Arc::new(OllamaGenerator::new(config.clone())?)),
        other => Err(PersonaError::Config(format!(
            "Unknown provider: {other}. Supported: openai, ollama"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_api_key() {
        let config = GeneratorConfig {
            api_key: Some("sk-secret".to_string()),
            ..Default::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let config = GeneratorConfig {
            provider: "carrier-pigeon".to_string(),
            ..Default::default()
        };
        assert!(create_generator(&config).is_err());
    }
}
