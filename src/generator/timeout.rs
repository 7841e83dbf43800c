//! Bounded Waits
//!
//! A stage that never returns is a defect the orchestrator must convert to
//! a failed run, not a hang. Every generator invocation goes through
//! [`with_timeout`]; the per-stage deadlines live in [`TimeoutConfig`].

use std::future::Future;
use std::time::Duration;

use crate::constants::{network, pipeline};
use crate::types::{PersonaError, Result};

/// Deadline configuration for pipeline operations
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Deadline for a single generator request
    pub generator_request: Duration,
    /// Deadline for one full pipeline stage (generator call plus glue)
    pub stage: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            generator_request: Duration::from_secs(network::DEFAULT_TIMEOUT_SECS),
            stage: Duration::from_secs(pipeline::STAGE_DEADLINE_SECS),
        }
    }
}

impl TimeoutConfig {
    /// Shorter deadlines for tests and local models
    pub fn fast() -> Self {
        Self {
            generator_request: Duration::from_secs(30),
            stage: Duration::from_secs(45),
        }
    }
}

/// Execute an async operation with a deadline.
///
/// Returns `PersonaError::Timeout` naming the operation if the future does
/// not complete within `timeout`.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(PersonaError::timeout(operation_name, timeout)),
    }
}
