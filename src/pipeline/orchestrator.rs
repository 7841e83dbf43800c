//! Pipeline Orchestrator (direct topology)
//!
//! Sequences the three stages as plain calls, owns the StageContract, and
//! maps each stage's result onto the status machine:
//!
//! ```text
//! PENDING --analyze ok--> ANALYZED --synthesize ok--> SYNTHESIZED --persist ok--> PERSISTED
//! PENDING/ANALYZED/SYNTHESIZED --any stage error--> FAILED (terminal)
//! ```
//!
//! There is no retry across stage boundaries: a stage failure halts the
//! run immediately and the terminal contract names the failing stage.
//! Each generator-bound stage runs under a deadline so a hung generator
//! becomes a failed run, not a stuck process.

use futures::future::join_all;
use tracing::{info, warn};

use super::analysis::AnalysisStage;
use super::contract::{PipelineStatus, StageContract};
use super::persistence::PersistenceStage;
use super::synthesis::SynthesisStage;
use crate::generator::timeout::{TimeoutConfig, with_timeout};
use crate::generator::SharedGenerator;
use crate::storage::SharedStore;
use crate::types::{GeneratorError, PersonaError, Result};

pub struct Orchestrator {
    analysis: AnalysisStage,
    synthesis: SynthesisStage,
    persistence: PersistenceStage,
    timeouts: TimeoutConfig,
}

impl Orchestrator {
    pub fn new(generator: SharedGenerator, store: SharedStore) -> Self {
        Self::with_timeouts(generator, store, TimeoutConfig::default())
    }

    pub fn with_timeouts(
        generator: SharedGenerator,
        store: SharedStore,
        timeouts: TimeoutConfig,
    ) -> Self {
        Self {
            analysis: AnalysisStage::new(generator.clone(), store.clone()),
            synthesis: SynthesisStage::new(generator),
            persistence: PersistenceStage::new(store),
            timeouts,
        }
    }

    /// Execute one pipeline run to a terminal contract.
    pub async fn run(&self) -> StageContract {
        let mut contract = StageContract::new();
        info!(run_id = %contract.run_id, "Pipeline run starting");

        // Stage 1: analysis
        match self.bounded("analysis stage", self.analysis.analyze()).await {
            Ok(brief) => {
                contract.instructions = Some(brief);
                contract.advance(PipelineStatus::Analyzed);
            }
            Err(e) => {
                warn!(run_id = %contract.run_id, "Analysis failed: {e}");
                contract.fail("analysis", e.to_string());
                return contract;
            }
        }

        // Stage 2: synthesis
        let instructions = contract.instructions.clone().unwrap_or_default();
        match self
            .bounded("synthesis stage", self.synthesis.synthesize(&instructions))
            .await
        {
            Ok(profile) => {
                contract.profile = Some(profile);
                contract.advance(PipelineStatus::Synthesized);
            }
            Err(e) => {
                warn!(run_id = %contract.run_id, "Synthesis failed: {e}");
                contract.fail("synthesis", e.to_string());
                return contract;
            }
        }

        // Stage 3: persistence. Never raises; the outcome variant decides.
        let profile = contract.profile.clone().unwrap_or_default();
        let outcome = self
            .persistence
            .persist(&contract.run_id.to_string(), &profile);
        contract.final_message = Some(outcome.message().to_string());
        if outcome.is_persisted() {
            contract.advance(PipelineStatus::Persisted);
            info!(run_id = %contract.run_id, "Pipeline run persisted one profile");
        } else {
            warn!(run_id = %contract.run_id, "Persistence failed: {}", outcome.message());
            contract.fail("persistence", outcome.message());
        }

        contract
    }

    /// Execute `count` independent runs concurrently.
    ///
    /// Runs share nothing mutable but the store, whose per-insert
    /// transaction is the isolation unit.
    pub async fn run_batch(&self, count: usize) -> Vec<StageContract> {
        join_all((0..count).map(|_| self.run())).await
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        future: impl Future<Output = std::result::Result<T, GeneratorError>>,
    ) -> Result<T> {
        with_timeout(
            self.timeouts.stage,
            async { future.await.map_err(PersonaError::from) },
            operation,
        )
        .await
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::{
        HangingGenerator, RecordingStore, RoutedGenerator, ScriptedGenerator, full_profile_json,
    };
    use std::sync::Arc;
    use std::time::Duration;

    fn tiny_timeouts() -> TimeoutConfig {
        TimeoutConfig {
            generator_request: Duration::from_millis(50),
            stage: Duration::from_millis(50),
        }
    }

    #[tokio::test]
    async fn test_happy_path_persists_one_row() {
        let generator = Arc::new(ScriptedGenerator::replying(&[
            "Emphasize rare languages.",
            &full_profile_json(),
        ]));
        let store = Arc::new(RecordingStore::default());

        let contract = Orchestrator::new(generator, store.clone()).run().await;

        assert_eq!(contract.status(), PipelineStatus::Persisted);
        assert!(contract.error().is_none());
        assert_eq!(store.insert_calls(), 1);
        assert!(contract.final_message.unwrap().contains("persisted"));
    }

    #[tokio::test]
    async fn test_analysis_failure_halts_run() {
        let generator = Arc::new(ScriptedGenerator::failing(GeneratorError::Unreachable(
            "connection refused".to_string(),
        )));
        let store = Arc::new(RecordingStore::default());

        let contract = Orchestrator::new(generator, store.clone()).run().await;

        assert_eq!(contract.status(), PipelineStatus::Failed);
        assert_eq!(contract.error().unwrap().stage, "analysis");
        assert!(contract.instructions.is_none());
        assert_eq!(store.insert_calls(), 0);
    }

    #[tokio::test]
    async fn test_synthesis_failure_names_stage() {
        let generator = Arc::new(ScriptedGenerator::replying_then_failing(
            &["brief"],
            GeneratorError::RateLimited("429".to_string()),
        ));
        let store = Arc::new(RecordingStore::default());

        let contract = Orchestrator::new(generator, store.clone()).run().await;

        assert_eq!(contract.status(), PipelineStatus::Failed);
        assert_eq!(contract.error().unwrap().stage, "synthesis");
        assert_eq!(store.insert_calls(), 0);
    }

    #[tokio::test]
    async fn test_unparsable_profile_fails_persistence_with_zero_writes() {
        let generator = Arc::new(ScriptedGenerator::replying(&[
            "brief",
            "Sorry, I cannot comply.",
        ]));
        let store = Arc::new(RecordingStore::default());

        let contract = Orchestrator::new(generator, store.clone()).run().await;

        assert_eq!(contract.status(), PipelineStatus::Failed);
        let failure = contract.error().unwrap();
        assert_eq!(failure.stage, "persistence");
        assert!(failure.message.contains("parse"));
        assert_eq!(store.insert_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_generator_becomes_failed_run() {
        let generator = Arc::new(HangingGenerator);
        let store = Arc::new(RecordingStore::default());

        let contract = Orchestrator::with_timeouts(generator, store, tiny_timeouts())
            .run()
            .await;

        assert_eq!(contract.status(), PipelineStatus::Failed);
        assert_eq!(contract.error().unwrap().stage, "analysis");
        assert!(contract.error().unwrap().message.contains("timeout"));
    }

    #[tokio::test]
    async fn test_batch_runs_are_independent() {
        // Concurrent runs interleave generator calls, so route replies by
        // prompt shape instead of by order
        let generator = Arc::new(RoutedGenerator::new("brief", &full_profile_json()));
        let store = Arc::new(RecordingStore::default());

        let contracts = Orchestrator::new(generator, store.clone()).run_batch(3).await;

        assert_eq!(contracts.len(), 3);
        assert!(contracts.iter().all(|c| c.status() == PipelineStatus::Persisted));
        assert_eq!(store.insert_calls(), 3);

        // Each run persisted under its own id
        let ids: std::collections::HashSet<_> =
            contracts.iter().map(|c| c.run_id).collect();
        assert_eq!(ids.len(), 3);
    }
}
