//! Analysis Stage
//!
//! First stage of the pipeline: ground a strategy brief in the current
//! corpus distribution. Read-only; its single product is free text for the
//! synthesis stage. The orchestrator validates nothing about the brief's
//! shape, only that it is non-empty.

use tracing::{debug, info, warn};

use super::prompts;
use crate::generator::SharedGenerator;
use crate::storage::{ProfileStore, SharedStore};
use crate::types::GeneratorError;

pub struct AnalysisStage {
    generator: SharedGenerator,
    store: SharedStore,
}

impl AnalysisStage {
    pub fn new(generator: SharedGenerator, store: SharedStore) -> Self {
        Self { generator, store }
    }

    /// Produce the strategy brief.
    ///
    /// The corpus aggregate is advisory grounding: if the store query
    /// fails, analysis proceeds against an empty-corpus note rather than
    /// failing the run. A generator failure or empty brief is fatal.
    pub async fn analyze(&self) -> Result<String, GeneratorError> {
        let summary = match self.store.corpus_summary() {
            Ok(summary) => summary.render(),
            Err(e) => {
                warn!("Corpus aggregate query failed, analyzing without grounding: {e}");
                "The profile corpus is currently empty.".to_string()
            }
        };
        debug!("Corpus grounding: {summary}");

        let prompt = prompts::analysis_prompt(&summary);
        let brief = self.generator.invoke(&prompt).await?;

        if brief.trim().is_empty() {
            return Err(GeneratorError::Empty);
        }

        info!("Analysis produced a {}-char strategy brief", brief.len());
        Ok(brief)
    }
}
