//! Synthesis Stage
//!
//! Second stage: turn a strategy brief into one candidate profile record,
//! returned as raw text exactly as the generator produced it. No parsing
//! or validation happens here; keeping synthesis oblivious to validation
//! policy means the validation rules can change without touching this
//! stage. Uniqueness of the record is a prompted constraint only.

use tracing::{debug, info};

use super::prompts;
use crate::generator::SharedGenerator;
use crate::types::GeneratorError;

pub struct SynthesisStage {
    generator: SharedGenerator,
}

impl SynthesisStage {
    pub fn new(generator: SharedGenerator) -> Self {
        Self { generator }
    }

    /// Produce raw candidate-record text from a non-empty strategy brief.
    pub async fn synthesize(&self, instructions: &str) -> Result<String, GeneratorError> {
        if instructions.trim().is_empty() {
            return Err(GeneratorError::Empty);
        }

        let prompt = prompts::synthesis_prompt(instructions);
        debug!("Synthesis prompt is {} chars", prompt.len());

        let profile = self.generator.invoke(&prompt).await?;
        if profile.trim().is_empty() {
            return Err(GeneratorError::Empty);
        }

        info!("Synthesis produced {} chars of candidate text", profile.len());
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::ScriptedGenerator;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_synthesize_returns_raw_text_verbatim() {
        let raw = "not even json {";
        let generator = Arc::new(ScriptedGenerator::replying(&[raw]));

        let stage = SynthesisStage::new(generator);
        // Malformed output is passed through untouched; persistence decides
        assert_eq!(stage.synthesize("brief").await.unwrap(), raw);
    }

    #[tokio::test]
    async fn test_synthesize_embeds_instructions() {
        let generator = Arc::new(ScriptedGenerator::replying(&["{}"]));
        let stage = SynthesisStage::new(generator.clone());

        stage.synthesize("emphasize rare languages").await.unwrap();
        let prompt = generator.last_prompt().unwrap();
        assert!(prompt.contains("emphasize rare languages"));
    }

    #[tokio::test]
    async fn test_synthesize_requires_instructions() {
        let generator = Arc::new(ScriptedGenerator::replying(&["{}"]));
        let stage = SynthesisStage::new(generator);

        assert!(matches!(
            stage.synthesize("  ").await.unwrap_err(),
            GeneratorError::Empty
        ));
    }

    #[tokio::test]
    async fn test_generator_failure_propagates() {
        let generator = Arc::new(ScriptedGenerator::failing(GeneratorError::RateLimited(
            "429".to_string(),
        )));
        let stage = SynthesisStage::new(generator);

        assert!(matches!(
            stage.synthesize("brief").await.unwrap_err(),
            GeneratorError::RateLimited(_)
        ));
    }
}
