//! Test Doubles
//!
//! Scripted generators and recording stores shared by the pipeline unit
//! tests. Compiled only for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::json;

use crate::generator::Generator;
use crate::storage::{CorpusSummary, ProfileStore};
use crate::types::{GeneratorError, ProfileRecord, StoreError};

/// A complete candidate record with all required fields.
pub fn full_profile_json() -> String {
    json!({
        "name": "Yuki Tanaka",
        "age": 34,
        "gender": "female",
        "biography": "Marine acoustician who maps whale song.",
        "location": "Hobart, Australia",
        "language": "Japanese",
        "languages_known": ["Japanese", "English", "Ainu"],
        "occupation": "Marine acoustician",
        "education": "PhD in Bioacoustics",
        "date_of_birth": "1991-04-12",
        "personality": "Patient, wry, methodical"
    })
    .to_string()
}

// =============================================================================
// Generators
// =============================================================================

enum AfterQueue {
    RepeatLast(String),
    Fail(GeneratorError),
}

/// Replies from a fixed script, in order. Remembers the last prompt seen.
pub struct ScriptedGenerator {
    queue: Mutex<VecDeque<String>>,
    after_queue: AfterQueue,
    last_prompt: Mutex<Option<String>>,
}

impl ScriptedGenerator {
    /// Reply with each script entry in turn, repeating the final entry
    /// once the script is exhausted.
    pub fn replying(script: &[&str]) -> Self {
        let last = script.last().map(|s| s.to_string()).unwrap_or_default();
        Self {
            queue: Mutex::new(script.iter().map(|s| s.to_string()).collect()),
            after_queue: AfterQueue::RepeatLast(last),
            last_prompt: Mutex::new(None),
        }
    }

    /// Fail every invocation with the given error.
    pub fn failing(error: GeneratorError) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            after_queue: AfterQueue::Fail(error),
            last_prompt: Mutex::new(None),
        }
    }

    /// Reply with the script, then fail with the given error.
    pub fn replying_then_failing(script: &[&str], error: GeneratorError) -> Self {
        Self {
            queue: Mutex::new(script.iter().map(|s| s.to_string()).collect()),
            after_queue: AfterQueue::Fail(error),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().expect("prompt lock").clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn invoke(&self, prompt: &str) -> Result<String, GeneratorError> {
        *self.last_prompt.lock().expect("prompt lock") = Some(prompt.to_string());

        if let Some(reply) = self.queue.lock().expect("queue lock").pop_front() {
            return Ok(reply);
        }
        match &self.after_queue {
            AfterQueue::RepeatLast(reply) => Ok(reply.clone()),
            AfterQueue::Fail(error) => Err(error.clone()),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Routes replies by prompt shape instead of call order, so concurrent
/// runs always get the right stage's reply.
pub struct RoutedGenerator {
    brief: String,
    profile: String,
}

impl RoutedGenerator {
    pub fn new(brief: &str, profile: &str) -> Self {
        Self {
            brief: brief.to_string(),
            profile: profile.to_string(),
        }
    }
}

#[async_trait]
impl Generator for RoutedGenerator {
    async fn invoke(&self, prompt: &str) -> Result<String, GeneratorError> {
        if prompt.contains("[Strategy Brief]") {
            Ok(self.profile.clone())
        } else {
            Ok(self.brief.clone())
        }
    }

    fn name(&self) -> &str {
        "routed"
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Never returns; used to exercise deadline conversion.
pub struct HangingGenerator;

#[async_trait]
impl Generator for HangingGenerator {
    async fn invoke(&self, _prompt: &str) -> Result<String, GeneratorError> {
        std::future::pending().await
    }

    fn name(&self) -> &str {
        "hanging"
    }

    async fn health_check(&self) -> bool {
        false
    }
}

// =============================================================================
// Stores
// =============================================================================

/// Records insert attempts; optionally fails them all.
#[derive(Default)]
pub struct RecordingStore {
    attempts: AtomicUsize,
    rows: Mutex<Vec<Vec<String>>>,
    failure: Option<StoreError>,
}

impl RecordingStore {
    /// A store whose inserts all fail with the given error.
    pub fn failing(error: StoreError) -> Self {
        Self {
            failure: Some(error),
            ..Default::default()
        }
    }

    /// Number of insert attempts, including failed ones.
    pub fn insert_calls(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Normalized key set of the most recent successful insert.
    pub fn last_keys(&self) -> Option<Vec<String>> {
        self.rows.lock().expect("rows lock").last().cloned()
    }
}

impl ProfileStore for RecordingStore {
    fn insert_profile(&self, _run_id: &str, record: &ProfileRecord) -> Result<(), StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        self.rows
            .lock()
            .expect("rows lock")
            .push(record.keys().map(str::to_string).collect());
        Ok(())
    }

    fn corpus_summary(&self) -> Result<CorpusSummary, StoreError> {
        Ok(CorpusSummary {
            total_profiles: self.rows.lock().expect("rows lock").len() as u64,
            ..Default::default()
        })
    }

    fn profile_count(&self) -> Result<u64, StoreError> {
        Ok(self.rows.lock().expect("rows lock").len() as u64)
    }
}

/// A store that is entirely unavailable.
#[derive(Default)]
pub struct FailingStore;

impl ProfileStore for FailingStore {
    fn insert_profile(&self, _run_id: &str, _record: &ProfileRecord) -> Result<(), StoreError> {
        Err(StoreError::Pool("store unavailable".to_string()))
    }

    fn corpus_summary(&self) -> Result<CorpusSummary, StoreError> {
        Err(StoreError::Pool("store unavailable".to_string()))
    }

    fn profile_count(&self) -> Result<u64, StoreError> {
        Err(StoreError::Pool("store unavailable".to_string()))
    }
}
