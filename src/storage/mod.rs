//! Storage Layer
//!
//! The durable relational sink behind the pipeline. The [`ProfileStore`]
//! trait is the narrow interface the core depends on: one transactional
//! row insert plus read-only aggregates for the analysis stage. The SQLite
//! implementation lives in [`database`].

pub mod database;

pub use database::{PoolConfig, SqliteStore};

use std::sync::Arc;

use serde::Serialize;

use crate::types::{ProfileRecord, StoreError};

/// Shared store handle for concurrent pipeline runs.
pub type SharedStore = Arc<dyn ProfileStore>;

// =============================================================================
// Store Trait
// =============================================================================

/// Durable relational sink.
///
/// `insert_profile` is the atomicity boundary: the row becomes visible in
/// full or not at all, and any failure leaves the store unchanged.
pub trait ProfileStore: Send + Sync {
    /// Insert exactly one profile row inside a transaction.
    fn insert_profile(&self, run_id: &str, record: &ProfileRecord) -> Result<(), StoreError>;

    /// Read-only aggregates over persisted profiles for analysis grounding.
    fn corpus_summary(&self) -> Result<CorpusSummary, StoreError>;

    /// Total persisted profiles.
    fn profile_count(&self) -> Result<u64, StoreError>;
}

// =============================================================================
// Corpus Summary
// =============================================================================

/// Aggregate view of the persisted corpus, fed into the analysis prompt.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CorpusSummary {
    pub total_profiles: u64,
    pub top_locations: Vec<(String, u64)>,
    pub top_occupations: Vec<(String, u64)>,
    pub top_languages: Vec<(String, u64)>,
}

impl CorpusSummary {
    /// Render the summary as prompt-ready text.
    pub fn render(&self) -> String {
        if self.total_profiles == 0 {
            return "The profile corpus is currently empty.".to_string();
        }

        let mut out = format!("The corpus holds {} profiles.\n", self.total_profiles);
        for (label, entries) in [
            ("Most common locations", &self.top_locations),
            ("Most common occupations", &self.top_occupations),
            ("Most common primary languages", &self.top_languages),
        ] {
            if entries.is_empty() {
                continue;
            }
            let rendered: Vec<String> = entries
                .iter()
                .map(|(value, count)| format!("{value} ({count})"))
                .collect();
            out.push_str(&format!("{label}: {}\n", rendered.join(", ")));
        }
        out
    }
}
