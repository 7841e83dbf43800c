//! Persistence Stage
//!
//! Final stage: validate, normalize, and write exactly one row. Malformed
//! input is a reported outcome, never a crash, and the stage fails before
//! any store interaction when the text does not parse as one record. On a
//! store failure the transaction rolls back, so a non-persisted outcome
//! always means zero rows were written.

use tracing::{info, warn};

use crate::storage::{ProfileStore, SharedStore};
use crate::types::ProfileRecord;

// =============================================================================
// Persist Outcome
// =============================================================================

/// Typed result of a persistence attempt.
///
/// The orchestrator branches on the variant; the contained message is for
/// humans and is never re-parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistOutcome {
    /// One row committed
    Persisted { message: String },
    /// The candidate text was not one well-formed record; nothing written
    ParseFailure { reason: String },
    /// The store rejected the row; the transaction was rolled back
    StoreFailure { reason: String },
}

impl PersistOutcome {
    pub fn is_persisted(&self) -> bool {
        matches!(self, Self::Persisted { .. })
    }

    /// Human-readable message for the contract's final_message field.
    pub fn message(&self) -> &str {
        match self {
            Self::Persisted { message } => message,
            Self::ParseFailure { reason } | Self::StoreFailure { reason } => reason,
        }
    }
}

// =============================================================================
// Persistence Stage
// =============================================================================

pub struct PersistenceStage {
    store: SharedStore,
}

impl PersistenceStage {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Validate and write one profile row.
    ///
    /// Ordering is load-bearing: parse, normalize, and validate all happen
    /// before the store is touched, so a parse-class failure guarantees
    /// zero writes.
    pub fn persist(&self, run_id: &str, profile: &str) -> PersistOutcome {
        let record = match ProfileRecord::parse(profile) {
            Ok(record) => record,
            Err(e) => {
                warn!("Candidate record failed to parse: {e}");
                return PersistOutcome::ParseFailure {
                    reason: format!("profile text could not be parsed: {e}"),
                };
            }
        };

        if let Err(e) = record.validate_required() {
            warn!("Candidate record incomplete: {e}");
            return PersistOutcome::ParseFailure {
                reason: format!("profile record is incomplete: {e}"),
            };
        }

        match self.store.insert_profile(run_id, &record) {
            Ok(()) => {
                info!("Persisted profile with {} fields for run {run_id}", record.len());
                PersistOutcome::Persisted {
                    message: format!(
                        "profile persisted with {} fields",
                        record.len()
                    ),
                }
            }
            Err(e) => {
                warn!("Store rejected profile row: {e}");
                PersistOutcome::StoreFailure {
                    reason: format!("store rejected the profile row: {e}"),
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
