//! PersonaWeave - Multi-Agent Profile Synthesis Pipeline
//!
//! A fixed three-stage pipeline (Analyze -> Synthesize -> Persist) run by
//! cooperating agents to produce exactly one validated social-network
//! profile row per run. Malformed generator output is caught and reported
//! without ever corrupting the store.
//!
//! ## Core Pieces
//!
//! - **Generator**: external text-generation abstraction (OpenAI, Ollama)
//! - **Store**: durable relational sink (pooled SQLite)
//! - **StageContract**: the state envelope threaded through the stages
//! - **Two topologies**: direct sequential orchestration and peer-to-peer
//!   handoff dispatch, observably equivalent
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use personaweave::{Orchestrator, SqliteStore, create_generator, GeneratorConfig};
//!
//! let generator = create_generator(&GeneratorConfig::default())?;
//! let store = Arc::new(SqliteStore::open(".personaweave/profiles.db")?);
//! let contract = Orchestrator::new(generator, store).run().await;
//! println!("{}", contract.status());
//! ```
//!
//! ## Modules
//!
//! - [`generator`]: Generator trait, providers, bounded waits
//! - [`storage`]: ProfileStore trait and the SQLite implementation
//! - [`pipeline`]: contract, stages, orchestrator, handoff dispatch
//! - [`config`]: layered configuration
//! - [`types`]: error taxonomy and the profile record

pub mod cli;
pub mod config;
pub mod constants;
pub mod generator;
pub mod pipeline;
pub mod storage;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader};

// Error Types
pub use types::{GeneratorError, ParseError, PersonaError, Result, StoreError};

// Records
pub use types::{ProfileRecord, REQUIRED_FIELDS};

// Storage
pub use storage::{CorpusSummary, PoolConfig, ProfileStore, SharedStore, SqliteStore};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use pipeline::{
    AgentId, Handoff, HandoffAgent, HandoffPipeline, Orchestrator, PersistOutcome,
    PipelineStatus, StageContract, Topology,
};

// =============================================================================
// Generator Re-exports
// =============================================================================

pub use generator::{
    Generator, GeneratorConfig, OllamaGenerator, OpenAiGenerator, SharedGenerator,
    TimeoutConfig, create_generator, with_timeout,
};
