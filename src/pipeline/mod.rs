//! Profile Pipeline
//!
//! The fixed three-stage pipeline (Analyze -> Synthesize -> Persist) that
//! produces one validated profile row per run, plus the two dispatch
//! topologies that drive it:
//!
//! - [`orchestrator::Orchestrator`]: direct sequential call chain
//! - [`handoff::HandoffPipeline`]: peer-to-peer handoff dispatch
//!
//! Both topologies own a [`contract::StageContract`] and drive it to a
//! terminal status; they are observably equivalent.

pub mod analysis;
pub mod contract;
pub mod handoff;
pub mod orchestrator;
pub mod persistence;
pub mod prompts;
pub mod synthesis;

#[cfg(test)]
pub(crate) mod testing;

pub use analysis::AnalysisStage;
pub use contract::{PipelineStatus, StageContract, StageFailure};
pub use handoff::{AgentId, Handoff, HandoffAgent, HandoffPipeline, expected_next};
pub use orchestrator::Orchestrator;
pub use persistence::{PersistOutcome, PersistenceStage};
pub use synthesis::SynthesisStage;

/// Which dispatch mechanism runs the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Topology {
    /// Direct sequential call chain
    #[default]
    Direct,
    /// Peer-to-peer handoff dispatch
    Handoff,
}

impl std::str::FromStr for Topology {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "handoff" => Ok(Self::Handoff),
            other => Err(format!("Invalid topology '{other}'. Valid values: direct, handoff")),
        }
    }
}

impl std::fmt::Display for Topology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Handoff => write!(f, "handoff"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topology_parses_case_insensitively() {
        assert_eq!("Direct".parse::<Topology>().unwrap(), Topology::Direct);
        assert_eq!("HANDOFF".parse::<Topology>().unwrap(), Topology::Handoff);
        assert!("swarm".parse::<Topology>().is_err());
    }

    #[test]
    fn test_transition_table_is_linear() {
        assert_eq!(expected_next(AgentId::Analysis), Some(AgentId::Synthesis));
        assert_eq!(expected_next(AgentId::Synthesis), Some(AgentId::Persistence));
        assert_eq!(expected_next(AgentId::Persistence), None);
    }
}
