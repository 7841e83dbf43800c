//! Handoff Topology
//!
//! Decentralized dispatch for the same fixed linear pipeline: each agent
//! names the next agent to activate instead of a central orchestrator
//! calling stages in order. Routing is not trusted free-text - agent
//! identities form a closed enum and every handoff is validated against an
//! explicit transition table, so a misrouted handoff becomes a failed run.
//!
//! Structural risks this dispatcher guards against:
//! - misrouted handoff (next agent not in the transition table)
//! - missing terminal handoff (an agent completes with a non-terminal
//!   contract)
//! - a stalled agent (per-step deadline) or a routing cycle (step counter)
//!
//! Observably equivalent to [`super::orchestrator::Orchestrator`]: same
//! contract transitions, same terminal outcomes.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::analysis::AnalysisStage;
use super::contract::{PipelineStatus, StageContract};
use super::persistence::PersistenceStage;
use super::synthesis::SynthesisStage;
use crate::constants::pipeline::MAX_HANDOFFS;
use crate::generator::timeout::{TimeoutConfig, with_timeout};
use crate::generator::SharedGenerator;
use crate::storage::SharedStore;
use crate::types::Result;

// =============================================================================
// Agent Identities & Transition Table
// =============================================================================

/// Closed set of agent identities. Routing only ever names one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentId {
    Analysis,
    Synthesis,
    Persistence,
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Analysis => "analysis",
            Self::Synthesis => "synthesis",
            Self::Persistence => "persistence",
        };
        write!(f, "{name}")
    }
}

/// The only legal successor for each agent. The pipeline order is fixed;
/// anything else is a misroute.
pub fn expected_next(agent: AgentId) -> Option<AgentId> {
    match agent {
        AgentId::Analysis => Some(AgentId::Synthesis),
        AgentId::Synthesis => Some(AgentId::Persistence),
        AgentId::Persistence => None,
    }
}

/// Routing decision returned by an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handoff {
    /// Transfer control to the named agent
    Continue(AgentId),
    /// End the run; the contract must already be terminal
    Complete,
}

/// One cooperating agent in the handoff topology.
#[async_trait]
pub trait HandoffAgent: Send + Sync {
    fn id(&self) -> AgentId;

    /// Do this agent's work on the shared contract and name what happens
    /// next.
    async fn handle(&self, contract: &mut StageContract) -> Handoff;
}

// =============================================================================
// Built-in Agents
// =============================================================================

struct AnalysisAgent {
    stage: AnalysisStage,
}

#[async_trait]
impl HandoffAgent for AnalysisAgent {
    fn id(&self) -> AgentId {
        AgentId::Analysis
    }

    async fn handle(&self, contract: &mut StageContract) -> Handoff {
        match self.stage.analyze().await {
            Ok(brief) => {
                contract.instructions = Some(brief);
                contract.advance(PipelineStatus::Analyzed);
                Handoff::Continue(AgentId::Synthesis)
            }
            Err(e) => {
                contract.fail("analysis", e.to_string());
                Handoff::Complete
            }
        }
    }
}

struct SynthesisAgent {
    stage: SynthesisStage,
}

#[async_trait]
impl HandoffAgent for SynthesisAgent {
    fn id(&self) -> AgentId {
        AgentId::Synthesis
    }

    async fn handle(&self, contract: &mut StageContract) -> Handoff {
        let instructions = contract.instructions.clone().unwrap_or_default();
        match self.stage.synthesize(&instructions).await {
            Ok(profile) => {
                contract.profile = Some(profile);
                contract.advance(PipelineStatus::Synthesized);
                Handoff::Continue(AgentId::Persistence)
            }
            Err(e) => {
                contract.fail("synthesis", e.to_string());
                Handoff::Complete
            }
        }
    }
}

struct PersistenceAgent {
    stage: PersistenceStage,
}

#[async_trait]
impl HandoffAgent for PersistenceAgent {
    fn id(&self) -> AgentId {
        AgentId::Persistence
    }

    async fn handle(&self, contract: &mut StageContract) -> Handoff {
        let profile = contract.profile.clone().unwrap_or_default();
        let outcome = self.stage.persist(&contract.run_id.to_string(), &profile);
        contract.final_message = Some(outcome.message().to_string());
        if outcome.is_persisted() {
            contract.advance(PipelineStatus::Persisted);
        } else {
            contract.fail("persistence", outcome.message());
        }
        Handoff::Complete
    }
}

// =============================================================================
// Handoff Pipeline
// =============================================================================

/// Dispatcher for the handoff topology.
pub struct HandoffPipeline {
    agents: Vec<Box<dyn HandoffAgent>>,
    timeouts: TimeoutConfig,
}

impl HandoffPipeline {
    /// Standard three-agent pipeline over the given generator and store.
    pub fn new(generator: SharedGenerator, store: SharedStore) -> Self {
        Self::with_timeouts(generator, store, TimeoutConfig::default())
    }

    pub fn with_timeouts(
        generator: SharedGenerator,
        store: SharedStore,
        timeouts: TimeoutConfig,
    ) -> Self {
        let agents: Vec<Box<dyn HandoffAgent>> = vec![
            Box::new(AnalysisAgent {
                stage: AnalysisStage::new(generator.clone(), store.clone()),
            }),
            Box::new(SynthesisAgent {
                stage: SynthesisStage::new(generator),
            }),
            Box::new(PersistenceAgent {
                stage: PersistenceStage::new(store),
            }),
        ];
        Self { agents, timeouts }
    }

    /// Build a pipeline from an explicit agent set. Used by tests to
    /// exercise the routing guards with misbehaving agents.
    pub fn from_agents(agents: Vec<Box<dyn HandoffAgent>>, timeouts: TimeoutConfig) -> Self {
        Self { agents, timeouts }
    }

    fn agent(&self, id: AgentId) -> Option<&dyn HandoffAgent> {
        self.agents
            .iter()
            .find(|agent| agent.id() == id)
            .map(Box::as_ref)
    }

    /// Execute one run to a terminal contract.
    pub async fn run(&self) -> StageContract {
        let mut contract = StageContract::new();
        let mut active = AgentId::Analysis;
        let mut steps: u32 = 0;
        info!(run_id = %contract.run_id, "Handoff pipeline starting at {active}");

        loop {
            steps += 1;
            if steps > MAX_HANDOFFS {
                contract.fail(
                    "handoff",
                    format!("no terminal state after {MAX_HANDOFFS} handoffs"),
                );
                break;
            }

            let Some(agent) = self.agent(active) else {
                contract.fail("handoff", format!("no agent registered for '{active}'"));
                break;
            };

            let operation = format!("{active} agent");
            let decision: Result<Handoff> = with_timeout(
                self.timeouts.stage,
                async { Ok(agent.handle(&mut contract).await) },
                &operation,
            )
            .await;

            let decision = match decision {
                Ok(decision) => decision,
                Err(e) => {
                    warn!(run_id = %contract.run_id, "Agent '{active}' timed out");
                    contract.fail("handoff", e.to_string());
                    break;
                }
            };
            debug!(run_id = %contract.run_id, "Agent '{active}' decided {decision:?}");

            match decision {
                Handoff::Complete => {
                    if !contract.status().is_terminal() {
                        contract.fail(
                            "handoff",
                            format!("agent '{active}' completed without a terminal contract"),
                        );
                    }
                    break;
                }
                Handoff::Continue(next) => {
                    if expected_next(active) != Some(next) {
                        contract.fail(
                            "handoff",
                            format!(
                                "misrouted handoff: '{active}' -> '{next}' is not in the transition table"
                            ),
                        );
                        break;
                    }
                    // An agent that failed the contract must not keep routing
                    if contract.status().is_terminal() {
                        break;
                    }
                    active = next;
                }
            }
        }

        contract
    }
}

// =============================================================================
// Tests
// =============================================================================
