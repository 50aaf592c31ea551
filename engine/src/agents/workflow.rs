//! Workflow Engine
//!
//! Explicit finite-state machine over one mission's walk:
//!
//! ```text
//! Strategize → Plan → Critique → Terminated
//!                ↖──────┘ (revision, bounded by max_iterations)
//! ```
//!
//! The loop is iterative with an explicit cycle counter, so stack depth is
//! constant and termination is enumerable. An oracle failure in any state
//! ends the walk immediately; cancellation is observed only between
//! states, never mid-call.

use super::critic::{is_approved, Critic};
use super::planner::Planner;
use super::state::{MissionPhase, MissionState};
use super::strategist::Strategist;
use crate::llm::DecisionOracle;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared with the caller.
///
/// Setting it does not interrupt an in-flight oracle call; the walk
/// observes the flag at the next state boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Terminal status of a workflow walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowStatus {
    /// The critic approved a plan
    Completed,

    /// Every revision cycle was spent without an approval
    FailedMaxIterations,

    /// An oracle call failed; the walk was not retried
    Failed { error: String },

    /// The caller cancelled the walk between states
    Cancelled,
}

/// Drives one mission state through the role agents to termination
pub struct WorkflowEngine {
    oracle: Arc<DecisionOracle>,
    strategist: Strategist,
    planner: Planner,
    critic: Critic,
}

impl WorkflowEngine {
    pub fn new(
        oracle: Arc<DecisionOracle>,
        strategist: Strategist,
        planner: Planner,
        critic: Critic,
    ) -> Self {
        Self {
            oracle,
            strategist,
            planner,
            critic,
        }
    }

    /// Walk the mission state to a terminal phase.
    ///
    /// `iteration_count` counts completed Plan→Critique cycles: with
    /// `max_iterations = 3` and a critic that never approves, exactly
    /// three cycles run before the walk terminates.
    pub async fn run(&self, state: &mut MissionState, cancel: &CancelHandle) -> WorkflowStatus {
        loop {
            if cancel.is_cancelled() {
                tracing::info!(
                    mission_id = state.mission_id.as_str(),
                    phase = %state.phase,
                    "Mission cancelled"
                );
                state.phase = MissionPhase::Terminated;
                return WorkflowStatus::Cancelled;
            }

            match state.phase {
                MissionPhase::Strategize => {
                    if let Err(e) = self.strategist.analyze(&self.oracle, state).await {
                        return self.fail(state, "strategize", e);
                    }
                    state.phase = MissionPhase::Plan;
                }

                MissionPhase::Plan => {
                    if let Err(e) = self.planner.plan(&self.oracle, state).await {
                        return self.fail(state, "plan", e);
                    }
                    state.phase = MissionPhase::Critique;
                }

                MissionPhase::Critique => {
                    if let Err(e) = self.critic.critique(&self.oracle, state).await {
                        return self.fail(state, "critique", e);
                    }

                    // One Plan→Critique cycle is now complete
                    state.iteration_count += 1;

                    let approved = state
                        .critique
                        .as_deref()
                        .map(is_approved)
                        .unwrap_or(false);

                    if approved {
                        tracing::info!(
                            mission_id = state.mission_id.as_str(),
                            iterations = state.iteration_count,
                            "Plan approved"
                        );
                        state.success = true;
                        state.phase = MissionPhase::Terminated;
                        return WorkflowStatus::Completed;
                    }

                    if state.iteration_count >= state.max_iterations {
                        tracing::warn!(
                            mission_id = state.mission_id.as_str(),
                            iterations = state.iteration_count,
                            "No approval within iteration budget"
                        );
                        state.phase = MissionPhase::Terminated;
                        return WorkflowStatus::FailedMaxIterations;
                    }

                    state.phase = MissionPhase::Plan;
                }

                MissionPhase::Terminated => {
                    // Re-running a terminated state is a no-op
                    return if state.success {
                        WorkflowStatus::Completed
                    } else {
                        WorkflowStatus::FailedMaxIterations
                    };
                }
            }
        }
    }

    fn fail(
        &self,
        state: &mut MissionState,
        phase: &str,
        error: crate::llm::OracleError,
    ) -> WorkflowStatus {
        tracing::error!(
            mission_id = state.mission_id.as_str(),
            phase,
            error = %error,
            "Oracle call failed, terminating walk"
        );
        state.phase = MissionPhase::Terminated;
        WorkflowStatus::Failed {
            error: format!("{} failed: {}", phase, error),
        }
    }
}
