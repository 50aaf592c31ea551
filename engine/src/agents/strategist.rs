//! Strategist agent
//!
//! First state of every mission walk: reads the recon and vulnerability
//! context and produces the overall strategy the planner works from.

use super::state::{AgentRole, MissionState};
use crate::llm::DecisionOracle;

const SYSTEM_PROMPT: &str = "You are the strategist of an authorized red-team engagement.

Your role:
1. Analyze the target and the reconnaissance data
2. Define the overall engagement strategy
3. Identify the most promising attack vectors
4. Name the next objective for the planner

Think like a senior operator: weigh detection risk against speed, prefer
quiet approaches, and plan for contingencies.

Respond with a JSON object:
{
    \"strategy\": \"brief description of the overall approach\",
    \"priority_targets\": [\"target1\"],
    \"attack_vectors\": [\"vector1\"],
    \"risk_level\": \"low|medium|high\",
    \"next_action\": \"specific objective for the planner\"
}

Be concise and tactical.";

/// Strategist role agent
pub struct Strategist {
    backend: String,
    feedback: String,
}

impl Strategist {
    pub fn new(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            feedback: String::new(),
        }
    }

    /// Attach adaptive feedback text appended to the role prompt
    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = feedback.into();
        self
    }

    fn role_prompt(&self) -> String {
        if self.feedback.is_empty() {
            SYSTEM_PROMPT.to_string()
        } else {
            format!("{}\n\n{}", SYSTEM_PROMPT, self.feedback)
        }
    }

    /// Analyze the situation and write the strategy into the state
    pub async fn analyze(
        &self,
        oracle: &DecisionOracle,
        state: &mut MissionState,
    ) -> crate::llm::Result<()> {
        tracing::info!(
            mission_id = state.mission_id.as_str(),
            "[strategist] Analyzing mission"
        );

        let context = format!(
            "Target: {}\nPhase: {}\n\nReconnaissance data:\n{}\nKnown vulnerabilities:\n{}\n\nPrevious exploit attempts: {}",
            state.target,
            state.phase,
            state.context.recon.summary(),
            state.context.vulnerability_summary(),
            state.context.prior_attempts,
        );

        let completion = oracle.decide(&self.backend, &self.role_prompt(), &context).await?;

        state.oracle_model = Some(completion.model.clone());
        state.strategy = Some(completion.content.clone());
        state.append_message(AgentRole::Strategist, completion.content);

        tracing::info!(
            mission_id = state.mission_id.as_str(),
            "[strategist] Strategy defined"
        );
        Ok(())
    }
}
