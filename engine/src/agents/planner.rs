//! Planner agent
//!
//! Turns the strategist's output into a concrete tactical plan. Re-entered
//! on every revision cycle when the critic sends the plan back.

use super::state::{AgentRole, MissionState};
use crate::llm::DecisionOracle;

const SYSTEM_PROMPT: &str = "You are the planner of an authorized red-team engagement.

Your role:
1. Receive the strategic objective from the strategist
2. Break it down step by step
3. Sketch several tactical approaches and estimate their success odds
4. Select the best approach and expand it into an ordered plan

Reasoning process:
Step 1: Understand the objective
Step 2: List the candidate approaches
Step 3: Walk each approach through its steps
Step 4: Identify likely failure points
Step 5: Pick the approach with the best odds

Respond with a JSON object:
{
    \"objective\": \"what we're trying to achieve\",
    \"selected_approach\": \"name\",
    \"steps\": [
        {
            \"action\": \"specific action\",
            \"expected_outcome\": \"what should happen\",
            \"fallback\": \"what to do if it fails\"
        }
    ]
}

Think step by step and show your reasoning.";

/// Planner role agent
pub struct Planner {
    backend: String,
    feedback: String,
}

impl Planner {
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

    /// Produce the tactical plan and write it into the state
    pub async fn plan(
        &self,
        oracle: &DecisionOracle,
        state: &mut MissionState,
    ) -> crate::llm::Result<()> {
        tracing::info!(
            mission_id = state.mission_id.as_str(),
            iteration = state.iteration_count,
            "[planner] Planning tactics"
        );

        let mut context = format!(
            "Strategy from the strategist:\n{}\n\nAvailable data:\n- Target: {}\n- Vulnerabilities: {} known\n- Previous attempts: {}\n",
            state.strategy.as_deref().unwrap_or("(none)"),
            state.target,
            state.context.vulnerabilities.len(),
            state.context.prior_attempts,
        );

        // On a revision cycle the critic's objections are part of the input
        if let Some(critique) = &state.critique {
            context.push_str(&format!(
                "\nThe critic rejected the previous plan:\n{}\n",
                critique
            ));
        }

        context.push_str("\nYour task: create a detailed tactical plan to execute the strategy.");

        let completion = oracle.decide(&self.backend, &self.role_prompt(), &context).await?;

        state.tactical_plan = Some(completion.content.clone());
        state.append_message(AgentRole::Planner, completion.content);

        tracing::info!(
            mission_id = state.mission_id.as_str(),
            "[planner] Tactical plan created"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_prompt_appends_feedback() {
        let planner = Planner::new("gemini").with_feedback("Previously successful strategies: x");
        let prompt = planner.role_prompt();

        assert!(prompt.starts_with(SYSTEM_PROMPT));
        assert!(prompt.contains("Previously successful strategies"));
    }
}
