//! Critic agent
//!
//! Reviews the planner's output and either approves it or sends the walk
//! back for another revision cycle. The verdict parser is deliberately
//! strict: silence or ambiguous wording means needs-revision, never
//! approval.

use super::state::{AgentRole, MissionState};
use crate::llm::{extract_balanced_json, DecisionOracle};

const SYSTEM_PROMPT: &str = "You are the critic of an authorized red-team engagement. Your job is to be the devil's advocate and attack the plan before the target can.

Review the tactical plan for:
1. Logic flaws: will the steps actually achieve the objective?
2. Detection risk: will this trip IDS/IPS or WAF rules?
3. Operational security: traces left behind, attribution risk

Respond with a JSON object:
{
    \"approved\": true or false,
    \"severity_issues\": [\"critical issue\"],
    \"warnings\": [\"warning\"],
    \"suggestions\": [\"improvement\"],
    \"detection_risk\": \"low|medium|high\"
}

Only set approved to true when the plan needs no further revision.
Be harsh but constructive.";

/// Critic role agent
pub struct Critic {
    backend: String,
}

impl Critic {
    pub fn new(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
        }
    }

    /// Critique the current tactical plan and write the verdict text into
    /// the state
    pub async fn critique(
        &self,
        oracle: &DecisionOracle,
        state: &mut MissionState,
    ) -> crate::llm::Result<()> {
        tracing::info!(
            mission_id = state.mission_id.as_str(),
            iteration = state.iteration_count,
            "[critic] Reviewing plan"
        );

        let context = format!(
            "Review this tactical plan:\n\n{}\n\nTarget context:\n- Target: {}\n- Vulnerability: {}\n\nProvide your verdict.",
            state.tactical_plan.as_deref().unwrap_or("(no plan)"),
            state.target,
            state
                .context
                .vulnerabilities
                .first()
                .map(|v| v.summary())
                .unwrap_or_else(|| "unknown".to_string()),
        );

        let completion = oracle.decide(&self.backend, SYSTEM_PROMPT, &context).await?;

        state.critique = Some(completion.content.clone());
        state.append_message(AgentRole::Critic, completion.content);

        tracing::info!(
            mission_id = state.mission_id.as_str(),
            "[critic] Critique completed"
        );
        Ok(())
    }
}

/// Judge whether a critique text is an explicit approval.
///
/// Two accepted forms, checked in order:
/// 1. a structured verdict object whose `approved` field is a boolean
///    (found anywhere in the text, fenced or inline);
/// 2. a line consisting solely of the marker `APPROVED`.
///
/// Anything else is needs-revision, including silence, prose that
/// merely mentions approval, and malformed verdict objects.
pub fn is_approved(critique: &str) -> bool {
    if let Some(start) = critique.find('{') {
        if let Some(json_str) = extract_balanced_json(&critique[start..]) {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(json_str) {
                if let Some(approved) = value.get("approved").and_then(|v| v.as_bool()) {
                    return approved;
                }
            }
        }
    }

    critique
        .lines()
        .any(|line| line.trim() == "APPROVED")
}
