//! Mission Executor
//!
//! The top of the engine: runs one mission end to end (recon, knowledge
//! attachment, the cognitive workflow walk, execution through the sandbox
//! collaborator), then records every execution report as a scored attempt
//! and attaches the aggregate performance report.
//!
//! Every mission returns a `MissionReport` with an explicit status; no
//! fault crosses the mission boundary as a panic or an unwrapped error.

use super::collaborators::{ExploitSynthesizer, KnowledgeSource, ReconScanner, Sandbox};
use crate::agents::context::MissionContext;
use crate::agents::state::MissionState;
use crate::agents::workflow::{CancelHandle, WorkflowEngine, WorkflowStatus};
use crate::agents::{Critic, Planner, Strategist};
use crate::config::MissionSettings;
use crate::learning::attempt::{ExploitAttempt, Outcome};
use crate::learning::{LearningLoop, PerformanceReport};
use crate::llm::DecisionOracle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Terminal status of a mission run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    Completed,
    Failed,
    Cancelled,
    NoTargetsFound,
}

/// One executed attempt, summarized for the mission report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptSummary {
    pub attempt_id: String,
    pub target: String,
    pub outcome: Outcome,
    pub reward: f64,
}

/// Result of one mission run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionReport {
    pub mission_id: String,
    pub target: String,
    pub status: MissionStatus,

    /// Human-readable failure cause, present when status is `Failed`
    pub error: Option<String>,

    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,

    pub hosts_found: usize,
    pub vulnerabilities_found: usize,

    pub strategy: Option<String>,
    pub plan_approved: bool,
    pub iterations: u32,

    pub attempts: Vec<AttemptSummary>,
    pub performance: Option<PerformanceReport>,
}

impl MissionReport {
    fn started(mission_id: &str, target: &str) -> Self {
        Self {
            mission_id: mission_id.to_string(),
            target: target.to_string(),
            status: MissionStatus::Failed,
            error: None,
            started_at: Utc::now(),
            completed_at: None,
            hosts_found: 0,
            vulnerabilities_found: 0,
            strategy: None,
            plan_approved: false,
            iterations: 0,
            attempts: Vec::new(),
            performance: None,
        }
    }

    fn finish(mut self, status: MissionStatus) -> Self {
        self.status = status;
        self.completed_at = Some(Utc::now());
        self
    }

    fn fail(self, error: impl Into<String>) -> Self {
        let mut report = self.finish(MissionStatus::Failed);
        report.error = Some(error.into());
        report
    }
}

/// Backend name each role agent decides through
#[derive(Debug, Clone)]
pub struct RoleBackends {
    pub strategist: String,
    pub planner: String,
    pub critic: String,
}

impl RoleBackends {
    /// Every role on the same backend
    pub fn uniform(backend: impl Into<String>) -> Self {
        let backend = backend.into();
        Self {
            strategist: backend.clone(),
            planner: backend.clone(),
            critic: backend,
        }
    }
}

/// Runs missions against the injected collaborators
pub struct MissionExecutor {
    oracle: Arc<DecisionOracle>,
    learning: Arc<LearningLoop>,
    recon: Arc<dyn ReconScanner>,
    knowledge: Arc<dyn KnowledgeSource>,
    synthesizer: Arc<dyn ExploitSynthesizer>,
    sandbox: Arc<dyn Sandbox>,
    settings: MissionSettings,
    backends: RoleBackends,
}

impl MissionExecutor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        oracle: Arc<DecisionOracle>,
        learning: Arc<LearningLoop>,
        recon: Arc<dyn ReconScanner>,
        knowledge: Arc<dyn KnowledgeSource>,
        synthesizer: Arc<dyn ExploitSynthesizer>,
        sandbox: Arc<dyn Sandbox>,
        settings: MissionSettings,
        backends: RoleBackends,
    ) -> Self {
        Self {
            oracle,
            learning,
            recon,
            knowledge,
            synthesizer,
            sandbox,
            settings,
            backends,
        }
    }

    /// Run one mission to completion.
    ///
    /// The returned report always carries an explicit status; every
    /// failure path attaches a human-readable error string instead of
    /// propagating.
    pub async fn run(&self, target: &str, cancel: &CancelHandle) -> MissionReport {
        let mission_id = Uuid::new_v4().to_string();
        let mut report = MissionReport::started(&mission_id, target);

        tracing::info!(mission_id = mission_id.as_str(), target, "Starting mission");

        // No backend at all is fatal before any phase runs
        if !self.oracle.has_backends() {
            return report.fail("No oracle backends configured");
        }

        // Phase 1: reconnaissance
        let recon = match self.recon.survey(target, &self.settings.scan_ports).await {
            Ok(snapshot) => snapshot,
            Err(e) => return report.fail(format!("reconnaissance failed: {}", e)),
        };
        report.hosts_found = recon.hosts.len();

        if recon.is_empty() {
            tracing::warn!(mission_id = mission_id.as_str(), "No hosts found");
            return report.finish(MissionStatus::NoTargetsFound);
        }

        if cancel.is_cancelled() {
            return report.finish(MissionStatus::Cancelled);
        }

        // Phase 2: knowledge attachment
        let vulnerabilities = match self.knowledge.known_vulnerabilities(&recon).await {
            Ok(vulns) => vulns,
            Err(e) => return report.fail(format!("knowledge lookup failed: {}", e)),
        };
        report.vulnerabilities_found = vulnerabilities.len();

        let prior_attempts = self
            .learning
            .store()
            .len()
            .await
            .unwrap_or_default() as usize;

        let context = MissionContext {
            recon,
            vulnerabilities: vulnerabilities.clone(),
            prior_attempts,
        };

        // Phase 3: cognitive walk, with adaptive feedback folded into the
        // role prompts
        let vuln_type = vulnerabilities
            .first()
            .map(|v| v.vulnerability_type.clone())
            .unwrap_or_else(|| "general".to_string());

        let mut state = MissionState::new(
            &mission_id,
            target,
            context,
            self.settings.max_iterations,
        );

        let engine = WorkflowEngine::new(
            Arc::clone(&self.oracle),
            Strategist::new(&self.backends.strategist)
                .with_feedback(self.feedback_for("strategist", &vuln_type).await),
            Planner::new(&self.backends.planner)
                .with_feedback(self.feedback_for("planner", &vuln_type).await),
            Critic::new(&self.backends.critic),
        );

        let workflow_status = engine.run(&mut state, cancel).await;

        report.strategy = state.strategy.clone();
        report.iterations = state.iteration_count;
        report.plan_approved = state.success;

        match workflow_status {
            WorkflowStatus::Failed { error } => return report.fail(error),
            WorkflowStatus::Cancelled => return report.finish(MissionStatus::Cancelled),
            WorkflowStatus::Completed | WorkflowStatus::FailedMaxIterations => {}
        }

        // Phase 4: execution through the sandbox, one attempt per
        // completed execution report
        let plan = state.tactical_plan.clone().unwrap_or_default();
        let strategy_label = strategy_label(&plan);

        for vulnerability in &vulnerabilities {
            if cancel.is_cancelled() {
                return report.finish(MissionStatus::Cancelled);
            }

            let handoff = match self
                .synthesizer
                .synthesize(vulnerability, &plan, &self.settings.exploit_language)
                .await
            {
                Ok(handoff) => handoff,
                Err(e) => {
                    tracing::warn!(
                        mission_id = mission_id.as_str(),
                        vulnerability = vulnerability.vulnerability_type.as_str(),
                        error = %e,
                        "Synthesis failed, skipping vulnerability"
                    );
                    continue;
                }
            };

            let execution = match self
                .sandbox
                .execute(&handoff, self.settings.timeout_seconds)
                .await
            {
                Ok(execution) => execution,
                Err(e) => {
                    tracing::warn!(
                        mission_id = mission_id.as_str(),
                        code_ref = handoff.code_ref.as_str(),
                        error = %e,
                        "Sandbox reported no outcome, skipping attempt"
                    );
                    continue;
                }
            };

            let attempt = ExploitAttempt {
                attempt_id: Uuid::new_v4().to_string(),
                mission_id: mission_id.clone(),
                timestamp: Utc::now(),
                target: vulnerability.host.clone(),
                vulnerability_type: vulnerability.vulnerability_type.clone(),
                cve_id: vulnerability.cve_id.clone(),
                code_ref: handoff.code_ref.clone(),
                obfuscation_techniques: handoff.obfuscation_techniques.clone(),
                language: handoff.language.clone(),
                outcome: execution.outcome,
                execution_time: execution.execution_time,
                error_message: execution.error_message.clone(),
                reward: 0.0,
                strategy: Some(strategy_label.clone()),
                model: state.oracle_model.clone(),
            };

            let attempt_id = attempt.attempt_id.clone();
            let attempt_target = attempt.target.clone();
            let outcome = attempt.outcome;

            match self
                .learning
                .record_attempt(attempt, handoff.code_lines(), execution.detected)
                .await
            {
                Ok(reward) => report.attempts.push(AttemptSummary {
                    attempt_id,
                    target: attempt_target,
                    outcome,
                    reward,
                }),
                Err(e) => {
                    tracing::error!(
                        mission_id = mission_id.as_str(),
                        error = %e,
                        "Failed to record attempt"
                    );
                }
            }
        }

        // Phase 5: aggregate report
        match self.learning.get_performance_report().await {
            Ok(performance) => report.performance = Some(performance),
            Err(e) => {
                tracing::error!(mission_id = mission_id.as_str(), error = %e, "Report generation failed");
            }
        }

        tracing::info!(
            mission_id = mission_id.as_str(),
            attempts = report.attempts.len(),
            "Mission completed"
        );
        report.finish(MissionStatus::Completed)
    }

    /// Adaptive feedback is advisory: a failure to compose it logs and
    /// yields the empty baseline rather than blocking the mission
    async fn feedback_for(&self, role: &str, vuln_type: &str) -> String {
        match self.learning.optimize_prompt(role, vuln_type).await {
            Ok(feedback) => feedback,
            Err(e) => {
                tracing::warn!(role, error = %e, "Feedback composition failed, using baseline");
                String::new()
            }
        }
    }
}

/// Strategy label attempts are grouped under in the rankings.
///
/// Prefers the plan's own `selected_approach` field when the planner
/// produced a structured plan; otherwise a fixed label.
fn strategy_label(plan: &str) -> String {
    if let Some(start) = plan.find('{') {
        if let Some(json_str) = crate::llm::extract_balanced_json(&plan[start..]) {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(json_str) {
                if let Some(approach) = value.get("selected_approach").and_then(|v| v.as_str()) {
                    if !approach.is_empty() {
                        return approach.to_string();
                    }
                }
            }
        }
    }
    "cognitive_workflow".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_label_prefers_selected_approach() {
        let plan = r#"{"objective": "get in", "selected_approach": "slow_and_low", "steps": []}"#;
        assert_eq!(strategy_label(plan), "slow_and_low");
    }

    #[test]
    fn test_strategy_label_falls_back_on_free_text() {
        assert_eq!(strategy_label("step 1: knock on the door"), "cognitive_workflow");
        assert_eq!(strategy_label(""), "cognitive_workflow");
    }

    #[test]
    fn test_mission_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&MissionStatus::NoTargetsFound).unwrap(),
            r#""no_targets_found""#
        );
    }
}
