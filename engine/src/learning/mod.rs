//! Learning Loop
//!
//! The reinforcement feedback side of the engine: every completed
//! execution is scored and appended to the experience log, and the
//! aggregated history feeds adaptive guidance back into future mission
//! prompts.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod analyzer;
pub mod attempt;
pub mod policy;
pub mod reward;

pub use analyzer::{FailureAnalysis, FailurePattern, PerformanceAnalyzer, PerformanceSnapshot, StrategyRanking};
pub use attempt::{ExploitAttempt, Outcome};
pub use policy::PromptOptimizer;

use crate::config::LearningSettings;
use crate::db::ExperienceStore;

/// Time window the aggregate report covers, in hours
const REPORT_WINDOW_HOURS: i64 = 24;

/// Aggregated performance report, the externally consumed contract.
///
/// Field names are stable: downstream dashboards and collaborators key on
/// them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub overall_performance: PerformanceSnapshot,
    pub best_strategies: Vec<StrategyRanking>,
    pub failure_analysis: FailureAnalysis,
    pub generated_at: DateTime<Utc>,
}

/// Records attempts and derives feedback from the accumulated history
pub struct LearningLoop {
    store: ExperienceStore,
    settings: LearningSettings,
}

impl LearningLoop {
    pub fn new(store: ExperienceStore, settings: LearningSettings) -> Self {
        Self { store, settings }
    }

    /// The underlying experience store
    pub fn store(&self) -> &ExperienceStore {
        &self.store
    }

    /// Score an attempt and append it to the experience log.
    ///
    /// The reward is computed here, from the outcome, execution time, code
    /// size and detection flag, and stamped on the record before it is
    /// stored. Returns the stamped reward.
    pub async fn record_attempt(
        &self,
        mut attempt: ExploitAttempt,
        code_lines: usize,
        detected: bool,
    ) -> Result<f64> {
        attempt.reward = reward::reward(attempt.outcome, attempt.execution_time, code_lines, detected);

        self.store.add(&attempt).await?;

        tracing::info!(
            attempt_id = attempt.attempt_id.as_str(),
            outcome = attempt.outcome.as_str(),
            reward = attempt.reward,
            "Recorded attempt"
        );

        Ok(attempt.reward)
    }

    /// Analyzer over the current history
    pub fn analyzer(&self) -> PerformanceAnalyzer<'_> {
        PerformanceAnalyzer::new(&self.store, self.settings.clone())
    }

    /// Adaptive feedback text for the given role and vulnerability type
    pub async fn optimize_prompt(&self, role: &str, vulnerability_type: &str) -> Result<String> {
        let analyzer = self.analyzer();
        PromptOptimizer::new(self.settings.clone())
            .optimize_prompt(&analyzer, role, vulnerability_type)
            .await
    }

    /// Generate the aggregate performance report
    pub async fn get_performance_report(&self) -> Result<PerformanceReport> {
        let analyzer = self.analyzer();

        let overall_performance = analyzer
            .analyze_success_rate(None, REPORT_WINDOW_HOURS)
            .await?;
        let best_strategies = analyzer
            .get_best_strategies(self.settings.top_strategies)
            .await?;
        let failure_analysis = analyzer.identify_failure_patterns().await?;

        Ok(PerformanceReport {
            overall_performance,
            best_strategies,
            failure_analysis,
            generated_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn attempt(id: &str, outcome: Outcome) -> ExploitAttempt {
        ExploitAttempt {
            attempt_id: id.to_string(),
            mission_id: "m-1".to_string(),
            timestamp: Utc::now(),
            target: "10.0.0.5".to_string(),
            vulnerability_type: "RCE".to_string(),
            cve_id: None,
            code_ref: format!("artifact://m-1/{}", id),
            obfuscation_techniques: vec![],
            language: "python".to_string(),
            outcome,
            execution_time: 2.0,
            error_message: None,
            reward: 0.0,
            strategy: Some("direct".to_string()),
            model: None,
        }
    }

    async fn learning_loop() -> (Database, LearningLoop) {
        let db = Database::in_memory().await.unwrap();
        let store = db.experience(1000);
        (db, LearningLoop::new(store, LearningSettings::default()))
    }

    #[tokio::test]
    async fn test_record_attempt_stamps_reward() {
        let (_db, rl) = learning_loop().await;

        let reward = rl
            .record_attempt(attempt("a-0", Outcome::Success), 10, false)
            .await
            .unwrap();
        assert_eq!(reward, 1.5);

        let stored = rl.store().get_recent(1).await.unwrap();
        assert_eq!(stored[0].reward, 1.5);
    }

    #[tokio::test]
    async fn test_report_field_shape() {
        let (_db, rl) = learning_loop().await;

        rl.record_attempt(attempt("a-0", Outcome::Success), 10, false)
            .await
            .unwrap();
        rl.record_attempt(attempt("a-1", Outcome::Failure), 10, false)
            .await
            .unwrap();

        let report = rl.get_performance_report().await.unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert!(json["overall_performance"]["success_rate"].is_number());
        assert!(json["overall_performance"]["avg_execution_time"].is_number());
        assert!(json["best_strategies"].is_array());
        assert_eq!(json["best_strategies"][0]["strategy"], "direct");
        assert!(json["failure_analysis"]["total_failures"].is_number());
        assert!(json["generated_at"].is_string());
    }

    #[tokio::test]
    async fn test_report_on_empty_history() {
        let (_db, rl) = learning_loop().await;

        let report = rl.get_performance_report().await.unwrap();
        assert_eq!(report.overall_performance.total_attempts, 0);
        assert!(report.best_strategies.is_empty());
        assert_eq!(report.failure_analysis.total_failures, 0);
    }
}
