//! Policy Adapter
//!
//! Turns analyzer output into feedback text appended to future role
//! prompts. Clause order is fixed so identical statistics always produce
//! identical feedback; with nothing triggered the result is an empty
//! string, which is a valid baseline.

use super::analyzer::PerformanceAnalyzer;
use crate::config::LearningSettings;
use anyhow::Result;

/// Time window the optimizer analyzes, in hours
const FEEDBACK_WINDOW_HOURS: i64 = 24;

/// How many top strategies a feedback clause enumerates
const STRATEGIES_IN_FEEDBACK: usize = 3;

/// Composes adaptive prompt feedback from aggregated performance
pub struct PromptOptimizer {
    settings: LearningSettings,
}

impl PromptOptimizer {
    pub fn new(settings: LearningSettings) -> Self {
        Self { settings }
    }

    /// Compose feedback text for a role prompt.
    ///
    /// Clauses, in fixed order, each independently optional:
    /// 1. caution when the success rate is below the low threshold;
    /// 2. stealth emphasis when the detection rate exceeds the high
    ///    threshold;
    /// 3. an enumeration of the top successful strategies;
    /// 4. a warning naming the single most frequent failure.
    pub async fn optimize_prompt(
        &self,
        analyzer: &PerformanceAnalyzer<'_>,
        role: &str,
        vulnerability_type: &str,
    ) -> Result<String> {
        let stats = analyzer
            .analyze_success_rate(Some(vulnerability_type), FEEDBACK_WINDOW_HOURS)
            .await?;
        let best_strategies = analyzer
            .get_best_strategies(self.settings.top_strategies)
            .await?;
        let failures = analyzer.identify_failure_patterns().await?;

        let mut clauses = Vec::new();

        if stats.total_attempts > 0 && stats.success_rate < self.settings.low_success_threshold {
            clauses.push(format!(
                "IMPORTANT: Success rate for {} is low ({:.1}%). \
                 Be extra careful with payload generation and validation.",
                vulnerability_type,
                stats.success_rate * 100.0
            ));
        }

        if stats.detection_rate > self.settings.high_detection_threshold {
            clauses.push(format!(
                "WARNING: Detection rate is high ({:.1}%). \
                 Prioritize stealth and obfuscation techniques.",
                stats.detection_rate * 100.0
            ));
        }

        if !best_strategies.is_empty() {
            let names: Vec<&str> = best_strategies
                .iter()
                .take(STRATEGIES_IN_FEEDBACK)
                .map(|s| s.strategy.as_str())
                .collect();
            clauses.push(format!(
                "Previously successful strategies: {}",
                names.join(", ")
            ));
        }

        if let Some(top) = failures.top_patterns.first() {
            clauses.push(format!(
                "Common failure: '{}'. Avoid this pattern.",
                top.error
            ));
        }

        let feedback = clauses.join("\n\n");
        tracing::debug!(
            role,
            vulnerability_type,
            clauses = clauses.len(),
            "Adaptive feedback composed"
        );

        Ok(feedback)
    }
}
