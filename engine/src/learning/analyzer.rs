//! Performance Analyzer
//!
//! Derives success/detection rates, failure clusters, and strategy
//! rankings from the experience log. Every function defines a well-formed
//! zero/empty result for an empty dataset; an empty log is a normal
//! state, not an error.

use super::attempt::{ExploitAttempt, Outcome};
use crate::config::LearningSettings;
use crate::db::ExperienceStore;
use anyhow::Result;
use chrono::{Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

/// How many successful records strategy ranking reads
const STRATEGY_WINDOW: u32 = 100;

/// Cap on reported failure patterns
const MAX_FAILURE_PATTERNS: usize = 10;

/// Aggregate rates over a recent window of attempts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceSnapshot {
    pub success_rate: f64,
    pub detection_rate: f64,
    pub total_attempts: usize,
    pub avg_reward: f64,
    pub avg_execution_time: f64,
    pub vulnerability_type: String,
}

impl PerformanceSnapshot {
    /// Snapshot of an empty dataset: all rates zero, zero attempts
    fn zeroed(vulnerability_type: &str) -> Self {
        Self {
            success_rate: 0.0,
            detection_rate: 0.0,
            total_attempts: 0,
            avg_reward: 0.0,
            avg_execution_time: 0.0,
            vulnerability_type: vulnerability_type.to_string(),
        }
    }
}

/// One recurring failure message and how often it was seen
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailurePattern {
    pub error: String,
    pub count: usize,
}

/// Clustered failure summary over a recent window
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailureAnalysis {
    pub total_failures: usize,
    pub unique_errors: usize,
    pub top_patterns: Vec<FailurePattern>,
}

impl FailureAnalysis {
    fn empty() -> Self {
        Self {
            total_failures: 0,
            unique_errors: 0,
            top_patterns: Vec::new(),
        }
    }
}

/// One strategy label ranked by observed reward
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategyRanking {
    pub strategy: String,
    pub avg_reward: f64,
    pub success_count: usize,
    pub max_reward: f64,
}

/// Analyzer over an experience store
pub struct PerformanceAnalyzer<'a> {
    store: &'a ExperienceStore,
    settings: LearningSettings,
}

impl<'a> PerformanceAnalyzer<'a> {
    pub fn new(store: &'a ExperienceStore, settings: LearningSettings) -> Self {
        Self { store, settings }
    }

    /// Compute success/detection rates over a recent time window.
    ///
    /// Reads a bounded recent slice of the log, then filters by
    /// vulnerability type (if given) and by timestamp within the last
    /// `window_hours`. An empty filtered set yields a zeroed snapshot.
    pub async fn analyze_success_rate(
        &self,
        vulnerability_type: Option<&str>,
        window_hours: i64,
    ) -> Result<PerformanceSnapshot> {
        let label = vulnerability_type.unwrap_or("all");
        let attempts = self.store.get_recent(self.settings.recent_window).await?;

        let cutoff = Utc::now() - Duration::hours(window_hours);
        let filtered: Vec<&ExploitAttempt> = attempts
            .iter()
            .filter(|a| {
                vulnerability_type
                    .map(|v| a.vulnerability_type == v)
                    .unwrap_or(true)
            })
            .filter(|a| a.timestamp >= cutoff)
            .collect();

        if filtered.is_empty() {
            return Ok(PerformanceSnapshot::zeroed(label));
        }

        let total = filtered.len();
        let successful = filtered
            .iter()
            .filter(|a| a.outcome == Outcome::Success)
            .count();
        let detected = filtered
            .iter()
            .filter(|a| a.outcome == Outcome::Detected)
            .count();

        let avg_reward = filtered.iter().map(|a| a.reward).sum::<f64>() / total as f64;
        let avg_execution_time =
            filtered.iter().map(|a| a.execution_time).sum::<f64>() / total as f64;

        Ok(PerformanceSnapshot {
            success_rate: successful as f64 / total as f64,
            detection_rate: detected as f64 / total as f64,
            total_attempts: total,
            avg_reward,
            avg_execution_time,
            vulnerability_type: label.to_string(),
        })
    }

    /// Cluster recent Failure/Error records by normalized error message.
    ///
    /// Patterns are frequency-sorted, ties in first-seen order, and capped
    /// at the ten most frequent. An empty input yields an empty analysis.
    pub async fn identify_failure_patterns(&self) -> Result<FailureAnalysis> {
        let attempts = self.store.get_recent(self.settings.failure_window).await?;

        let failures: Vec<&ExploitAttempt> = attempts
            .iter()
            .filter(|a| matches!(a.outcome, Outcome::Failure | Outcome::Error))
            .collect();

        if failures.is_empty() {
            return Ok(FailureAnalysis::empty());
        }

        // Group by normalized message, preserving first-seen order so
        // equal counts rank deterministically
        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        for attempt in &failures {
            let error = normalize_error(attempt.error_message.as_deref().unwrap_or("Unknown error"));
            if !counts.contains_key(&error) {
                order.push(error.clone());
            }
            *counts.entry(error).or_insert(0) += 1;
        }

        let unique_errors = counts.len();

        let mut patterns: Vec<FailurePattern> = order
            .into_iter()
            .map(|error| {
                let count = counts[&error];
                FailurePattern { error, count }
            })
            .collect();
        patterns.sort_by(|a, b| b.count.cmp(&a.count));
        patterns.truncate(MAX_FAILURE_PATTERNS);

        Ok(FailureAnalysis {
            total_failures: failures.len(),
            unique_errors,
            top_patterns: patterns,
        })
    }

    /// Rank strategy labels of successful attempts by mean reward.
    ///
    /// Restricted to Success records. Sorted by mean reward descending;
    /// ties keep first-seen order; truncated to `top_n`.
    pub async fn get_best_strategies(&self, top_n: usize) -> Result<Vec<StrategyRanking>> {
        let successful = self.store.get_successful(STRATEGY_WINDOW).await?;

        let mut rewards: HashMap<String, Vec<f64>> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        for attempt in &successful {
            let strategy = attempt
                .strategy
                .clone()
                .unwrap_or_else(|| "unknown".to_string());
            if !rewards.contains_key(&strategy) {
                order.push(strategy.clone());
            }
            rewards.entry(strategy).or_default().push(attempt.reward);
        }

        let mut rankings: Vec<StrategyRanking> = order
            .into_iter()
            .map(|strategy| {
                let values = &rewards[&strategy];
                let avg_reward = values.iter().sum::<f64>() / values.len() as f64;
                let max_reward = values.iter().cloned().fold(f64::MIN, f64::max);
                StrategyRanking {
                    strategy,
                    avg_reward,
                    success_count: values.len(),
                    max_reward,
                }
            })
            .collect();

        // Stable sort keeps first-seen order for equal means
        rankings.sort_by(|a, b| {
            b.avg_reward
                .partial_cmp(&a.avg_reward)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        rankings.truncate(top_n);

        Ok(rankings)
    }
}

/// Collapse volatile fragments of an error message so retries of the same
/// fault cluster together: lowercased, hex addresses and digit runs
/// replaced with placeholders, whitespace squeezed.
fn normalize_error(message: &str) -> String {
    static HEX_ADDR: OnceLock<Regex> = OnceLock::new();
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    static SPACES: OnceLock<Regex> = OnceLock::new();

    let hex = HEX_ADDR.get_or_init(|| Regex::new(r"0x[0-9a-fA-F]+").expect("Invalid hex pattern"));
    let digits = DIGITS.get_or_init(|| Regex::new(r"\d+").expect("Invalid digit pattern"));
    let spaces = SPACES.get_or_init(|| Regex::new(r"\s+").expect("Invalid space pattern"));

    let lowered = message.trim().to_lowercase();
    let no_addr = hex.replace_all(&lowered, "<addr>");
    let no_digits = digits.replace_all(&no_addr, "<n>");
    spaces.replace_all(&no_digits, " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use chrono::Utc;

    fn attempt(
        id: &str,
        outcome: Outcome,
        vuln: &str,
        reward: f64,
        strategy: Option<&str>,
        error: Option<&str>,
    ) -> ExploitAttempt {
        ExploitAttempt {
            attempt_id: id.to_string(),
            mission_id: "m-1".to_string(),
            timestamp: Utc::now(),
            target: "10.0.0.5".to_string(),
            vulnerability_type: vuln.to_string(),
            cve_id: None,
            code_ref: format!("artifact://m-1/{}", id),
            obfuscation_techniques: vec![],
            language: "python".to_string(),
            outcome,
            execution_time: 2.0,
            error_message: error.map(String::from),
            reward,
            strategy: strategy.map(String::from),
            model: None,
        }
    }

    async fn fixture() -> (Database, ExperienceStore) {
        let db = Database::in_memory().await.unwrap();
        let store = db.experience(1000);
        (db, store)
    }

    #[tokio::test]
    async fn test_success_rate_on_empty_store_is_zeroed() {
        let (_db, store) = fixture().await;
        let analyzer = PerformanceAnalyzer::new(&store, LearningSettings::default());

        let snapshot = analyzer.analyze_success_rate(None, 24).await.unwrap();
        assert_eq!(snapshot.success_rate, 0.0);
        assert_eq!(snapshot.total_attempts, 0);
        assert_eq!(snapshot.vulnerability_type, "all");
    }

    #[tokio::test]
    async fn test_success_rate_counts_outcomes() {
        let (_db, store) = fixture().await;

        store.add(&attempt("a-0", Outcome::Success, "RCE", 1.5, None, None)).await.unwrap();
        store.add(&attempt("a-1", Outcome::Failure, "RCE", -0.5, None, None)).await.unwrap();
        store.add(&attempt("a-2", Outcome::Detected, "RCE", -1.0, None, None)).await.unwrap();
        store.add(&attempt("a-3", Outcome::Success, "RCE", 1.0, None, None)).await.unwrap();

        let analyzer = PerformanceAnalyzer::new(&store, LearningSettings::default());
        let snapshot = analyzer.analyze_success_rate(None, 24).await.unwrap();

        assert_eq!(snapshot.total_attempts, 4);
        assert_eq!(snapshot.success_rate, 0.5);
        assert_eq!(snapshot.detection_rate, 0.25);
        assert!((snapshot.avg_reward - 0.25).abs() < 1e-9);
        assert!((snapshot.avg_execution_time - 2.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_success_rate_filters_by_vulnerability_type() {
        let (_db, store) = fixture().await;

        store.add(&attempt("a-0", Outcome::Success, "RCE", 1.5, None, None)).await.unwrap();
        store.add(&attempt("a-1", Outcome::Failure, "SQLI", -0.5, None, None)).await.unwrap();

        let analyzer = PerformanceAnalyzer::new(&store, LearningSettings::default());
        let snapshot = analyzer
            .analyze_success_rate(Some("SQLI"), 24)
            .await
            .unwrap();

        assert_eq!(snapshot.total_attempts, 1);
        assert_eq!(snapshot.success_rate, 0.0);
        assert_eq!(snapshot.vulnerability_type, "SQLI");
    }

    #[tokio::test]
    async fn test_failure_patterns_empty_input() {
        let (_db, store) = fixture().await;
        let analyzer = PerformanceAnalyzer::new(&store, LearningSettings::default());

        let analysis = analyzer.identify_failure_patterns().await.unwrap();
        assert_eq!(analysis.total_failures, 0);
        assert!(analysis.top_patterns.is_empty());
    }

    #[tokio::test]
    async fn test_failure_patterns_group_by_normalized_message() {
        let (_db, store) = fixture().await;

        // Same fault, different ports; normalization collapses them
        store
            .add(&attempt("a-0", Outcome::Failure, "RCE", -0.5, None, Some("connection refused on port 8080")))
            .await
            .unwrap();
        store
            .add(&attempt("a-1", Outcome::Error, "RCE", -0.2, None, Some("Connection refused on port 9090")))
            .await
            .unwrap();
        store
            .add(&attempt("a-2", Outcome::Failure, "RCE", -0.5, None, None))
            .await
            .unwrap();

        let analyzer = PerformanceAnalyzer::new(&store, LearningSettings::default());
        let analysis = analyzer.identify_failure_patterns().await.unwrap();

        assert_eq!(analysis.total_failures, 3);
        assert_eq!(analysis.unique_errors, 2);
        assert_eq!(analysis.top_patterns[0].error, "connection refused on port <n>");
        assert_eq!(analysis.top_patterns[0].count, 2);
    }

    #[tokio::test]
    async fn test_failure_patterns_ignore_non_failure_outcomes() {
        let (_db, store) = fixture().await;

        store.add(&attempt("a-0", Outcome::Timeout, "RCE", -0.3, None, Some("slow"))).await.unwrap();
        store.add(&attempt("a-1", Outcome::Detected, "RCE", -1.0, None, Some("ids"))).await.unwrap();

        let analyzer = PerformanceAnalyzer::new(&store, LearningSettings::default());
        let analysis = analyzer.identify_failure_patterns().await.unwrap();
        assert_eq!(analysis.total_failures, 0);
    }

    #[tokio::test]
    async fn test_best_strategies_rank_by_mean_reward() {
        let (_db, store) = fixture().await;

        store.add(&attempt("a-0", Outcome::Success, "RCE", 0.8, Some("phased"), None)).await.unwrap();
        store.add(&attempt("a-1", Outcome::Success, "RCE", 1.5, Some("direct"), None)).await.unwrap();
        store.add(&attempt("a-2", Outcome::Success, "RCE", 1.2, Some("phased"), None)).await.unwrap();
        store.add(&attempt("a-3", Outcome::Failure, "RCE", -0.5, Some("noisy"), None)).await.unwrap();

        let analyzer = PerformanceAnalyzer::new(&store, LearningSettings::default());
        let rankings = analyzer.get_best_strategies(5).await.unwrap();

        assert_eq!(rankings.len(), 2);
        assert_eq!(rankings[0].strategy, "direct");
        assert_eq!(rankings[0].success_count, 1);
        assert_eq!(rankings[0].max_reward, 1.5);
        assert_eq!(rankings[1].strategy, "phased");
        assert!((rankings[1].avg_reward - 1.0).abs() < 1e-9);
        assert_eq!(rankings[1].max_reward, 1.2);
    }

    #[tokio::test]
    async fn test_best_strategies_ties_keep_first_seen_order() {
        let (_db, store) = fixture().await;

        // Equal mean rewards; "alpha" seen first (stored first means it is
        // *older*, but first-seen order is over the recency scan)
        store.add(&attempt("a-0", Outcome::Success, "RCE", 1.0, Some("beta"), None)).await.unwrap();
        store.add(&attempt("a-1", Outcome::Success, "RCE", 1.0, Some("alpha"), None)).await.unwrap();

        let analyzer = PerformanceAnalyzer::new(&store, LearningSettings::default());
        let rankings = analyzer.get_best_strategies(5).await.unwrap();

        // Recency order scans a-1 first, so "alpha" precedes "beta"
        assert_eq!(rankings[0].strategy, "alpha");
        assert_eq!(rankings[1].strategy, "beta");
    }

    #[tokio::test]
    async fn test_best_strategies_truncates_to_top_n() {
        let (_db, store) = fixture().await;

        for (i, s) in ["a", "b", "c"].iter().enumerate() {
            store
                .add(&attempt(&format!("a-{}", i), Outcome::Success, "RCE", 1.0, Some(s), None))
                .await
                .unwrap();
        }

        let analyzer = PerformanceAnalyzer::new(&store, LearningSettings::default());
        let rankings = analyzer.get_best_strategies(2).await.unwrap();
        assert_eq!(rankings.len(), 2);
    }

    #[test]
    fn test_normalize_error() {
        assert_eq!(
            normalize_error("  Segfault at 0xDEADBEEF in worker 3 "),
            "segfault at <addr> in worker <n>"
        );
        assert_eq!(normalize_error("timeout after 30s"), "timeout after <n>s");
    }
}
