//! Learning loop integration tests
//!
//! Exercises the reward → store → analyzer → report chain end to end
//! against an in-memory database.

use chrono::Utc;
use talon_engine::config::LearningSettings;
use talon_engine::db::Database;
use talon_engine::learning::{ExploitAttempt, LearningLoop, Outcome};

fn attempt(i: usize, outcome: Outcome) -> ExploitAttempt {
    ExploitAttempt {
        attempt_id: format!("test-{}", i),
        mission_id: "mission-001".to_string(),
        timestamp: Utc::now(),
        target: "192.168.1.10".to_string(),
        vulnerability_type: "RCE".to_string(),
        cve_id: Some("CVE-2021-44228".to_string()),
        code_ref: format!("artifact://mission-001/test-{}", i),
        obfuscation_techniques: vec!["base64".to_string()],
        language: "python".to_string(),
        outcome,
        execution_time: 2.5,
        error_message: match outcome {
            Outcome::Failure => Some("payload rejected".to_string()),
            _ => None,
        },
        reward: 0.0,
        strategy: Some("direct_execution".to_string()),
        model: None,
    }
}

async fn learning_loop() -> (Database, LearningLoop) {
    let db = Database::in_memory().await.unwrap();
    let store = db.experience(10_000);
    (db, LearningLoop::new(store, LearningSettings::default()))
}

#[tokio::test]
async fn success_rate_over_mixed_outcomes_is_exact() {
    let (_db, rl) = learning_loop().await;

    // Attempt i succeeds iff i % 3 == 0: successes at 0, 3, 6, 9
    for i in 0..10 {
        let outcome = if i % 3 == 0 {
            Outcome::Success
        } else {
            Outcome::Failure
        };
        rl.record_attempt(attempt(i, outcome), 10, false)
            .await
            .unwrap();
    }

    let report = rl.get_performance_report().await.unwrap();
    let overall = &report.overall_performance;

    assert_eq!(overall.total_attempts, 10);
    assert_eq!(overall.success_rate, 0.4);
    assert_eq!(overall.detection_rate, 0.0);
}

#[tokio::test]
async fn report_carries_stable_external_field_names() {
    let (_db, rl) = learning_loop().await;

    rl.record_attempt(attempt(0, Outcome::Success), 10, false)
        .await
        .unwrap();
    rl.record_attempt(attempt(1, Outcome::Failure), 10, false)
        .await
        .unwrap();

    let report = rl.get_performance_report().await.unwrap();
    let json = serde_json::to_value(&report).unwrap();

    for key in [
        "success_rate",
        "detection_rate",
        "total_attempts",
        "avg_reward",
        "avg_execution_time",
    ] {
        assert!(
            json["overall_performance"].get(key).is_some(),
            "missing overall_performance.{}",
            key
        );
    }

    let strategy = &json["best_strategies"][0];
    for key in ["strategy", "avg_reward", "success_count", "max_reward"] {
        assert!(strategy.get(key).is_some(), "missing best_strategies[0].{}", key);
    }

    for key in ["total_failures", "unique_errors", "top_patterns"] {
        assert!(
            json["failure_analysis"].get(key).is_some(),
            "missing failure_analysis.{}",
            key
        );
    }
    let pattern = &json["failure_analysis"]["top_patterns"][0];
    assert!(pattern.get("error").is_some());
    assert!(pattern.get("count").is_some());

    assert!(json.get("generated_at").is_some());
}

#[tokio::test]
async fn rewards_are_stamped_before_storage() {
    let (_db, rl) = learning_loop().await;

    // Fast undetected success hits the reward ceiling
    let reward = rl
        .record_attempt(attempt(0, Outcome::Success), 10, false)
        .await
        .unwrap();
    assert_eq!(reward, 1.5);

    // Detection floors the reward
    let reward = rl
        .record_attempt(attempt(1, Outcome::Detected), 10, true)
        .await
        .unwrap();
    assert_eq!(reward, -1.0);

    let stored = rl.store().get_recent(2).await.unwrap();
    assert_eq!(stored[0].reward, -1.0);
    assert_eq!(stored[1].reward, 1.5);
}

#[tokio::test]
async fn capacity_bound_holds_through_the_loop() {
    let db = Database::in_memory().await.unwrap();
    let rl = LearningLoop::new(db.experience(5), LearningSettings::default());

    for i in 0..12 {
        rl.record_attempt(attempt(i, Outcome::Failure), 10, false)
            .await
            .unwrap();
    }

    let recent = rl.store().get_recent(100).await.unwrap();
    assert_eq!(recent.len(), 5);
    assert_eq!(recent[0].attempt_id, "test-11");
    assert_eq!(recent[4].attempt_id, "test-7");
}

#[tokio::test]
async fn empty_history_yields_well_formed_report_and_baseline_feedback() {
    let (_db, rl) = learning_loop().await;

    let report = rl.get_performance_report().await.unwrap();
    assert_eq!(report.overall_performance.total_attempts, 0);
    assert_eq!(report.overall_performance.success_rate, 0.0);
    assert!(report.best_strategies.is_empty());
    assert!(report.failure_analysis.top_patterns.is_empty());

    let feedback = rl.optimize_prompt("planner", "RCE").await.unwrap();
    assert_eq!(feedback, "");
}
