//! Attempt records
//!
//! One `ExploitAttempt` is recorded per completed execution report and is
//! immutable once created. Records serialize to JSON for the experience log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed classification of an attempt's execution result
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    PartialSuccess,
    Failure,
    Timeout,
    Detected,
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &str {
        match self {
            Outcome::Success => "success",
            Outcome::PartialSuccess => "partial_success",
            Outcome::Failure => "failure",
            Outcome::Timeout => "timeout",
            Outcome::Detected => "detected",
            Outcome::Error => "error",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of a single exploit attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExploitAttempt {
    pub attempt_id: String,
    pub mission_id: String,
    pub timestamp: DateTime<Utc>,

    // Context
    pub target: String,
    pub vulnerability_type: String,
    pub cve_id: Option<String>,

    // Exploit details
    pub code_ref: String,
    pub obfuscation_techniques: Vec<String>,
    pub language: String,

    // Execution
    pub outcome: Outcome,
    /// Wall-clock execution time in seconds
    pub execution_time: f64,
    pub error_message: Option<String>,

    // Reward, stamped by the learning loop before the record is stored
    pub reward: f64,

    // Metadata
    pub strategy: Option<String>,
    pub model: Option<String>,
}
