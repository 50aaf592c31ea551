//! Mission state
//!
//! One `MissionState` per mission, exclusively owned by the workflow
//! engine for the mission's lifetime. The message log is append-only and
//! stays in chronological order; entries are never mutated after append.

use super::context::MissionContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of the mission walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionPhase {
    Strategize,
    Plan,
    Critique,
    Terminated,
}

impl fmt::Display for MissionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissionPhase::Strategize => write!(f, "strategize"),
            MissionPhase::Plan => write!(f, "plan"),
            MissionPhase::Critique => write!(f, "critique"),
            MissionPhase::Terminated => write!(f, "terminated"),
        }
    }
}

/// Role agents in the workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Strategist,
    Planner,
    Critic,
}

impl AgentRole {
    pub fn as_str(&self) -> &str {
        match self {
            AgentRole::Strategist => "strategist",
            AgentRole::Planner => "planner",
            AgentRole::Critic => "critic",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the mission message log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub role: AgentRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Mutable state of one mission walk
#[derive(Debug, Clone)]
pub struct MissionState {
    pub mission_id: String,
    pub target: String,
    pub phase: MissionPhase,

    /// Read-only input attached before the walk starts
    pub context: MissionContext,

    // Agent outputs
    pub strategy: Option<String>,
    pub tactical_plan: Option<String>,
    pub critique: Option<String>,

    /// Model that served the walk's decisions, recorded for attempt metadata
    pub oracle_model: Option<String>,

    // Append-only conversation log
    messages: Vec<LogEntry>,

    /// Completed Plan→Critique cycles; never exceeds `max_iterations`
    pub iteration_count: u32,
    pub max_iterations: u32,

    pub success: bool,
    pub created_at: DateTime<Utc>,
}

impl MissionState {
    /// Create fresh state for a mission, starting at `Strategize`
    pub fn new(
        mission_id: impl Into<String>,
        target: impl Into<String>,
        context: MissionContext,
        max_iterations: u32,
    ) -> Self {
        Self {
            mission_id: mission_id.into(),
            target: target.into(),
            phase: MissionPhase::Strategize,
            context,
            strategy: None,
            tactical_plan: None,
            critique: None,
            oracle_model: None,
            messages: Vec::new(),
            iteration_count: 0,
            max_iterations,
            success: false,
            created_at: Utc::now(),
        }
    }

    /// Append one entry to the message log
    pub fn append_message(&mut self, role: AgentRole, content: impl Into<String>) {
        self.messages.push(LogEntry {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        });
    }

    /// The message log, in append order
    pub fn messages(&self) -> &[LogEntry] {
        &self.messages
    }
}
