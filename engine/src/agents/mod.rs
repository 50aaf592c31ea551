//! Role Agents & Workflow Engine
//!
//! Drives one mission through a bounded Strategize → Plan → Critique walk.
//! Each role agent performs exactly one oracle call per state and mutates
//! the mission state in place; the workflow engine owns the transitions.

pub mod context;
pub mod critic;
pub mod planner;
pub mod state;
pub mod strategist;
pub mod workflow;

pub use context::{KnownVulnerability, MissionContext, ReconHost, ReconService, ReconSnapshot};
pub use critic::Critic;
pub use planner::Planner;
pub use state::{AgentRole, LogEntry, MissionPhase, MissionState};
pub use strategist::Strategist;
pub use workflow::{CancelHandle, WorkflowEngine, WorkflowStatus};
