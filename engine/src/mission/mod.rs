//! Mission orchestration
//!
//! The mission executor wires the cognitive workflow, the collaborator
//! seams, and the learning loop into one end-to-end run per target.

pub mod collaborators;
pub mod executor;

pub use collaborators::{
    ExecutionReport, ExploitHandoff, ExploitSynthesizer, KnowledgeSource, ReconScanner, Sandbox,
};
pub use executor::{AttemptSummary, MissionExecutor, MissionReport, MissionStatus, RoleBackends};
