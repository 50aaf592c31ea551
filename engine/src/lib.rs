//! Talon Engine Library
//!
//! Closed-loop decision and learning engine: a bounded multi-agent
//! workflow produces strategy, plan and critique for a mission, and a
//! reinforcement feedback loop scores every attempt to steer the next one.
//! This library is used by both the talon binary and integration tests.

/// Configuration management module
pub mod config;

/// Database persistence module
pub mod db;

/// Decision oracle abstraction layer
pub mod llm;

/// Role agents and workflow engine
pub mod agents;

/// Reward, analysis and adaptive feedback
pub mod learning;

/// Mission orchestration module
pub mod mission;

/// Telemetry and observability
pub mod telemetry;
