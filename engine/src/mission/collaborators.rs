//! Collaborator seams
//!
//! The mission executor drives external systems (scanner, knowledge
//! base, code synthesizer, sandbox) only through these traits. The core
//! hands code references across the sandbox seam and never executes
//! anything itself.

use crate::agents::context::{KnownVulnerability, ReconSnapshot};
use crate::learning::attempt::Outcome;
use anyhow::Result;
use async_trait::async_trait;

/// Code handed to the execution collaborator
#[derive(Debug, Clone)]
pub struct ExploitHandoff {
    /// Opaque reference the sandbox resolves (artifact id, path, url)
    pub code_ref: String,

    /// Code body; the core only measures it for reward scoring
    pub code_body: String,

    pub language: String,
    pub obfuscation_techniques: Vec<String>,
}

impl ExploitHandoff {
    /// Line count used as the code-complexity input to the reward
    pub fn code_lines(&self) -> usize {
        self.code_body.lines().count()
    }
}

/// What the sandbox reports back per attempt
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub outcome: Outcome,

    /// Wall-clock execution time in seconds
    pub execution_time: f64,

    /// Whether defensive tooling flagged the attempt
    pub detected: bool,

    pub error_message: Option<String>,
}

/// Reconnaissance collaborator: surveys a target into a structured
/// snapshot
#[async_trait]
pub trait ReconScanner: Send + Sync {
    async fn survey(&self, target: &str, ports: &[u16]) -> Result<ReconSnapshot>;
}

/// Knowledge collaborator: maps a recon snapshot to known vulnerabilities
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    async fn known_vulnerabilities(
        &self,
        recon: &ReconSnapshot,
    ) -> Result<Vec<KnownVulnerability>>;
}

/// Synthesis collaborator: turns an approved plan and a vulnerability
/// into executable code the sandbox can resolve
#[async_trait]
pub trait ExploitSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        vulnerability: &KnownVulnerability,
        tactical_plan: &str,
        language: &str,
    ) -> Result<ExploitHandoff>;
}

/// Execution collaborator: runs a handoff in isolation and reports the
/// outcome
#[async_trait]
pub trait Sandbox: Send + Sync {
    async fn execute(&self, handoff: &ExploitHandoff, timeout_seconds: u64)
        -> Result<ExecutionReport>;
}
