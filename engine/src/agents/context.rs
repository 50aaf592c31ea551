//! Mission context
//!
//! Typed, read-only input handed to the role agents: what reconnaissance
//! saw, which vulnerabilities are known, and how many attempts came
//! before. Collaborators produce these records; the core only renders
//! them into oracle context text.

use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// One open service on a surveyed host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconService {
    pub port: u16,
    pub name: String,
    pub version: Option<String>,
    pub banner: Option<String>,
}

/// One surveyed host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconHost {
    pub ip: String,
    pub hostname: Option<String>,
    pub os: Option<String>,
    pub services: Vec<ReconService>,
}

/// Structured reconnaissance snapshot (hosts → services → banners)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconSnapshot {
    pub hosts: Vec<ReconHost>,
}

impl ReconSnapshot {
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Render the snapshot as indented text for oracle context
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for host in &self.hosts {
            let _ = writeln!(
                out,
                "- {} ({})",
                host.ip,
                host.os.as_deref().unwrap_or("os unknown")
            );
            for service in &host.services {
                let _ = write!(out, "    {}/{}", service.port, service.name);
                if let Some(version) = &service.version {
                    let _ = write!(out, " {}", version);
                }
                if let Some(banner) = &service.banner {
                    let _ = write!(out, " [{}]", banner);
                }
                out.push('\n');
            }
        }
        out
    }
}

/// One known vulnerability attached to a surveyed service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnownVulnerability {
    pub host: String,
    pub port: u16,
    pub service: String,
    pub vulnerability_type: String,
    pub cve_id: Option<String>,
    pub severity: String,
    pub description: String,
}

impl KnownVulnerability {
    /// One-line rendering for oracle context
    pub fn summary(&self) -> String {
        format!(
            "- {} on {}:{} ({}) severity {}{}",
            self.vulnerability_type,
            self.host,
            self.port,
            self.service,
            self.severity,
            self.cve_id
                .as_deref()
                .map(|c| format!(" [{}]", c))
                .unwrap_or_default()
        )
    }
}

/// Read-only context a mission starts from
#[derive(Debug, Clone, Default)]
pub struct MissionContext {
    pub recon: ReconSnapshot,
    pub vulnerabilities: Vec<KnownVulnerability>,
    pub prior_attempts: usize,
}

impl MissionContext {
    /// Render the vulnerability list as text, one per line
    pub fn vulnerability_summary(&self) -> String {
        if self.vulnerabilities.is_empty() {
            return "(none known)".to_string();
        }
        self.vulnerabilities
            .iter()
            .map(KnownVulnerability::summary)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
