//! Configuration management
//!
//! This module handles loading, validation, and management of the Talon
//! configuration. Configuration is stored in TOML format at
//! ~/.talon/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Data directory, log level
//! - **oracle**: Decision oracle backends and preferences
//! - **mission**: Workflow bounds and scan defaults
//! - **learning**: Experience store capacity and analyzer thresholds
//!
//! # Path Expansion
//!
//! The configuration system automatically expands ~ to the user's home
//! directory and creates the data directory if it doesn't exist.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
///
/// This structure represents the complete Talon configuration loaded from
/// ~/.talon/config.toml. Every section carries serde defaults, so a partial
/// file is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Decision oracle configuration
    #[serde(default)]
    pub oracle: OracleConfig,

    /// Mission workflow configuration
    #[serde(default)]
    pub mission: MissionSettings,

    /// Learning loop configuration
    #[serde(default)]
    pub learning: LearningSettings,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Data directory path (supports ~ expansion); holds the experience db
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Decision oracle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Default backend name (openai, gemini)
    #[serde(default = "default_backend")]
    pub default_backend: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// OpenAI-compatible backend settings
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Gemini backend settings
    #[serde(default)]
    pub gemini: GeminiConfig,
}

/// OpenAI-compatible backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Base URL for the chat-completions API
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_openai_model")]
    pub model: String,
    // Note: API key comes from the OPENAI_API_KEY environment variable
}

/// Gemini backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Base URL for the generateContent API
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_gemini_model")]
    pub model: String,
    // Note: API key comes from the GEMINI_API_KEY environment variable
}

/// Mission workflow configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionSettings {
    /// Maximum Plan→Critique revision cycles per mission
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Default ports handed to the recon collaborator
    #[serde(default = "default_scan_ports")]
    pub scan_ports: Vec<u16>,

    /// Per-attempt sandbox budget in seconds, forwarded to the executor
    #[serde(default = "default_attempt_timeout")]
    pub timeout_seconds: u64,

    /// Language requested from the synthesis collaborator
    #[serde(default = "default_exploit_language")]
    pub exploit_language: String,
}

/// Learning loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningSettings {
    /// Experience store capacity; oldest records evicted beyond this
    #[serde(default = "default_capacity")]
    pub capacity: u32,

    /// How many recent records success-rate analysis reads
    #[serde(default = "default_recent_window")]
    pub recent_window: u32,

    /// How many recent records failure-pattern analysis reads
    #[serde(default = "default_failure_window")]
    pub failure_window: u32,

    /// Lookahead multiplier for filtered reads (scan at most k·n records)
    #[serde(default = "default_lookahead_factor")]
    pub lookahead_factor: u32,

    /// Success rate below which feedback adds a caution clause
    #[serde(default = "default_low_success_threshold")]
    pub low_success_threshold: f64,

    /// Detection rate above which feedback emphasizes stealth
    #[serde(default = "default_high_detection_threshold")]
    pub high_detection_threshold: f64,

    /// How many strategies feedback and reports rank
    #[serde(default = "default_top_strategies")]
    pub top_strategies: usize,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.talon")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_backend() -> String {
    "openai".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash-exp".to_string()
}

fn default_max_iterations() -> u32 {
    5
}

fn default_scan_ports() -> Vec<u16> {
    vec![21, 22, 23, 80, 443, 3306, 3389, 5432, 8080]
}

fn default_attempt_timeout() -> u64 {
    30
}

fn default_exploit_language() -> String {
    "python".to_string()
}

fn default_capacity() -> u32 {
    crate::db::experience::DEFAULT_CAPACITY
}

fn default_recent_window() -> u32 {
    1000
}

fn default_failure_window() -> u32 {
    500
}

fn default_lookahead_factor() -> u32 {
    2
}

fn default_low_success_threshold() -> f64 {
    0.3
}

fn default_high_detection_threshold() -> f64 {
    0.2
}

fn default_top_strategies() -> usize {
    5
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            default_backend: default_backend(),
            request_timeout_secs: default_request_timeout(),
            openai: OpenAiConfig::default(),
            gemini: GeminiConfig::default(),
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_openai_model(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: default_gemini_base_url(),
            model: default_gemini_model(),
        }
    }
}

impl Default for MissionSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            scan_ports: default_scan_ports(),
            timeout_seconds: default_attempt_timeout(),
            exploit_language: default_exploit_language(),
        }
    }
}

impl Default for LearningSettings {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            recent_window: default_recent_window(),
            failure_window: default_failure_window(),
            lookahead_factor: default_lookahead_factor(),
            low_success_threshold: default_low_success_threshold(),
            high_detection_threshold: default_high_detection_threshold(),
            top_strategies: default_top_strategies(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            core: CoreConfig::default(),
            oracle: OracleConfig::default(),
            mission: MissionSettings::default(),
            learning: LearningSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.talon/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default one.
    pub fn load_or_create() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let mut config: Config =
            toml::from_str(&contents).context("Failed to parse config")?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let mut config = Self::default();
        config.validate_and_process()?;

        let toml_string =
            toml::to_string_pretty(&config).context("Failed to serialize config")?;
        fs::write(path, toml_string)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.talon/config.toml)
    fn default_config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".talon").join("config.toml"))
    }

    /// Path of the experience database inside the data directory
    pub fn experience_db_path(&self) -> PathBuf {
        self.core.data_dir.join("experience.db")
    }

    /// Validate fields and expand paths
    fn validate_and_process(&mut self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            anyhow::bail!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            );
        }

        let valid_backends = ["openai", "gemini"];
        if !valid_backends.contains(&self.oracle.default_backend.as_str()) {
            anyhow::bail!(
                "Invalid default backend '{}'. Must be one of: {}",
                self.oracle.default_backend,
                valid_backends.join(", ")
            );
        }

        if self.mission.max_iterations == 0 {
            anyhow::bail!("mission.max_iterations must be at least 1");
        }

        if self.learning.capacity == 0 {
            anyhow::bail!("learning.capacity must be at least 1");
        }
        if self.learning.lookahead_factor == 0 {
            anyhow::bail!("learning.lookahead_factor must be at least 1");
        }
        for (name, value) in [
            ("low_success_threshold", self.learning.low_success_threshold),
            (
                "high_detection_threshold",
                self.learning.high_detection_threshold,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                anyhow::bail!("learning.{} must be between 0.0 and 1.0", name);
            }
        }

        self.core.data_dir = expand_tilde(&self.core.data_dir)?;

        Ok(())
    }
}

/// Expand a leading ~ to the user's home directory
fn expand_tilde(path: &Path) -> Result<PathBuf> {
    let Some(s) = path.to_str() else {
        return Ok(path.to_path_buf());
    };

    if s == "~" {
        return dirs::home_dir().context("Could not determine home directory");
    }

    if let Some(rest) = s.strip_prefix("~/") {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        return Ok(home.join(rest));
    }

    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let mut config = Config::default();
        config.validate_and_process().unwrap();

        assert_eq!(config.oracle.default_backend, "openai");
        assert_eq!(config.mission.max_iterations, 5);
        assert_eq!(config.learning.capacity, 10_000);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [oracle]
            default_backend = "gemini"
            "#,
        )
        .unwrap();

        assert_eq!(config.oracle.default_backend, "gemini");
        assert_eq!(config.learning.recent_window, 1000);
        assert_eq!(config.learning.low_success_threshold, 0.3);
    }

    #[test]
    fn test_invalid_backend_rejected() {
        let mut config = Config::default();
        config.oracle.default_backend = "mainframe".to_string();

        assert!(config.validate_and_process().is_err());
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let mut config = Config::default();
        config.learning.high_detection_threshold = 1.5;

        assert!(config.validate_and_process().is_err());
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let mut config = Config::default();
        config.mission.max_iterations = 0;

        assert!(config.validate_and_process().is_err());
    }

    #[test]
    fn test_expand_tilde() {
        let expanded = expand_tilde(Path::new("~/data")).unwrap();
        assert!(!expanded.to_string_lossy().starts_with('~'));

        let absolute = expand_tilde(Path::new("/var/lib/talon")).unwrap();
        assert_eq!(absolute, PathBuf::from("/var/lib/talon"));
    }

    #[test]
    fn test_load_from_path_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::default();
        fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.oracle.default_backend, config.oracle.default_backend);
    }
}
