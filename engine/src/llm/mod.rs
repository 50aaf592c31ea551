//! Decision Oracle Abstraction Layer
//!
//! This module provides a common interface for obtaining role-scoped textual
//! decisions from one or more LLM backends (OpenAI-compatible, Gemini). The
//! OracleBackend trait defines the contract every backend implements, so the
//! DecisionOracle can select a backend by name and fall back transparently.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod gemini;
pub mod openai;
pub mod oracle;

pub use oracle::DecisionOracle;

/// Result type for oracle operations
pub type Result<T> = std::result::Result<T, OracleError>;

/// Errors that can occur during oracle operations
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Message in a decision exchange
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender (system, user, assistant)
    pub role: MessageRole,

    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System message
    System,

    /// User message
    User,

    /// Assistant message
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// Completed decision from an oracle backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    /// Decision text
    pub content: String,

    /// Model that produced it
    pub model: String,
}

impl Completion {
    /// Create a new completion
    pub fn new(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
        }
    }
}

/// Oracle backend trait that all backends must implement
#[async_trait]
pub trait OracleBackend: Send + Sync {
    /// Returns the configured name of the backend (e.g., "openai", "gemini")
    fn name(&self) -> &str;

    /// Returns the estimated cost for the given token count in USD
    fn estimated_cost(&self, tokens: usize) -> f64;

    /// Produce a decision for the given message exchange
    ///
    /// # Arguments
    /// * `messages` - System role prompt followed by the mission context
    ///
    /// # Returns
    /// * `Ok(Completion)` - The decision text and the model that produced it
    /// * `Err(OracleError)` - If the request fails
    async fn complete(&self, messages: &[Message]) -> Result<Completion>;
}

/// Average characters per token (rough estimate: 1 token ≈ 4 characters)
const CHARS_PER_TOKEN: usize = 4;

/// Best-effort token estimate for cost accounting.
///
/// Deliberately crude: a pure character-count heuristic with no tokenizer
/// dependency, so estimation can never fail or block a decision call.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(CHARS_PER_TOKEN)
}

/// Extract a balanced JSON object starting at position 0 of `s`.
///
/// Counts `{` / `}` depth, respecting string literals, to find the
/// matching close brace.
pub(crate) fn extract_balanced_json(s: &str) -> Option<&str> {
    if !s.starts_with('{') {
        return None;
    }
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
