//! Decision Oracle
//!
//! Holds the set of named oracle backends injected at setup and routes each
//! role-scoped decision to the requested backend, falling back to another
//! configured backend when the requested one is absent. Backends are an
//! explicit constructor argument, never a process-wide registry.

use super::gemini::GeminiBackend;
use super::openai::OpenAiBackend;
use super::{Completion, Message, OracleBackend, OracleError};
use crate::config::OracleConfig;
use std::time::Duration;

/// Default per-request timeout in seconds
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Decision oracle over one or more named backends
pub struct DecisionOracle {
    /// Named backends in registration order; the first entry is the
    /// fallback when a requested name is absent
    backends: Vec<(String, Box<dyn OracleBackend>)>,

    /// Request-level timeout applied to every backend call
    request_timeout: Duration,
}

impl DecisionOracle {
    /// Create a new oracle from named backends
    pub fn new(backends: Vec<(String, Box<dyn OracleBackend>)>) -> Self {
        Self {
            backends,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Override the per-request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Build an oracle from config, registering every backend whose API
    /// key is present in the environment (`OPENAI_API_KEY`,
    /// `GEMINI_API_KEY`).
    ///
    /// The configured default backend registers first, making it the
    /// fallback target for unknown names. An empty result is valid here;
    /// `decide` surfaces `ProviderUnavailable` on first use.
    pub fn from_config(config: &OracleConfig) -> Self {
        let mut backends: Vec<(String, Box<dyn OracleBackend>)> = Vec::new();

        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            backends.push((
                "openai".to_string(),
                Box::new(OpenAiBackend::new("openai", config.openai.clone(), key)),
            ));
        }

        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            backends.push((
                "gemini".to_string(),
                Box::new(GeminiBackend::new("gemini", config.gemini.clone(), key)),
            ));
        }

        // Default backend first so it wins fallback selection
        if let Some(pos) = backends
            .iter()
            .position(|(name, _)| *name == config.default_backend)
        {
            backends.swap(0, pos);
        }

        let names: Vec<&str> = backends.iter().map(|(n, _)| n.as_str()).collect();
        tracing::info!(backends = ?names, "Initialized oracle backends");

        Self::new(backends)
            .with_request_timeout(Duration::from_secs(config.request_timeout_secs))
    }

    /// Names of all configured backends, in registration order
    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Whether any backend is configured
    pub fn has_backends(&self) -> bool {
        !self.backends.is_empty()
    }

    /// Select a backend by name, falling back to the first registered one.
    ///
    /// The fallback is never silent: a substitution is logged with both
    /// names so mission transcripts show which model actually answered.
    fn select(&self, name: &str) -> super::Result<&dyn OracleBackend> {
        if let Some((_, backend)) = self.backends.iter().find(|(n, _)| n == name) {
            return Ok(backend.as_ref());
        }

        match self.backends.first() {
            Some((fallback_name, backend)) => {
                tracing::warn!(
                    requested = name,
                    fallback = fallback_name.as_str(),
                    "Backend not configured, using fallback"
                );
                Ok(backend.as_ref())
            }
            None => Err(OracleError::ProviderUnavailable(
                "No oracle backends configured".to_string(),
            )),
        }
    }

    /// Obtain a role-scoped decision.
    ///
    /// Sends the role prompt as the system message and the context as the
    /// user message to the named backend. A timed-out call surfaces as
    /// `OracleError::Timeout`; the engine never retries.
    pub async fn decide(
        &self,
        backend_name: &str,
        role_prompt: &str,
        context: &str,
    ) -> super::Result<Completion> {
        let backend = self.select(backend_name)?;

        let estimated = self.estimate_request(role_prompt, context);
        tracing::debug!(
            backend = backend.name(),
            tokens = estimated.tokens,
            cost_usd = estimated.cost_usd,
            "Dispatching oracle request"
        );

        let messages = [Message::system(role_prompt), Message::user(context)];

        let result = tokio::time::timeout(self.request_timeout, backend.complete(&messages)).await;

        match result {
            Ok(Ok(completion)) => {
                tracing::debug!(backend = backend.name(), model = completion.model.as_str(), "Oracle decision received");
                Ok(completion)
            }
            Ok(Err(e)) => {
                tracing::warn!(backend = backend.name(), error = %e, "Oracle request failed");
                Err(e)
            }
            Err(_) => {
                tracing::warn!(
                    backend = backend.name(),
                    timeout_secs = self.request_timeout.as_secs(),
                    "Oracle request timed out"
                );
                Err(OracleError::Timeout)
            }
        }
    }

    /// Best-effort size/cost estimate for a decision request.
    ///
    /// Estimation never blocks the call: token counting is the crude
    /// length heuristic and the cost comes from the first registered
    /// backend, or zero when none is configured.
    pub fn estimate_request(&self, role_prompt: &str, context: &str) -> RequestEstimate {
        let tokens = super::estimate_tokens(role_prompt) + super::estimate_tokens(context);
        let cost_usd = self
            .backends
            .first()
            .map(|(_, b)| b.estimated_cost(tokens))
            .unwrap_or(0.0);

        RequestEstimate { tokens, cost_usd }
    }
}

/// Estimated size and cost of a single decision request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestEstimate {
    pub tokens: usize,
    pub cost_usd: f64,
}
