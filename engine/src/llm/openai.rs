//! OpenAI-compatible Oracle Backend
//!
//! Speaks the chat-completions protocol, which also covers self-hosted
//! OpenAI-compatible gateways when `base_url` is overridden in config.

use super::{Completion, Message, OracleBackend, OracleError};
use crate::config::OpenAiConfig;
use async_trait::async_trait;
use serde_json::json;

pub struct OpenAiBackend {
    name: String,
    config: OpenAiConfig,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiBackend {
    pub fn new(name: impl Into<String>, config: OpenAiConfig, api_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config,
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl OracleBackend for OpenAiBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn estimated_cost(&self, tokens: usize) -> f64 {
        // Approx $0.002 per 1k tokens for gpt-4o-mini class models
        (tokens as f64 / 1000.0) * 0.002
    }

    async fn complete(&self, messages: &[Message]) -> super::Result<Completion> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let api_messages: Vec<_> = messages
            .iter()
            .map(|msg| {
                json!({
                    "role": msg.role.to_string(),
                    "content": msg.content
                })
            })
            .collect();

        let payload = json!({
            "model": self.config.model,
            "messages": api_messages,
            "temperature": 0.7,
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OracleError::Timeout
                } else if e.is_connect() {
                    OracleError::ProviderUnavailable(format!(
                        "Cannot connect to {}",
                        self.config.base_url
                    ))
                } else {
                    OracleError::NetworkError(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(OracleError::AuthenticationFailed(text));
            }
            return Err(OracleError::InvalidRequest(format!("{}: {}", status, text)));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| OracleError::ParseError(e.to_string()))?;

        let content = data
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| OracleError::ParseError("No content in response".to_string()))?;

        Ok(Completion::new(content, &self.config.model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend_for(server: &MockServer) -> OpenAiBackend {
        let config = OpenAiConfig {
            base_url: server.uri(),
            model: "gpt-4o-mini".to_string(),
        };
        OpenAiBackend::new("openai", config, "test-key")
    }

    #[tokio::test]
    async fn test_complete_extracts_content() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "use the service banner"}}]
            })))
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let completion = backend
            .complete(&[Message::system("strategist"), Message::user("ctx")])
            .await
            .unwrap();

        assert_eq!(completion.content, "use the service banner");
        assert_eq!(completion.model, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_complete_maps_auth_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let err = backend.complete(&[Message::user("ctx")]).await.unwrap_err();
        assert!(matches!(err, OracleError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn test_complete_rejects_malformed_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": []
            })))
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let err = backend.complete(&[Message::user("ctx")]).await.unwrap_err();
        assert!(matches!(err, OracleError::ParseError(_)));
    }

    #[test]
    fn test_estimated_cost_scales_with_tokens() {
        let config = OpenAiConfig::default();
        let backend = OpenAiBackend::new("openai", config, "k");
        assert_eq!(backend.estimated_cost(0), 0.0);
        assert!(backend.estimated_cost(2000) > backend.estimated_cost(1000));
    }
}
