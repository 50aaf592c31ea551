//! Google Gemini Oracle Backend
//!
//! Uses the generateContent endpoint. Gemini has no system role on this
//! API surface, so system prompts are folded into the first user turn.

use super::{Completion, Message, MessageRole, OracleBackend, OracleError};
use crate::config::GeminiConfig;
use async_trait::async_trait;
use serde_json::json;

pub struct GeminiBackend {
    name: String,
    config: GeminiConfig,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(name: impl Into<String>, config: GeminiConfig, api_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config,
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Fold our message exchange into Gemini `contents`.
    ///
    /// System messages are prepended to the first user part because the
    /// generateContent API only accepts "user" and "model" roles.
    fn convert_messages(&self, messages: &[Message]) -> Vec<serde_json::Value> {
        let mut system_text = String::new();
        let mut contents = Vec::new();

        for msg in messages {
            match msg.role {
                MessageRole::System => {
                    if !system_text.is_empty() {
                        system_text.push_str("\n\n");
                    }
                    system_text.push_str(&msg.content);
                }
                MessageRole::User => {
                    let text = if system_text.is_empty() {
                        msg.content.clone()
                    } else {
                        let combined = format!("{}\n\n{}", system_text, msg.content);
                        system_text.clear();
                        combined
                    };
                    contents.push(json!({
                        "role": "user",
                        "parts": [{"text": text}]
                    }));
                }
                MessageRole::Assistant => {
                    contents.push(json!({
                        "role": "model",
                        "parts": [{"text": msg.content}]
                    }));
                }
            }
        }

        // System prompt with no user turn after it still has to reach the model
        if !system_text.is_empty() {
            contents.push(json!({
                "role": "user",
                "parts": [{"text": system_text}]
            }));
        }

        contents
    }
}

#[async_trait]
impl OracleBackend for GeminiBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn estimated_cost(&self, tokens: usize) -> f64 {
        // Approx $0.001 per 1k tokens for flash-class models
        (tokens as f64 / 1000.0) * 0.001
    }

    async fn complete(&self, messages: &[Message]) -> super::Result<Completion> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.config.base_url, self.config.model, self.api_key
        );

        let payload = json!({
            "contents": self.convert_messages(messages),
            "generationConfig": {"temperature": 0.7},
        });

        let response = self
            .client
            .post(&url)
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
            .get("candidates")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|cand| cand.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array())
            .and_then(|p| p.first())
            .and_then(|part| part.get("text"))
            .and_then(|t| t.as_str())
            .ok_or_else(|| OracleError::ParseError("No candidate text in response".to_string()))?;

        Ok(Completion::new(content, &self.config.model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> GeminiBackend {
        GeminiBackend::new("gemini", GeminiConfig::default(), "k")
    }

    #[test]
    fn test_convert_messages_folds_system_into_user() {
        let contents = backend().convert_messages(&[
            Message::system("You are the planner"),
            Message::user("Plan the approach"),
        ]);

        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0]["role"], "user");
        let text = contents[0]["parts"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("You are the planner"));
        assert!(text.ends_with("Plan the approach"));
    }

    #[test]
    fn test_convert_messages_maps_assistant_to_model() {
        let contents = backend().convert_messages(&[
            Message::user("hello"),
            Message::assistant("prior plan"),
        ]);

        assert_eq!(contents.len(), 2);
        assert_eq!(contents[1]["role"], "model");
    }

    #[test]
    fn test_convert_messages_system_only() {
        let contents = backend().convert_messages(&[Message::system("standalone prompt")]);

        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[0]["parts"][0]["text"], "standalone prompt");
    }
}
