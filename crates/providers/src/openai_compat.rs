//! OpenAI-compatible backend implementation.
//!
//! Works with Groq, OpenAI, and any endpoint exposing the
//! `/v1/chat/completions` surface. The composed prompt goes out as a
//! single user message; system-level behavior rules are part of the
//! composed prompt itself, so this client stays a dumb pipe.
//!
//! Errors propagate untransformed — no retry, no interpretation. The job
//! runner owns retry policy.

use apoyo_core::backend::{BackendMessage, BackendResponse, GenerationBackend};
use apoyo_core::error::BackendError;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// An OpenAI-compatible generation backend.
#[derive(Debug)]
pub struct OpenAiCompatBackend {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

impl OpenAiCompatBackend {
    /// Create a backend against any OpenAI-compatible endpoint.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: default_temperature(),
            client,
        }
    }

    /// Create a Groq backend (convenience constructor).
    pub fn groq(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new("groq", GROQ_BASE_URL, api_key, model)
    }

    /// Create an OpenAI backend (convenience constructor).
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new("openai", OPENAI_BASE_URL, api_key, model)
    }

    /// Override the base URL (testing, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

fn default_temperature() -> f32 {
    0.2
}

#[async_trait]
impl GenerationBackend for OpenAiCompatBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn model_name(&self) -> String {
        format!("{}:{}", self.name, self.model)
    }

    async fn run(&self, prompt: &str) -> Result<BackendResponse, BackendError> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": self.temperature,
            "stream": false,
        });

        debug!(backend = %self.name, model = %self.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(BackendError::RateLimited { retry_after_secs: 5 });
        }

        if status == 401 || status == 403 {
            return Err(BackendError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Backend returned error");
            return Err(BackendError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| BackendError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let messages: Vec<BackendMessage> = api_response
            .choices
            .into_iter()
            .map(|choice| BackendMessage {
                role: Some(choice.message.role),
                content: choice.message.content.unwrap_or_default(),
            })
            .collect();

        if messages.is_empty() {
            return Err(BackendError::UnrecognizedShape(
                "no choices in completion response".into(),
            ));
        }

        Ok(BackendResponse::Messages(messages))
    }
}

// ─── API types ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_name_is_provider_qualified() {
        let backend = OpenAiCompatBackend::groq("key", "llama-3.3-70b-versatile");
        assert_eq!(backend.model_name(), "groq:llama-3.3-70b-versatile");
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let backend = OpenAiCompatBackend::new("test", "http://localhost:9999/v1/", "k", "m");
        assert_eq!(backend.base_url, "http://localhost:9999/v1");
    }

    #[test]
    fn api_response_parses_missing_content() {
        let raw = r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#;
        let parsed: ApiResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices.len(), 1);
        assert!(parsed.choices[0].message.content.is_none());
    }
}
