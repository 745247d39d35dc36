//! GenerationBackend trait — the abstraction over LLM backends.
//!
//! A backend knows how to send one composed prompt to a language model and
//! hand back whatever textual payload the provider produced. Providers have
//! returned the payload in two shapes (a direct text field, or a list of
//! message-like entries); both are modeled as a closed tagged union with an
//! explicit unrecognized-shape failure — no runtime attribute probing.
//!
//! This seam does not retry and does not interpret errors: transport and
//! provider failures propagate untransformed to the job runner.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;

/// One message-like entry in a list-shaped response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendMessage {
    #[serde(default)]
    pub role: Option<String>,
    pub content: String,
}

/// The raw payload a backend produced, in one of the known shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BackendResponse {
    /// The whole response as one text field.
    Text(String),
    /// A list of message-like entries; the final entry's content is the
    /// response text.
    Messages(Vec<BackendMessage>),
}

impl BackendResponse {
    /// Normalize any known shape into one plain string.
    ///
    /// A `Messages` response with no entries carries no text and is an
    /// unrecognized shape, not an empty success.
    pub fn into_text(self) -> std::result::Result<String, BackendError> {
        match self {
            BackendResponse::Text(text) => Ok(text),
            BackendResponse::Messages(messages) => messages
                .into_iter()
                .next_back()
                .map(|m| m.content)
                .ok_or_else(|| {
                    BackendError::UnrecognizedShape("message list was empty".into())
                }),
        }
    }
}

/// The generation collaborator: one prompt in, one raw response out.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// A human-readable backend name (e.g. "groq", "openai").
    fn name(&self) -> &str;

    /// The model identity string persisted with audit rows, in
    /// `provider:model` form (e.g. "groq:llama-3.3-70b-versatile").
    fn model_name(&self) -> String;

    /// Send the composed prompt and return the raw response.
    async fn run(&self, prompt: &str) -> std::result::Result<BackendResponse, BackendError>;
}
