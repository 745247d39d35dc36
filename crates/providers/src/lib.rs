//! Generation backend implementations for Apoyo.
//!
//! All backends implement the `apoyo_core::GenerationBackend` trait. The
//! factory selects the correct backend from configuration, so the rest of
//! the system stays provider-agnostic.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatBackend;

use apoyo_config::BackendConfig;
use apoyo_core::error::BackendError;

/// Build the configured generation backend.
///
/// Both supported providers speak the OpenAI chat-completions surface;
/// they differ only in base URL and key source.
pub fn backend_from_config(config: &BackendConfig) -> Result<OpenAiCompatBackend, BackendError> {
    let api_key = config
        .api_key
        .clone()
        .ok_or_else(|| BackendError::NotConfigured("no API key configured".into()))?;

    let mut backend = match config.provider.as_str() {
        "groq" => OpenAiCompatBackend::groq(api_key, &config.model),
        "openai" => OpenAiCompatBackend::openai(api_key, &config.model),
        other => {
            return Err(BackendError::NotConfigured(format!(
                "unknown backend provider: {other}"
            )));
        }
    };

    backend = backend.with_temperature(config.temperature);
    if let Some(url) = &config.api_url {
        backend = backend.with_base_url(url);
    }

    Ok(backend)
}
