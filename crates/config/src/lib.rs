//! Configuration loading, validation, and management for Apoyo.
//!
//! Loads configuration from `~/.apoyo/config.toml` with environment
//! variable overrides applied in exactly one place at startup. The loaded
//! [`AppConfig`] is passed by reference into each component constructor —
//! no component reads ambient process state directly.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.apoyo/config.toml`.
#[derive(Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Generation backend settings
    pub backend: BackendConfig,

    /// Vector-index retrieval settings
    pub retrieval: RetrievalConfig,

    /// Prompt composition settings
    pub prompt: PromptConfig,

    /// Content-safety guardrail settings
    pub guardrails: GuardrailConfig,

    /// Job retry settings
    pub retry: RetryConfig,
}

/// Which language model answers, and how to reach it.
#[derive(Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Provider name: "groq" or "openai"
    #[serde(default = "default_backend_provider")]
    pub provider: String,

    /// Model identifier at the provider
    #[serde(default = "default_backend_model")]
    pub model: String,

    /// API key (usually supplied via environment)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Override the provider base URL (testing, proxies)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_backend_provider() -> String {
    "groq".into()
}
fn default_backend_model() -> String {
    "llama-3.3-70b-versatile".into()
}
fn default_temperature() -> f32 {
    0.2
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: default_backend_provider(),
            model: default_backend_model(),
            api_key: None,
            api_url: None,
            temperature: default_temperature(),
        }
    }
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("backend", &self.backend)
            .field("retrieval", &self.retrieval)
            .field("prompt", &self.prompt)
            .field("guardrails", &self.guardrails)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Vector-index settings for playbook retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Index host
    #[serde(default = "default_index_host")]
    pub host: String,

    /// Index port
    #[serde(default = "default_index_port")]
    pub port: u16,

    /// Collection holding the playbook corpus
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Results requested per context tag
    #[serde(default = "default_results_per_context")]
    pub results_per_context: usize,

    /// Over-fetch factor applied before the post-hoc context filter.
    ///
    /// The index can only filter by age range; context membership is
    /// checked afterwards over the comma-joined `context` metadata field.
    /// Fetching only `results_per_context` items would starve sparse
    /// contexts of valid results, so the adapter requests
    /// `results_per_context * fetch_multiplier` and truncates after
    /// filtering.
    #[serde(default = "default_fetch_multiplier")]
    pub fetch_multiplier: usize,
}

fn default_index_host() -> String {
    "chroma".into()
}
fn default_index_port() -> u16 {
    8000
}
fn default_collection() -> String {
    "jcj_playbooks_v1".into()
}
fn default_results_per_context() -> usize {
    3
}
fn default_fetch_multiplier() -> usize {
    3
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            host: default_index_host(),
            port: default_index_port(),
            collection: default_collection(),
            results_per_context: default_results_per_context(),
            fetch_multiplier: default_fetch_multiplier(),
        }
    }
}

/// Prompt composition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Display cap per retrieved snippet, in characters. Truncation is for
    /// prompt legibility, not a model window limit.
    #[serde(default = "default_snippet_max_chars")]
    pub snippet_max_chars: usize,
}

fn default_snippet_max_chars() -> usize {
    1200
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            snippet_max_chars: default_snippet_max_chars(),
        }
    }
}

/// Content-safety guardrail settings.
///
/// The term list is deliberately minimal and extensible — deployments grow
/// it without code changes. Matching is case- and accent-insensitive, so a
/// term configured with or without diacritics catches both spellings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailConfig {
    #[serde(default = "default_banned_terms")]
    pub banned_terms: Vec<String>,
}

fn default_banned_terms() -> Vec<String> {
    [
        "tdah",
        "t.d.a.h",
        "autismo",
        "asperger",
        "trastorno",
        "diagnóstico",
        "dsm",
        "neurológico",
        "patología",
        "ansiedad generalizada",
        "depresión",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            banned_terms: default_banned_terms(),
        }
    }
}

/// Bounded retry for the job runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts before a job is terminally failed
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff base in milliseconds; the delay before attempt N is
    /// `base_delay_ms * N`
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    2000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.apoyo/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `APOYO_API_KEY`, or the provider-native `GROQ_API_KEY` /
    ///   `OPENAI_API_KEY`
    /// - `APOYO_PROVIDER`, `APOYO_MODEL`
    /// - `APOYO_INDEX_HOST`, `APOYO_INDEX_PORT`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.backend.api_key.is_none() {
            config.backend.api_key = std::env::var("APOYO_API_KEY")
                .ok()
                .or_else(|| std::env::var("GROQ_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("APOYO_PROVIDER") {
            config.backend.provider = provider.trim().to_lowercase();
        }

        if let Ok(model) = std::env::var("APOYO_MODEL") {
            config.backend.model = model.trim().to_string();
        }

        if let Ok(host) = std::env::var("APOYO_INDEX_HOST") {
            config.retrieval.host = host;
        }

        if let Ok(port) = std::env::var("APOYO_INDEX_PORT") {
            config.retrieval.port = port.parse().map_err(|_| {
                ConfigError::ValidationError(format!("APOYO_INDEX_PORT is not a port: {port}"))
            })?;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".apoyo")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.backend.temperature) {
            return Err(ConfigError::ValidationError(
                "backend.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.retrieval.results_per_context == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.results_per_context must be at least 1".into(),
            ));
        }

        if self.retrieval.fetch_multiplier == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.fetch_multiplier must be at least 1".into(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry.max_attempts must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.backend.api_key.is_some()
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
