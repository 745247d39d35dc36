//! The Apoyo generation pipeline.
//!
//! One request flows through a fail-fast chain:
//!
//! 1. Retrieval per context tag ([`apoyo_retrieval::ContextAggregator`])
//! 2. Prompt composition ([`prompt`])
//! 3. Model call (any [`apoyo_core::GenerationBackend`])
//! 4. JSON extraction ([`parser`])
//! 5. Strict schema validation ([`validate`])
//! 6. Banned-term guardrails ([`guardrails`])
//! 7. Outcome metadata and audit derivation ([`outcome`])
//!
//! Any stage failure (other than an empty retrieval, which is a valid
//! fallback state) aborts the run. Nothing is retried here — retry policy
//! belongs to `apoyo-jobs`.

pub mod generator;
pub mod guardrails;
pub mod outcome;
pub mod parser;
pub mod prompt;
pub mod validate;

pub use generator::{GenerationResult, SupportGenerator};
pub use guardrails::{GuardrailFilter, RejectOnMatch, SanitizeStrategy, SoftenDiagnostic};
pub use outcome::{AuditSummary, FALLBACK_DISCLAIMER};
pub use prompt::PromptComposer;
