//! # Apoyo Core
//!
//! Domain types, traits, and error definitions for the Apoyo
//! support-generation pipeline. This crate has **zero framework
//! dependencies** — it defines the domain model that all other crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is defined as a trait here. Implementations
//! live in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod backend;
pub mod error;
pub mod request;
pub mod retrieval;
pub mod support;

// Re-export key types at crate root for ergonomics
pub use backend::{BackendMessage, BackendResponse, GenerationBackend};
pub use error::{BackendError, Error, PipelineError, Result, RetrievalError};
pub use request::SupportRequest;
pub use retrieval::{ContextResults, RetrievalOutcome, RetrievalStore, RetrievedStrategy};
pub use support::{
    FallbackReason, GeneratedSupport, GuardrailsBlock, ParentVersion, PlanDay, Recommendation,
    SupportMeta, SupportSource, SupportVersion, TeacherVersion,
};
