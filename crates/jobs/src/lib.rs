//! Job execution around the generation pipeline.
//!
//! The pipeline itself never retries; this crate wraps one invocation with
//! a bounded retry policy ([`runner`]) and turns fallback runs into
//! reviewable [`fallback::FallbackEvent`] records for the "pending
//! playbooks" queue.

pub mod fallback;
pub mod runner;

pub use fallback::{FallbackEvent, FallbackEventStatus};
pub use runner::{GenerationJob, JobRunner, JobStatus};
