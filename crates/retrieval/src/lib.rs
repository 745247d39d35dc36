//! Playbook retrieval for Apoyo.
//!
//! [`index`] talks to the vector index over HTTP; [`aggregator`] runs one
//! query per requested context tag and folds the results into a
//! [`apoyo_core::RetrievalOutcome`].

pub mod aggregator;
pub mod index;

pub use aggregator::ContextAggregator;
pub use index::{ChromaPlaybookIndex, PlaybookMetadata};
