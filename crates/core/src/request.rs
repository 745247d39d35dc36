//! The generation request — one teacher observation report plus the
//! settings it should be answered for.
//!
//! Context tags describe where a strategy applies ("aula", "casa", ...).
//! They are normalized once at construction: lower-cased, trimmed,
//! deduplicated, with the two primary settings substituted when the caller
//! supplies none.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Youngest subject age the playbook corpus covers.
pub const MIN_AGE: u8 = 3;
/// Oldest subject age the playbook corpus covers.
pub const MAX_AGE: u8 = 12;

/// Default context tags when the caller supplies none or an all-blank list.
pub const DEFAULT_CONTEXTS: [&str; 2] = ["aula", "casa"];

/// Input for one support-generation run. Created per API call, never
/// persisted directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportRequest {
    /// The student's given name (the only proper name allowed in output).
    pub student_name: String,

    /// Age in years, within [`MIN_AGE`]..=[`MAX_AGE`].
    pub age: u8,

    /// Group label (e.g. "2B").
    pub group: String,

    /// The teacher's free-text observation report.
    pub report_text: String,

    /// Normalized context tags, never empty.
    contexts: Vec<String>,
}

impl SupportRequest {
    /// Build a request, validating the age range and normalizing contexts.
    pub fn new(
        student_name: impl Into<String>,
        age: u8,
        group: impl Into<String>,
        report_text: impl Into<String>,
        contexts: Option<Vec<String>>,
    ) -> std::result::Result<Self, PipelineError> {
        if !(MIN_AGE..=MAX_AGE).contains(&age) {
            return Err(PipelineError::InvalidRequest(format!(
                "age {age} outside supported range {MIN_AGE}..={MAX_AGE}"
            )));
        }

        Ok(Self {
            student_name: student_name.into(),
            age,
            group: group.into(),
            report_text: report_text.into(),
            contexts: normalize_contexts(contexts),
        })
    }

    /// The normalized context tags (lower-cased, deduplicated, non-empty).
    pub fn contexts(&self) -> &[String] {
        &self.contexts
    }
}

/// Lower-case, trim, and deduplicate context tags, preserving caller order.
/// An absent, empty, or all-blank list falls back to [`DEFAULT_CONTEXTS`].
fn normalize_contexts(contexts: Option<Vec<String>>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::new();

    for raw in contexts.unwrap_or_default() {
        let tag = raw.trim().to_lowercase();
        if tag.is_empty() || normalized.contains(&tag) {
            continue;
        }
        normalized.push(tag);
    }

    if normalized.is_empty() {
        normalized = DEFAULT_CONTEXTS.iter().map(|c| c.to_string()).collect();
    }

    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(contexts: Option<Vec<String>>) -> SupportRequest {
        SupportRequest::new("Sofía", 6, "2B", "Se distrae en actividades largas", contexts)
            .unwrap()
    }

    #[test]
    fn missing_contexts_get_defaults() {
        let req = request_with(None);
        assert_eq!(req.contexts(), &["aula", "casa"]);
    }

    #[test]
    fn blank_contexts_get_defaults() {
        let req = request_with(Some(vec!["  ".into(), "".into()]));
        assert_eq!(req.contexts(), &["aula", "casa"]);
    }

    #[test]
    fn contexts_are_lowercased_and_deduplicated() {
        let req = request_with(Some(vec![
            " Aula ".into(),
            "CASA".into(),
            "aula".into(),
            "recreo".into(),
        ]));
        assert_eq!(req.contexts(), &["aula", "casa", "recreo"]);
    }

    #[test]
    fn age_outside_range_rejected() {
        let err = SupportRequest::new("Sofía", 15, "2B", "texto", None).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRequest(_)));
        assert!(SupportRequest::new("Sofía", 2, "2B", "texto", None).is_err());
        assert!(SupportRequest::new("Sofía", 3, "2B", "texto", None).is_ok());
        assert!(SupportRequest::new("Sofía", 12, "2B", "texto", None).is_ok());
    }
}
