//! Outcome metadata and the audit summary package.
//!
//! After guardrails pass, the composer decides what the record says about
//! its own provenance: suggestions drawn from retrieved playbooks, or
//! generic fallback suggestions that carry a fixed disclaimer. It also
//! derives the audit package consumed by the fallback-tracking
//! collaborator.

use apoyo_core::request::SupportRequest;
use apoyo_core::retrieval::RetrievalOutcome;
use apoyo_core::support::{
    FallbackReason, GeneratedSupport, SupportMeta, SupportSource, SupportVersion,
};
use serde::{Deserialize, Serialize};

/// Fixed disclaimer prefixed to both summaries when retrieval found
/// nothing. The structured copy lives in `SupportMeta.disclaimer`.
pub const FALLBACK_DISCLAIMER: &str = "⚠️ Nota: No se encontraron estrategias específicas en el Playbook JCJ para este caso. \
Las sugerencias siguientes son generales y deben ser validadas/ajustadas por el equipo profesional.";

/// Caps for the audit package.
const MAX_FULL_CHARS: usize = 4000;
const PREVIEW_CHARS: usize = 240;

/// Attach outcome metadata to a validated, guardrail-passed record.
///
/// Under fallback the disclaimer is also prefixed to both version
/// summaries; the prepend is idempotent, so text that already carries the
/// disclaimer is left alone.
pub fn attach_meta(support: &mut GeneratedSupport, outcome: &RetrievalOutcome) {
    let contexts: Vec<String> = outcome.contexts().iter().map(|c| c.to_string()).collect();
    let retrieved_count = outcome.total_items();

    if outcome.fallback_used() {
        support.meta = Some(SupportMeta {
            source: SupportSource::Fallback,
            disclaimer: Some(FALLBACK_DISCLAIMER.to_string()),
            fallback_reason: Some(FallbackReason::NoMatch),
            contexts,
            retrieved_count,
        });

        prepend_to_version(&mut support.teacher_version);
        prepend_to_version(&mut support.parent_version);
    } else {
        support.meta = Some(SupportMeta {
            source: SupportSource::Playbook,
            disclaimer: None,
            fallback_reason: None,
            contexts,
            retrieved_count,
        });
    }
}

fn prepend_to_version<V: SupportVersion>(version: &mut V) {
    let updated = prepend_disclaimer(version.summary(), FALLBACK_DISCLAIMER);
    version.set_summary(updated);
}

/// Prefix `disclaimer` to `summary` unless it is already present
/// (case-insensitive). Applying this twice yields the same result as once.
pub fn prepend_disclaimer(summary: &str, disclaimer: &str) -> String {
    let summary = summary.trim();
    if summary.is_empty() {
        return disclaimer.to_string();
    }
    if summary.to_lowercase().contains(&disclaimer.to_lowercase()) {
        return summary.to_string();
    }
    format!("{disclaimer}\n\n{summary}")
}

/// The audit package handed to the fallback-tracking collaborator.
///
/// Text fields are bounded copies; every derivation tolerates missing or
/// blank source text by producing empty strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSummary {
    pub fallback_used: bool,
    pub fallback_reason: Option<FallbackReason>,
    pub contexts: Vec<String>,
    /// Topic classification for the review queue; unset until a curator
    /// assigns one.
    pub topic: Option<String>,
    /// The input report, capped at 4000 chars.
    pub query_text: String,
    /// Short preview of the input, ellipsis-terminated if truncated.
    pub query_preview: String,
    /// The parent-facing summary, capped at 4000 chars.
    pub model_output_summary: String,
    /// Short preview of the output.
    pub model_output_preview: String,
    pub retrieved_count: usize,
}

/// Derive the audit package for one completed run.
///
/// Call after [`attach_meta`] so the output preview reflects any
/// disclaimer prefix.
pub fn build_audit_summary(
    request: &SupportRequest,
    outcome: &RetrievalOutcome,
    support: &GeneratedSupport,
) -> AuditSummary {
    let query_text = cap(request.report_text.trim(), MAX_FULL_CHARS);
    let model_output = cap(support.parent_version.summary.trim(), MAX_FULL_CHARS);

    AuditSummary {
        fallback_used: outcome.fallback_used(),
        fallback_reason: outcome.fallback_used().then_some(FallbackReason::NoMatch),
        contexts: outcome.contexts().iter().map(|c| c.to_string()).collect(),
        topic: None,
        query_preview: clip(&query_text, PREVIEW_CHARS),
        query_text,
        model_output_preview: clip(&model_output, PREVIEW_CHARS),
        model_output_summary: model_output,
        retrieved_count: outcome.total_items(),
    }
}

/// Hard cap without ellipsis (guards against enormous notes).
fn cap(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}

/// Preview clip: cap at `max_chars` and mark truncation with an ellipsis.
fn clip(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}
