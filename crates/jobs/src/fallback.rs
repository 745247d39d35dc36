//! Fallback events — the "pending playbooks" review queue.
//!
//! A run that found no retrieval material still answers the teacher (with
//! generic, disclaimed suggestions), but it also leaves a record so
//! curators can see which cases the corpus does not cover yet. One event
//! per fallback occurrence; the only mutation ever applied is resolution.

use apoyo_core::error::RetrievalError;
use apoyo_core::retrieval::RetrievalOutcome;
use apoyo_core::support::FallbackReason;
use apoyo_pipeline::AuditSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Open/resolved state of one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackEventStatus {
    Open,
    Resolved,
}

/// Identifiers tying an event to its tenant and source report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackScope {
    pub school_id: Uuid,
    pub student_id: Uuid,
    pub report_id: Uuid,
    /// The persisted generated record, when its id is known.
    pub ai_report_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
}

/// One recorded fallback occurrence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackEvent {
    pub id: Uuid,
    pub school_id: Uuid,
    pub student_id: Uuid,
    pub report_id: Uuid,
    pub ai_report_id: Option<Uuid>,
    pub reason: FallbackReason,
    /// Topic classification, when a curator has assigned one.
    pub topic: Option<String>,
    /// Context tags the failed retrieval queried.
    pub contexts: Vec<String>,
    /// Truncated copy of the input report.
    pub query_text: String,
    /// Truncated copy of the generated parent-facing summary.
    pub model_output_summary: String,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<Uuid>,
}

impl FallbackEvent {
    /// Build an event from a completed run's audit package.
    ///
    /// Returns `None` when the run did not fall back — callers can feed
    /// every audit summary through without branching.
    pub fn from_audit(scope: FallbackScope, audit: &AuditSummary) -> Option<Self> {
        if !audit.fallback_used {
            return None;
        }

        Some(Self {
            id: Uuid::new_v4(),
            school_id: scope.school_id,
            student_id: scope.student_id,
            report_id: scope.report_id,
            ai_report_id: scope.ai_report_id,
            reason: audit.fallback_reason.unwrap_or(FallbackReason::NoMatch),
            topic: audit.topic.clone(),
            contexts: audit.contexts.clone(),
            query_text: audit.query_text.clone(),
            model_output_summary: audit.model_output_summary.clone(),
            created_by: scope.created_by,
            created_at: Utc::now(),
            resolved_at: None,
            resolved_by: None,
        })
    }

    /// Build an event from a raw queued payload, tolerating older
    /// producers: missing text fields become empty strings, the retrieved
    /// count is derived from whatever result shape the producer wrote, and
    /// an absent reason defaults to `no_match`.
    ///
    /// Returns `Ok(None)` when the payload says no fallback happened.
    pub fn from_payload(
        scope: FallbackScope,
        payload: &serde_json::Value,
    ) -> Result<Option<Self>, RetrievalError> {
        let fallback_used = payload
            .get("fallback_used")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if !fallback_used {
            return Ok(None);
        }

        // Validates the per-context shapes even though only fallback
        // payloads reach here; an unrecognized shape is a producer bug
        // worth surfacing, not data to guess at.
        let _retrieved = count_retrieved_items(payload.get("retrieved"))?;

        let reason = payload
            .get("fallback_reason")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or(FallbackReason::NoMatch);

        let contexts = payload
            .get("contexts")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Some(Self {
            id: Uuid::new_v4(),
            school_id: scope.school_id,
            student_id: scope.student_id,
            report_id: scope.report_id,
            ai_report_id: scope.ai_report_id,
            reason,
            topic: string_field(payload, "topic"),
            contexts,
            query_text: string_field(payload, "query_text").unwrap_or_default(),
            model_output_summary: string_field(payload, "model_output_summary")
                .unwrap_or_default(),
            created_by: scope.created_by,
            created_at: Utc::now(),
            resolved_at: None,
            resolved_by: None,
        }))
    }

    pub fn status(&self) -> FallbackEventStatus {
        if self.resolved_at.is_some() {
            FallbackEventStatus::Resolved
        } else {
            FallbackEventStatus::Open
        }
    }

    /// Mark the event resolved. Resolution happens once; repeated calls
    /// keep the original timestamp and actor.
    pub fn resolve(&mut self, actor: Uuid) {
        if self.resolved_at.is_none() {
            self.resolved_at = Some(Utc::now());
            self.resolved_by = Some(actor);
        }
    }
}

/// Count retrieved items in a queued payload, tolerating every shape the
/// producers have written: a `{context: results}` map (results in any
/// known shape), a bare list, or nothing at all.
fn count_retrieved_items(value: Option<&serde_json::Value>) -> Result<usize, RetrievalError> {
    match value {
        None | Some(serde_json::Value::Null) => Ok(0),
        Some(serde_json::Value::Array(items)) => Ok(items.len()),
        Some(serde_json::Value::Object(map)) => {
            Ok(RetrievalOutcome::from_context_map(map)?.total_items())
        }
        Some(other) => Err(RetrievalError::UnrecognizedShape(format!(
            "retrieved payload was {other}"
        ))),
    }
}

/// Keep only events still waiting for a curator.
pub fn open_events(events: &[FallbackEvent]) -> Vec<&FallbackEvent> {
    events
        .iter()
        .filter(|e| e.status() == FallbackEventStatus::Open)
        .collect()
}

fn string_field(payload: &serde_json::Value, key: &str) -> Option<String> {
    payload.get(key).and_then(|v| v.as_str()).map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scope() -> FallbackScope {
        FallbackScope {
            school_id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            report_id: Uuid::new_v4(),
            ai_report_id: None,
            created_by: None,
        }
    }

    fn fallback_audit() -> AuditSummary {
        AuditSummary {
            fallback_used: true,
            fallback_reason: Some(FallbackReason::NoMatch),
            contexts: vec!["aula".into(), "casa".into()],
            topic: None,
            query_text: "Se distrae en actividades largas".into(),
            query_preview: "Se distrae en actividades largas".into(),
            model_output_summary: "Sugerencias generales.".into(),
            model_output_preview: "Sugerencias generales.".into(),
            retrieved_count: 0,
        }
    }

    #[test]
    fn audit_without_fallback_produces_no_event() {
        let mut audit = fallback_audit();
        audit.fallback_used = false;
        assert!(FallbackEvent::from_audit(scope(), &audit).is_none());
    }

    #[test]
    fn audit_with_fallback_produces_open_event() {
        let event = FallbackEvent::from_audit(scope(), &fallback_audit()).unwrap();
        assert_eq!(event.status(), FallbackEventStatus::Open);
        assert_eq!(event.reason, FallbackReason::NoMatch);
        assert_eq!(event.contexts, vec!["aula", "casa"]);
        assert!(event.resolved_at.is_none());
    }

    #[test]
    fn resolve_is_one_shot() {
        let mut event = FallbackEvent::from_audit(scope(), &fallback_audit()).unwrap();
        let first_actor = Uuid::new_v4();
        event.resolve(first_actor);
        let first_time = event.resolved_at;

        event.resolve(Uuid::new_v4());
        assert_eq!(event.resolved_at, first_time);
        assert_eq!(event.resolved_by, Some(first_actor));
        assert_eq!(event.status(), FallbackEventStatus::Resolved);
    }

    #[test]
    fn payload_with_container_shapes_counts_items() {
        let payload = json!({
            "fallback_used": true,
            "fallback_reason": "no_match",
            "contexts": ["aula"],
            "query_text": "texto",
            "retrieved": {"aula": {"playbooks": []}, "casa": null},
        });
        let event = FallbackEvent::from_payload(scope(), &payload).unwrap().unwrap();
        assert_eq!(event.reason, FallbackReason::NoMatch);
        assert_eq!(event.query_text, "texto");
        assert_eq!(event.model_output_summary, "");
    }

    #[test]
    fn payload_without_fallback_is_none() {
        let payload = json!({"fallback_used": false});
        assert!(FallbackEvent::from_payload(scope(), &payload).unwrap().is_none());
    }

    #[test]
    fn payload_with_unknown_result_shape_errors() {
        let payload = json!({
            "fallback_used": true,
            "retrieved": {"aula": {"docs": ["x"]}},
        });
        assert!(FallbackEvent::from_payload(scope(), &payload).is_err());
    }

    #[test]
    fn payload_with_missing_fields_defaults() {
        let payload = json!({"fallback_used": true});
        let event = FallbackEvent::from_payload(scope(), &payload).unwrap().unwrap();
        assert_eq!(event.reason, FallbackReason::NoMatch);
        assert!(event.contexts.is_empty());
        assert_eq!(event.query_text, "");
    }

    #[test]
    fn open_events_filters_resolved() {
        let mut resolved = FallbackEvent::from_audit(scope(), &fallback_audit()).unwrap();
        resolved.resolve(Uuid::new_v4());
        let open = FallbackEvent::from_audit(scope(), &fallback_audit()).unwrap();
        let open_id = open.id;

        let events = vec![resolved, open];
        let pending = open_events(&events);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, open_id);
    }
}
