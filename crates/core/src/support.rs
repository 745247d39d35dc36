//! The strict output contract for generated support material.
//!
//! The model must return exactly this JSON shape: two parallel versions
//! (teacher-facing and parent-facing), a guardrails confirmation block, and
//! nothing else. Structural keys are English and fixed; content values are
//! in the target natural language.
//!
//! Deserialization rejects unknown fields at every level; numeric and
//! length bounds are enforced by [`GeneratedSupport::validate`]. The
//! guardrails booleans are model-asserted and NOT trusted — real
//! enforcement happens in the guardrail filter downstream.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// One actionable recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Recommendation {
    pub title: String,
    pub steps: Vec<String>,
    pub when_to_use: String,
}

/// One entry of a 7-day plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanDay {
    pub day: u8,
    pub focus: String,
    pub activity: String,
    pub success_criteria: String,
}

/// The teacher-facing version of the generated support.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TeacherVersion {
    pub summary: String,

    #[serde(default)]
    pub signals_detected: Vec<String>,

    #[serde(default)]
    pub recommendations: Vec<Recommendation>,

    #[serde(default)]
    pub classroom_plan_7_days: Vec<PlanDay>,
}

/// The parent-facing version of the generated support.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParentVersion {
    pub summary: String,

    #[serde(default)]
    pub signals_detected: Vec<String>,

    #[serde(default)]
    pub recommendations: Vec<Recommendation>,

    #[serde(default)]
    pub home_plan_7_days: Vec<PlanDay>,
}

/// Model-asserted guardrail confirmations. Informational only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GuardrailsBlock {
    pub no_diagnosis_confirmed: bool,
    pub no_clinical_labels_confirmed: bool,
}

/// Where the suggestions were drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportSource {
    Playbook,
    Fallback,
}

/// Why generation fell back to generic suggestions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    NoMatch,
    EmptyStrategies,
    LowConfidence,
}

/// Outcome metadata attached after guardrails pass, for audit/UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SupportMeta {
    pub source: SupportSource,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disclaimer: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,

    pub contexts: Vec<String>,

    pub retrieved_count: usize,
}

/// The validated model output. Constructed once per successful pipeline
/// run; immutable after the guardrail filter passes (the outcome composer
/// only fills `meta` and prefixes the summaries).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratedSupport {
    pub teacher_version: TeacherVersion,
    pub parent_version: ParentVersion,
    pub guardrails: GuardrailsBlock,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<SupportMeta>,
}

/// A version-agnostic view used by validation and the outcome composer.
pub trait SupportVersion {
    fn summary(&self) -> &str;
    fn set_summary(&mut self, summary: String);
    fn signals(&self) -> &[String];
    fn recommendations(&self) -> &[Recommendation];
    fn plan(&self) -> &[PlanDay];
}

impl SupportVersion for TeacherVersion {
    fn summary(&self) -> &str {
        &self.summary
    }
    fn set_summary(&mut self, summary: String) {
        self.summary = summary;
    }
    fn signals(&self) -> &[String] {
        &self.signals_detected
    }
    fn recommendations(&self) -> &[Recommendation] {
        &self.recommendations
    }
    fn plan(&self) -> &[PlanDay] {
        &self.classroom_plan_7_days
    }
}

impl SupportVersion for ParentVersion {
    fn summary(&self) -> &str {
        &self.summary
    }
    fn set_summary(&mut self, summary: String) {
        self.summary = summary;
    }
    fn signals(&self) -> &[String] {
        &self.signals_detected
    }
    fn recommendations(&self) -> &[Recommendation] {
        &self.recommendations
    }
    fn plan(&self) -> &[PlanDay] {
        &self.home_plan_7_days
    }
}

impl GeneratedSupport {
    /// Enforce the length and cardinality bounds of the contract.
    ///
    /// Field presence and unknown-field rejection are handled at
    /// deserialization; everything countable is checked here.
    pub fn validate(&self) -> std::result::Result<(), PipelineError> {
        validate_version(&self.teacher_version, "teacher_version")?;
        validate_version(&self.parent_version, "parent_version")?;
        Ok(())
    }
}

const MAX_RECOMMENDATIONS: usize = 6;
const MAX_PLAN_DAYS: usize = 7;

fn validate_version<V: SupportVersion>(
    version: &V,
    label: &str,
) -> std::result::Result<(), PipelineError> {
    check_len(&format!("{label}.summary"), version.summary(), 10, 600)?;

    if version.recommendations().len() > MAX_RECOMMENDATIONS {
        return Err(violation(format!(
            "{label}.recommendations has {} entries, maximum is {MAX_RECOMMENDATIONS}",
            version.recommendations().len()
        )));
    }

    for (i, rec) in version.recommendations().iter().enumerate() {
        let at = format!("{label}.recommendations[{i}]");
        check_len(&format!("{at}.title"), &rec.title, 3, 120)?;
        check_len(&format!("{at}.when_to_use"), &rec.when_to_use, 3, 200)?;
        if rec.steps.is_empty() {
            return Err(violation(format!("{at}.steps must have at least 1 step")));
        }
    }

    if version.plan().len() > MAX_PLAN_DAYS {
        return Err(violation(format!(
            "{label} plan has {} entries, maximum is {MAX_PLAN_DAYS}",
            version.plan().len()
        )));
    }

    for (i, entry) in version.plan().iter().enumerate() {
        let at = format!("{label} plan[{i}]");
        if !(1..=7).contains(&entry.day) {
            return Err(violation(format!(
                "{at}.day is {}, must be within 1..=7",
                entry.day
            )));
        }
        check_len(&format!("{at}.focus"), &entry.focus, 2, 120)?;
        check_len(&format!("{at}.activity"), &entry.activity, 2, 300)?;
        check_len(&format!("{at}.success_criteria"), &entry.success_criteria, 2, 200)?;
    }

    Ok(())
}

fn check_len(
    field: &str,
    value: &str,
    min: usize,
    max: usize,
) -> std::result::Result<(), PipelineError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(violation(format!(
            "{field} length {len} outside {min}..={max}"
        )));
    }
    Ok(())
}

fn violation(detail: String) -> PipelineError {
    PipelineError::SchemaViolation { detail }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan_day(day: u8) -> PlanDay {
        PlanDay {
            day,
            focus: "Atención sostenida".into(),
            activity: "Juego de turnos cortos con temporizador".into(),
            success_criteria: "Completa dos turnos sin levantarse".into(),
        }
    }

    fn valid_support() -> GeneratedSupport {
        let rec = Recommendation {
            title: "Dividir actividades largas".into(),
            steps: vec!["Partir la actividad en bloques de 10 minutos".into()],
            when_to_use: "Cuando la actividad dure más de 20 minutos".into(),
        };
        GeneratedSupport {
            teacher_version: TeacherVersion {
                summary: "El alumno participa bien y pierde el foco en tareas largas.".into(),
                signals_detected: vec!["Se levanta durante actividades largas".into()],
                recommendations: vec![rec.clone()],
                classroom_plan_7_days: (1..=7).map(plan_day).collect(),
            },
            parent_version: ParentVersion {
                summary: "En casa conviene alternar juego y descanso en bloques cortos.".into(),
                signals_detected: vec![],
                recommendations: vec![rec],
                home_plan_7_days: vec![plan_day(1)],
            },
            guardrails: GuardrailsBlock {
                no_diagnosis_confirmed: true,
                no_clinical_labels_confirmed: true,
            },
            meta: None,
        }
    }

    #[test]
    fn valid_support_passes() {
        assert!(valid_support().validate().is_ok());
    }

    #[test]
    fn full_week_plan_passes() {
        let support = valid_support();
        assert_eq!(support.teacher_version.classroom_plan_7_days.len(), 7);
        assert!(support.validate().is_ok());
    }

    #[test]
    fn day_out_of_range_rejected() {
        let mut support = valid_support();
        support.parent_version.home_plan_7_days[0].day = 8;
        let err = support.validate().unwrap_err();
        assert!(matches!(err, PipelineError::SchemaViolation { .. }));

        support.parent_version.home_plan_7_days[0].day = 0;
        assert!(support.validate().is_err());
    }

    #[test]
    fn short_summary_rejected() {
        let mut support = valid_support();
        support.teacher_version.summary = "Corto".into();
        let err = support.validate().unwrap_err();
        assert!(err.to_string().contains("teacher_version.summary"));
    }

    #[test]
    fn too_many_recommendations_rejected() {
        let mut support = valid_support();
        let rec = support.teacher_version.recommendations[0].clone();
        support.teacher_version.recommendations = vec![rec; 7];
        assert!(support.validate().is_err());
    }

    #[test]
    fn empty_steps_rejected() {
        let mut support = valid_support();
        support.teacher_version.recommendations[0].steps.clear();
        let err = support.validate().unwrap_err();
        assert!(err.to_string().contains("steps"));
    }

    #[test]
    fn unknown_top_level_field_fails_deserialization() {
        let mut value = serde_json::to_value(valid_support()).unwrap();
        value["unexpected_field"] = serde_json::json!(true);
        let result: std::result::Result<GeneratedSupport, _> = serde_json::from_value(value);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("unexpected_field"));
    }

    #[test]
    fn meta_roundtrips_with_snake_case_reason() {
        let meta = SupportMeta {
            source: SupportSource::Fallback,
            disclaimer: Some("Nota".into()),
            fallback_reason: Some(FallbackReason::NoMatch),
            contexts: vec!["aula".into()],
            retrieved_count: 0,
        };
        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"fallback\""));
        assert!(json.contains("\"no_match\""));
    }
}
