//! Content-safety guardrails.
//!
//! The validated output is serialized to one lower-cased blob and scanned
//! for banned clinical/diagnostic vocabulary. Matching folds diacritics on
//! both sides, so "Diagnóstico" and "diagnostico" trip the same configured
//! term.
//!
//! The enforcement policy is hard rejection: any hit aborts the run with
//! the matched terms. [`SanitizeStrategy`] is the seam for a future
//! sanitize-and-retry mode; [`SoftenDiagnostic`] implements it but the
//! shipped pipeline only ever constructs [`RejectOnMatch`], and a
//! rewriting strategy still aborts the run because no re-validation pass
//! exists yet.

use apoyo_config::GuardrailConfig;
use apoyo_core::error::PipelineError;
use regex_lite::Regex;
use tracing::warn;

/// Scans serialized output for banned terms.
pub struct GuardrailFilter {
    /// Folded, deduplicated terms in configuration order.
    terms: Vec<String>,
    strategy: Box<dyn SanitizeStrategy>,
}

impl GuardrailFilter {
    /// Build the filter from configuration with the default hard-reject
    /// strategy.
    pub fn new(config: &GuardrailConfig) -> Self {
        let mut terms: Vec<String> = Vec::new();
        for raw in &config.banned_terms {
            let folded = fold(raw);
            if folded.is_empty() || terms.contains(&folded) {
                continue;
            }
            terms.push(folded);
        }

        Self {
            terms,
            strategy: Box::new(RejectOnMatch),
        }
    }

    /// Swap the violation strategy. Extension point only — the generator
    /// never calls this.
    pub fn with_strategy(mut self, strategy: Box<dyn SanitizeStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Scan a text blob, returning every banned term it contains (folded
    /// form, configuration order).
    pub fn scan(&self, text: &str) -> Vec<String> {
        let folded = fold(text);
        self.terms
            .iter()
            .filter(|term| folded.contains(term.as_str()))
            .cloned()
            .collect()
    }

    /// Serialize the parsed output and enforce the guardrails on it.
    pub fn enforce(&self, value: &serde_json::Value) -> Result<(), PipelineError> {
        let blob = serde_json::to_string(value).unwrap_or_default().to_lowercase();
        let hits = self.scan(&blob);
        if hits.is_empty() {
            return Ok(());
        }

        let rewritten = self.strategy.resolve(&blob, &hits)?;

        // No re-validation pass exists for rewritten output, so a
        // rewriting strategy cannot make the run pass.
        warn!(
            hits = ?hits,
            rewritten_len = rewritten.len(),
            "Sanitize strategy rewrote output, but sanitize-and-retry is unsupported; rejecting"
        );
        Err(PipelineError::GuardrailViolation { terms: hits })
    }
}

/// Lower-case and strip the diacritics relevant to the corpus language.
fn fold(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            other => other,
        })
        .collect()
}

/// What to do with output that tripped the filter.
pub trait SanitizeStrategy: Send + Sync {
    /// Either abort with an error (the default policy) or return a
    /// rewritten serialization for a future re-validation pass.
    fn resolve(&self, serialized: &str, hits: &[String]) -> Result<String, PipelineError>;
}

/// The default policy: abort the run with the matched terms.
pub struct RejectOnMatch;

impl SanitizeStrategy for RejectOnMatch {
    fn resolve(&self, _serialized: &str, hits: &[String]) -> Result<String, PipelineError> {
        Err(PipelineError::GuardrailViolation {
            terms: hits.to_vec(),
        })
    }
}

/// Soft rewrite of the diagnostic word family into neutral language.
/// Not wired into the pipeline; kept for a future sanitize-and-retry mode.
pub struct SoftenDiagnostic {
    pattern: Regex,
}

impl SoftenDiagnostic {
    pub fn new() -> Self {
        Self {
            // Safe: the pattern is a literal constant.
            pattern: Regex::new(r"(?i)\bdiagn[oó]stic[oa]\b").expect("valid softener pattern"),
        }
    }
}

impl Default for SoftenDiagnostic {
    fn default() -> Self {
        Self::new()
    }
}

impl SanitizeStrategy for SoftenDiagnostic {
    fn resolve(&self, serialized: &str, _hits: &[String]) -> Result<String, PipelineError> {
        Ok(self.pattern.replace_all(serialized, "evaluación").into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn filter() -> GuardrailFilter {
        GuardrailFilter::new(&GuardrailConfig::default())
    }

    #[test]
    fn clean_text_passes() {
        let value = json!({"summary": "El alumno participa y colabora en clase."});
        assert!(filter().enforce(&value).is_ok());
    }

    #[test]
    fn banned_term_rejected_with_term_listed() {
        let value = json!({"summary": "Posible TDAH según lo observado."});
        let err = filter().enforce(&value).unwrap_err();
        match err {
            PipelineError::GuardrailViolation { terms } => {
                assert_eq!(terms, vec!["tdah".to_string()]);
            }
            other => panic!("expected GuardrailViolation, got {other:?}"),
        }
    }

    #[test]
    fn accented_and_unaccented_spellings_match_same_term() {
        let f = filter();
        let accented = f.scan("Se sugiere un Diagnóstico formal.");
        let plain = f.scan("se sugiere un diagnostico formal.");
        assert_eq!(accented, vec!["diagnostico".to_string()]);
        assert_eq!(accented, plain);
    }

    #[test]
    fn multi_word_phrase_matches() {
        let hits = filter().scan("muestra ansiedad generalizada en exámenes");
        assert_eq!(hits, vec!["ansiedad generalizada".to_string()]);
    }

    #[test]
    fn duplicate_spellings_in_config_collapse() {
        let config = GuardrailConfig {
            banned_terms: vec!["depresión".into(), "depresion".into()],
        };
        let f = GuardrailFilter::new(&config);
        assert_eq!(f.scan("sin señales de depresión"), vec!["depresion".to_string()]);
    }

    #[test]
    fn scan_reports_all_hits_in_config_order() {
        let hits = filter().scan("diagnóstico de trastorno y tdah");
        assert_eq!(
            hits,
            vec![
                "tdah".to_string(),
                "trastorno".to_string(),
                "diagnostico".to_string()
            ]
        );
    }

    #[test]
    fn softener_rewrites_diagnostic_words() {
        let softener = SoftenDiagnostic::new();
        let out = softener
            .resolve("se recomienda un diagnóstico y otra diagnostica", &[])
            .unwrap();
        assert_eq!(out, "se recomienda un evaluación y otra evaluación");
    }

    #[test]
    fn rewriting_strategy_still_rejects_in_enforce() {
        let f = filter().with_strategy(Box::new(SoftenDiagnostic::new()));
        let value = json!({"summary": "requiere diagnóstico"});
        let err = f.enforce(&value).unwrap_err();
        assert!(matches!(err, PipelineError::GuardrailViolation { .. }));
    }
}
