//! The pipeline orchestrator.
//!
//! One request, one sequential fail-fast chain. All collaborators are
//! injected; nothing here reads ambient process state, retries, or keeps
//! state across requests.

use std::sync::Arc;

use apoyo_config::AppConfig;
use apoyo_core::backend::GenerationBackend;
use apoyo_core::error::PipelineError;
use apoyo_core::request::SupportRequest;
use apoyo_core::retrieval::RetrievalStore;
use apoyo_core::support::GeneratedSupport;
use apoyo_retrieval::ContextAggregator;
use tracing::{debug, info};

use crate::guardrails::GuardrailFilter;
use crate::outcome::{attach_meta, build_audit_summary, AuditSummary};
use crate::parser::extract_json_object;
use crate::prompt::PromptComposer;
use crate::validate::validate_support;

/// Everything one successful run produces. No partial result ever leaves
/// the generator — a stage failure aborts before anything is returned.
#[derive(Debug)]
pub struct GenerationResult {
    /// The validated, guardrail-passed record with outcome metadata.
    pub support: GeneratedSupport,
    /// Backend identity (`provider:model`) for the audit row.
    pub model_name: String,
    /// The package for the fallback-tracking collaborator.
    pub audit: AuditSummary,
}

/// Runs the full generation pipeline for one request.
pub struct SupportGenerator {
    aggregator: ContextAggregator,
    backend: Arc<dyn GenerationBackend>,
    composer: PromptComposer,
    guardrails: GuardrailFilter,
}

impl SupportGenerator {
    pub fn new(
        store: Arc<dyn RetrievalStore>,
        backend: Arc<dyn GenerationBackend>,
        config: &AppConfig,
    ) -> Self {
        Self {
            aggregator: ContextAggregator::new(store, config.retrieval.results_per_context),
            backend,
            composer: PromptComposer::new(&config.prompt),
            guardrails: GuardrailFilter::new(&config.guardrails),
        }
    }

    /// Execute one generation run.
    ///
    /// Stage order: retrieval → prompt → model call → JSON extraction →
    /// schema validation → guardrails → outcome metadata. Every failure
    /// aborts; an empty retrieval does not fail, it drives the fallback
    /// path instead.
    pub async fn generate(
        &self,
        request: &SupportRequest,
    ) -> Result<GenerationResult, PipelineError> {
        info!(
            age = request.age,
            contexts = ?request.contexts(),
            "Generation: starting retrieval"
        );

        let outcome = self
            .aggregator
            .gather(&request.report_text, request.age, request.contexts())
            .await?;

        if outcome.fallback_used() {
            info!("Generation: no strategies retrieved, composing fallback prompt");
        } else {
            debug!(retrieved = outcome.total_items(), "Generation: strategies retrieved");
        }

        let prompt = self.composer.compose(request, &outcome);

        let raw = self.backend.run(&prompt).await?.into_text()?;
        debug!(raw_len = raw.len(), "Generation: raw response received");

        let value = extract_json_object(&raw)?;
        let mut support = validate_support(&value)?;
        self.guardrails.enforce(&value)?;

        attach_meta(&mut support, &outcome);
        let audit = build_audit_summary(request, &outcome, &support);

        info!(
            fallback = audit.fallback_used,
            retrieved = audit.retrieved_count,
            "Generation: run complete"
        );

        Ok(GenerationResult {
            support,
            model_name: self.backend.model_name(),
            audit,
        })
    }
}
