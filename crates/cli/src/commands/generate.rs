//! `apoyo generate` — Run one support generation for a report.
//!
//! Wires the configured index and backend into the pipeline, retries the
//! run with the same bounded policy the queue worker uses, and prints the
//! resulting record as JSON. A fallback run also prints the review-queue
//! event that would be recorded for it.

use std::path::PathBuf;
use std::sync::Arc;

use apoyo_config::AppConfig;
use apoyo_core::request::SupportRequest;
use apoyo_jobs::{FallbackEvent, GenerationJob, JobRunner};
use apoyo_jobs::fallback::FallbackScope;
use apoyo_pipeline::SupportGenerator;
use apoyo_providers::backend_from_config;
use apoyo_retrieval::ChromaPlaybookIndex;
use uuid::Uuid;

pub async fn run(
    name: String,
    age: u8,
    group: String,
    report_file: PathBuf,
    contexts: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    GROQ_API_KEY   (for the default Groq backend)");
        eprintln!("    OPENAI_API_KEY (for OpenAI)");
        eprintln!("    APOYO_API_KEY  (generic)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let report_text = std::fs::read_to_string(&report_file)
        .map_err(|e| format!("Failed to read {}: {e}", report_file.display()))?;

    let contexts = (!contexts.is_empty()).then_some(contexts);
    let request = SupportRequest::new(name, age, group, report_text, contexts)?;

    let store = Arc::new(ChromaPlaybookIndex::new(&config.retrieval)?);
    let backend = Arc::new(backend_from_config(&config.backend)?);
    let generator = SupportGenerator::new(store, backend, &config);

    // One-shot local job; the ids only matter to the review queue.
    let mut job = GenerationJob::new(Uuid::nil(), Uuid::nil(), Uuid::nil(), None, None);
    let runner = JobRunner::new(&config.retry);

    let result = runner.run(&mut job, || generator.generate(&request)).await?;

    println!("{}", serde_json::to_string_pretty(&result.support)?);
    eprintln!();
    eprintln!("model: {}", result.model_name);
    eprintln!("attempts: {}", job.attempts);

    let scope = FallbackScope {
        school_id: Uuid::nil(),
        student_id: Uuid::nil(),
        report_id: Uuid::nil(),
        ai_report_id: None,
        created_by: None,
    };
    if let Some(event) = FallbackEvent::from_audit(scope, &result.audit) {
        eprintln!();
        eprintln!("No playbook material covered this case; review-queue event:");
        eprintln!("{}", serde_json::to_string_pretty(&event)?);
    }

    Ok(())
}
