//! `apoyo ingest` — Add a playbook document to the retrieval corpus.

use std::path::PathBuf;

use apoyo_config::AppConfig;
use apoyo_retrieval::{ChromaPlaybookIndex, PlaybookMetadata};

pub async fn run(
    id: String,
    file: PathBuf,
    age_min: u8,
    age_max: u8,
    contexts: String,
) -> Result<(), Box<dyn std::error::Error>> {
    if age_min > age_max {
        return Err(format!("age_min {age_min} is greater than age_max {age_max}").into());
    }

    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let content = std::fs::read_to_string(&file)
        .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;

    let metadata = PlaybookMetadata {
        age_min,
        age_max,
        context: contexts.to_lowercase(),
    };

    let index = ChromaPlaybookIndex::new(&config.retrieval)?;
    index.add_playbook(&id, &content, &metadata).await?;

    println!(
        "Ingested playbook '{}' (ages {}..={}, contexts: {})",
        id, age_min, age_max, metadata.context
    );
    Ok(())
}
