//! Chroma-style vector-index adapter for the playbook corpus.
//!
//! The index supports numeric range predicates but has no "contains"
//! operator on string fields, so filtering happens in two phases:
//!
//! 1. At the index: semantic similarity plus the age range predicate
//!    (`age_min <= age <= age_max`).
//! 2. Here: a case-insensitive containment check of the requested context
//!    tag against the comma-joined `context` metadata field
//!    (e.g. `"aula,casa"`).
//!
//! Because phase 2 discards rows, the query over-fetches
//! `limit * fetch_multiplier` candidates before filtering; see
//! `RetrievalConfig::fetch_multiplier` for the rationale.

use apoyo_config::RetrievalConfig;
use apoyo_core::error::RetrievalError;
use apoyo_core::retrieval::RetrievalStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

/// Metadata stored with each playbook document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybookMetadata {
    /// Youngest age the strategy applies to.
    pub age_min: u8,
    /// Oldest age the strategy applies to.
    pub age_max: u8,
    /// Comma-joined context tags, e.g. `"aula,casa"`.
    pub context: String,
}

/// HTTP client for a Chroma-style vector index holding playbook snippets.
pub struct ChromaPlaybookIndex {
    base_url: String,
    collection: String,
    fetch_multiplier: usize,
    client: reqwest::Client,
}

impl ChromaPlaybookIndex {
    /// Build the adapter from the retrieval configuration section.
    pub fn new(config: &RetrievalConfig) -> Result<Self, RetrievalError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| RetrievalError::Unreachable(e.to_string()))?;

        Ok(Self {
            base_url: format!("http://{}:{}", config.host, config.port),
            collection: config.collection.clone(),
            fetch_multiplier: config.fetch_multiplier,
            client,
        })
    }

    /// Add one playbook document to the corpus.
    pub async fn add_playbook(
        &self,
        playbook_id: &str,
        content: &str,
        metadata: &PlaybookMetadata,
    ) -> Result<(), RetrievalError> {
        let url = format!(
            "{}/api/v1/collections/{}/add",
            self.base_url, self.collection
        );

        let body = json!({
            "ids": [playbook_id],
            "documents": [content],
            "metadatas": [metadata],
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RetrievalError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let detail = response.text().await.unwrap_or_default();
            return Err(RetrievalError::QueryFailed(format!(
                "add returned status {status}: {detail}"
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl RetrievalStore for ChromaPlaybookIndex {
    async fn query(
        &self,
        text: &str,
        age: u8,
        context: &str,
        limit: usize,
    ) -> Result<Vec<String>, RetrievalError> {
        let url = format!(
            "{}/api/v1/collections/{}/query",
            self.base_url, self.collection
        );

        // Over-fetch so the context post-filter has enough candidates.
        let fetch = limit.saturating_mul(self.fetch_multiplier).max(limit);

        let body = json!({
            "query_texts": [text],
            "n_results": fetch,
            "where": {
                "$and": [
                    {"age_min": {"$lte": age}},
                    {"age_max": {"$gte": age}},
                ]
            },
            "include": ["documents", "metadatas"],
        });

        debug!(context, age, fetch, "Querying playbook index");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RetrievalError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let detail = response.text().await.unwrap_or_default();
            return Err(RetrievalError::QueryFailed(format!(
                "query returned status {status}: {detail}"
            )));
        }

        let payload: QueryResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::QueryFailed(format!("bad query response: {e}")))?;

        // The index returns one row per query text; we always send one.
        let documents = payload.documents.into_iter().next().unwrap_or_default();
        let metadatas = payload.metadatas.into_iter().next().unwrap_or_default();

        let mut matched = filter_by_context(documents, &metadatas, context);
        matched.truncate(limit);
        Ok(matched)
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    documents: Vec<Vec<String>>,
    #[serde(default)]
    metadatas: Vec<Vec<QueryMetadata>>,
}

#[derive(Debug, Default, Deserialize)]
struct QueryMetadata {
    #[serde(default)]
    context: Option<String>,
}

/// Phase-2 filter: keep documents whose `context` metadata contains the
/// requested tag. A blank tag keeps everything (the index already did the
/// age filtering). Documents without metadata rows are dropped when a tag
/// is requested — membership cannot be confirmed for them.
fn filter_by_context(
    documents: Vec<String>,
    metadatas: &[QueryMetadata],
    context: &str,
) -> Vec<String> {
    let wanted = context.trim().to_lowercase();
    if wanted.is_empty() {
        return documents;
    }

    documents
        .into_iter()
        .zip(metadatas.iter())
        .filter(|(_, meta)| {
            meta.context
                .as_deref()
                .unwrap_or("")
                .to_lowercase()
                .contains(&wanted)
        })
        .map(|(doc, _)| doc)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(context: &str) -> QueryMetadata {
        QueryMetadata {
            context: Some(context.into()),
        }
    }

    #[test]
    fn context_filter_matches_membership() {
        let docs = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let metas = vec![meta("aula,casa"), meta("casa"), meta("aula")];

        let filtered = filter_by_context(docs, &metas, "aula");
        assert_eq!(filtered, vec!["a", "c"]);
    }

    #[test]
    fn context_filter_is_case_insensitive() {
        let docs = vec!["a".to_string()];
        let metas = vec![meta("Aula,Casa")];
        assert_eq!(filter_by_context(docs, &metas, "AULA"), vec!["a"]);
    }

    #[test]
    fn blank_context_keeps_everything() {
        let docs = vec!["a".to_string(), "b".to_string()];
        let metas = vec![meta("aula"), meta("casa")];
        assert_eq!(filter_by_context(docs, &metas, "  "), vec!["a", "b"]);
    }

    #[test]
    fn missing_metadata_drops_document() {
        let docs = vec!["a".to_string(), "b".to_string()];
        let metas = vec![QueryMetadata { context: None }, meta("aula")];
        assert_eq!(filter_by_context(docs, &metas, "aula"), vec!["b"]);
    }

    #[test]
    fn index_url_built_from_config() {
        let config = RetrievalConfig::default();
        let index = ChromaPlaybookIndex::new(&config).unwrap();
        assert_eq!(index.base_url, "http://chroma:8000");
        assert_eq!(index.collection, "jcj_playbooks_v1");
    }
}
