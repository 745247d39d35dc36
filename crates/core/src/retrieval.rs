//! Retrieval seam — the vector-index collaborator and its result types.
//!
//! The store is defined as a trait here; the HTTP adapter lives in
//! `apoyo-retrieval`. Result payloads have shipped in more than one shape
//! over time (a plain list, or a container keyed `items`/`results`/
//! `playbooks`), so the per-context result is a closed tagged union with an
//! explicit unrecognized-shape failure instead of silent stringification.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RetrievalError;

/// The retrieval collaborator: semantic search over the playbook corpus.
///
/// Implementations must return an empty list for zero matches — zero
/// results is a valid state, never an error.
#[async_trait]
pub trait RetrievalStore: Send + Sync {
    /// Query strategy snippets relevant to `text`, filtered to playbooks
    /// whose age band covers `age` and whose context list contains
    /// `context`. Most relevant first, at most `limit` items.
    async fn query(
        &self,
        text: &str,
        age: u8,
        context: &str,
        limit: usize,
    ) -> std::result::Result<Vec<String>, RetrievalError>;
}

/// Per-context retrieval results, tolerating the known legacy shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextResults {
    /// The current shape: an ordered list of snippet bodies.
    Plain(Vec<String>),
    /// Older container shape with the list under a well-known key.
    Container(ResultContainer),
}

/// Container payload accepting `items`, `results`, or `playbooks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultContainer {
    #[serde(alias = "results", alias = "playbooks")]
    pub items: Vec<String>,
}

impl ContextResults {
    /// Parse a raw JSON payload into a known result shape.
    ///
    /// `null` counts as an empty result list (older writers emitted it for
    /// contexts that matched nothing). Anything else unknown is rejected.
    pub fn from_value(value: &serde_json::Value) -> std::result::Result<Self, RetrievalError> {
        if value.is_null() {
            return Ok(ContextResults::Plain(Vec::new()));
        }
        serde_json::from_value(value.clone())
            .map_err(|_| RetrievalError::UnrecognizedShape(shape_of(value)))
    }

    /// The snippet bodies, shape-independent, in relevance order.
    pub fn items(&self) -> &[String] {
        match self {
            ContextResults::Plain(items) => items,
            ContextResults::Container(container) => &container.items,
        }
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }
}

fn shape_of(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            format!("object with keys {keys:?}")
        }
        other => format!("{other}"),
    }
}

/// One retrieved strategy snippet, as seen by the prompt composer.
/// Ephemeral — borrows from the outcome it came from.
#[derive(Debug, Clone, Copy)]
pub struct RetrievedStrategy<'a> {
    /// The playbook snippet body.
    pub body: &'a str,
    /// The context tag this snippet was retrieved for.
    pub context: &'a str,
    /// Relevance rank within its context, 1-based.
    pub rank: usize,
}

/// What retrieval produced for one request: context tag → ordered results,
/// in request order.
///
/// `fallback_used` is a pure function of the total item count; it is never
/// stored or independently settable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalOutcome {
    entries: Vec<ContextEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ContextEntry {
    context: String,
    results: ContextResults,
}

impl RetrievalOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the results for one context, preserving query order.
    pub fn push(&mut self, context: impl Into<String>, results: ContextResults) {
        self.entries.push(ContextEntry {
            context: context.into(),
            results,
        });
    }

    /// Rehydrate an outcome from a raw `{context: payload}` mapping, as
    /// written by older queue producers. Each payload goes through the
    /// tolerant [`ContextResults::from_value`] adapter.
    pub fn from_context_map(
        map: &serde_json::Map<String, serde_json::Value>,
    ) -> std::result::Result<Self, RetrievalError> {
        let mut outcome = Self::new();
        for (context, payload) in map {
            outcome.push(context.clone(), ContextResults::from_value(payload)?);
        }
        Ok(outcome)
    }

    /// Context tags in query order.
    pub fn contexts(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.context.as_str()).collect()
    }

    /// Results for one context, if it was queried.
    pub fn get(&self, context: &str) -> Option<&ContextResults> {
        self.entries
            .iter()
            .find(|e| e.context == context)
            .map(|e| &e.results)
    }

    /// Iterate `(context, results)` pairs in query order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContextResults)> {
        self.entries.iter().map(|e| (e.context.as_str(), &e.results))
    }

    /// Iterate every retrieved snippet across all contexts.
    pub fn iter_strategies(&self) -> impl Iterator<Item = RetrievedStrategy<'_>> {
        self.entries.iter().flat_map(|e| {
            e.results
                .items()
                .iter()
                .enumerate()
                .map(move |(i, body)| RetrievedStrategy {
                    body: body.as_str(),
                    context: e.context.as_str(),
                    rank: i + 1,
                })
        })
    }

    /// Total retrieved items across all contexts.
    pub fn total_items(&self) -> usize {
        self.entries.iter().map(|e| e.results.len()).sum()
    }

    /// True iff retrieval found nothing in any context.
    pub fn fallback_used(&self) -> bool {
        self.total_items() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_list_shape() {
        let results = ContextResults::from_value(&json!(["uno", "dos"])).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results.items()[0], "uno");
    }

    #[test]
    fn container_shapes_all_accepted() {
        for key in ["items", "results", "playbooks"] {
            let results = ContextResults::from_value(&json!({key: ["uno"]})).unwrap();
            assert_eq!(results.len(), 1, "key {key}");
        }
    }

    #[test]
    fn null_counts_as_empty() {
        let results = ContextResults::from_value(&serde_json::Value::Null).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn unrecognized_shape_rejected() {
        let err = ContextResults::from_value(&json!({"docs": ["uno"]})).unwrap_err();
        assert!(matches!(err, RetrievalError::UnrecognizedShape(_)));
        assert!(err.to_string().contains("docs"));

        assert!(ContextResults::from_value(&json!(42)).is_err());
    }

    #[test]
    fn fallback_is_derived_from_total() {
        let mut outcome = RetrievalOutcome::new();
        outcome.push("aula", ContextResults::Plain(vec![]));
        outcome.push("casa", ContextResults::Plain(vec![]));
        assert_eq!(outcome.total_items(), 0);
        assert!(outcome.fallback_used());

        let mut outcome = RetrievalOutcome::new();
        outcome.push("aula", ContextResults::Plain(vec!["uno".into(), "dos".into()]));
        outcome.push("casa", ContextResults::Plain(vec![]));
        assert_eq!(outcome.total_items(), 2);
        assert!(!outcome.fallback_used());
    }

    #[test]
    fn context_order_is_preserved() {
        let mut outcome = RetrievalOutcome::new();
        outcome.push("casa", ContextResults::Plain(vec![]));
        outcome.push("aula", ContextResults::Plain(vec![]));
        assert_eq!(outcome.contexts(), vec!["casa", "aula"]);
    }

    #[test]
    fn from_context_map_counts_mixed_shapes() {
        let payload = json!({
            "aula": ["uno", "dos"],
            "casa": {"items": ["tres"]},
            "recreo": null,
        });
        let outcome =
            RetrievalOutcome::from_context_map(payload.as_object().unwrap()).unwrap();
        assert_eq!(outcome.total_items(), 3);
        assert!(!outcome.fallback_used());
    }

    #[test]
    fn strategies_carry_context_and_rank() {
        let mut outcome = RetrievalOutcome::new();
        outcome.push("aula", ContextResults::Plain(vec!["uno".into(), "dos".into()]));
        let strategies: Vec<_> = outcome.iter_strategies().collect();
        assert_eq!(strategies.len(), 2);
        assert_eq!(strategies[0].context, "aula");
        assert_eq!(strategies[0].rank, 1);
        assert_eq!(strategies[1].rank, 2);
    }
}
