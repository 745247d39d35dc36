//! Context aggregation — one independent index query per context tag.
//!
//! Queries are independent by design: results are grouped per tag with no
//! cross-context ranking, so a strategy that fits "aula" never displaces
//! one that fits "casa". Whether the whole run fell back is derived from
//! the aggregate count on the resulting outcome, never decided here.

use std::sync::Arc;

use apoyo_core::error::RetrievalError;
use apoyo_core::retrieval::{ContextResults, RetrievalOutcome, RetrievalStore};
use tracing::debug;

/// Runs retrieval once per requested context and merges the results.
pub struct ContextAggregator {
    store: Arc<dyn RetrievalStore>,
    results_per_context: usize,
}

impl ContextAggregator {
    pub fn new(store: Arc<dyn RetrievalStore>, results_per_context: usize) -> Self {
        Self {
            store,
            results_per_context,
        }
    }

    /// Retrieve strategies for every context tag, in request order.
    ///
    /// Empty per-context results are recorded as empty, not skipped — the
    /// prompt composer renders an explicit no-material notice for them.
    pub async fn gather(
        &self,
        report_text: &str,
        age: u8,
        contexts: &[String],
    ) -> Result<RetrievalOutcome, RetrievalError> {
        let mut outcome = RetrievalOutcome::new();

        for context in contexts {
            let docs = self
                .store
                .query(report_text, age, context, self.results_per_context)
                .await?;

            debug!(context = %context, count = docs.len(), "Context retrieval complete");
            outcome.push(context.clone(), ContextResults::Plain(docs));
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Store stub returning canned results keyed by context tag.
    struct StubStore {
        by_context: Vec<(&'static str, Vec<&'static str>)>,
    }

    #[async_trait]
    impl RetrievalStore for StubStore {
        async fn query(
            &self,
            _text: &str,
            _age: u8,
            context: &str,
            limit: usize,
        ) -> Result<Vec<String>, RetrievalError> {
            let docs = self
                .by_context
                .iter()
                .find(|(tag, _)| *tag == context)
                .map(|(_, docs)| docs.iter().take(limit).map(|d| d.to_string()).collect())
                .unwrap_or_default();
            Ok(docs)
        }
    }

    fn contexts(tags: &[&str]) -> Vec<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    #[tokio::test]
    async fn gathers_per_context_in_order() {
        let store = Arc::new(StubStore {
            by_context: vec![("aula", vec!["estrategia uno", "estrategia dos"]), ("casa", vec![])],
        });
        let aggregator = ContextAggregator::new(store, 3);

        let outcome = aggregator
            .gather("se distrae", 6, &contexts(&["aula", "casa"]))
            .await
            .unwrap();

        assert_eq!(outcome.contexts(), vec!["aula", "casa"]);
        assert_eq!(outcome.get("aula").unwrap().len(), 2);
        assert!(outcome.get("casa").unwrap().is_empty());
        assert_eq!(outcome.total_items(), 2);
        assert!(!outcome.fallback_used());
    }

    #[tokio::test]
    async fn empty_everywhere_drives_fallback() {
        let store = Arc::new(StubStore {
            by_context: vec![("aula", vec![]), ("casa", vec![])],
        });
        let aggregator = ContextAggregator::new(store, 3);

        let outcome = aggregator
            .gather("se distrae", 6, &contexts(&["aula", "casa"]))
            .await
            .unwrap();

        assert_eq!(outcome.total_items(), 0);
        assert!(outcome.fallback_used());
    }

    #[tokio::test]
    async fn respects_results_per_context() {
        let store = Arc::new(StubStore {
            by_context: vec![("aula", vec!["a", "b", "c", "d", "e"])],
        });
        let aggregator = ContextAggregator::new(store, 2);

        let outcome = aggregator
            .gather("se distrae", 6, &contexts(&["aula"]))
            .await
            .unwrap();

        assert_eq!(outcome.total_items(), 2);
    }
}
