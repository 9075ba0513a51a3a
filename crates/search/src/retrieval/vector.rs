//! Vector similarity search through an external store
//!
//! Provides semantic search by delegating to a [`VectorStore`].

use super::{RankedList, RetrievalMode, Retriever, SearchResult, VECTOR_SOURCE};
use siftrank_common::errors::Result;
use siftrank_common::{QueryContext, VectorStore};
use std::sync::Arc;
use tracing::debug;

/// Vector retriever over a shared store handle
#[derive(Clone)]
pub struct VectorRetriever {
    store: Arc<dyn VectorStore>,
}

impl VectorRetriever {
    /// Create a new vector retriever
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Store results as a ranked list labelled "vector"
    pub async fn search_ranked(
        &self,
        ctx: &QueryContext,
        query: &str,
        k: usize,
    ) -> Result<RankedList> {
        let hits = self.store.similarity_search_with_score(ctx, query, k).await?;
        debug!(requested = k, returned = hits.len(), "Vector search complete");

        Ok(RankedList::from_sorted(
            VECTOR_SOURCE,
            hits.into_iter().map(|h| (h.document, h.score)),
        ))
    }
}

#[async_trait::async_trait]
impl Retriever for VectorRetriever {
    async fn search(
        &self,
        ctx: &QueryContext,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let list = self.search_ranked(ctx, query, top_k).await?;
        let results = list
            .documents
            .into_iter()
            .map(|d| SearchResult {
                document: d.document,
                score: d.score,
                vector_score: Some(d.score),
                keyword_score: None,
                vector_rank: Some(d.rank),
                keyword_rank: None,
            })
            .collect();
        Ok(results)
    }

    fn mode(&self) -> RetrievalMode {
        RetrievalMode::Vector
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siftrank_common::vectorstore::InMemoryVectorStore;
    use siftrank_common::Document;

    #[tokio::test]
    async fn test_vector_ranks_follow_store_order() {
        let store = InMemoryVectorStore::new().with_documents(vec![
            Document::new("rust async runtime").with_id("a"),
            Document::new("rust ownership").with_id("b"),
            Document::new("gardening tips").with_id("c"),
        ]);
        let retriever = VectorRetriever::new(Arc::new(store));

        let results = retriever
            .search(&QueryContext::background(), "rust async", 5)
            .await
            .unwrap();

        assert_eq!(results[0].document.id().as_deref(), Some("a"));
        let ranks: Vec<usize> = results.iter().filter_map(|r| r.vector_rank).collect();
        assert_eq!(ranks, (1..=results.len()).collect::<Vec<_>>());
        assert!(results.iter().all(|r| r.keyword_score.is_none()));
    }

    #[tokio::test]
    async fn test_store_error_propagates() {
        let store = InMemoryVectorStore::new().with_failure("index offline");
        let retriever = VectorRetriever::new(Arc::new(store));

        let err = retriever
            .search(&QueryContext::background(), "anything", 5)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("index offline"));
    }
}
