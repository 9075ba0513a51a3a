//! Multi-modal retrieval system
//!
//! Provides four retrieval modes:
//! - Vector search (delegated to an external vector store)
//! - Keyword search (in-memory BM25 index)
//! - Hybrid search (concurrent vector + keyword, fused locally)
//! - Native hybrid search (fusion computed by the vector store)

mod vector;
mod bm25;
mod hybrid;
pub mod fusion;
mod native;

pub use vector::VectorRetriever;
pub use bm25::{BM25Index, BM25Retriever, IndexStats, ScoredDocument};
pub use hybrid::{HybridRetriever, HybridRetrieverBuilder};
pub use fusion::{
    FusedDocument, FusionStrategy, LinearCombination, RRFusion, WeightedFusion, DEFAULT_RRF_K,
};
pub use native::NativeFusionRetriever;

use serde::{Deserialize, Serialize};
use siftrank_common::errors::Result;
use siftrank_common::{Document, QueryContext};

/// Source label for vector results in ranked lists
pub const VECTOR_SOURCE: &str = "vector";

/// Source label for keyword results in ranked lists
pub const KEYWORD_SOURCE: &str = "keyword";

/// Retrieval mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
    /// Vector similarity search
    Vector,
    /// BM25 keyword search
    Keyword,
    /// Locally fused hybrid search
    Hybrid,
    /// Store-side fused hybrid search
    NativeHybrid,
}

impl RetrievalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalMode::Vector => "vector",
            RetrievalMode::Keyword => "keyword",
            RetrievalMode::Hybrid => "hybrid",
            RetrievalMode::NativeHybrid => "native_hybrid",
        }
    }
}

/// A document at a 1-based position within one source's results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedDocument {
    pub document: Document,
    pub score: f32,

    /// 1-based rank within its list
    pub rank: usize,
}

/// One source's results in rank order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedList {
    /// Source label, e.g. "vector" or "keyword"
    pub source: String,
    pub documents: Vec<RankedDocument>,
}

impl RankedList {
    /// Build a list from already-sorted `(document, score)` pairs.
    ///
    /// Ranks are assigned by position, so they are contiguous from 1.
    pub fn from_sorted<I>(source: impl Into<String>, results: I) -> Self
    where
        I: IntoIterator<Item = (Document, f32)>,
    {
        let documents = results
            .into_iter()
            .enumerate()
            .map(|(i, (document, score))| RankedDocument {
                document,
                score,
                rank: i + 1,
            })
            .collect();

        Self {
            source: source.into(),
            documents,
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// A search result with the fused score and each source's contribution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub document: Document,

    /// Final score (fused for hybrid modes, raw for single-source modes)
    pub score: f32,

    /// Raw vector similarity, if the vector side returned this document
    pub vector_score: Option<f32>,

    /// Raw BM25 score, if the keyword side returned this document
    pub keyword_score: Option<f32>,

    /// 1-based vector rank, if present
    pub vector_rank: Option<usize>,

    /// 1-based keyword rank, if present
    pub keyword_rank: Option<usize>,
}

impl SearchResult {
    pub(crate) fn from_fused(fused: FusedDocument) -> Self {
        Self {
            vector_score: fused.source_scores.get(VECTOR_SOURCE).copied(),
            keyword_score: fused.source_scores.get(KEYWORD_SOURCE).copied(),
            vector_rank: fused.source_ranks.get(VECTOR_SOURCE).copied(),
            keyword_rank: fused.source_ranks.get(KEYWORD_SOURCE).copied(),
            score: fused.score,
            document: fused.document,
        }
    }
}

/// Common trait for all retrievers
#[async_trait::async_trait]
pub trait Retriever: Send + Sync {
    /// Retrieve up to `top_k` results for `query`, best first
    async fn search(
        &self,
        ctx: &QueryContext,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>>;

    /// Get the retrieval mode
    fn mode(&self) -> RetrievalMode;
}

/// Drop results below `min_score` (when positive), then keep the first `top_k`
pub(crate) fn finalize(
    results: Vec<SearchResult>,
    min_score: f32,
    top_k: usize,
) -> Vec<SearchResult> {
    results
        .into_iter()
        .filter(|r| min_score <= 0.0 || r.score >= min_score)
        .take(top_k)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranks_contiguous_from_one() {
        let list = RankedList::from_sorted(
            VECTOR_SOURCE,
            vec![
                (Document::new("a"), 0.9),
                (Document::new("b"), 0.5),
                (Document::new("c"), 0.1),
            ],
        );
        let ranks: Vec<usize> = list.documents.iter().map(|d| d.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert_eq!(list.source, "vector");
    }

    fn result(score: f32) -> SearchResult {
        SearchResult {
            document: Document::new(format!("doc {score}")),
            score,
            vector_score: None,
            keyword_score: None,
            vector_rank: None,
            keyword_rank: None,
        }
    }

    #[test]
    fn test_finalize_filters_then_truncates() {
        let results = vec![result(0.9), result(0.6), result(0.3)];
        let kept = finalize(results.clone(), 0.5, 10);
        assert_eq!(kept.len(), 2);

        let truncated = finalize(results, 0.0, 1);
        assert_eq!(truncated.len(), 1);
        assert_eq!(truncated[0].score, 0.9);
    }
}
