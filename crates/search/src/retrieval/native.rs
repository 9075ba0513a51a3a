//! Store-side hybrid search
//!
//! For stores that fuse lexical and vector rankings themselves. Results use the
//! same [`SearchResult`] contract as the local hybrid path.

use super::{
    finalize, FusionStrategy, RankedList, RetrievalMode, Retriever, SearchResult, VectorRetriever,
};
use siftrank_common::config::NativeFusionConfig;
use siftrank_common::errors::Result;
use siftrank_common::vectorstore::{NativeHybridHit, NativeHybridOptions};
use siftrank_common::{metrics, NativeHybridStore, QueryContext, VectorStore};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Retriever delegating fusion to a [`NativeHybridStore`]
pub struct NativeFusionRetriever {
    store: Arc<dyn NativeHybridStore>,
    vector: VectorRetriever,
    config: NativeFusionConfig,
    vector_weight: Option<f32>,
    keyword_weight: Option<f32>,
}

impl NativeFusionRetriever {
    pub fn new<S: NativeHybridStore + 'static>(store: Arc<S>) -> Self {
        Self::with_config(store, NativeFusionConfig::default())
    }

    pub fn with_config<S: NativeHybridStore + 'static>(
        store: Arc<S>,
        config: NativeFusionConfig,
    ) -> Self {
        let vector: Arc<dyn VectorStore> = store.clone();
        Self::from_parts(store, vector, config)
    }

    /// Build from type-erased handles.
    ///
    /// `vector` must refer to the same store as `native`; it serves the
    /// custom-strategy path.
    pub fn from_parts(
        native: Arc<dyn NativeHybridStore>,
        vector: Arc<dyn VectorStore>,
        config: NativeFusionConfig,
    ) -> Self {
        Self {
            store: native,
            vector: VectorRetriever::new(vector),
            config,
            vector_weight: None,
            keyword_weight: None,
        }
    }

    /// Per-side weights, forwarded to stores that support them
    pub fn with_weights(mut self, vector_weight: f32, keyword_weight: f32) -> Self {
        self.vector_weight = Some(vector_weight);
        self.keyword_weight = Some(keyword_weight);
        self
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.config.min_score = min_score;
        self
    }

    pub fn config(&self) -> &NativeFusionConfig {
        &self.config
    }

    fn options(&self) -> NativeHybridOptions {
        NativeHybridOptions {
            rrf_rank_constant: self.config.rrf_rank_constant,
            vector_weight: self.vector_weight,
            keyword_weight: self.keyword_weight,
        }
    }

    /// Fused search computed by the store
    pub async fn search(
        &self,
        ctx: &QueryContext,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let start = Instant::now();
        let hits = self.store.hybrid_search(ctx, query, top_k, &self.options()).await?;
        debug!(
            returned = hits.len(),
            rrf_rank_constant = self.config.rrf_rank_constant,
            "Native hybrid search complete"
        );

        let mut results = to_results(hits);
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        let results = finalize(results, self.config.min_score, top_k);

        metrics::record_search(
            start.elapsed().as_secs_f64(),
            RetrievalMode::NativeHybrid.as_str(),
            results.len(),
        );
        Ok(results)
    }

    /// Vector search only, fused locally with `strategy`.
    ///
    /// Used when the store cannot fuse or a different strategy is wanted.
    pub async fn search_with_custom_strategy(
        &self,
        ctx: &QueryContext,
        query: &str,
        top_k: usize,
        strategy: &dyn FusionStrategy,
    ) -> Result<Vec<SearchResult>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let list: RankedList = self.vector.search_ranked(ctx, query, top_k).await?;

        let fused = strategy
            .fuse(&[list])
            .into_iter()
            .map(SearchResult::from_fused)
            .collect();
        Ok(finalize(fused, self.config.min_score, top_k))
    }
}

/// Map store hits to results, ranking each side among hits it actually scored
fn to_results(hits: Vec<NativeHybridHit>) -> Vec<SearchResult> {
    let vector_ranks = side_ranks(&hits, |h| h.vector_score);
    let keyword_ranks = side_ranks(&hits, |h| h.keyword_score);

    hits.into_iter()
        .enumerate()
        .map(|(i, hit)| SearchResult {
            score: hit.fusion_score,
            vector_score: (hit.vector_score > 0.0).then_some(hit.vector_score),
            keyword_score: (hit.keyword_score > 0.0).then_some(hit.keyword_score),
            vector_rank: vector_ranks[i],
            keyword_rank: keyword_ranks[i],
            document: hit.document,
        })
        .collect()
}

/// 1-based rank of each hit by one side's score; `None` where that score is not positive
fn side_ranks(
    hits: &[NativeHybridHit],
    score: impl Fn(&NativeHybridHit) -> f32,
) -> Vec<Option<usize>> {
    let mut order: Vec<usize> = (0..hits.len()).filter(|&i| score(&hits[i]) > 0.0).collect();
    order.sort_by(|&a, &b| {
        score(&hits[b])
            .partial_cmp(&score(&hits[a]))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranks = vec![None; hits.len()];
    for (pos, idx) in order.into_iter().enumerate() {
        ranks[idx] = Some(pos + 1);
    }
    ranks
}

#[async_trait::async_trait]
impl Retriever for NativeFusionRetriever {
    async fn search(
        &self,
        ctx: &QueryContext,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        NativeFusionRetriever::search(self, ctx, query, top_k).await
    }

    fn mode(&self) -> RetrievalMode {
        RetrievalMode::NativeHybrid
    }
}
