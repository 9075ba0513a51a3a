//! Hybrid retrieval combining vector and BM25 search
//!
//! Both sides run as independently spawned tasks. The join is fail-fast and
//! races the caller's context: the first side error, cancellation or deadline
//! aborts the other task and ends the call. No partial results are returned.

use super::{
    bm25::{BM25Retriever, IndexStats},
    finalize,
    fusion::{self, FusionStrategy, WeightedFusion},
    vector::VectorRetriever,
    RankedList, RetrievalMode, Retriever, SearchResult,
};
use crate::tokenizer::{self, Tokenizer, WhitespaceTokenizer};
use siftrank_common::config::{AppConfig, Bm25Config, HybridConfig};
use siftrank_common::errors::{AppError, Result};
use siftrank_common::{metrics, Document, QueryContext, SearchSide, VectorStore};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Hybrid retriever combining a vector store and an in-memory BM25 index
pub struct HybridRetriever {
    vector: VectorRetriever,
    bm25: Arc<RwLock<BM25Retriever>>,
    fusion: Arc<dyn FusionStrategy>,
    config: HybridConfig,
}

/// Builder for [`HybridRetriever`]
#[derive(Default)]
pub struct HybridRetrieverBuilder {
    vector_store: Option<Arc<dyn VectorStore>>,
    documents: Vec<Document>,
    tokenizer: Option<Arc<dyn Tokenizer>>,
    fusion: Option<Arc<dyn FusionStrategy>>,
    config: HybridConfig,
    bm25: Bm25Config,
}

impl HybridRetrieverBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Collection indexed by the BM25 side
    pub fn documents(mut self, documents: Vec<Document>) -> Self {
        self.documents = documents;
        self
    }

    pub fn tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    /// Override the strategy otherwise derived from the hybrid config
    pub fn fusion(mut self, fusion: Arc<dyn FusionStrategy>) -> Self {
        self.fusion = Some(fusion);
        self
    }

    pub fn config(mut self, config: HybridConfig) -> Self {
        self.config = config;
        self
    }

    pub fn bm25_config(mut self, bm25: Bm25Config) -> Self {
        self.bm25 = bm25;
        self
    }

    pub fn min_score(mut self, min_score: f32) -> Self {
        self.config.min_score = min_score;
        self
    }

    pub fn fetch_multiplier(mut self, multiplier: usize) -> Self {
        self.config.fetch_multiplier = multiplier;
        self
    }

    pub fn build(self) -> Result<HybridRetriever> {
        let store = self.vector_store.ok_or_else(|| AppError::MissingField {
            field: "vector_store".to_string(),
        })?;
        if self.documents.is_empty() {
            return Err(AppError::EmptyCorpus);
        }

        let tokenizer = self
            .tokenizer
            .unwrap_or_else(|| Arc::new(WhitespaceTokenizer::default()));
        let fusion = self.fusion.unwrap_or_else(|| fusion::from_config(&self.config));

        info!(
            documents = self.documents.len(),
            tokenizer = tokenizer.name(),
            fusion = fusion.name(),
            "Building hybrid retriever"
        );

        let bm25 = BM25Retriever::with_config(self.documents, tokenizer, self.bm25);

        Ok(HybridRetriever {
            vector: VectorRetriever::new(store),
            bm25: Arc::new(RwLock::new(bm25)),
            fusion,
            config: self.config,
        })
    }
}

impl HybridRetriever {
    /// Defaults: whitespace tokenizer, RRF(60), 2x fan-out, no score floor
    pub fn new(store: Arc<dyn VectorStore>, documents: Vec<Document>) -> Result<Self> {
        Self::builder().vector_store(store).documents(documents).build()
    }

    pub fn builder() -> HybridRetrieverBuilder {
        HybridRetrieverBuilder::new()
    }

    /// Tokenizer, BM25 parameters and hybrid settings from application config
    pub fn from_config(
        store: Arc<dyn VectorStore>,
        documents: Vec<Document>,
        config: &AppConfig,
    ) -> Result<Self> {
        Self::builder()
            .vector_store(store)
            .documents(documents)
            .tokenizer(tokenizer::from_config(&config.tokenizer))
            .bm25_config(config.bm25)
            .config(config.hybrid.clone())
            .build()
    }

    /// Replace the fusion strategy
    pub fn with_fusion(mut self, fusion: Arc<dyn FusionStrategy>) -> Self {
        self.fusion = fusion;
        self
    }

    /// Switch to weighted fusion using the configured vector/keyword weights
    pub fn with_weighted_fusion(self) -> Self {
        let weighted = WeightedFusion::hybrid(self.config.vector_weight, self.config.keyword_weight)
            .with_normalize(self.config.normalize);
        self.with_fusion(Arc::new(weighted))
    }

    pub fn config(&self) -> &HybridConfig {
        &self.config
    }

    pub fn fusion(&self) -> &Arc<dyn FusionStrategy> {
        &self.fusion
    }

    /// Fused search over both sides
    #[instrument(skip(self, ctx), fields(fusion = self.fusion.name()))]
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
        let ctx = self.bounded(ctx);
        ctx.check()?;

        let vector_k = self.config.vector_fetch(top_k);
        let keyword_k = self.config.keyword_fetch(top_k);

        let vector_task: JoinHandle<Result<RankedList>> = {
            let vector = self.vector.clone();
            let ctx = ctx.clone();
            let query = query.to_string();
            tokio::spawn(async move { vector.search_ranked(&ctx, &query, vector_k).await })
        };
        let keyword_task: JoinHandle<Result<RankedList>> = {
            let bm25 = Arc::clone(&self.bm25);
            let query = query.to_string();
            tokio::spawn(async move { Ok(bm25.read().await.search_ranked(&query, keyword_k)) })
        };

        let vector_abort = vector_task.abort_handle();
        let keyword_abort = keyword_task.abort_handle();

        let joined = tokio::select! {
            res = async {
                tokio::try_join!(
                    settle(SearchSide::Vector, vector_task),
                    settle(SearchSide::Keyword, keyword_task),
                )
            } => res,
            err = ctx.done() => Err(err),
        };

        let (vector_list, keyword_list) = match joined {
            Ok(lists) => lists,
            Err(e) => {
                vector_abort.abort();
                keyword_abort.abort();
                if let Some(side) = e.failed_side() {
                    metrics::record_source_failure(side.as_str());
                }
                warn!(error = %e, "Hybrid search failed");
                return Err(e);
            }
        };

        debug!(
            vector_hits = vector_list.len(),
            keyword_hits = keyword_list.len(),
            vector_k,
            keyword_k,
            "Fusing ranked lists"
        );

        let fused = self
            .fusion
            .fuse(&[vector_list, keyword_list])
            .into_iter()
            .map(SearchResult::from_fused)
            .collect();
        let results = finalize(fused, self.config.min_score, top_k);

        metrics::record_search(
            start.elapsed().as_secs_f64(),
            RetrievalMode::Hybrid.as_str(),
            results.len(),
        );
        Ok(results)
    }

    /// Vector side only, no fusion
    pub async fn search_vector_only(
        &self,
        ctx: &QueryContext,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let ctx = self.bounded(ctx);
        self.vector.search(&ctx, query, top_k).await
    }

    /// Keyword side only, no fusion
    pub async fn search_keyword_only(
        &self,
        ctx: &QueryContext,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let ctx = self.bounded(ctx);
        let bm25 = self.bm25.read().await;
        Retriever::search(&*bm25, &ctx, query, top_k).await
    }

    /// Add documents to the vector store, then to the BM25 index.
    ///
    /// A store error is returned before the index is touched. A store success
    /// is never rolled back.
    #[instrument(skip(self, ctx, documents), fields(count = documents.len()))]
    pub async fn add_documents(
        &self,
        ctx: &QueryContext,
        documents: Vec<Document>,
    ) -> Result<Vec<String>> {
        let ids = self.vector.store().add_documents(ctx, &documents).await?;
        let mut bm25 = self.bm25.write().await;
        bm25.add_documents(documents);
        info!(added = ids.len(), total = bm25.document_count(), "Documents added");
        Ok(ids)
    }

    /// Documents in the BM25 collection
    pub async fn document_count(&self) -> usize {
        self.bm25.read().await.document_count()
    }

    pub async fn stats(&self) -> IndexStats {
        self.bm25.read().await.stats()
    }

    /// Apply the configured per-query timeout unless the caller's deadline is sooner
    fn bounded(&self, ctx: &QueryContext) -> QueryContext {
        match (self.config.timeout(), ctx.remaining()) {
            (Some(timeout), Some(remaining)) if remaining <= timeout => ctx.clone(),
            (Some(timeout), _) => ctx.clone().with_timeout(timeout),
            (None, _) => ctx.clone(),
        }
    }
}

/// Await one side, tagging failures with the side they came from
async fn settle(
    side: SearchSide,
    task: JoinHandle<Result<RankedList>>,
) -> Result<RankedList> {
    match task.await {
        Ok(Ok(list)) => Ok(list),
        Ok(Err(e)) => Err(AppError::search_failed(side, e)),
        Err(e) => Err(AppError::TaskJoin {
            side,
            message: e.to_string(),
        }),
    }
}

#[async_trait::async_trait]
impl Retriever for HybridRetriever {
    async fn search(
        &self,
        ctx: &QueryContext,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        HybridRetriever::search(self, ctx, query, top_k).await
    }

    fn mode(&self) -> RetrievalMode {
        RetrievalMode::Hybrid
    }
}
