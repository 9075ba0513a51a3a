//! In-memory vector store test double
//!
//! Scores documents by cosine similarity of bag-of-words term counts. This is
//! not an embedding model and not an ANN index; it only gives tests and demos a
//! deterministic store with realistic call semantics (latency, failures,
//! context observation, native hybrid search).

use super::{NativeHybridHit, NativeHybridOptions, NativeHybridStore, ScoredHit, VectorStore};
use crate::context::QueryContext;
use crate::document::Document;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

struct StoredDocument {
    id: String,
    document: Document,
    terms: HashMap<String, f32>,
    norm: f32,
}

impl StoredDocument {
    fn new(document: Document) -> Self {
        let terms = term_counts(&document.content);
        let norm = vector_norm(&terms);
        Self {
            id: document.id().unwrap_or_else(|| Uuid::new_v4().to_string()),
            document,
            terms,
            norm,
        }
    }
}

/// Deterministic in-memory implementation of both store traits
pub struct InMemoryVectorStore {
    documents: RwLock<Vec<StoredDocument>>,
    latency: Option<Duration>,
    failure: Option<String>,
    native_fusion: bool,
    search_calls: AtomicUsize,
    last_k: AtomicUsize,
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryVectorStore {
    /// Create an empty store with native hybrid search enabled
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(Vec::new()),
            latency: None,
            failure: None,
            native_fusion: true,
            search_calls: AtomicUsize::new(0),
            last_k: AtomicUsize::new(0),
        }
    }

    /// Seed the store with documents
    pub fn with_documents(mut self, documents: impl IntoIterator<Item = Document>) -> Self {
        self.documents
            .get_mut()
            .extend(documents.into_iter().map(StoredDocument::new));
        self
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail every call with a store error carrying `message`
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Report native hybrid search as unsupported
    pub fn without_native_fusion(mut self) -> Self {
        self.native_fusion = false;
        self
    }

    /// Number of similarity or hybrid searches served
    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    /// The `k` requested by the most recent search
    pub fn last_k(&self) -> usize {
        self.last_k.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Simulated latency and injected failure, observing the caller's context
    async fn enter(&self, ctx: &QueryContext) -> Result<()> {
        ctx.check()?;
        if let Some(latency) = self.latency {
            tokio::select! {
                _ = tokio::time::sleep(latency) => {}
                err = ctx.done() => return Err(err),
            }
        }
        match &self.failure {
            Some(message) => Err(AppError::VectorStore {
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    fn record_search(&self, k: usize) {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.last_k.store(k, Ordering::SeqCst);
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn similarity_search_with_score(
        &self,
        ctx: &QueryContext,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredHit>> {
        self.record_search(k);
        self.enter(ctx).await?;

        let query_terms = term_counts(query);
        let query_norm = vector_norm(&query_terms);
        let docs = self.documents.read().await;

        let mut hits: Vec<ScoredHit> = docs
            .iter()
            .filter_map(|stored| {
                let score = cosine(&query_terms, query_norm, stored);
                (score > 0.0).then(|| ScoredHit {
                    document: stored.document.clone(),
                    score,
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    async fn add_documents(
        &self,
        ctx: &QueryContext,
        documents: &[Document],
    ) -> Result<Vec<String>> {
        self.enter(ctx).await?;

        let mut docs = self.documents.write().await;
        let mut ids = Vec::with_capacity(documents.len());
        for document in documents {
            let stored = StoredDocument::new(document.clone());
            ids.push(stored.id.clone());
            docs.push(stored);
        }
        Ok(ids)
    }
}

#[async_trait]
impl NativeHybridStore for InMemoryVectorStore {
    async fn hybrid_search(
        &self,
        ctx: &QueryContext,
        query: &str,
        k: usize,
        options: &NativeHybridOptions,
    ) -> Result<Vec<NativeHybridHit>> {
        self.record_search(k);
        if !self.native_fusion {
            return Err(AppError::NativeFusionUnavailable {
                message: "in-memory store configured without native fusion".to_string(),
            });
        }
        self.enter(ctx).await?;

        let query_terms = term_counts(query);
        let query_norm = vector_norm(&query_terms);
        let docs = self.documents.read().await;

        // (index, vector score, keyword score)
        let candidates: Vec<(usize, f32, f32)> = docs
            .iter()
            .enumerate()
            .map(|(i, stored)| {
                let vector = cosine(&query_terms, query_norm, stored);
                let keyword: f32 = query_terms
                    .keys()
                    .filter_map(|t| stored.terms.get(t))
                    .sum();
                (i, vector, keyword)
            })
            .filter(|&(_, v, kw)| v > 0.0 || kw > 0.0)
            .collect();

        let vector_ranks = ranks_by(&candidates, |c| c.1);
        let keyword_ranks = ranks_by(&candidates, |c| c.2);
        let rank_k = options.rrf_rank_constant as f32;
        let vector_weight = options.vector_weight.unwrap_or(1.0);
        let keyword_weight = options.keyword_weight.unwrap_or(1.0);

        let mut hits: Vec<NativeHybridHit> = candidates
            .iter()
            .map(|&(i, vector_score, keyword_score)| {
                let mut fusion_score = 0.0;
                if let Some(r) = vector_ranks.get(&i) {
                    fusion_score += vector_weight / (rank_k + *r as f32);
                }
                if let Some(r) = keyword_ranks.get(&i) {
                    fusion_score += keyword_weight / (rank_k + *r as f32);
                }
                NativeHybridHit {
                    document: docs[i].document.clone(),
                    vector_score,
                    keyword_score,
                    fusion_score,
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            b.fusion_score
                .partial_cmp(&a.fusion_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        Ok(hits)
    }
}

/// 1-based ranks of candidates with a positive score on one side
fn ranks_by(
    candidates: &[(usize, f32, f32)],
    score: impl Fn(&(usize, f32, f32)) -> f32,
) -> HashMap<usize, usize> {
    let mut scored: Vec<&(usize, f32, f32)> =
        candidates.iter().filter(|c| score(*c) > 0.0).collect();
    scored.sort_by(|a, b| score(*b).partial_cmp(&score(*a)).unwrap_or(std::cmp::Ordering::Equal));
    scored
        .into_iter()
        .enumerate()
        .map(|(rank, c)| (c.0, rank + 1))
        .collect()
}

fn term_counts(text: &str) -> HashMap<String, f32> {
    let mut counts = HashMap::new();
    for term in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        *counts.entry(term.to_lowercase()).or_insert(0.0) += 1.0;
    }
    counts
}

fn vector_norm(terms: &HashMap<String, f32>) -> f32 {
    terms.values().map(|v| v * v).sum::<f32>().sqrt()
}

fn cosine(query: &HashMap<String, f32>, query_norm: f32, doc: &StoredDocument) -> f32 {
    if query_norm == 0.0 || doc.norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = query
        .iter()
        .filter_map(|(t, q)| doc.terms.get(t).map(|d| q * d))
        .sum();
    dot / (query_norm * doc.norm)
}
