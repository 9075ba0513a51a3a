//! Vector store capability
//!
//! The retrieval engine does not own a vector index. It consumes one through
//! these traits:
//! - [`VectorStore`]: scored similarity search and document ingestion
//! - [`NativeHybridStore`]: stores that also fuse lexical and vector
//!   rankings server-side
//!
//! [`InMemoryVectorStore`] is a deterministic stand-in for tests and demos.

mod memory;

pub use memory::InMemoryVectorStore;

use crate::context::QueryContext;
use crate::document::Document;
use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Default RRF rank constant passed to native hybrid search
pub const DEFAULT_RRF_RANK_CONSTANT: u32 = 60;

/// A document returned by similarity search with its score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredHit {
    pub document: Document,

    /// Similarity score; higher is closer
    pub score: f32,
}

/// One result of a store-side fused search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NativeHybridHit {
    pub document: Document,

    /// Vector similarity component (0.0 when the vector side missed)
    pub vector_score: f32,

    /// Lexical component (0.0 when the keyword side missed)
    pub keyword_score: f32,

    /// Fused score computed by the store
    pub fusion_score: f32,
}

/// Options forwarded to a store's native hybrid protocol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NativeHybridOptions {
    /// RRF rank constant `k` in `1 / (k + rank)`
    pub rrf_rank_constant: u32,

    /// Optional weight for the vector ranking, if the store supports weighting
    pub vector_weight: Option<f32>,

    /// Optional weight for the keyword ranking, if the store supports weighting
    pub keyword_weight: Option<f32>,
}

impl Default for NativeHybridOptions {
    fn default() -> Self {
        Self {
            rrf_rank_constant: DEFAULT_RRF_RANK_CONSTANT,
            vector_weight: None,
            keyword_weight: None,
        }
    }
}

/// Similarity search over an external vector index
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Top `k` documents for `query`, sorted by descending score
    async fn similarity_search_with_score(
        &self,
        ctx: &QueryContext,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredHit>>;

    /// Ingest documents, returning the store-assigned ids
    async fn add_documents(
        &self,
        ctx: &QueryContext,
        documents: &[Document],
    ) -> Result<Vec<String>>;
}

/// A vector store that can fuse lexical and vector rankings itself
#[async_trait]
pub trait NativeHybridStore: VectorStore {
    /// Top `k` documents by the store's fused ranking, sorted by descending fusion score
    async fn hybrid_search(
        &self,
        ctx: &QueryContext,
        query: &str,
        k: usize,
        options: &NativeHybridOptions,
    ) -> Result<Vec<NativeHybridHit>>;
}
