//! SiftRank Search
//!
//! Ranks documents against free-text queries by combining:
//! - An in-memory BM25 keyword index over a pluggable tokenizer
//! - An external vector store
//! - Rank fusion (RRF, weighted, linear) or store-side native fusion
//!
//! ```ignore
//! let retriever = HybridRetriever::new(store, documents)?;
//! let results = retriever.search(&QueryContext::background(), "rust async", 10).await?;
//! ```

pub mod retrieval;
pub mod tokenizer;

pub use retrieval::{
    BM25Retriever, FusionStrategy, HybridRetriever, HybridRetrieverBuilder, NativeFusionRetriever,
    RRFusion, RankedList, RetrievalMode, Retriever, SearchResult, VectorRetriever, WeightedFusion,
    LinearCombination,
};
pub use tokenizer::Tokenizer;
