//! BM25 lexical search over an in-memory inverted index
//!
//! Scores every document containing at least one query term with
//! `Σ IDF(t) · tf·(k1+1) / (tf + k1·(1 − b + b·len/avgLen))`, where
//! `IDF(t) = ln((N − df + 0.5)/(df + 0.5) + 1)`.
//!
//! Terms are case-folded on both the index and the query side.

use super::{RankedList, RetrievalMode, Retriever, SearchResult, KEYWORD_SOURCE};
use crate::tokenizer::Tokenizer;
use serde::{Deserialize, Serialize};
use siftrank_common::config::Bm25Config;
use siftrank_common::errors::Result;
use siftrank_common::{metrics, Document, QueryContext};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// A keyword hit with per-term score contributions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f32,

    /// Score contributed by each query term, for diagnostics
    pub term_info: HashMap<String, f32>,
}

/// Corpus-level index statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_docs: usize,
    pub total_tokens: usize,
    pub avg_doc_length: f32,
    pub vocabulary_size: usize,
}

/// Inverted index and length statistics derived from a document collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BM25Index {
    /// term -> number of documents containing it
    doc_frequency: HashMap<String, usize>,

    /// token count of document i
    doc_lengths: Vec<usize>,

    avg_doc_length: f32,
    total_docs: usize,
    total_tokens: usize,

    /// term -> ascending indices of documents containing it
    inverted_index: HashMap<String, Vec<usize>>,

    /// per-document term counts
    term_frequency: Vec<HashMap<String, usize>>,
}

impl BM25Index {
    /// Build the index from scratch
    pub fn build(documents: &[Document], tokenizer: &dyn Tokenizer) -> Self {
        let mut index = Self::default();
        index.append(documents, tokenizer);
        index
    }

    /// Index additional documents, numbered after the existing ones.
    ///
    /// The result is identical to rebuilding over the concatenated collection.
    pub fn append(&mut self, documents: &[Document], tokenizer: &dyn Tokenizer) {
        for document in documents {
            let doc_idx = self.total_docs;
            let tokens = tokenizer.tokenize(&document.content);

            let mut counts: HashMap<String, usize> = HashMap::new();
            for token in &tokens {
                *counts.entry(token.to_lowercase()).or_insert(0) += 1;
            }

            for term in counts.keys() {
                *self.doc_frequency.entry(term.clone()).or_insert(0) += 1;
                self.inverted_index
                    .entry(term.clone())
                    .or_default()
                    .push(doc_idx);
            }

            self.doc_lengths.push(tokens.len());
            self.term_frequency.push(counts);
            self.total_tokens += tokens.len();
            self.total_docs += 1;
        }

        self.avg_doc_length = if self.total_docs > 0 {
            self.total_tokens as f32 / self.total_docs as f32
        } else {
            0.0
        };
    }

    /// `ln((N − df + 0.5)/(df + 0.5) + 1)`
    pub fn idf(&self, term: &str) -> f32 {
        let n = self.total_docs as f32;
        let df = self.doc_frequency(term) as f32;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    pub fn doc_frequency(&self, term: &str) -> usize {
        self.doc_frequency.get(term).copied().unwrap_or(0)
    }

    pub fn term_frequency(&self, doc_idx: usize, term: &str) -> usize {
        self.term_frequency
            .get(doc_idx)
            .and_then(|tf| tf.get(term))
            .copied()
            .unwrap_or(0)
    }

    /// Documents containing `term`, ascending
    pub fn postings(&self, term: &str) -> &[usize] {
        self.inverted_index
            .get(term)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn doc_length(&self, doc_idx: usize) -> Option<usize> {
        self.doc_lengths.get(doc_idx).copied()
    }

    pub fn total_docs(&self) -> usize {
        self.total_docs
    }

    pub fn avg_doc_length(&self) -> f32 {
        self.avg_doc_length
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            total_docs: self.total_docs,
            total_tokens: self.total_tokens,
            avg_doc_length: self.avg_doc_length,
            vocabulary_size: self.doc_frequency.len(),
        }
    }

    /// BM25 score of one document for already case-folded query terms.
    ///
    /// Repeated query terms contribute once per occurrence.
    fn score(
        &self,
        doc_idx: usize,
        terms: &[String],
        params: &Bm25Config,
    ) -> (f32, HashMap<String, f32>) {
        let mut total = 0.0;
        let mut term_info = HashMap::new();

        let doc_len = self.doc_lengths[doc_idx] as f32;
        // avg_doc_length is 0 only when every document is empty; no term matches then
        let len_ratio = if self.avg_doc_length > 0.0 {
            doc_len / self.avg_doc_length
        } else {
            0.0
        };

        for term in terms {
            let tf = self.term_frequency(doc_idx, term) as f32;
            if tf == 0.0 {
                continue;
            }
            let norm = tf * (params.k1 + 1.0)
                / (tf + params.k1 * (1.0 - params.b + params.b * len_ratio));
            let contribution = self.idf(term) * norm;

            total += contribution;
            *term_info.entry(term.clone()).or_insert(0.0) += contribution;
        }

        (total, term_info)
    }
}

/// BM25 retriever owning its document collection and index
pub struct BM25Retriever {
    documents: Vec<Document>,
    tokenizer: Arc<dyn Tokenizer>,
    index: BM25Index,
    params: Bm25Config,
}

impl BM25Retriever {
    /// Create a retriever with default parameters (k1 = 1.5, b = 0.75)
    pub fn new(documents: Vec<Document>, tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self::with_config(documents, tokenizer, Bm25Config::default())
    }

    /// Create with custom BM25 parameters
    pub fn with_config(
        documents: Vec<Document>,
        tokenizer: Arc<dyn Tokenizer>,
        params: Bm25Config,
    ) -> Self {
        let mut retriever = Self {
            documents,
            tokenizer,
            index: BM25Index::default(),
            params,
        };
        retriever.rebuild();
        retriever
    }

    /// Rebuild the whole index from the current collection
    pub fn rebuild(&mut self) {
        let start = Instant::now();
        self.index = BM25Index::build(&self.documents, self.tokenizer.as_ref());
        let elapsed = start.elapsed();

        metrics::record_index_build(elapsed.as_secs_f64(), self.documents.len());
        debug!(
            documents = self.index.total_docs(),
            vocabulary = self.index.stats().vocabulary_size,
            tokenizer = self.tokenizer.name(),
            elapsed_ms = elapsed.as_millis() as u64,
            "BM25 index built"
        );
    }

    /// Append documents and index them incrementally
    pub fn add_documents(&mut self, documents: Vec<Document>) {
        if documents.is_empty() {
            return;
        }
        let start = Instant::now();
        self.index.append(&documents, self.tokenizer.as_ref());
        let added = documents.len();
        self.documents.extend(documents);

        metrics::record_index_build(start.elapsed().as_secs_f64(), added);
        debug!(added, total = self.documents.len(), "BM25 index extended");
    }

    /// Top `k` documents with a positive score, best first.
    ///
    /// Equal scores keep collection order.
    pub fn search(&self, query: &str, k: usize) -> Vec<ScoredDocument> {
        let terms: Vec<String> = self
            .tokenizer
            .tokenize(query)
            .into_iter()
            .map(|t| t.to_lowercase())
            .collect();

        if terms.is_empty() || k == 0 || self.index.total_docs() == 0 {
            return Vec::new();
        }

        // Only documents sharing a term can score above zero
        let candidates: BTreeSet<usize> = terms
            .iter()
            .flat_map(|t| self.index.postings(t).iter().copied())
            .collect();

        let mut scored: Vec<(usize, f32, HashMap<String, f32>)> = candidates
            .into_iter()
            .map(|doc_idx| {
                let (score, term_info) = self.index.score(doc_idx, &terms, &self.params);
                (doc_idx, score, term_info)
            })
            .filter(|(_, score, _)| *score > 0.0)
            .collect();

        // Stable sort over ascending indices: ties stay in collection order
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(doc_idx, score, term_info)| ScoredDocument {
                document: self.documents[doc_idx].clone(),
                score,
                term_info,
            })
            .collect()
    }

    /// Keyword results as a ranked list labelled "keyword"
    pub fn search_ranked(&self, query: &str, k: usize) -> RankedList {
        RankedList::from_sorted(
            KEYWORD_SOURCE,
            self.search(query, k).into_iter().map(|d| (d.document, d.score)),
        )
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn index(&self) -> &BM25Index {
        &self.index
    }

    pub fn stats(&self) -> IndexStats {
        self.index.stats()
    }

    pub fn params(&self) -> Bm25Config {
        self.params
    }

    pub fn tokenizer(&self) -> &Arc<dyn Tokenizer> {
        &self.tokenizer
    }
}

#[async_trait::async_trait]
impl Retriever for BM25Retriever {
    async fn search(
        &self,
        ctx: &QueryContext,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        ctx.check()?;
        let results = BM25Retriever::search(self, query, top_k)
            .into_iter()
            .enumerate()
            .map(|(i, hit)| SearchResult {
                document: hit.document,
                score: hit.score,
                vector_score: None,
                keyword_score: Some(hit.score),
                vector_rank: None,
                keyword_rank: Some(i + 1),
            })
            .collect();
        Ok(results)
    }

    fn mode(&self) -> RetrievalMode {
        RetrievalMode::Keyword
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::{UnicodeTokenizer, WhitespaceTokenizer};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn tokenizer() -> Arc<dyn Tokenizer> {
        Arc::new(WhitespaceTokenizer::default())
    }

    fn corpus() -> Vec<Document> {
        vec![
            Document::new("rust programming systems language fast").with_id("0"),
            Document::new("python programming scripting easy").with_id("1"),
            Document::new("java enterprise programming verbose").with_id("2"),
            Document::new("rust memory safety zero cost abstractions").with_id("3"),
        ]
    }

    #[test]
    fn test_index_invariants() {
        let retriever = BM25Retriever::new(corpus(), tokenizer());
        let index = retriever.index();

        assert_eq!(index.total_docs(), 4);
        assert_eq!(index.stats().total_tokens, 5 + 4 + 4 + 6);
        assert!((index.avg_doc_length() - 19.0 / 4.0).abs() < 1e-6);
        assert_eq!(index.doc_frequency("programming"), 3);
        assert_eq!(index.postings("rust"), &[0, 3]);

        // df(t) == |{d : tf(t, d) > 0}|
        for term in ["rust", "programming", "java", "zero"] {
            let with_term = (0..4).filter(|&d| index.term_frequency(d, term) > 0).count();
            assert_eq!(index.doc_frequency(term), with_term, "term {term}");
        }
    }

    #[test]
    fn test_exact_score() {
        let docs = vec![Document::new("apple apple banana"), Document::new("banana cherry")];
        let retriever = BM25Retriever::new(docs, tokenizer());

        let hits = retriever.search("apple", 10);
        assert_eq!(hits.len(), 1);

        // N = 2, df = 1, tf = 2, len = 3, avg = 2.5
        let idf = ((2.0f32 - 1.0 + 0.5) / (1.0 + 0.5) + 1.0).ln();
        let norm = 2.0 * 2.5 / (2.0 + 1.5 * (1.0 - 0.75 + 0.75 * 3.0 / 2.5));
        assert!((hits[0].score - idf * norm).abs() < 1e-5);
        assert!((hits[0].term_info["apple"] - hits[0].score).abs() < 1e-6);
    }

    #[test]
    fn test_rarer_term_scores_higher() {
        let docs = vec![
            Document::new("common rare filler"),
            Document::new("common other filler"),
            Document::new("common third filler"),
        ];
        let retriever = BM25Retriever::new(docs, tokenizer());

        let rare = retriever.search("rare", 10);
        let common = retriever.search("common", 10);
        assert!(rare[0].score >= common[0].score);
        assert!(retriever.index().idf("rare") > retriever.index().idf("common"));
    }

    #[test]
    fn test_empty_and_unmatched_queries() {
        let retriever = BM25Retriever::new(corpus(), tokenizer());
        assert!(retriever.search("", 10).is_empty());
        assert!(retriever.search("   !!! ", 10).is_empty());
        assert!(retriever.search("no-overlap-term", 10).is_empty());
        assert!(retriever.search("rust", 0).is_empty());
    }

    #[test]
    fn test_empty_index() {
        let retriever = BM25Retriever::new(Vec::new(), tokenizer());
        assert!(retriever.search("rust", 10).is_empty());
        assert_eq!(retriever.stats().avg_doc_length, 0.0);
    }

    #[test]
    fn test_query_case_folded() {
        let retriever = BM25Retriever::new(corpus(), Arc::new(WhitespaceTokenizer::new(false, 1)));
        let upper = retriever.search("RUST", 10);
        let lower = retriever.search("rust", 10);
        assert_eq!(upper.len(), 2);
        assert_eq!(upper.len(), lower.len());
    }

    #[test]
    fn test_truncation_and_positive_scores() {
        let retriever = BM25Retriever::new(corpus(), tokenizer());
        let hits = retriever.search("programming rust", 2);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.score > 0.0));
        // doc 0 has both terms
        assert_eq!(hits[0].document.id().as_deref(), Some("0"));
    }

    #[test]
    fn test_ties_keep_collection_order() {
        let docs = vec![
            Document::new("same words").with_id("first"),
            Document::new("same words").with_id("second"),
            Document::new("same words").with_id("third"),
        ];
        let retriever = BM25Retriever::new(docs, tokenizer());
        let ids: Vec<String> = retriever
            .search("same", 10)
            .into_iter()
            .filter_map(|h| h.document.id())
            .collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_add_documents_count() {
        let mut retriever = BM25Retriever::new(vec![Document::new("first document")], tokenizer());
        retriever.add_documents(vec![Document::new("second document"), Document::new("third one")]);

        assert_eq!(retriever.document_count(), 3);
        assert_eq!(retriever.stats().total_docs, 3);
        assert_eq!(retriever.search("third", 10).len(), 1);
    }

    #[test]
    fn test_append_matches_full_rebuild() {
        let docs = corpus();
        let mut incremental = BM25Retriever::new(docs[..1].to_vec(), tokenizer());
        incremental.add_documents(docs[1..].to_vec());

        let rebuilt = BM25Retriever::new(docs, tokenizer());
        assert_eq!(incremental.index(), rebuilt.index());
    }

    #[test]
    fn test_scores_sorted_on_random_corpora() {
        let vocab = ["alpha", "beta", "gamma", "delta", "eps", "zeta", "eta", "theta"];
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..20 {
            let docs: Vec<Document> = (0..30)
                .map(|_| {
                    let len = rng.gen_range(1..12);
                    let words: Vec<&str> =
                        (0..len).map(|_| vocab[rng.gen_range(0..vocab.len())]).collect();
                    Document::new(words.join(" "))
                })
                .collect();
            let retriever = BM25Retriever::new(docs, Arc::new(UnicodeTokenizer::default()));

            let first = vocab[rng.gen_range(0..vocab.len())];
            let second = vocab[rng.gen_range(0..vocab.len())];
            let query = format!("{first} {second}");
            let hits = retriever.search(&query, 15);
            for pair in hits.windows(2) {
                assert!(pair[0].score >= pair[1].score);
            }
        }
    }

    #[tokio::test]
    async fn test_retriever_trait_ranks() {
        let retriever = BM25Retriever::new(corpus(), tokenizer());
        let results = Retriever::search(&retriever, &QueryContext::background(), "programming", 10)
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].keyword_rank, Some(1));
        assert_eq!(results[2].keyword_rank, Some(3));
        assert!(results.iter().all(|r| r.vector_rank.is_none()));
        assert_eq!(retriever.mode(), RetrievalMode::Keyword);
    }
}
