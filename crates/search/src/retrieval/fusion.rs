//! Rank fusion for combining ranked lists from several sources
//!
//! Three strategies are provided:
//! - [`RRFusion`]: reciprocal rank fusion, scale-free, the default
//! - [`WeightedFusion`]: per-source min-max normalization, then a weighted sum
//! - [`LinearCombination`]: weighted sum of raw scores
//!
//! Documents are merged across lists by [`DocumentKey`]. Output is sorted by
//! fused score descending; ties keep the order in which documents were first seen.

use super::{RankedList, KEYWORD_SOURCE, VECTOR_SOURCE};
use serde::{Deserialize, Serialize};
use siftrank_common::config::{FusionKind, HybridConfig};
use siftrank_common::{Document, DocumentKey, KeyStrategy};
use std::collections::HashMap;
use std::sync::Arc;

/// Default RRF constant
pub const DEFAULT_RRF_K: f32 = 60.0;

/// A document after fusion, with each source's raw score and rank
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusedDocument {
    pub document: Document,

    /// Fused score
    pub score: f32,

    /// Raw score per source label
    pub source_scores: HashMap<String, f32>,

    /// 1-based rank per source label
    pub source_ranks: HashMap<String, usize>,
}

/// Merges ranked lists into one list sorted by fused score
pub trait FusionStrategy: Send + Sync {
    fn fuse(&self, lists: &[RankedList]) -> Vec<FusedDocument>;

    fn name(&self) -> &str;
}

/// Keyed accumulator preserving first-seen order
struct Accumulator {
    keys: KeyStrategy,
    slots: HashMap<DocumentKey, usize>,
    fused: Vec<FusedDocument>,
}

impl Accumulator {
    fn new(keys: KeyStrategy) -> Self {
        Self {
            keys,
            slots: HashMap::new(),
            fused: Vec::new(),
        }
    }

    fn add(
        &mut self,
        source: &str,
        document: &Document,
        raw_score: f32,
        rank: usize,
        contribution: f32,
    ) {
        let key = self.keys.key_for(document);
        let idx = match self.slots.get(&key) {
            Some(&idx) => idx,
            None => {
                self.fused.push(FusedDocument {
                    document: document.clone(),
                    score: 0.0,
                    source_scores: HashMap::new(),
                    source_ranks: HashMap::new(),
                });
                self.slots.insert(key, self.fused.len() - 1);
                self.fused.len() - 1
            }
        };

        let entry = &mut self.fused[idx];
        entry.score += contribution;
        // A repeated key within one source keeps its best rank
        entry.source_ranks.entry(source.to_string()).or_insert(rank);
        entry.source_scores.entry(source.to_string()).or_insert(raw_score);
    }

    fn finish(mut self) -> Vec<FusedDocument> {
        self.fused
            .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        self.fused
    }
}

/// Reciprocal rank fusion: each occurrence at rank `r` adds `1/(k + r)`
#[derive(Debug, Clone)]
pub struct RRFusion {
    /// Rank constant (typically 60)
    pub k: f32,

    pub key_strategy: KeyStrategy,
}

impl Default for RRFusion {
    fn default() -> Self {
        Self::new(DEFAULT_RRF_K)
    }
}

impl RRFusion {
    /// Non-positive `k` falls back to 60
    pub fn new(k: f32) -> Self {
        Self {
            k: if k > 0.0 { k } else { DEFAULT_RRF_K },
            key_strategy: KeyStrategy::default(),
        }
    }

    pub fn with_key_strategy(mut self, key_strategy: KeyStrategy) -> Self {
        self.key_strategy = key_strategy;
        self
    }
}

impl FusionStrategy for RRFusion {
    fn fuse(&self, lists: &[RankedList]) -> Vec<FusedDocument> {
        let mut acc = Accumulator::new(self.key_strategy);
        for list in lists {
            for ranked in &list.documents {
                let contribution = 1.0 / (self.k + ranked.rank as f32);
                acc.add(&list.source, &ranked.document, ranked.score, ranked.rank, contribution);
            }
        }
        acc.finish()
    }

    fn name(&self) -> &str {
        "rrf"
    }
}

/// Weighted sum of (optionally min-max normalized) source scores.
///
/// A source without a weight gets `1 / lists.len()`. An explicit weight of
/// zero is honoured: that source still lists its documents but adds nothing.
#[derive(Debug, Clone)]
pub struct WeightedFusion {
    pub weights: HashMap<String, f32>,
    pub normalize: bool,
    pub key_strategy: KeyStrategy,
}

impl WeightedFusion {
    pub fn new(weights: HashMap<String, f32>) -> Self {
        Self {
            weights,
            normalize: true,
            key_strategy: KeyStrategy::default(),
        }
    }

    /// Weights for the "vector" and "keyword" sources
    pub fn hybrid(vector_weight: f32, keyword_weight: f32) -> Self {
        Self::new(source_weights(vector_weight, keyword_weight))
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn with_key_strategy(mut self, key_strategy: KeyStrategy) -> Self {
        self.key_strategy = key_strategy;
        self
    }
}

impl FusionStrategy for WeightedFusion {
    fn fuse(&self, lists: &[RankedList]) -> Vec<FusedDocument> {
        let uniform = if lists.is_empty() { 0.0 } else { 1.0 / lists.len() as f32 };
        let mut acc = Accumulator::new(self.key_strategy);

        for list in lists {
            let weight = self.weights.get(&list.source).copied().unwrap_or(uniform);
            let scores: Vec<f32> = list.documents.iter().map(|d| d.score).collect();
            let scores = if self.normalize { min_max_normalize(&scores) } else { scores };

            for (ranked, score) in list.documents.iter().zip(scores) {
                acc.add(&list.source, &ranked.document, ranked.score, ranked.rank, weight * score);
            }
        }
        acc.finish()
    }

    fn name(&self) -> &str {
        "weighted"
    }
}

/// Weighted sum of raw scores; a source without a weight gets 1.0
#[derive(Debug, Clone, Default)]
pub struct LinearCombination {
    pub weights: HashMap<String, f32>,
    pub key_strategy: KeyStrategy,
}

impl LinearCombination {
    pub fn new(weights: HashMap<String, f32>) -> Self {
        Self {
            weights,
            key_strategy: KeyStrategy::default(),
        }
    }

    pub fn hybrid(vector_weight: f32, keyword_weight: f32) -> Self {
        Self::new(source_weights(vector_weight, keyword_weight))
    }

    pub fn with_key_strategy(mut self, key_strategy: KeyStrategy) -> Self {
        self.key_strategy = key_strategy;
        self
    }
}

impl FusionStrategy for LinearCombination {
    fn fuse(&self, lists: &[RankedList]) -> Vec<FusedDocument> {
        let mut acc = Accumulator::new(self.key_strategy);
        for list in lists {
            let weight = self.weights.get(&list.source).copied().unwrap_or(1.0);
            for ranked in &list.documents {
                let contribution = weight * ranked.score;
                acc.add(&list.source, &ranked.document, ranked.score, ranked.rank, contribution);
            }
        }
        acc.finish()
    }

    fn name(&self) -> &str {
        "linear"
    }
}

/// Strategy described by the hybrid configuration
pub fn from_config(config: &HybridConfig) -> Arc<dyn FusionStrategy> {
    match config.fusion {
        FusionKind::Rrf => Arc::new(RRFusion::new(config.rrf_k)),
        FusionKind::Weighted => Arc::new(
            WeightedFusion::hybrid(config.vector_weight, config.keyword_weight)
                .with_normalize(config.normalize),
        ),
        FusionKind::Linear => Arc::new(LinearCombination::hybrid(
            config.vector_weight,
            config.keyword_weight,
        )),
    }
}

fn source_weights(vector_weight: f32, keyword_weight: f32) -> HashMap<String, f32> {
    HashMap::from([
        (VECTOR_SOURCE.to_string(), vector_weight),
        (KEYWORD_SOURCE.to_string(), keyword_weight),
    ])
}

/// `(s - min) / (max - min)`; a constant list maps to all 1.0
fn min_max_normalize(scores: &[f32]) -> Vec<f32> {
    if scores.is_empty() {
        return Vec::new();
    }
    let min = scores.iter().copied().fold(f32::INFINITY, f32::min);
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;

    if range == 0.0 {
        return vec![1.0; scores.len()];
    }
    scores.iter().map(|s| (s - min) / range).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str) -> Document {
        Document::new(format!("content of {id}")).with_id(id)
    }

    fn list(source: &str, entries: &[(&str, f32)]) -> RankedList {
        RankedList::from_sorted(source, entries.iter().map(|(id, s)| (doc(id), *s)))
    }

    fn score_of(fused: &[FusedDocument], id: &str) -> f32 {
        fused
            .iter()
            .find(|f| f.document.id().as_deref() == Some(id))
            .map(|f| f.score)
            .unwrap()
    }

    #[test]
    fn test_rrf_exact_formula() {
        let vector = list(VECTOR_SOURCE, &[("d0", 0.9), ("d1", 0.8), ("d2", 0.7)]);
        let keyword = list(KEYWORD_SOURCE, &[("d1", 5.0), ("d3", 4.0), ("d0", 3.0)]);

        let fused = RRFusion::new(60.0).fuse(&[vector, keyword]);

        assert!((score_of(&fused, "d0") - (1.0 / 61.0 + 1.0 / 63.0)).abs() < 1e-6);
        assert!((score_of(&fused, "d1") - (1.0 / 62.0 + 1.0 / 61.0)).abs() < 1e-6);
        assert_eq!(fused[0].document.id().as_deref(), Some("d1"));
        assert_eq!(fused[1].document.id().as_deref(), Some("d0"));
        assert_eq!(fused.len(), 4);

        // Per-source raw score and rank survive fusion
        assert_eq!(fused[0].source_ranks[VECTOR_SOURCE], 2);
        assert_eq!(fused[0].source_ranks[KEYWORD_SOURCE], 1);
        assert_eq!(fused[0].source_scores[KEYWORD_SOURCE], 5.0);
    }

    #[test]
    fn test_rrf_non_positive_k_defaults() {
        assert_eq!(RRFusion::new(0.0).k, DEFAULT_RRF_K);
        assert_eq!(RRFusion::new(-3.0).k, DEFAULT_RRF_K);
        assert_eq!(RRFusion::new(10.0).k, 10.0);
    }

    #[test]
    fn test_weighted_constant_list_normalizes_to_one() {
        let vector = list(VECTOR_SOURCE, &[("a", 0.4), ("b", 0.4), ("c", 0.4)]);
        let fusion = WeightedFusion::new(HashMap::from([(VECTOR_SOURCE.to_string(), 1.0)]));

        let fused = fusion.fuse(&[vector]);
        assert!(fused.iter().all(|f| (f.score - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_weighted_missing_weight_is_uniform() {
        let vector = list(VECTOR_SOURCE, &[("a", 0.9), ("b", 0.1)]);
        let keyword = list(KEYWORD_SOURCE, &[("b", 8.0), ("c", 2.0)]);

        let fused = WeightedFusion::new(HashMap::new()).fuse(&[vector, keyword]);

        // normalized: a = 1.0 (vector), b = 0.0 (vector) + 1.0 (keyword), c = 0.0
        assert!((score_of(&fused, "a") - 0.5).abs() < 1e-6);
        assert!((score_of(&fused, "b") - 0.5).abs() < 1e-6);
        assert!(score_of(&fused, "c").abs() < 1e-6);
        // tie keeps first-seen order
        assert_eq!(fused[0].document.id().as_deref(), Some("a"));
    }

    #[test]
    fn test_weighted_explicit_zero_excludes_contribution() {
        let vector = list(VECTOR_SOURCE, &[("a", 0.9), ("b", 0.1)]);
        let keyword = list(KEYWORD_SOURCE, &[("b", 8.0), ("a", 2.0)]);

        let fused = WeightedFusion::hybrid(0.0, 1.0).fuse(&[vector, keyword]);
        assert!((score_of(&fused, "b") - 1.0).abs() < 1e-6);
        assert!(score_of(&fused, "a").abs() < 1e-6);
        assert_eq!(fused[0].document.id().as_deref(), Some("b"));
        assert_eq!(fused[1].source_ranks[VECTOR_SOURCE], 1);
    }

    #[test]
    fn test_weighted_without_normalization() {
        let vector = list(VECTOR_SOURCE, &[("a", 0.8)]);
        let fused = WeightedFusion::hybrid(0.5, 0.5).with_normalize(false).fuse(&[vector]);
        assert!((fused[0].score - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_linear_missing_weight_is_one() {
        let vector = list(VECTOR_SOURCE, &[("a", 0.6), ("b", 0.2)]);
        let keyword = list(KEYWORD_SOURCE, &[("b", 0.5)]);

        let fused = LinearCombination::new(HashMap::from([(KEYWORD_SOURCE.to_string(), 2.0)]))
            .fuse(&[vector, keyword]);

        assert!((score_of(&fused, "a") - 0.6).abs() < 1e-6);
        assert!((score_of(&fused, "b") - 1.2).abs() < 1e-6);
        assert_eq!(fused[0].document.id().as_deref(), Some("b"));
    }

    #[test]
    fn test_content_prefix_key_merges_unidentified_documents() {
        let shared = "x".repeat(150);
        let vector_doc = Document::new(format!("{shared}-v"));
        let keyword_doc = Document::new(format!("{shared}-k"));
        let vector = RankedList::from_sorted(VECTOR_SOURCE, vec![(vector_doc, 0.5)]);
        let keyword = RankedList::from_sorted(KEYWORD_SOURCE, vec![(keyword_doc, 1.5)]);

        // Same 100-char prefix collides under the default key
        assert_eq!(RRFusion::default().fuse(&[vector.clone(), keyword.clone()]).len(), 1);

        // Content hashing keeps them apart
        let hashed = RRFusion::default().with_key_strategy(KeyStrategy::MetadataOrContentHash);
        assert_eq!(hashed.fuse(&[vector, keyword]).len(), 2);
    }

    #[test]
    fn test_empty_input() {
        assert!(RRFusion::default().fuse(&[]).is_empty());
        assert!(WeightedFusion::new(HashMap::new()).fuse(&[]).is_empty());
    }

    #[test]
    fn test_from_config() {
        let mut config = HybridConfig::default();
        assert_eq!(from_config(&config).name(), "rrf");
        config.fusion = FusionKind::Weighted;
        assert_eq!(from_config(&config).name(), "weighted");
        config.fusion = FusionKind::Linear;
        assert_eq!(from_config(&config).name(), "linear");
    }
}
