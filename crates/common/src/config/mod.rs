//! Configuration management for SiftRank
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with SIFTRANK__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values
//!
//! Every section validates its own numeric ranges.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

use crate::errors::Result;

/// Environment variable prefix, e.g. `SIFTRANK__HYBRID__MIN_SCORE=0.2`
pub const ENV_PREFIX: &str = "SIFTRANK";

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct AppConfig {
    /// BM25 scoring parameters
    #[serde(default)]
    #[validate(nested)]
    pub bm25: Bm25Config,

    /// Tokenizer used for both indexing and queries
    #[serde(default)]
    #[validate(nested)]
    pub tokenizer: TokenizerConfig,

    /// Hybrid retriever configuration
    #[serde(default)]
    #[validate(nested)]
    pub hybrid: HybridConfig,

    /// Native-fusion adapter configuration
    #[serde(default)]
    #[validate(nested)]
    pub native: NativeFusionConfig,

    /// Logging configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, Validate)]
pub struct Bm25Config {
    /// Term frequency saturation
    #[serde(default = "default_k1")]
    #[validate(range(min = 0.0))]
    pub k1: f32,

    /// Length normalization strength
    #[serde(default = "default_b")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub b: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerKind {
    Whitespace,
    SimpleChinese,
    Unicode,
    Ngram,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopWordList {
    None,
    English,
    Chinese,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct TokenizerConfig {
    #[serde(default = "default_tokenizer_kind")]
    pub kind: TokenizerKind,

    #[serde(default = "default_true")]
    pub lowercase: bool,

    /// Minimum token length in characters
    #[serde(default = "default_min_length")]
    #[validate(range(min = 1))]
    pub min_length: usize,

    /// Window size for the n-gram tokenizer
    #[serde(default = "default_ngram_size")]
    #[validate(range(min = 1, max = 16))]
    pub ngram_size: usize,

    /// Drop punctuation in the simple Chinese tokenizer
    #[serde(default = "default_true")]
    pub skip_punctuation: bool,

    /// Built-in stop-word list applied on top of the base tokenizer
    #[serde(default = "default_stop_words")]
    pub stop_words: StopWordList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionKind {
    Rrf,
    Weighted,
    Linear,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct HybridConfig {
    /// Candidates fetched per side, as a multiple of top_k
    #[serde(default = "default_fetch_multiplier")]
    #[validate(range(min = 1, max = 100))]
    pub fetch_multiplier: usize,

    /// Explicit vector fan-out, overriding the multiplier
    pub vector_k: Option<usize>,

    /// Explicit keyword fan-out, overriding the multiplier
    pub keyword_k: Option<usize>,

    /// Fused documents scoring below this are dropped (0 disables)
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub min_score: f32,

    /// Fusion strategy
    #[serde(default = "default_fusion")]
    pub fusion: FusionKind,

    /// RRF rank constant
    #[serde(default = "default_rrf_k")]
    #[validate(range(min = 1.0))]
    pub rrf_k: f32,

    /// Vector weight for weighted/linear fusion
    #[serde(default = "default_vector_weight")]
    #[validate(range(min = 0.0))]
    pub vector_weight: f32,

    /// Keyword weight for weighted/linear fusion
    #[serde(default = "default_keyword_weight")]
    #[validate(range(min = 0.0))]
    pub keyword_weight: f32,

    /// Min-max normalize each source before weighted fusion
    #[serde(default = "default_true")]
    pub normalize: bool,

    /// Per-query deadline in milliseconds
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct NativeFusionConfig {
    /// RRF rank constant forwarded to the store
    #[serde(default = "default_rrf_rank_constant")]
    #[validate(range(min = 1))]
    pub rrf_rank_constant: u32,

    /// Fused documents scoring below this are dropped (0 disables)
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub min_score: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full EnvFilter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logging: bool,
}

// Default value functions
fn default_k1() -> f32 { 1.5 }
fn default_b() -> f32 { 0.75 }
fn default_tokenizer_kind() -> TokenizerKind { TokenizerKind::Whitespace }
fn default_true() -> bool { true }
fn default_min_length() -> usize { 1 }
fn default_ngram_size() -> usize { 2 }
fn default_stop_words() -> StopWordList { StopWordList::None }
fn default_fetch_multiplier() -> usize { 2 }
fn default_fusion() -> FusionKind { FusionKind::Rrf }
fn default_rrf_k() -> f32 { 60.0 }
fn default_vector_weight() -> f32 { 0.7 }
fn default_keyword_weight() -> f32 { 0.3 }
fn default_rrf_rank_constant() -> u32 { 60 }
fn default_log_level() -> String { "info".to_string() }

impl Default for Bm25Config {
    fn default() -> Self {
        Self {
            k1: default_k1(),
            b: default_b(),
        }
    }
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            kind: default_tokenizer_kind(),
            lowercase: true,
            min_length: default_min_length(),
            ngram_size: default_ngram_size(),
            skip_punctuation: true,
            stop_words: default_stop_words(),
        }
    }
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            fetch_multiplier: default_fetch_multiplier(),
            vector_k: None,
            keyword_k: None,
            min_score: 0.0,
            fusion: default_fusion(),
            rrf_k: default_rrf_k(),
            vector_weight: default_vector_weight(),
            keyword_weight: default_keyword_weight(),
            normalize: true,
            timeout_ms: None,
        }
    }
}

impl HybridConfig {
    /// Candidates requested from the vector store for a given top_k
    pub fn vector_fetch(&self, top_k: usize) -> usize {
        self.vector_k.unwrap_or(top_k.saturating_mul(self.fetch_multiplier))
    }

    /// Candidates requested from the keyword index for a given top_k
    pub fn keyword_fetch(&self, top_k: usize) -> usize {
        self.keyword_k.unwrap_or(top_k.saturating_mul(self.fetch_multiplier))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl Default for NativeFusionConfig {
    fn default() -> Self {
        Self {
            rrf_rank_constant: default_rrf_rank_constant(),
            min_score: 0.0,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from `.env`, config files and environment
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // e.g., SIFTRANK__BM25__K1=1.2
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        Self::finish(config)
    }

    /// Load from a specific file, still honouring environment overrides
    pub fn from_file(path: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        Self::finish(config)
    }

    fn finish(config: Config) -> Result<Self> {
        let app: AppConfig = config.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }
}
