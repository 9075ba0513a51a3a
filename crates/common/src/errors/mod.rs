//! Error types for SiftRank
//!
//! Provides a single error taxonomy for the retrieval engine:
//! - Construction-time validation errors (non-retryable)
//! - Per-side search failures (vector or keyword), wrapped with the failing side
//! - Query-context termination (cancellation, deadline)
//! - Error codes for machine-readable handling by callers

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Which half of a hybrid search produced a result or an error
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SearchSide {
    Vector,
    Keyword,
}

impl SearchSide {
    /// Source label used in ranked lists and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchSide::Vector => "vector",
            SearchSide::Keyword => "keyword",
        }
    }
}

impl fmt::Display for SearchSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    MissingField,
    EmptyCorpus,

    // Search errors (2xxx)
    VectorSearchFailed,
    KeywordSearchFailed,
    TaskFailed,

    // Store errors (3xxx)
    VectorStoreError,
    NativeFusionUnavailable,

    // Context termination (4xxx)
    Cancelled,
    DeadlineExceeded,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,
            ErrorCode::MissingField => 1002,
            ErrorCode::EmptyCorpus => 1003,

            ErrorCode::VectorSearchFailed => 2001,
            ErrorCode::KeywordSearchFailed => 2002,
            ErrorCode::TaskFailed => 2003,

            ErrorCode::VectorStoreError => 3001,
            ErrorCode::NativeFusionUnavailable => 3002,

            ErrorCode::Cancelled => 4001,
            ErrorCode::DeadlineExceeded => 4002,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>
    },

    #[error("Required field missing: {field}")]
    MissingField { field: String },

    #[error("Document collection is empty")]
    EmptyCorpus,

    // Search errors
    #[error("Vector search failed: {source}")]
    VectorSearch {
        #[source]
        source: Box<AppError>,
    },

    #[error("Keyword search failed: {source}")]
    KeywordSearch {
        #[source]
        source: Box<AppError>,
    },

    #[error("{side} search task did not complete: {message}")]
    TaskJoin { side: SearchSide, message: String },

    // Store errors
    #[error("Vector store error: {message}")]
    VectorStore { message: String },

    #[error("Native hybrid search unavailable: {message}")]
    NativeFusionUnavailable { message: String },

    // Context termination
    #[error("Query cancelled")]
    Cancelled,

    #[error("Query deadline exceeded after {timeout_ms}ms")]
    DeadlineExceeded { timeout_ms: u64 },

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Wrap an error raised by the given side of a hybrid search
    pub fn search_failed(side: SearchSide, source: AppError) -> Self {
        let source = Box::new(source);
        match side {
            SearchSide::Vector => AppError::VectorSearch { source },
            SearchSide::Keyword => AppError::KeywordSearch { source },
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::MissingField { .. } => ErrorCode::MissingField,
            AppError::EmptyCorpus => ErrorCode::EmptyCorpus,
            AppError::VectorSearch { .. } => ErrorCode::VectorSearchFailed,
            AppError::KeywordSearch { .. } => ErrorCode::KeywordSearchFailed,
            AppError::TaskJoin { .. } => ErrorCode::TaskFailed,
            AppError::VectorStore { .. } => ErrorCode::VectorStoreError,
            AppError::NativeFusionUnavailable { .. } => ErrorCode::NativeFusionUnavailable,
            AppError::Cancelled => ErrorCode::Cancelled,
            AppError::DeadlineExceeded { .. } => ErrorCode::DeadlineExceeded,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// The side of a hybrid search that failed, if this is a per-side failure
    pub fn failed_side(&self) -> Option<SearchSide> {
        match self {
            AppError::VectorSearch { .. } => Some(SearchSide::Vector),
            AppError::KeywordSearch { .. } => Some(SearchSide::Keyword),
            AppError::TaskJoin { side, .. } => Some(*side),
            _ => None,
        }
    }

    /// Check if an external orchestrator could reasonably retry the call.
    ///
    /// The core itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::VectorSearch { source } | AppError::KeywordSearch { source } => {
                source.is_retryable()
            }
            AppError::VectorStore { .. }
            | AppError::DeadlineExceeded { .. }
            | AppError::TaskJoin { .. } => true,
            _ => false,
        }
    }

    /// Check if this error was raised while validating construction inputs
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::Validation { .. } | AppError::MissingField { .. } | AppError::EmptyCorpus
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string()
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation {
            message: err.to_string(),
            field: err.field_errors().keys().next().map(|f| f.to_string()),
        }
    }
}
