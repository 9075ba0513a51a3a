//! SiftRank Common Library
//!
//! Shared code for the SiftRank retrieval engine including:
//! - Document model and merge keys
//! - Error types and handling
//! - Configuration management
//! - Query context (deadline and cancellation)
//! - Vector store capability traits
//! - Metrics and tracing setup

pub mod config;
pub mod context;
pub mod document;
pub mod errors;
pub mod metrics;
pub mod telemetry;
pub mod vectorstore;

// Re-export commonly used types
pub use config::AppConfig;
pub use context::{CancelHandle, QueryContext};
pub use document::{Document, DocumentKey, KeyStrategy};
pub use errors::{AppError, Result, SearchSide};
pub use vectorstore::{NativeHybridStore, VectorStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
