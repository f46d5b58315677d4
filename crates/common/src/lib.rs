//! PaperLens Common Library
//!
//! Shared code for the PaperLens engine and gateway including:
//! - Document models and their API projection
//! - Embedding and reranking collaborator abstractions
//! - Error types and handling
//! - Configuration management
//! - Database connection pool
//! - Metrics and observability

pub mod config;
pub mod db;
pub mod embeddings;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod rerank;
pub mod text;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::DbPool;
pub use embeddings::Embedder;
pub use errors::{AppError, Result};
pub use models::{Document, DocumentMeta, DocumentResponse};
pub use rerank::Reranker;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding dimension (BAAI/bge-m3)
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1024;
