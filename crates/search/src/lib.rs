//! PaperLens Search Engine
//!
//! Hybrid retrieval and correlation over harvested paper metadata:
//! - Lexical + semantic retrieval fused into one candidate pool
//! - Cross-encoder style reranking
//! - Structured category/date filters
//! - Bounded LRU cache of document vectors for "related papers" queries

pub mod cache;
pub mod engine;
pub mod filter;
pub mod fusion;
pub mod orchestrator;
pub mod pool;
pub mod store;

pub use cache::{CacheMiss, CachedDocument, CorrelationCache};
pub use engine::Engine;
pub use filter::{Filter, FilterBuilder};
pub use fusion::ResultFuser;
pub use orchestrator::{CorrelationOrchestrator, SearchOrchestrator};
pub use pool::WorkerPool;
pub use store::{DocumentStore, PgDocumentStore};
