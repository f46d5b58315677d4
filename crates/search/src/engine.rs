//! Engine facade used by the web layer
//!
//! Owns the single correlation cache and worker pool of the process and
//! shares them between the search and correlation pipelines.

use crate::cache::CorrelationCache;
use crate::filter::FilterBuilder;
use crate::orchestrator::{CorrelationOrchestrator, SearchOrchestrator};
use crate::pool::WorkerPool;
use crate::store::DocumentStore;
use paperlens_common::config::EngineConfig;
use paperlens_common::errors::Result;
use paperlens_common::{DocumentResponse, Embedder, Reranker};
use std::sync::Arc;
use tracing::{debug, info};

pub struct Engine {
    search: SearchOrchestrator,
    correlation: CorrelationOrchestrator,
    cache: Arc<CorrelationCache>,
    pool: WorkerPool,
    config: EngineConfig,
}

impl Engine {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn DocumentStore>,
        reranker: Arc<dyn Reranker>,
        config: EngineConfig,
    ) -> Self {
        let cache = Arc::new(CorrelationCache::new(config.cache_capacity));
        let pool = WorkerPool::new(config.max_in_flight_calls);

        info!(
            embedder = embedder.model_name(),
            reranker = reranker.model_name(),
            cache_capacity = cache.capacity(),
            max_in_flight_calls = pool.size(),
            "Engine initialized"
        );

        let search = SearchOrchestrator::new(
            embedder,
            Arc::clone(&store),
            Arc::clone(&reranker),
            Arc::clone(&cache),
            pool.clone(),
            config.retrieval_top_k,
        );
        let correlation =
            CorrelationOrchestrator::new(store, reranker, Arc::clone(&cache), pool.clone());

        Self {
            search,
            correlation,
            cache,
            pool,
            config,
        }
    }

    /// Hybrid search returning at most `engine.search_limit` documents
    pub async fn search(
        &self,
        query: &str,
        filters: &FilterBuilder,
    ) -> Result<Vec<DocumentResponse>> {
        filters.validate()?;
        self.search
            .query(query, filters.build(), self.config.search_limit)
            .await
    }

    /// Query vector as the search pipeline would compute it
    pub async fn embed(&self, query: &str) -> Result<Vec<f32>> {
        self.search.embed_query(query).await
    }

    /// Documents related to `doc_id`.
    ///
    /// `limit` defaults to `engine.correlation_limit` and is capped at
    /// `engine.max_correlation_limit`.
    pub async fn correlations(
        &self,
        doc_id: &str,
        limit: Option<usize>,
        filters: &FilterBuilder,
    ) -> Result<Vec<DocumentResponse>> {
        filters.validate()?;

        let requested = limit.unwrap_or(self.config.correlation_limit);
        let top_k = requested.min(self.config.max_correlation_limit);
        if top_k != requested {
            debug!(requested, top_k, "Correlation limit capped");
        }

        self.correlation
            .similar_docs(doc_id, top_k, filters.build())
            .await
    }

    pub fn cache(&self) -> &Arc<CorrelationCache> {
        &self.cache
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
