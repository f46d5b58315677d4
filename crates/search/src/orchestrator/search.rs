//! Hybrid search pipeline
//!
//! embed → lexical ∥ semantic retrieval → fuse → rerank → cache → project

use super::{populate_cache, project, rerank_on_pool};
use crate::cache::CorrelationCache;
use crate::filter::Filter;
use crate::fusion::ResultFuser;
use crate::pool::WorkerPool;
use crate::store::DocumentStore;
use paperlens_common::errors::{AppError, Result};
use paperlens_common::metrics;
use paperlens_common::{Document, DocumentResponse, Embedder, Reranker};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Answers free-text queries by fusing lexical and semantic retrieval
pub struct SearchOrchestrator {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn DocumentStore>,
    reranker: Arc<dyn Reranker>,
    cache: Arc<CorrelationCache>,
    pool: WorkerPool,
    fuser: ResultFuser,
    retrieval_top_k: usize,
}

impl SearchOrchestrator {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn DocumentStore>,
        reranker: Arc<dyn Reranker>,
        cache: Arc<CorrelationCache>,
        pool: WorkerPool,
        retrieval_top_k: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            reranker,
            cache,
            pool,
            fuser: ResultFuser::new(),
            retrieval_top_k: retrieval_top_k.max(1),
        }
    }

    /// Run a hybrid query and return at most `limit` documents in reranker order.
    ///
    /// Every returned document that carries an embedding is cached for later
    /// correlation requests.
    #[instrument(skip_all, fields(query = %text, limit = limit, filtered = filter.is_some()))]
    pub async fn query(
        &self,
        text: &str,
        filter: Option<Filter>,
        limit: usize,
    ) -> Result<Vec<DocumentResponse>> {
        let start = Instant::now();
        let result = self.run(text, filter, limit).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(results) => {
                metrics::record_search(elapsed.as_secs_f64(), true, results.len());
                info!(
                    results = results.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Search complete"
                );
            }
            Err(e) => {
                metrics::record_search(elapsed.as_secs_f64(), false, 0);
                warn!(error = %e, "Search failed");
            }
        }

        result
    }

    /// Embed `text` on the pool without retrieving anything
    #[instrument(skip_all, fields(query = %text))]
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        reject_blank(text)?;
        self.embed(text).await
    }

    async fn run(
        &self,
        text: &str,
        filter: Option<Filter>,
        limit: usize,
    ) -> Result<Vec<DocumentResponse>> {
        reject_blank(text)?;
        if limit == 0 {
            return Err(AppError::Validation {
                message: "limit must be at least 1".to_string(),
                field: Some("limit".to_string()),
            });
        }

        let embedding = self.embed(text).await?;

        let filter = filter.map(Arc::new);
        let (lexical, semantic) = tokio::try_join!(
            self.retrieve_lexical(text.to_string(), filter.clone()),
            self.retrieve_semantic(embedding, filter),
        )?;

        let fused = self.fuser.fuse(lexical, semantic);
        debug!(candidates = fused.len(), "Fused retrieval results");

        if fused.is_empty() {
            return Ok(Vec::new());
        }

        let ranked =
            rerank_on_pool(&self.pool, &self.reranker, text.to_string(), fused, limit).await?;

        populate_cache(&self.cache, &ranked);
        Ok(project(ranked))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let embedder = Arc::clone(&self.embedder);
        let model = embedder.model_name().to_string();
        let owned = text.to_string();

        let result = self
            .pool
            .submit("embed", async move { embedder.embed(&owned).await })
            .await
            .map_err(AppError::into_embedding_error)
            .and_then(|vector| {
                if vector.is_empty() {
                    Err(AppError::EmbeddingError {
                        message: format!("{} returned an empty vector", model),
                    })
                } else {
                    Ok(vector)
                }
            });

        metrics::record_embedding(start.elapsed().as_secs_f64(), &model, result.is_ok());
        result
    }

    async fn retrieve_lexical(
        &self,
        text: String,
        filter: Option<Arc<Filter>>,
    ) -> Result<Vec<Document>> {
        let start = Instant::now();
        let store = Arc::clone(&self.store);
        let top_k = self.retrieval_top_k;

        let docs = self
            .pool
            .submit("lexical retrieval", async move {
                store.search_lexical(&text, filter.as_deref(), top_k).await
            })
            .await
            .map_err(AppError::into_retrieval_error)?;

        metrics::record_retrieval(start.elapsed().as_secs_f64(), "lexical");
        debug!(hits = docs.len(), "Lexical retrieval complete");
        Ok(docs)
    }

    async fn retrieve_semantic(
        &self,
        embedding: Vec<f32>,
        filter: Option<Arc<Filter>>,
    ) -> Result<Vec<Document>> {
        let start = Instant::now();
        let store = Arc::clone(&self.store);
        let top_k = self.retrieval_top_k;

        let docs = self
            .pool
            .submit("semantic retrieval", async move {
                store.search_semantic(&embedding, filter.as_deref(), top_k).await
            })
            .await
            .map_err(AppError::into_retrieval_error)?;

        metrics::record_retrieval(start.elapsed().as_secs_f64(), "semantic");
        debug!(hits = docs.len(), "Semantic retrieval complete");
        Ok(docs)
    }
}

fn reject_blank(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(AppError::Validation {
            message: "query must not be blank".to_string(),
            field: Some("query".to_string()),
        });
    }
    Ok(())
}
