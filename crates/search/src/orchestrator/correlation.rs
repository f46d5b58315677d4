//! "More like this" pipeline
//!
//! The source document's vector comes from the correlation cache when
//! possible, otherwise from an exact store lookup. Its nearest neighbours are
//! reranked against the source's own text. The source itself is never part of
//! the answer.

use super::{populate_cache, project, rerank_on_pool};
use crate::cache::{CachedDocument, CorrelationCache};
use crate::filter::Filter;
use crate::fusion::ResultFuser;
use crate::pool::WorkerPool;
use crate::store::DocumentStore;
use paperlens_common::errors::{AppError, Result};
use paperlens_common::metrics;
use paperlens_common::{Document, DocumentResponse, Reranker};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

pub struct CorrelationOrchestrator {
    store: Arc<dyn DocumentStore>,
    reranker: Arc<dyn Reranker>,
    cache: Arc<CorrelationCache>,
    pool: WorkerPool,
    fuser: ResultFuser,
}

impl CorrelationOrchestrator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        reranker: Arc<dyn Reranker>,
        cache: Arc<CorrelationCache>,
        pool: WorkerPool,
    ) -> Self {
        Self {
            store,
            reranker,
            cache,
            pool,
            fuser: ResultFuser::new(),
        }
    }

    /// Up to `top_k` documents related to `source_id`, in reranker order.
    ///
    /// Fails with `DocumentNotFound` when the id is neither cached nor stored.
    #[instrument(skip_all, fields(source_id = %source_id, top_k = top_k, filtered = filter.is_some()))]
    pub async fn similar_docs(
        &self,
        source_id: &str,
        top_k: usize,
        filter: Option<Filter>,
    ) -> Result<Vec<DocumentResponse>> {
        let start = Instant::now();
        let mut source_cached = false;
        let result = self.run(source_id, top_k, filter, &mut source_cached).await;
        let elapsed = start.elapsed();

        metrics::record_correlation(elapsed.as_secs_f64(), result.is_ok(), source_cached);
        match &result {
            Ok(results) => info!(
                results = results.len(),
                source_cached,
                elapsed_ms = elapsed.as_millis() as u64,
                "Correlation complete"
            ),
            Err(e) => warn!(error = %e, "Correlation failed"),
        }

        result
    }

    async fn run(
        &self,
        source_id: &str,
        top_k: usize,
        filter: Option<Filter>,
        source_cached: &mut bool,
    ) -> Result<Vec<DocumentResponse>> {
        if top_k == 0 {
            return Err(AppError::Validation {
                message: "limit must be at least 1".to_string(),
                field: Some("limit".to_string()),
            });
        }

        let source = match self.cache.get(source_id) {
            Ok(hit) => {
                *source_cached = true;
                debug!("Source vector served from cache");
                hit
            }
            Err(miss) => {
                debug!(reason = %miss, "Resolving source through exact lookup");
                self.resolve_from_store(source_id).await?
            }
        };

        // One extra neighbour makes room for the source, which is usually its
        // own nearest match.
        let neighbours = self
            .retrieve_neighbours(
                Arc::clone(&source.embedding),
                filter,
                top_k.saturating_add(1),
            )
            .await?;

        let candidates: Vec<Document> = self
            .fuser
            .fuse(Vec::new(), neighbours)
            .into_iter()
            .filter(|doc| doc.id != source_id)
            .collect();
        debug!(candidates = candidates.len(), "Collected neighbour candidates");

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let ranked =
            rerank_on_pool(&self.pool, &self.reranker, source.content, candidates, top_k).await?;

        populate_cache(&self.cache, &ranked);
        Ok(project(ranked))
    }

    async fn resolve_from_store(&self, source_id: &str) -> Result<CachedDocument> {
        let store = Arc::clone(&self.store);
        let id = source_id.to_string();

        let doc = self
            .pool
            .submit("exact lookup", async move { store.search_by_id_exact(&id).await })
            .await
            .map_err(AppError::into_retrieval_error)?
            .ok_or_else(|| AppError::DocumentNotFound {
                id: source_id.to_string(),
            })?;

        let embedding: Arc<[f32]> = match doc.embedding {
            Some(embedding) if !embedding.is_empty() => Arc::from(embedding),
            _ => {
                return Err(AppError::RetrievalError {
                    message: format!("document {} has no stored embedding", source_id),
                })
            }
        };

        self.cache
            .set(&doc.id, Arc::clone(&embedding), doc.content.clone());

        Ok(CachedDocument {
            embedding,
            content: doc.content,
        })
    }

    async fn retrieve_neighbours(
        &self,
        embedding: Arc<[f32]>,
        filter: Option<Filter>,
        top_k: usize,
    ) -> Result<Vec<Document>> {
        let start = Instant::now();
        let store = Arc::clone(&self.store);

        let docs = self
            .pool
            .submit("semantic retrieval", async move {
                store.search_semantic(&embedding, filter.as_ref(), top_k).await
            })
            .await
            .map_err(AppError::into_retrieval_error)?;

        metrics::record_retrieval(start.elapsed().as_secs_f64(), "semantic");
        Ok(docs)
    }
}
