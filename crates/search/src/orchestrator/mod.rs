//! Request pipelines of the engine
//!
//! - [`SearchOrchestrator`]: free-text query → ranked documents
//! - [`CorrelationOrchestrator`]: document id → ranked related documents
//!
//! Both run every collaborator call on the shared [`WorkerPool`] and feed the
//! documents they return into the shared [`CorrelationCache`].

mod correlation;
mod search;

pub use correlation::CorrelationOrchestrator;
pub use search::SearchOrchestrator;

use crate::cache::CorrelationCache;
use crate::pool::WorkerPool;
use paperlens_common::errors::{AppError, Result};
use paperlens_common::metrics;
use paperlens_common::{Document, DocumentResponse, Reranker};
use std::sync::Arc;
use std::time::Instant;

/// Rerank `candidates` against `query` on the pool, keeping at most `top_k`
async fn rerank_on_pool(
    pool: &WorkerPool,
    reranker: &Arc<dyn Reranker>,
    query: String,
    candidates: Vec<Document>,
    top_k: usize,
) -> Result<Vec<Document>> {
    let start = Instant::now();
    let candidate_count = candidates.len();
    let reranker = Arc::clone(reranker);
    let model = reranker.model_name().to_string();

    let mut ranked = pool
        .submit("rerank", async move {
            reranker.rerank(&query, candidates, top_k).await
        })
        .await
        .map_err(AppError::into_rerank_error)?;
    ranked.truncate(top_k);

    metrics::record_rerank(start.elapsed().as_secs_f64(), &model);
    tracing::debug!(
        model = %model,
        candidates = candidate_count,
        kept = ranked.len(),
        "Rerank complete"
    );

    Ok(ranked)
}

/// Remember the vector of every document that carries one
fn populate_cache(cache: &CorrelationCache, docs: &[Document]) {
    for doc in docs {
        if let Some(embedding) = &doc.embedding {
            cache.set(&doc.id, Arc::from(embedding.as_slice()), doc.content.clone());
        }
    }
}

fn project(docs: Vec<Document>) -> Vec<DocumentResponse> {
    docs.into_iter().map(DocumentResponse::from).collect()
}
