//! Reranking abstraction
//!
//! A reranker rescores a candidate set against a reference text and owns the
//! final ordering of every result list the engine returns.

use crate::config::RerankerConfig;
use crate::errors::{AppError, Result};
use crate::models::Document;
use crate::text::terms;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Trait for candidate reranking
///
/// In-process scoring runs under `spawn_blocking`, as for `Embedder`.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Rescore `candidates` against `query` and return at most `top_k` of them,
    /// sorted by descending normalized score (0.0 - 1.0) stored in `Document::score`.
    async fn rerank(&self, query: &str, candidates: Vec<Document>, top_k: usize)
        -> Result<Vec<Document>>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Cross-encoder served behind a TEI-compatible `/rerank` endpoint
/// (e.g. BAAI/bge-reranker-v2-m3).
pub struct CrossEncoderReranker {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    texts: Vec<&'a str>,
    raw_scores: bool,
}

#[derive(Deserialize)]
struct RerankHit {
    index: usize,
    score: f32,
}

impl CrossEncoderReranker {
    pub fn new(config: &RerankerConfig) -> Result<Self> {
        let base_url = config.base_url.clone().ok_or_else(|| AppError::Configuration {
            message: "reranker.base_url is required for the cross-encoder provider".to_string(),
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create reranker HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url,
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl Reranker for CrossEncoderReranker {
    async fn rerank(
        &self,
        query: &str,
        candidates: Vec<Document>,
        top_k: usize,
    ) -> Result<Vec<Document>> {
        if candidates.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let url = format!("{}/rerank", self.base_url.trim_end_matches('/'));
        let request = RerankRequest {
            query,
            texts: candidates.iter().map(|d| d.content.as_str()).collect(),
            raw_scores: true,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::RerankError {
                message: format!("Failed to reach reranker endpoint: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::RerankError {
                message: format!("Reranker returned {}: {}", status, body),
            });
        }

        let hits: Vec<RerankHit> = response.json().await.map_err(|e| AppError::RerankError {
            message: format!("Failed to parse reranker response: {}", e),
        })?;

        let scores = hits
            .into_iter()
            .map(|hit| {
                if hit.index >= candidates.len() {
                    return Err(AppError::RerankError {
                        message: format!(
                            "Reranker returned index {} for {} candidates",
                            hit.index,
                            candidates.len()
                        ),
                    });
                }
                Ok((hit.index, sigmoid(hit.score)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(order_by_scores(candidates, scores, top_k))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// In-process fallback scoring the share of distinct query terms found in
/// each candidate.
#[derive(Debug, Default)]
pub struct TermOverlapReranker;

impl TermOverlapReranker {
    /// Score and order candidates on the calling thread
    fn rerank_blocking(query: &str, candidates: Vec<Document>, top_k: usize) -> Vec<Document> {
        let query_terms: HashSet<String> = terms(query).into_iter().collect();

        let scores = candidates
            .iter()
            .enumerate()
            .map(|(index, doc)| {
                if query_terms.is_empty() {
                    return (index, 0.0);
                }
                let doc_terms: HashSet<String> = terms(&doc.content).into_iter().collect();
                let matched = query_terms.intersection(&doc_terms).count();
                (index, matched as f32 / query_terms.len() as f32)
            })
            .collect();

        order_by_scores(candidates, scores, top_k)
    }
}

#[async_trait]
impl Reranker for TermOverlapReranker {
    async fn rerank(
        &self,
        query: &str,
        candidates: Vec<Document>,
        top_k: usize,
    ) -> Result<Vec<Document>> {
        let query = query.to_string();
        let ranked = tokio::task::spawn_blocking(move || {
            Self::rerank_blocking(&query, candidates, top_k)
        })
        .await?;
        Ok(ranked)
    }

    fn model_name(&self) -> &str {
        "term-overlap"
    }
}

/// Attach scores, sort descending (stable, so ties keep candidate order), truncate.
///
/// Candidates without a score are dropped, matching endpoints that only
/// return the top hits.
fn order_by_scores(
    candidates: Vec<Document>,
    scores: Vec<(usize, f32)>,
    top_k: usize,
) -> Vec<Document> {
    let mut slots: Vec<Option<Document>> = candidates.into_iter().map(Some).collect();

    let mut scored: Vec<(usize, f32)> = scores;
    scored.sort_by_key(|(index, _)| *index);
    scored.dedup_by_key(|(index, _)| *index);
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    scored
        .into_iter()
        .filter_map(|(index, score)| slots[index].take().map(|doc| doc.with_score(score)))
        .take(top_k)
        .collect()
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Create a reranker based on configuration
pub fn create_reranker(config: &RerankerConfig) -> Result<Arc<dyn Reranker>> {
    match config.provider.as_str() {
        "cross-encoder" => Ok(Arc::new(CrossEncoderReranker::new(config)?)),
        "term-overlap" => Ok(Arc::new(TermOverlapReranker)),
        other => Err(AppError::Configuration {
            message: format!("Unknown reranker provider: {}", other),
        }),
    }
}
