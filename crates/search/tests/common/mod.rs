//! Deterministic collaborators for engine tests

#![allow(dead_code)]

use async_trait::async_trait;
use paperlens_common::config::EngineConfig;
use paperlens_common::embeddings::HashEmbedder;
use paperlens_common::errors::{AppError, Result};
use paperlens_common::text::terms;
use paperlens_common::{Document, DocumentMeta, Embedder, Reranker};
use paperlens_search::filter::{Condition, ConditionOperator, Filter, FilterField, FilterValue};
use paperlens_search::{DocumentStore, Engine};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const DIM: usize = 64;

pub fn make_doc(id: &str, title: &str, abstract_text: &str, categories: &str, datestamp: &str) -> Document {
    Document {
        id: id.to_string(),
        content: format!("{}\n\n{}", title, abstract_text),
        meta: DocumentMeta {
            identifier: format!("oai:arXiv.org:{}", id),
            datestamp: datestamp.to_string(),
            title: title.to_string(),
            abstract_text: abstract_text.to_string(),
            authors: "J. Doe, R. Roe".to_string(),
            categories: categories.to_string(),
            comments: None,
            license: None,
            submitter: Some("J. Doe".to_string()),
        },
        embedding: None,
        score: None,
    }
}

pub fn corpus() -> Vec<Document> {
    vec![
        make_doc(
            "2401.00001",
            "Real-time object detection in traffic images",
            "A single-stage detector for cars, buses and pedestrians in roadside traffic images.",
            "cs.CV",
            "2024-01-10",
        ),
        make_doc(
            "2401.00002",
            "Vehicle detection for traffic camera images",
            "We benchmark vehicle detectors on low resolution traffic camera footage.",
            "cs.CV",
            "2024-01-20",
        ),
        make_doc(
            "2402.00003",
            "Object tracking in urban traffic video",
            "Multi-object tracking of vehicles across intersections using detection cues.",
            "cs.CV cs.LG",
            "2024-02-05",
        ),
        make_doc(
            "2402.00004",
            "Large language models for code generation",
            "We study how instruction tuning affects program synthesis benchmarks.",
            "cs.CL",
            "2024-02-14",
        ),
        make_doc(
            "2403.00005",
            "Graph neural networks for molecule property prediction",
            "Message passing networks predict solubility and toxicity of molecules.",
            "cs.LG",
            "2024-03-01",
        ),
        make_doc(
            "2403.00006",
            "Pedestrian detection under adverse weather",
            "Fog and rain degrade detection; we propose weather-aware augmentation for images.",
            "cs.CV",
            "2024-03-15",
        ),
        make_doc(
            "2404.00007",
            "Reinforcement learning for robotic grasping",
            "A robot learns grasping policies from sparse rewards in simulation.",
            "cs.RO",
            "2024-04-02",
        ),
        make_doc(
            "2404.00008",
            "Speech recognition with self-supervised transformers",
            "Pretraining on unlabeled audio improves word error rate.",
            "eess.AS",
            "2024-04-20",
        ),
    ]
}

pub fn matches_filter(doc: &Document, filter: Option<&Filter>) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    filter.conditions.iter().all(|c| matches_condition(doc, c))
}

fn matches_condition(doc: &Document, condition: &Condition) -> bool {
    match (condition.field, condition.operator, &condition.value) {
        (FilterField::Id, ConditionOperator::Eq, FilterValue::Text(id)) => &doc.id == id,
        (FilterField::Datestamp, ConditionOperator::Gte, FilterValue::Text(d)) => {
            doc.meta.datestamp.as_str() >= d.as_str()
        }
        (FilterField::Datestamp, ConditionOperator::Lte, FilterValue::Text(d)) => {
            doc.meta.datestamp.as_str() <= d.as_str()
        }
        (FilterField::Categories, ConditionOperator::In, FilterValue::List(wanted)) => doc
            .meta
            .categories
            .split_whitespace()
            .any(|c| wanted.iter().any(|w| w == c)),
        other => panic!("fake store cannot evaluate {:?}", other),
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// In-memory store ranking by term overlap (lexical) and dot product (semantic)
#[derive(Default)]
pub struct FakeStore {
    docs: Vec<Document>,
    pub lexical_calls: AtomicUsize,
    pub semantic_calls: AtomicUsize,
    pub exact_calls: AtomicUsize,
    pub last_semantic_top_k: AtomicUsize,
}

impl FakeStore {
    /// Store holding `docs` as given (embeddings untouched)
    pub fn new(docs: Vec<Document>) -> Self {
        Self {
            docs,
            ..Default::default()
        }
    }

    /// Store holding `docs` embedded with the test embedder
    pub async fn indexed(mut docs: Vec<Document>) -> Self {
        let embedder = HashEmbedder::new(DIM);
        for doc in &mut docs {
            doc.embedding = Some(embedder.embed(&doc.content).await.unwrap());
        }
        Self::new(docs)
    }

    pub fn calls(&self) -> (usize, usize, usize) {
        (
            self.lexical_calls.load(Ordering::SeqCst),
            self.semantic_calls.load(Ordering::SeqCst),
            self.exact_calls.load(Ordering::SeqCst),
        )
    }
}

#[async_trait]
impl DocumentStore for FakeStore {
    async fn search_lexical(&self, query: &str, filter: Option<&Filter>, top_k: usize) -> Result<Vec<Document>> {
        self.lexical_calls.fetch_add(1, Ordering::SeqCst);
        let query_terms: HashSet<String> = terms(query).into_iter().collect();

        let mut hits: Vec<Document> = self
            .docs
            .iter()
            .filter(|doc| matches_filter(doc, filter))
            .filter_map(|doc| {
                let doc_terms: HashSet<String> = terms(&doc.content).into_iter().collect();
                let matched = query_terms.intersection(&doc_terms).count();
                (matched > 0).then(|| doc.clone().with_score(matched as f32))
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn search_semantic(&self, embedding: &[f32], filter: Option<&Filter>, top_k: usize) -> Result<Vec<Document>> {
        self.semantic_calls.fetch_add(1, Ordering::SeqCst);
        self.last_semantic_top_k.store(top_k, Ordering::SeqCst);

        let mut hits: Vec<Document> = self
            .docs
            .iter()
            .filter(|doc| matches_filter(doc, filter))
            .filter_map(|doc| {
                let stored = doc.embedding.as_ref()?;
                Some(doc.clone().with_score(dot(embedding, stored)))
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn search_by_id_exact(&self, id: &str) -> Result<Option<Document>> {
        self.exact_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.docs.iter().find(|doc| doc.id == id).cloned())
    }
}

/// Store whose lexical retrieval always fails with a non-retrieval error
pub struct BrokenLexicalStore(pub FakeStore);

#[async_trait]
impl DocumentStore for BrokenLexicalStore {
    async fn search_lexical(&self, _query: &str, _filter: Option<&Filter>, _top_k: usize) -> Result<Vec<Document>> {
        Err(AppError::DatabaseConnection {
            message: "connection reset by peer".to_string(),
        })
    }

    async fn search_semantic(&self, embedding: &[f32], filter: Option<&Filter>, top_k: usize) -> Result<Vec<Document>> {
        self.0.search_semantic(embedding, filter, top_k).await
    }
}

/// Store whose two retrievals each wait for the other to start.
///
/// Running them one after the other trips the timeout and fails the query.
pub struct RendezvousStore {
    pub inner: FakeStore,
    barrier: tokio::sync::Barrier,
}

impl RendezvousStore {
    pub fn new(inner: FakeStore) -> Self {
        Self {
            inner,
            barrier: tokio::sync::Barrier::new(2),
        }
    }

    async fn meet(&self, retriever: &str) -> Result<()> {
        tokio::time::timeout(std::time::Duration::from_secs(2), self.barrier.wait())
            .await
            .map(|_| ())
            .map_err(|_| AppError::RetrievalError {
                message: format!("{} retrieval ran without its counterpart", retriever),
            })
    }
}

#[async_trait]
impl DocumentStore for RendezvousStore {
    async fn search_lexical(&self, query: &str, filter: Option<&Filter>, top_k: usize) -> Result<Vec<Document>> {
        self.meet("lexical").await?;
        self.inner.search_lexical(query, filter, top_k).await
    }

    async fn search_semantic(&self, embedding: &[f32], filter: Option<&Filter>, top_k: usize) -> Result<Vec<Document>> {
        self.meet("semantic").await?;
        self.inner.search_semantic(embedding, filter, top_k).await
    }
}

/// Store relying on the default exact lookup; records lexical arguments
#[derive(Default)]
pub struct LexicalOnlyStore {
    pub docs: Vec<Document>,
    pub lexical_args: Mutex<Vec<(String, Option<Filter>, usize)>>,
}

#[async_trait]
impl DocumentStore for LexicalOnlyStore {
    async fn search_lexical(&self, query: &str, filter: Option<&Filter>, top_k: usize) -> Result<Vec<Document>> {
        self.lexical_args
            .lock()
            .unwrap()
            .push((query.to_string(), filter.cloned(), top_k));
        let mut hits: Vec<Document> = self
            .docs
            .iter()
            .filter(|doc| matches_filter(doc, filter))
            .cloned()
            .collect();
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn search_semantic(&self, _embedding: &[f32], _filter: Option<&Filter>, _top_k: usize) -> Result<Vec<Document>> {
        Ok(Vec::new())
    }
}

pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(AppError::ServiceUnavailable {
            message: "embedding endpoint unreachable".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        "failing"
    }

    fn dimension(&self) -> usize {
        DIM
    }
}

/// Reranker returning a fixed id order with fixed scores
pub struct ScriptedReranker {
    script: Vec<(String, f32)>,
    pub calls: AtomicUsize,
}

impl ScriptedReranker {
    pub fn new(script: &[(&str, f32)]) -> Self {
        Self {
            script: script.iter().map(|(id, s)| (id.to_string(), *s)).collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Reranker for ScriptedReranker {
    async fn rerank(&self, _query: &str, candidates: Vec<Document>, top_k: usize) -> Result<Vec<Document>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .script
            .iter()
            .filter_map(|(id, score)| {
                candidates
                    .iter()
                    .find(|doc| &doc.id == id)
                    .map(|doc| doc.clone().with_score(*score))
            })
            .take(top_k)
            .collect())
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

pub struct FailingReranker;

#[async_trait]
impl Reranker for FailingReranker {
    async fn rerank(&self, _query: &str, _candidates: Vec<Document>, _top_k: usize) -> Result<Vec<Document>> {
        Err(AppError::ServiceUnavailable {
            message: "reranker overloaded".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

pub fn engine(store: Arc<dyn DocumentStore>, reranker: Arc<dyn Reranker>) -> Engine {
    engine_with_embedder(Arc::new(HashEmbedder::new(DIM)), store, reranker)
}

pub fn engine_with_embedder(
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn DocumentStore>,
    reranker: Arc<dyn Reranker>,
) -> Engine {
    Engine::new(embedder, store, reranker, EngineConfig::default())
}
