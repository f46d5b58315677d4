//! Harvested paper documents and their API projection

use serde::{Deserialize, Serialize};

/// Bibliographic metadata of a harvested arXiv record.
///
/// `authors` and `categories` are kept as the raw harvested strings
/// (`categories` is space separated, e.g. `"cs.CV cs.LG"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub identifier: String,
    pub datestamp: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub authors: String,
    pub categories: String,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub submitter: Option<String>,
}

/// A document as returned by the document store.
///
/// Treated as an immutable value once returned; `score` is only populated
/// by retrieval or reranking and is never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub meta: DocumentMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl Document {
    /// Same document carrying a different score
    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }
}

/// Externally visible projection of a ranked document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub id: String,
    /// Normalized reranker score
    pub weight: f32,
    pub meta: DocumentMeta,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id,
            weight: doc.score.unwrap_or_default(),
            meta: doc.meta,
        }
    }
}
