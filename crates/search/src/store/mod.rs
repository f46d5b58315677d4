//! Document store abstraction
//!
//! The engine never ranks documents lexically or computes vector similarity
//! itself; both are delegated to a store behind [`DocumentStore`].

mod postgres;

pub use postgres::PgDocumentStore;

use crate::filter::Filter;
use paperlens_common::errors::Result;
use paperlens_common::Document;

/// Indexed document collection supporting lexical and vector retrieval
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Full-text retrieval, best match first
    async fn search_lexical(
        &self,
        query: &str,
        filter: Option<&Filter>,
        top_k: usize,
    ) -> Result<Vec<Document>>;

    /// Nearest neighbours of `embedding`, most similar first.
    ///
    /// Returned documents carry their stored embedding.
    async fn search_semantic(
        &self,
        embedding: &[f32],
        filter: Option<&Filter>,
        top_k: usize,
    ) -> Result<Vec<Document>>;

    /// Fetch one document by id.
    ///
    /// The default goes through lexical search restricted by an id filter;
    /// stores with a direct key lookup should override it.
    async fn search_by_id_exact(&self, id: &str) -> Result<Option<Document>> {
        let filter = Filter::id_equals(id);
        let docs = self.search_lexical(id, Some(&filter), 1).await?;
        Ok(docs.into_iter().find(|doc| doc.id == id))
    }
}
