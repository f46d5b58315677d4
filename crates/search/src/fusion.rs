//! Union of lexical and semantic candidates
//!
//! Lexical and semantic scores live on different scales, so nothing here tries
//! to combine them. The fused set is only a deduplicated candidate pool; final
//! order comes from the reranker.

use paperlens_common::Document;
use std::collections::HashSet;

/// Deduplicating merge of retriever outputs
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultFuser;

impl ResultFuser {
    pub fn new() -> Self {
        Self
    }

    /// Merge both lists keeping the first occurrence of every id.
    ///
    /// The lexical list is walked before the semantic one. Retriever-local
    /// scores are cleared on the way out.
    pub fn fuse(&self, lexical: Vec<Document>, semantic: Vec<Document>) -> Vec<Document> {
        let mut seen = HashSet::with_capacity(lexical.len() + semantic.len());

        lexical
            .into_iter()
            .chain(semantic)
            .filter(|doc| seen.insert(doc.id.clone()))
            .map(|mut doc| {
                doc.score = None;
                doc
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperlens_common::DocumentMeta;

    fn make_doc(id: &str, score: f32) -> Document {
        Document {
            id: id.to_string(),
            content: format!("content of {}", id),
            meta: DocumentMeta {
                identifier: format!("oai:arXiv.org:{}", id),
                datestamp: "2024-01-01".to_string(),
                title: id.to_string(),
                abstract_text: String::new(),
                authors: String::new(),
                categories: "cs.CV".to_string(),
                comments: None,
                license: None,
                submitter: None,
            },
            embedding: None,
            score: Some(score),
        }
    }

    fn ids(docs: &[Document]) -> Vec<&str> {
        docs.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn test_lexical_first_then_semantic() {
        let fuser = ResultFuser::new();
        let lexical = vec![make_doc("A", 3.0), make_doc("B", 2.0)];
        let semantic = vec![make_doc("C", 0.9), make_doc("A", 0.8), make_doc("D", 0.7)];

        let fused = fuser.fuse(lexical, semantic);
        assert_eq!(ids(&fused), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_first_occurrence_wins() {
        let fuser = ResultFuser::new();
        let mut lexical_a = make_doc("A", 3.0);
        lexical_a.content = "lexical copy".to_string();
        let mut semantic_a = make_doc("A", 0.8);
        semantic_a.content = "semantic copy".to_string();

        let fused = fuser.fuse(vec![lexical_a], vec![semantic_a]);
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].content, "lexical copy");
    }

    #[test]
    fn test_scores_are_cleared() {
        let fuser = ResultFuser::new();
        let fused = fuser.fuse(vec![make_doc("A", 3.0)], vec![make_doc("B", 0.5)]);
        assert!(fused.iter().all(|d| d.score.is_none()));
    }

    #[test]
    fn test_fusing_list_with_itself_is_idempotent() {
        let fuser = ResultFuser::new();
        let list = vec![make_doc("A", 1.0), make_doc("B", 0.9), make_doc("A", 0.1)];

        let fused = fuser.fuse(list.clone(), list);
        assert_eq!(ids(&fused), vec!["A", "B"]);

        let again = fuser.fuse(fused.clone(), fused.clone());
        assert_eq!(again, fused);
    }

    #[test]
    fn test_empty_inputs() {
        let fuser = ResultFuser::new();
        assert!(fuser.fuse(vec![], vec![]).is_empty());
        assert_eq!(ids(&fuser.fuse(vec![], vec![make_doc("X", 0.2)])), vec!["X"]);
    }
}
