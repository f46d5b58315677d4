//! Term extraction shared by the in-process embedder and reranker

/// Lowercased alphanumeric terms longer than two characters, in text order.
pub fn terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 2)
        .map(|w| w.to_lowercase())
        .collect()
}
