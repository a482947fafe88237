//! In-memory vector index with cosine top-K queries.

use std::sync::Arc;

use async_trait::async_trait;
use mentor_common::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embedding::{cosine_similarity, Embedder};

/// A knowledge snippet returned by a similarity query, scored in `[0, 1]`-ish
/// cosine space, descending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedSnippet {
    pub snippet: String,
    pub score: f32,
}

/// The retrieval seam the solver consumes.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Top-`k` snippets most similar to `query`, descending by score.
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedSnippet>>;
}

struct IndexEntry {
    text: String,
    vector: Vec<f32>,
}

/// Embeds a seeded snippet corpus once and answers cosine top-K queries.
pub struct KnowledgeIndex {
    embedder: Arc<dyn Embedder>,
    entries: Vec<IndexEntry>,
}

impl KnowledgeIndex {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            entries: Vec::new(),
        }
    }

    /// Seed the index with ready-made snippets.
    pub fn with_snippets(
        embedder: Arc<dyn Embedder>,
        snippets: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut index = Self::new(embedder);
        for snippet in snippets {
            index.insert(snippet);
        }
        index
    }

    pub fn insert(&mut self, snippet: impl Into<String>) {
        let text = snippet.into();
        let vector = self.embedder.embed(&text);
        self.entries.push(IndexEntry { text, vector });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl Retriever for KnowledgeIndex {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedSnippet>> {
        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query);

        let mut scored: Vec<RetrievedSnippet> = self
            .entries
            .iter()
            .map(|entry| RetrievedSnippet {
                snippet: entry.text.clone(),
                score: cosine_similarity(&query_vector, &entry.vector),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);

        debug!(
            query_preview = %query.chars().take(50).collect::<String>(),
            results = scored.len(),
            top_score = scored.first().map(|s| s.score).unwrap_or(0.0),
            "Retrieved knowledge snippets"
        );

        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;

    fn seeded_index() -> KnowledgeIndex {
        KnowledgeIndex::with_snippets(
            Arc::new(HashEmbedder::default()),
            vec![
                "A quadratic equation ax^2 + bx + c = 0 has roots given by the quadratic formula."
                    .to_string(),
                "The discriminant b^2 - 4ac determines how many real roots a quadratic has."
                    .to_string(),
                "The derivative of x^n is n*x^(n-1).".to_string(),
                "The probability of independent events both occurring is the product of their probabilities."
                    .to_string(),
            ],
        )
    }

    #[tokio::test]
    async fn retrieves_relevant_snippets_first() {
        let index = seeded_index();
        let results = index
            .retrieve("solve the quadratic equation x^2 - 4x + 4 = 0", 2)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results[0].snippet.to_lowercase().contains("quadratic"));
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn respects_k_limit() {
        let index = seeded_index();
        let results = index.retrieve("roots", 10).await.unwrap();
        assert_eq!(results.len(), 4);

        let results = index.retrieve("roots", 0).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn empty_index_returns_nothing() {
        let index = KnowledgeIndex::new(Arc::new(HashEmbedder::default()));
        let results = index.retrieve("anything", 3).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn scores_are_descending() {
        let index = seeded_index();
        let results = index.retrieve("derivative of a polynomial", 4).await.unwrap();
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }
}
