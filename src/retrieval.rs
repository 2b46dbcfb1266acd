//! Retrieval-augmented answering.
//!
//! Embeds the user message, searches the vector store for the most
//! similar knowledge documents, and synthesizes a templated explanation
//! from the retrieved text. Confidence is a monotonic, saturating
//! function of the best similarity: `min(0.55 + 0.45 × top, 0.98)`, so
//! near-exact matches approach certainty without reaching it.
//!
//! This component never mutates the vector store. When nothing clears
//! the similarity cutoff it falls back to a context-only templated
//! answer with a fixed low confidence.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::embedding::{embed_query, EmbeddingProvider};
use crate::models::{ChatContext, ChatMessage};
use crate::vector_store::{SearchHit, VectorStore};

/// Fixed confidence of the context-only fallback answer.
const NO_RETRIEVAL_CONFIDENCE: f64 = 0.3;

/// The retrieval stage's answer.
#[derive(Debug, Clone)]
pub struct RagAnswer {
    pub text: String,
    pub confidence: f64,
    /// False when the answer came from the context-only fallback.
    pub used_retrieval: bool,
    pub elapsed: Duration,
    /// Qualifying documents found (count of returned hits).
    pub documents_found: usize,
}

/// Orchestrates embedding, vector search, and answer synthesis.
pub struct RagResponder {
    store: Arc<VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    max_results: usize,
    min_similarity: f32,
}

impl RagResponder {
    pub fn new(
        store: Arc<VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        max_results: usize,
        min_similarity: f32,
    ) -> Self {
        Self {
            store,
            embedder,
            max_results,
            min_similarity,
        }
    }

    /// Answer a message from the knowledge base.
    ///
    /// Errors (embedding provider down, etc.) propagate to the cascade,
    /// which logs them and moves on to the next stage.
    pub async fn answer(
        &self,
        message: &str,
        ctx: &ChatContext,
        _history: &[ChatMessage],
    ) -> Result<RagAnswer> {
        let started = Instant::now();

        let query = embed_query(self.embedder.as_ref(), message).await?;
        let outcome = self
            .store
            .search(&query, self.max_results, self.min_similarity)
            .await;

        if outcome.hits.is_empty() {
            return Ok(RagAnswer {
                text: context_only_answer(ctx),
                confidence: NO_RETRIEVAL_CONFIDENCE,
                used_retrieval: false,
                elapsed: started.elapsed(),
                documents_found: 0,
            });
        }

        let top_score = outcome.hits[0].score as f64;
        let confidence = (0.55 + 0.45 * top_score).min(0.98);

        Ok(RagAnswer {
            text: synthesize(&outcome.hits, ctx),
            confidence,
            used_retrieval: true,
            elapsed: started.elapsed(),
            documents_found: outcome.hits.len(),
        })
    }
}

/// Compose an explanation from retrieved documents, best match first.
fn synthesize(hits: &[SearchHit], ctx: &ChatContext) -> String {
    let mut parts = vec!["Here's what I found in our nutrition library:".to_string()];

    for hit in hits {
        let label = hit
            .document
            .metadata
            .title
            .clone()
            .unwrap_or_else(|| hit.document.id.clone());
        parts.push(format!("- {}: {}", label, hit.document.text.trim()));
    }

    if let Some(goal) = ctx.profile.get("goal") {
        parts.push(format!(
            "Given your goal of {}, let me know if you'd like this tailored further.",
            goal.replace('_', " ")
        ));
    }

    parts.join("\n")
}

/// Fallback when no document clears the similarity cutoff.
fn context_only_answer(ctx: &ChatContext) -> String {
    match ctx.profile.get("goal") {
        Some(goal) => format!(
            "I couldn't find a specific article for that, but given your goal of {}, a balanced plate of protein, whole grains, and vegetables is a safe bet. Could you rephrase or narrow the question?",
            goal.replace('_', " ")
        ),
        None => "I couldn't find a specific answer for that in our nutrition library. Could you rephrase, or ask about a particular food or goal?".to_string(),
    }
}
