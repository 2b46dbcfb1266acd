//! Fallback cascade orchestration and the engine composition root.
//!
//! [`ResponseEngine`] owns every shared component (corpus cache, vector
//! store, embedding provider, classifier, analytics worker, match
//! statistics) and folds over an ordered list of candidate generators:
//!
//! 1. Retrieval-augmented responder — terminal when its confidence
//!    reaches the high-confidence threshold (default 0.6).
//! 2. Profile-aware rule engine.
//! 3. Learned classifier (used above confidence 0.8, and only when the
//!    predicted intent has an applicable response).
//! 4. Lexical similarity matcher (used above confidence 0.7).
//! 5. Always-available keyword default (confidence 0.5).
//!
//! The strictly highest confidence wins; ties keep the earlier,
//! higher-precision stage. A stage failure is logged and treated as "no
//! candidate" — a response is always produced for valid input. Only
//! input validation errors ever reach the caller.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{debug, warn};

use crate::analytics::{infer_preferences, Analytics, AnalyticsEvent};
use crate::classifier::{DisabledClassifier, IntentClassifier};
use crate::config::{Config, EngineConfig};
use crate::corpus::{Corpus, CorpusCache, CorpusLoader, FileCorpusLoader, SeedCorpusLoader};
use crate::embedding::{create_provider, EmbeddingProvider};
use crate::error::{validate_message, InputError};
use crate::matcher;
use crate::models::{Candidate, ChatContext, ChatMessage, Document, EngineReply, Method};
use crate::retrieval::RagResponder;
use crate::rules;
use crate::stats::{IntentMatchStats, MatchStats};
use crate::vector_store::{StoreStats, VectorStore};

/// How many characters of a rendered response the analytics record keeps.
const RESPONSE_PREFIX_CHARS: usize = 80;

/// The conversational response engine.
///
/// One instance serves many concurrent requests; all shared state is
/// read-mostly and internally synchronized. Construction must happen
/// inside a tokio runtime (the analytics worker is spawned eagerly).
pub struct ResponseEngine {
    config: EngineConfig,
    corpus: CorpusCache,
    store: Arc<VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    classifier: Arc<dyn IntentClassifier>,
    rag: RagResponder,
    analytics: Analytics,
    stats: MatchStats,
}

impl ResponseEngine {
    /// Assemble an engine from explicit parts. Used directly by tests;
    /// production callers go through [`from_config`](Self::from_config).
    pub fn new(
        config: EngineConfig,
        loader: Arc<dyn CorpusLoader>,
        store: Arc<VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        classifier: Arc<dyn IntentClassifier>,
    ) -> Self {
        let corpus = CorpusCache::new(loader, Duration::from_millis(config.cache_ttl_ms));
        let rag = RagResponder::new(
            Arc::clone(&store),
            Arc::clone(&embedder),
            config.max_results,
            config.min_similarity,
        );

        Self {
            config,
            corpus,
            store,
            embedder,
            classifier,
            rag,
            analytics: Analytics::spawn(),
            stats: MatchStats::new(),
        }
    }

    /// Build the production engine from configuration: file or seed
    /// corpus, optionally persistent vector store, configured embedding
    /// provider, and no learned classifier.
    pub fn from_config(config: &Config) -> Result<Self> {
        let loader: Arc<dyn CorpusLoader> = match &config.corpus.path {
            Some(path) => Arc::new(FileCorpusLoader::new(path.clone())),
            None => Arc::new(SeedCorpusLoader),
        };

        let store = Arc::new(match &config.store.path {
            Some(path) => VectorStore::open(path.clone()),
            None => VectorStore::in_memory(),
        });

        let embedder: Arc<dyn EmbeddingProvider> = create_provider(&config.embedding)?.into();

        Ok(Self::new(
            config.engine.clone(),
            loader,
            store,
            embedder,
            Arc::new(DisabledClassifier),
        ))
    }

    /// Generate the single best reply for a message.
    ///
    /// The only error surfaced to callers is input validation; every
    /// internal stage failure is absorbed and the cascade falls through
    /// to the always-available default.
    pub async fn generate_response(
        &self,
        message: &str,
        ctx: &ChatContext,
        history: &[ChatMessage],
    ) -> Result<EngineReply, InputError> {
        validate_message(message, self.config.max_message_chars)?;

        let started = Instant::now();
        let mut best: Option<Candidate> = None;
        let mut documents_found = 0usize;
        let mut terminal = false;

        // Stage 1: retrieval-augmented responder.
        match self.rag.answer(message, ctx, history).await {
            Ok(answer) => {
                documents_found = answer.documents_found;
                let candidate = Candidate::new(answer.text, answer.confidence, Method::Retrieval);
                if candidate.confidence >= self.config.high_confidence_threshold {
                    terminal = true;
                }
                consider(&mut best, candidate);
            }
            Err(e) => warn!(stage = "retrieval", error = %e, "cascade stage failed, skipping"),
        }

        if !terminal {
            let corpus = self.corpus.load().await;

            // Stage 2: profile-aware rule engine.
            if let Some(candidate) = rules::rule_engine(message, ctx) {
                consider(&mut best, candidate);
            }

            // Stage 3: learned classifier.
            match self.classifier.classify(message).await {
                Ok(Some(prediction)) if prediction.confidence > 0.8 => {
                    if let Some(candidate) = self.render_classified(&corpus, &prediction.intent, prediction.confidence, message, ctx)
                    {
                        consider(&mut best, candidate);
                    }
                }
                Ok(_) => {}
                Err(e) => warn!(stage = "classifier", error = %e, "cascade stage failed, skipping"),
            }

            // Stage 4: lexical similarity matcher.
            if let Some(m) = matcher::best_match(&corpus, message, ctx) {
                self.stats
                    .record_match(&m.intent_id, &m.intent_name, m.confidence, &m.response_id);
                self.analytics.record(AnalyticsEvent::MatchRecorded {
                    session_id: ctx.session_id.clone(),
                    profile: ctx.profile.clone(),
                    normalized_input: crate::text::normalize(message),
                    intent_id: m.intent_id.clone(),
                    confidence: m.confidence,
                    response_prefix: m.response.chars().take(RESPONSE_PREFIX_CHARS).collect(),
                });

                if m.confidence > 0.7 {
                    consider(&mut best, Candidate::new(m.response, m.confidence, Method::Lexical));
                }
            }

            // Stage 5: always-available default.
            consider(&mut best, rules::default_response(message));
        }

        // A candidate always exists: stage 5 is infallible (and the
        // terminal path already holds one).
        let selected = best.unwrap_or_else(|| rules::default_response(message));
        debug!(method = selected.method.as_str(), confidence = selected.confidence, "response selected");

        self.record_preferences(message, ctx);

        Ok(EngineReply {
            text: selected.text,
            confidence: selected.confidence,
            method: selected.method,
            elapsed_ms: started.elapsed().as_millis() as u64,
            documents_found,
        })
    }

    /// Render the top-priority applicable response of a
    /// classifier-predicted intent, if the intent exists and is usable.
    fn render_classified(
        &self,
        corpus: &Corpus,
        intent_id: &str,
        confidence: f64,
        message: &str,
        ctx: &ChatContext,
    ) -> Option<Candidate> {
        let intent = corpus.find_intent(intent_id)?;
        if !intent.active || intent.responses.is_empty() {
            return None;
        }
        let response = matcher::select_response(intent, ctx)?;
        Some(Candidate::new(
            matcher::render_template(&response.text, message, ctx),
            confidence,
            Method::Learned,
        ))
    }

    /// Fire-and-forget preference signals inferred from the message.
    fn record_preferences(&self, message: &str, ctx: &ChatContext) {
        for (signal, value) in infer_preferences(message) {
            self.analytics.record(AnalyticsEvent::PreferenceSignal {
                session_id: ctx.session_id.clone(),
                signal,
                value,
            });
        }
    }

    // ============ Management surface ============

    /// Force an immediate corpus reload, resetting the TTL timer.
    pub async fn refresh_corpus_cache(&self) -> Result<Arc<Corpus>> {
        self.corpus.refresh().await
    }

    /// Top 10 intents by match count.
    pub fn match_statistics(&self) -> Vec<IntentMatchStats> {
        self.stats.top(10)
    }

    /// Ingest documents into the knowledge base.
    ///
    /// Documents arriving without embeddings are embedded with the
    /// configured provider; when embeddings are disabled such documents
    /// are rejected. Returns the number of documents stored.
    pub async fn ingest(&self, mut docs: Vec<Document>) -> Result<usize> {
        let pending: Vec<usize> = docs
            .iter()
            .enumerate()
            .filter(|(_, d)| d.embedding.is_empty())
            .map(|(i, _)| i)
            .collect();

        if !pending.is_empty() {
            if !self.embedder.is_enabled() {
                anyhow::bail!(
                    "{} document(s) have no embedding and no embedding provider is configured",
                    pending.len()
                );
            }
            let texts: Vec<String> = pending.iter().map(|&i| docs[i].text.clone()).collect();
            let vectors = self.embedder.embed(&texts).await?;
            for (&i, vector) in pending.iter().zip(vectors) {
                docs[i].embedding = vector;
            }
        }

        let count = docs.len();
        self.store.add_batch(docs).await?;
        Ok(count)
    }

    /// Empty the knowledge base and its durable snapshot.
    pub async fn clear_knowledge_base(&self) -> Result<()> {
        self.store.clear().await
    }

    pub fn store_stats(&self) -> StoreStats {
        self.store.stats()
    }

    /// Recent analytics events (for inspection and tests).
    pub fn analytics_tail(&self) -> Vec<AnalyticsEvent> {
        self.analytics.tail()
    }
}

/// Keep the strictly better candidate; ties favor the earlier stage.
fn consider(best: &mut Option<Candidate>, candidate: Candidate) {
    match best {
        Some(current) if candidate.confidence <= current.confidence => {}
        _ => *best = Some(candidate),
    }
}
