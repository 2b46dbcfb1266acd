//! Intent corpus loading and TTL caching.
//!
//! The corpus is the denormalized Intent → Examples → Responses tree
//! the lexical matcher scores against. Reads always go through
//! [`CorpusCache`], which memoizes a full snapshot for a fixed
//! time-to-live and swaps it atomically on reload — readers never see a
//! partially updated tree.
//!
//! Loaders are pluggable via [`CorpusLoader`]: production deployments
//! point at a curated JSON file, tests inject in-memory corpora, and a
//! built-in seed corpus keeps the engine answering when no file is
//! configured.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::models::{Example, Intent, ResponseTemplate};
use crate::text::extract_keywords;

/// A full corpus snapshot: every intent with its examples and responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Corpus {
    pub intents: Vec<Intent>,
}

impl Corpus {
    /// Intents eligible for matching: active, with at least one example
    /// and one response.
    pub fn eligible_intents(&self) -> impl Iterator<Item = &Intent> {
        self.intents
            .iter()
            .filter(|i| i.active && !i.examples.is_empty() && !i.responses.is_empty())
    }

    pub fn find_intent(&self, id_or_name: &str) -> Option<&Intent> {
        self.intents
            .iter()
            .find(|i| i.id == id_or_name || i.name == id_or_name)
    }

    /// Derive keywords for any example that was loaded without them.
    fn hydrate(&mut self) {
        for intent in &mut self.intents {
            for example in &mut intent.examples {
                if example.keywords.is_empty() {
                    example.keywords = extract_keywords(&example.text);
                }
                example.confidence_weight = example.confidence_weight.clamp(0.0, 1.0);
            }
        }
    }

    /// The built-in seed corpus used when no corpus file is configured.
    pub fn seed() -> Self {
        let intents = vec![
            Intent {
                id: "greeting".to_string(),
                name: "Greeting".to_string(),
                priority: 1,
                active: true,
                examples: vec![
                    Example::new("hello", 1.0),
                    Example::new("hi there", 0.9),
                    Example::new("good morning", 0.9),
                    Example::new("hey, how are you", 0.8),
                ],
                responses: vec![
                    ResponseTemplate::plain(
                        "greeting_default",
                        "Hello! I'm your nutrition assistant. Ask me about foods, meal plans, or your goals.",
                        0,
                    ),
                    ResponseTemplate::templated(
                        "greeting_plan",
                        "Welcome back! Your {{plan_type}} plan is active — what would you like to know today?",
                        1,
                    )
                    .with_condition("has_plan", "true"),
                ],
            },
            Intent {
                id: "weight_loss".to_string(),
                name: "Weight Loss".to_string(),
                priority: 2,
                active: true,
                examples: vec![
                    Example::new("how do I lose weight", 1.0),
                    Example::new("I want to reduce my body fat", 0.9),
                    Example::new("best way to burn calories", 0.8),
                    Example::new("help me slim down", 0.8),
                ],
                responses: vec![
                    ResponseTemplate::plain(
                        "weight_loss_general",
                        "Sustainable weight loss comes from a moderate calorie deficit: plenty of vegetables, lean protein at every meal, and regular activity.",
                        0,
                    ),
                    ResponseTemplate::plain(
                        "weight_loss_plan",
                        "Since you're on a weight-loss plan, focus on your daily deficit target and keep protein high to preserve muscle.",
                        1,
                    )
                    .with_condition("plan_type", "weight_loss"),
                ],
            },
            Intent {
                id: "nutrition_facts".to_string(),
                name: "Nutrition Facts".to_string(),
                priority: 1,
                active: true,
                examples: vec![
                    Example::new("tell me about protein", 1.0),
                    Example::new("what foods are high in fiber", 0.9),
                    Example::new("which vitamins do I need", 0.9),
                    Example::new("how many calories are in rice", 0.8),
                ],
                responses: vec![ResponseTemplate::templated(
                    "nutrition_facts_general",
                    "Good question about \"{{user_input}}\". Protein-rich options include eggs, fish, legumes, and dairy; fiber comes from whole grains, fruit, and vegetables.",
                    0,
                )],
            },
            Intent {
                id: "hydration".to_string(),
                name: "Hydration".to_string(),
                priority: 0,
                active: true,
                examples: vec![
                    Example::new("how much water should I drink", 1.0),
                    Example::new("am I drinking enough water", 0.9),
                ],
                responses: vec![ResponseTemplate::plain(
                    "hydration_general",
                    "Most adults do well with 2 to 3 liters of water a day, more on training days or in hot weather.",
                    0,
                )],
            },
        ];

        Self { intents }
    }
}

/// Produces a full [`Corpus`]. Implementations must return the entire
/// tree in one call — the cache swaps snapshots whole.
#[async_trait]
pub trait CorpusLoader: Send + Sync {
    async fn load(&self) -> Result<Corpus>;
}

/// Loads the corpus from a curated JSON file.
pub struct FileCorpusLoader {
    path: PathBuf,
}

impl FileCorpusLoader {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl CorpusLoader for FileCorpusLoader {
    async fn load(&self) -> Result<Corpus> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read corpus file: {}", self.path.display()))?;

        let mut corpus: Corpus =
            serde_json::from_str(&content).with_context(|| "Failed to parse corpus file")?;
        corpus.hydrate();
        Ok(corpus)
    }
}

/// Serves the built-in seed corpus.
pub struct SeedCorpusLoader;

#[async_trait]
impl CorpusLoader for SeedCorpusLoader {
    async fn load(&self) -> Result<Corpus> {
        Ok(Corpus::seed())
    }
}

struct CachedSnapshot {
    corpus: Arc<Corpus>,
    loaded_at: Instant,
}

/// TTL-memoized corpus cache with atomic snapshot swap.
pub struct CorpusCache {
    loader: Arc<dyn CorpusLoader>,
    ttl: Duration,
    current: RwLock<Option<CachedSnapshot>>,
}

impl CorpusCache {
    pub fn new(loader: Arc<dyn CorpusLoader>, ttl: Duration) -> Self {
        Self {
            loader,
            ttl,
            current: RwLock::new(None),
        }
    }

    /// Return the current snapshot, reloading when the TTL has expired.
    ///
    /// A reload failure is logged and the last good snapshot keeps
    /// serving; if no snapshot was ever loaded an empty corpus is
    /// returned (the cascade then relies on its other generators).
    pub async fn load(&self) -> Arc<Corpus> {
        {
            let guard = self.current.read().unwrap();
            if let Some(snapshot) = guard.as_ref() {
                if snapshot.loaded_at.elapsed() < self.ttl {
                    return Arc::clone(&snapshot.corpus);
                }
            }
        }

        match self.reload().await {
            Ok(corpus) => corpus,
            Err(e) => {
                warn!(error = %e, "corpus reload failed, serving last good snapshot");
                let guard = self.current.read().unwrap();
                guard
                    .as_ref()
                    .map(|s| Arc::clone(&s.corpus))
                    .unwrap_or_default()
            }
        }
    }

    /// Force an immediate reload, resetting the TTL timer.
    ///
    /// Unlike [`load`](Self::load), a failure here propagates so
    /// management callers can see it; the cached snapshot is left
    /// untouched in that case.
    pub async fn refresh(&self) -> Result<Arc<Corpus>> {
        self.reload().await
    }

    async fn reload(&self) -> Result<Arc<Corpus>> {
        let corpus = Arc::new(self.loader.load().await?);
        info!(intents = corpus.intents.len(), "corpus snapshot loaded");

        let mut guard = self.current.write().unwrap();
        *guard = Some(CachedSnapshot {
            corpus: Arc::clone(&corpus),
            loaded_at: Instant::now(),
        });
        Ok(corpus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLoader {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CorpusLoader for CountingLoader {
        async fn load(&self) -> Result<Corpus> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Corpus::seed())
        }
    }

    struct FailingLoader;

    #[async_trait]
    impl CorpusLoader for FailingLoader {
        async fn load(&self) -> Result<Corpus> {
            anyhow::bail!("corpus backend unavailable")
        }
    }

    #[tokio::test]
    async fn test_load_is_memoized_within_ttl() {
        let loader = Arc::new(CountingLoader {
            calls: AtomicUsize::new(0),
        });
        let cache = CorpusCache::new(loader.clone(), Duration::from_secs(60));

        let first = cache.load().await;
        let second = cache.load().await;
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_refresh_is_idempotent_without_data_change() {
        let loader = Arc::new(CountingLoader {
            calls: AtomicUsize::new(0),
        });
        let cache = CorpusCache::new(loader, Duration::from_secs(60));

        let a = cache.refresh().await.unwrap();
        let b = cache.refresh().await.unwrap();
        assert_eq!(*a, *b);
    }

    #[tokio::test]
    async fn test_load_failure_serves_empty_corpus_initially() {
        let cache = CorpusCache::new(Arc::new(FailingLoader), Duration::from_secs(60));
        let corpus = cache.load().await;
        assert!(corpus.intents.is_empty());
    }

    #[tokio::test]
    async fn test_seed_corpus_is_eligible() {
        let corpus = Corpus::seed();
        assert!(corpus.eligible_intents().count() >= 3);
        assert!(corpus.find_intent("nutrition_facts").is_some());
    }

    #[tokio::test]
    async fn test_file_loader_hydrates_keywords() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("corpus.json");
        std::fs::write(
            &path,
            r#"{"intents":[{"id":"t","name":"T","examples":[{"text":"tell me about protein"}],"responses":[{"id":"r","text":"ok"}]}]}"#,
        )
        .unwrap();

        let corpus = FileCorpusLoader::new(path).load().await.unwrap();
        assert!(corpus.intents[0].examples[0]
            .keywords
            .iter()
            .any(|k| k == "protein"));
    }
}
