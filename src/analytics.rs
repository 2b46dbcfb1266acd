//! Fire-and-forget analytics and preference learning.
//!
//! Match records and inferred preference signals are handed to a
//! background worker over a bounded channel. A full channel drops the
//! event with a debug log; worker problems are logged and never block
//! or fail the request path. The worker keeps a short in-memory tail of
//! recent events for inspection and tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

/// How many recent events the worker retains.
const TAIL_CAPACITY: usize = 256;

/// An event recorded off the request path.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalyticsEvent {
    /// A lexical match succeeded.
    MatchRecorded {
        session_id: String,
        /// Caller profile at match time (plan, goal, preferences).
        profile: HashMap<String, String>,
        normalized_input: String,
        intent_id: String,
        confidence: f64,
        /// First characters of the rendered response.
        response_prefix: String,
    },
    /// A lightweight preference signal inferred from the message.
    PreferenceSignal {
        session_id: String,
        signal: String,
        value: String,
    },
}

/// Handle for submitting events; cheap to clone.
#[derive(Clone)]
pub struct Analytics {
    tx: mpsc::Sender<AnalyticsEvent>,
    tail: Arc<RwLock<VecDeque<AnalyticsEvent>>>,
}

impl Analytics {
    /// Spawn the background worker. Must be called within a tokio
    /// runtime.
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::channel::<AnalyticsEvent>(512);
        let tail: Arc<RwLock<VecDeque<AnalyticsEvent>>> =
            Arc::new(RwLock::new(VecDeque::with_capacity(TAIL_CAPACITY)));

        let worker_tail = Arc::clone(&tail);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                debug!(?event, "analytics event");
                let mut tail = worker_tail.write().unwrap();
                if tail.len() == TAIL_CAPACITY {
                    tail.pop_front();
                }
                tail.push_back(event);
            }
        });

        Self { tx, tail }
    }

    /// Submit an event without waiting. Dropped (with a debug log) when
    /// the channel is full or the worker is gone.
    pub fn record(&self, event: AnalyticsEvent) {
        if let Err(e) = self.tx.try_send(event) {
            debug!(error = %e, "analytics event dropped");
        }
    }

    /// Recent events, oldest first.
    pub fn tail(&self) -> Vec<AnalyticsEvent> {
        self.tail.read().unwrap().iter().cloned().collect()
    }
}

/// Infer lightweight preference signals from simple keyword triggers.
///
/// Returns `(signal, value)` pairs: dietary interest (vegan,
/// vegetarian, keto, paleo), macro focus (protein, carbs, fat), and
/// goal focus (lose, gain, maintain).
pub fn infer_preferences(message: &str) -> Vec<(String, String)> {
    let normalized = crate::text::normalize(message);
    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    let mut signals = Vec::new();

    for diet in ["vegan", "vegetarian", "keto", "paleo", "pescatarian"] {
        if tokens.contains(&diet) {
            signals.push(("dietary_interest".to_string(), diet.to_string()));
        }
    }

    for (trigger, value) in [
        ("protein", "protein"),
        ("carbs", "carbs"),
        ("carbohydrates", "carbs"),
        ("fat", "fat"),
        ("fats", "fat"),
        ("fiber", "fiber"),
    ] {
        if tokens.contains(&trigger) {
            signals.push(("macro_focus".to_string(), value.to_string()));
        }
    }

    for (trigger, value) in [
        ("lose", "lose_weight"),
        ("losing", "lose_weight"),
        ("gain", "gain_weight"),
        ("bulk", "gain_weight"),
        ("maintain", "maintain_weight"),
    ] {
        if tokens.contains(&trigger) {
            signals.push(("goal_focus".to_string(), value.to_string()));
            break;
        }
    }

    signals
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_reach_tail() {
        let analytics = Analytics::spawn();
        analytics.record(AnalyticsEvent::PreferenceSignal {
            session_id: "s1".to_string(),
            signal: "macro_focus".to_string(),
            value: "protein".to_string(),
        });

        // Give the worker a moment to drain the channel.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let tail = analytics.tail();
        assert_eq!(tail.len(), 1);
    }

    #[test]
    fn test_infer_preferences_keyword_triggers() {
        let signals = infer_preferences("I'm vegan and want to lose fat");
        assert!(signals.contains(&("dietary_interest".to_string(), "vegan".to_string())));
        assert!(signals.contains(&("macro_focus".to_string(), "fat".to_string())));
        assert!(signals.contains(&("goal_focus".to_string(), "lose_weight".to_string())));
    }

    #[test]
    fn test_infer_preferences_empty_for_neutral_text() {
        assert!(infer_preferences("hello there").is_empty());
    }
}
