//! Match statistics and response usage counters.
//!
//! Tracks per-intent match counts and average confidence, plus
//! per-response usage, for the `stats` management surface. Counters are
//! best-effort observability: they live in process memory and their
//! loss never affects response correctness.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::Serialize;

/// One row of the match-statistics report.
#[derive(Debug, Clone, Serialize)]
pub struct IntentMatchStats {
    pub intent_id: String,
    pub intent_name: String,
    pub match_count: u64,
    pub avg_confidence: f64,
}

#[derive(Default)]
struct IntentEntry {
    name: String,
    count: u64,
    confidence_sum: f64,
}

/// Process-wide match counters, keyed by intent and response id.
#[derive(Default)]
pub struct MatchStats {
    intents: RwLock<HashMap<String, IntentEntry>>,
    response_usage: RwLock<HashMap<String, u64>>,
}

impl MatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful lexical match and the response it used.
    pub fn record_match(
        &self,
        intent_id: &str,
        intent_name: &str,
        confidence: f64,
        response_id: &str,
    ) {
        {
            let mut intents = self.intents.write().unwrap();
            let entry = intents.entry(intent_id.to_string()).or_default();
            entry.name = intent_name.to_string();
            entry.count += 1;
            entry.confidence_sum += confidence;
        }

        let mut usage = self.response_usage.write().unwrap();
        *usage.entry(response_id.to_string()).or_insert(0) += 1;
    }

    /// Times a response has been served.
    pub fn response_usage(&self, response_id: &str) -> u64 {
        self.response_usage
            .read()
            .unwrap()
            .get(response_id)
            .copied()
            .unwrap_or(0)
    }

    /// Top `n` intents by match count (ties broken by name) with their
    /// average confidence.
    pub fn top(&self, n: usize) -> Vec<IntentMatchStats> {
        let intents = self.intents.read().unwrap();
        let mut rows: Vec<IntentMatchStats> = intents
            .iter()
            .map(|(id, entry)| IntentMatchStats {
                intent_id: id.clone(),
                intent_name: entry.name.clone(),
                match_count: entry.count,
                avg_confidence: if entry.count > 0 {
                    entry.confidence_sum / entry.count as f64
                } else {
                    0.0
                },
            })
            .collect();

        rows.sort_by(|a, b| {
            b.match_count
                .cmp(&a.match_count)
                .then_with(|| a.intent_name.cmp(&b.intent_name))
        });
        rows.truncate(n);
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_report() {
        let stats = MatchStats::new();
        stats.record_match("greeting", "Greeting", 0.8, "r1");
        stats.record_match("greeting", "Greeting", 0.6, "r1");
        stats.record_match("weight_loss", "Weight Loss", 0.9, "r2");

        let rows = stats.top(10);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].intent_id, "greeting");
        assert_eq!(rows[0].match_count, 2);
        assert!((rows[0].avg_confidence - 0.7).abs() < 1e-9);

        assert_eq!(stats.response_usage("r1"), 2);
        assert_eq!(stats.response_usage("r2"), 1);
        assert_eq!(stats.response_usage("unknown"), 0);
    }

    #[test]
    fn test_top_truncates() {
        let stats = MatchStats::new();
        for i in 0..15 {
            stats.record_match(&format!("i{}", i), &format!("Intent {}", i), 0.5, "r");
        }
        assert_eq!(stats.top(10).len(), 10);
    }
}
