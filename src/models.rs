//! Core data models used throughout the response engine.
//!
//! These types represent the curated conversational corpus (intents,
//! examples, responses), the retrievable knowledge documents, and the
//! request/reply values that flow through the cascade.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A named conversational category, owning its example utterances and
/// candidate responses.
///
/// Intents are curated externally and loaded as part of a corpus
/// snapshot. A deactivated intent stays in the corpus but is never
/// eligible for matching; so is an intent with zero examples or zero
/// responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    /// Stable identifier (e.g. `"nutrition_facts"`).
    pub id: String,
    /// Human-readable name shown in statistics.
    pub name: String,
    /// Higher priority intents win ties and get a score boost.
    #[serde(default)]
    pub priority: i32,
    /// Deactivated intents are kept for reference but never matched.
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub examples: Vec<Example>,
    #[serde(default)]
    pub responses: Vec<ResponseTemplate>,
}

fn default_true() -> bool {
    true
}

/// A labeled sample utterance belonging to one [`Intent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    /// The raw utterance text as curated.
    pub text: String,
    /// Keywords derived from `text`; filled on load if absent.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Weight in `[0, 1]` multiplied into the similarity score.
    #[serde(default = "default_weight")]
    pub confidence_weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl Example {
    /// Create an example with keywords derived from the text.
    pub fn new(text: impl Into<String>, confidence_weight: f64) -> Self {
        let text = text.into();
        let keywords = crate::text::extract_keywords(&text);
        Self {
            text,
            keywords,
            confidence_weight: confidence_weight.clamp(0.0, 1.0),
        }
    }
}

/// Whether a response body is literal text or contains placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    Plain,
    Templated,
}

/// A candidate reply belonging to one [`Intent`].
///
/// Templated responses may contain `{{key}}` placeholders resolved from
/// the caller context, plus the built-ins `{{user_input}}` and
/// `{{timestamp}}`. A response is only selectable when every entry in
/// `conditions` matches the caller-supplied context exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseTemplate {
    /// Stable identifier used for usage counters.
    pub id: String,
    pub text: String,
    #[serde(default = "default_kind")]
    pub kind: ResponseKind,
    /// Among applicable responses the highest priority wins.
    #[serde(default)]
    pub priority: i32,
    /// Key → value equality predicates against the caller context.
    #[serde(default)]
    pub conditions: HashMap<String, String>,
}

fn default_kind() -> ResponseKind {
    ResponseKind::Plain
}

impl ResponseTemplate {
    pub fn plain(id: impl Into<String>, text: impl Into<String>, priority: i32) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            kind: ResponseKind::Plain,
            priority,
            conditions: HashMap::new(),
        }
    }

    pub fn templated(id: impl Into<String>, text: impl Into<String>, priority: i32) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            kind: ResponseKind::Templated,
            priority,
            conditions: HashMap::new(),
        }
    }

    pub fn with_condition(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.conditions.insert(key.into(), value.into());
        self
    }

    /// True when every condition matches the given context profile.
    pub fn applies_to(&self, profile: &HashMap<String, String>) -> bool {
        self.conditions
            .iter()
            .all(|(k, v)| profile.get(k) == Some(v))
    }
}

/// Descriptive metadata attached to a knowledge [`Document`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// Source credibility label (e.g. `"peer_reviewed"`, `"editorial"`).
    #[serde(default)]
    pub credibility: Option<String>,
}

/// A unit of retrievable knowledge with a precomputed embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: DocumentMetadata,
    /// May be absent in curated JSON; the engine embeds such documents
    /// at ingest when a provider is configured.
    #[serde(default)]
    pub embedding: Vec<f32>,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: DocumentMetadata::default(),
            embedding,
        }
    }
}

/// Caller-supplied context for one request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatContext {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub session_id: String,
    /// Profile fields (e.g. `plan_type`, `goal`) used for response
    /// conditions, template rendering, and rule personalization.
    #[serde(default)]
    pub profile: HashMap<String, String>,
}

impl ChatContext {
    pub fn for_session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Self::default()
        }
    }

    pub fn with_profile(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.profile.insert(key.into(), value.into());
        self
    }
}

/// One turn of conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `"user"` or `"assistant"`.
    pub role: String,
    pub text: String,
}

/// Which cascade stage produced the selected reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Retrieval,
    RuleEngine,
    Learned,
    Lexical,
    Default,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Retrieval => "retrieval",
            Method::RuleEngine => "rule_engine",
            Method::Learned => "learned",
            Method::Lexical => "lexical",
            Method::Default => "default",
        }
    }
}

/// An intermediate candidate produced by one cascade stage.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub text: String,
    /// Clamped to `[0, 1]` on construction.
    pub confidence: f64,
    pub method: Method,
}

impl Candidate {
    pub fn new(text: impl Into<String>, confidence: f64, method: Method) -> Self {
        Self {
            text: text.into(),
            confidence: confidence.clamp(0.0, 1.0),
            method,
        }
    }
}

/// The reply returned to callers of the engine.
#[derive(Debug, Clone, Serialize)]
pub struct EngineReply {
    pub text: String,
    pub confidence: f64,
    pub method: Method,
    pub elapsed_ms: u64,
    /// Number of knowledge documents the retrieval stage found,
    /// regardless of which stage won.
    pub documents_found: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_derives_keywords() {
        let ex = Example::new("What foods are high in protein?", 1.0);
        assert!(ex.keywords.iter().any(|k| k == "protein"));
        assert!(ex.keywords.iter().any(|k| k == "foods"));
    }

    #[test]
    fn test_confidence_weight_clamped() {
        let ex = Example::new("hello", 1.7);
        assert_eq!(ex.confidence_weight, 1.0);
    }

    #[test]
    fn test_conditions_match_exactly() {
        let resp = ResponseTemplate::plain("r1", "text", 0).with_condition("plan_type", "weight_loss");

        let mut profile = HashMap::new();
        assert!(!resp.applies_to(&profile));

        profile.insert("plan_type".to_string(), "maintenance".to_string());
        assert!(!resp.applies_to(&profile));

        profile.insert("plan_type".to_string(), "weight_loss".to_string());
        assert!(resp.applies_to(&profile));
    }

    #[test]
    fn test_document_parses_without_embedding_field() {
        let docs: Vec<Document> =
            serde_json::from_str(r#"[{"id":"d1","text":"Fiber aids digestion."}]"#).unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].embedding.is_empty());
        assert_eq!(docs[0].metadata, DocumentMetadata::default());
    }

    #[test]
    fn test_method_serializes_snake_case() {
        let json = serde_json::to_string(&Method::RuleEngine).unwrap();
        assert_eq!(json, "\"rule_engine\"");
    }
}
