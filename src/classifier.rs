//! Learned intent classifier seam.
//!
//! The classifier is an external collaborator that maps a message to an
//! intent id with a confidence. The cascade only trusts predictions
//! above 0.8 and only when the predicted intent has at least one
//! response. [`DisabledClassifier`] is the default when no model is
//! wired in.

use anyhow::Result;
use async_trait::async_trait;

/// A classifier prediction.
#[derive(Debug, Clone)]
pub struct Prediction {
    /// Intent id or name as known to the corpus.
    pub intent: String,
    pub confidence: f64,
}

/// Pluggable learned classifier.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Classify a message. `Ok(None)` means "no prediction", which is a
    /// normal outcome; `Err` is treated by the cascade as a skipped
    /// stage.
    async fn classify(&self, message: &str) -> Result<Option<Prediction>>;
}

/// Default classifier that never predicts.
pub struct DisabledClassifier;

#[async_trait]
impl IntentClassifier for DisabledClassifier {
    async fn classify(&self, _message: &str) -> Result<Option<Prediction>> {
        Ok(None)
    }
}
