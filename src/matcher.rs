//! Lexical intent matching over a corpus snapshot.
//!
//! For each eligible intent the matcher takes the best
//! `similarity × example.confidence_weight` across its examples, adds a
//! priority boost of `priority × 0.05`, and accepts the intent only if
//! the boosted score clears an adaptive threshold
//! `max(0.3 − priority × 0.02, 0.15)` and beats the best seen so far.
//! Among the winning intent's responses whose conditions hold against
//! the caller context, the highest-priority one is rendered.
//!
//! Matching is pure: the usage-counter and analytics side effects the
//! cascade performs on a successful match live in
//! [`crate::cascade`].

use chrono::Utc;

use crate::corpus::Corpus;
use crate::models::{ChatContext, Intent, ResponseTemplate};
use crate::similarity::score;

/// A successful lexical match, ready for the cascade to consider.
#[derive(Debug, Clone)]
pub struct LexicalMatch {
    pub intent_id: String,
    pub intent_name: String,
    pub response_id: String,
    pub response: String,
    /// Boosted score, clamped to `[0, 1]`.
    pub confidence: f64,
}

/// Adaptive acceptance threshold for an intent: higher-priority intents
/// are accepted on weaker evidence, floored at 0.15.
fn acceptance_threshold(priority: i32) -> f64 {
    (0.3 - priority as f64 * 0.02).max(0.15)
}

/// Find the best-matching intent for a message, or `None` when nothing
/// clears its threshold ("no match" is a normal outcome, not an error).
pub fn best_match(corpus: &Corpus, message: &str, ctx: &ChatContext) -> Option<LexicalMatch> {
    let mut best: Option<(f64, &Intent, &ResponseTemplate)> = None;

    for intent in corpus.eligible_intents() {
        let raw = intent
            .examples
            .iter()
            .map(|ex| score(message, &ex.text) * ex.confidence_weight)
            .fold(0.0f64, f64::max);

        let boosted = (raw + intent.priority as f64 * 0.05).clamp(0.0, 1.0);

        if boosted <= acceptance_threshold(intent.priority) {
            continue;
        }
        if let Some((current_best, _, _)) = best {
            if boosted <= current_best {
                continue;
            }
        }

        // Highest-priority response whose conditions all hold.
        let Some(response) = select_response(intent, ctx) else {
            continue;
        };

        best = Some((boosted, intent, response));
    }

    best.map(|(confidence, intent, response)| LexicalMatch {
        intent_id: intent.id.clone(),
        intent_name: intent.name.clone(),
        response_id: response.id.clone(),
        response: render_template(&response.text, message, ctx),
        confidence,
    })
}

/// Pick the highest-priority response applicable under the caller
/// context. Returns `None` when no response's conditions hold.
pub fn select_response<'a>(intent: &'a Intent, ctx: &ChatContext) -> Option<&'a ResponseTemplate> {
    intent
        .responses
        .iter()
        .filter(|r| r.applies_to(&ctx.profile))
        .max_by_key(|r| r.priority)
}

/// Substitute `{{key}}` placeholders from the caller profile plus the
/// built-ins `{{user_input}}` and `{{timestamp}}`. Unknown placeholders
/// are left in place.
pub fn render_template(template: &str, message: &str, ctx: &ChatContext) -> String {
    let mut rendered = template.replace("{{user_input}}", message.trim());
    rendered = rendered.replace(
        "{{timestamp}}",
        &Utc::now().format("%Y-%m-%d %H:%M UTC").to_string(),
    );

    for (key, value) in &ctx.profile {
        rendered = rendered.replace(&format!("{{{{{}}}}}", key), value);
    }

    rendered
}
