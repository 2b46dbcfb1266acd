//! Rule-based candidate generators.
//!
//! Two deterministic generators bracket the cascade:
//!
//! - [`rule_engine`] — a profile-aware template matcher that
//!   personalizes wording from caller profile fields (enrolled plan,
//!   stored goal). Returns `None` when no rule fires.
//! - [`default_response`] — the always-available keyword-triggered
//!   fallback with fixed confidence 0.5, guaranteeing a non-empty
//!   answer when every other stage comes up short.

use crate::models::{Candidate, ChatContext, Method};
use crate::text::normalize;

fn contains_any(tokens: &[&str], triggers: &[&str]) -> bool {
    tokens.iter().any(|t| triggers.contains(t))
}

/// Profile-aware rule engine.
///
/// Inspects the caller's profile fields to produce a personalized
/// candidate. Confidence reflects how specific the fired rule is.
pub fn rule_engine(message: &str, ctx: &ChatContext) -> Option<Candidate> {
    let normalized = normalize(message);
    let tokens: Vec<&str> = normalized.split_whitespace().collect();

    let plan = ctx.profile.get("plan_type").map(String::as_str);
    let goal = ctx.profile.get("goal").map(String::as_str);

    // Greeting with a known plan: welcome the member back.
    if contains_any(&tokens, &["hello", "hi", "hey", "morning", "evening"]) {
        if let Some(plan) = plan {
            return Some(Candidate::new(
                format!(
                    "Welcome back! Your {} plan is active. Want to review today's meals or check your progress?",
                    plan.replace('_', " ")
                ),
                0.75,
                Method::RuleEngine,
            ));
        }
        return None;
    }

    // Questions about "my plan" need an enrolled plan to answer well.
    if normalized.contains("my plan") || normalized.contains("meal plan") {
        if let Some(plan) = plan {
            return Some(Candidate::new(
                format!(
                    "You're enrolled in the {} plan. Stick to the portion guides in each meal card, and swap any meal for another from the same category.",
                    plan.replace('_', " ")
                ),
                0.7,
                Method::RuleEngine,
            ));
        }
        return Some(Candidate::new(
            "You don't have an active meal plan yet. Tell me your goal and I can suggest a starting point.",
            0.6,
            Method::RuleEngine,
        ));
    }

    // Progress questions personalized by stored goal.
    if contains_any(&tokens, &["progress", "track", "tracking"]) {
        if let Some(goal) = goal {
            return Some(Candidate::new(
                format!(
                    "For your goal of {}, the best markers are weekly weigh-ins under the same conditions plus how your meals have felt. Consistency beats perfection.",
                    goal.replace('_', " ")
                ),
                0.7,
                Method::RuleEngine,
            ));
        }
        return None;
    }

    // Hydration is answerable without profile data.
    if contains_any(&tokens, &["water", "hydration", "hydrated", "drink"]) {
        return Some(Candidate::new(
            "Aim for 2 to 3 liters of water daily, more around training. Thirst and pale-yellow urine are reliable day-to-day checks.",
            0.6,
            Method::RuleEngine,
        ));
    }

    None
}

/// Deterministic keyword-triggered default with fixed confidence 0.5.
///
/// Always produces a non-empty answer.
pub fn default_response(message: &str) -> Candidate {
    let normalized = normalize(message);
    let tokens: Vec<&str> = normalized.split_whitespace().collect();

    let text = if contains_any(&tokens, &["hello", "hi", "hey", "greetings", "morning"]) {
        "Hello! I'm your nutrition assistant. Ask me about foods, meal planning, or your health goals."
    } else if contains_any(&tokens, &["lose", "losing", "deficit", "slim"]) {
        "For weight loss, a moderate calorie deficit with plenty of protein and vegetables works best. Would you like tips on building a deficit you can stick to?"
    } else if contains_any(&tokens, &["protein"]) {
        "Great protein sources include eggs, chicken, fish, Greek yogurt, lentils, and tofu. Most active adults do well around 1.6-2.2 g per kg of body weight."
    } else if contains_any(&tokens, &["calorie", "calories"]) {
        "Calorie needs vary with size, age, and activity. As a starting point, multiply your body weight in kg by 30-35 for maintenance."
    } else if contains_any(&tokens, &["bmi"]) {
        "BMI is weight in kilograms divided by height in meters squared. It's a rough screen, not a full picture — body composition matters too."
    } else {
        "I can help with nutrition questions, meal ideas, and health goals. Could you tell me a bit more about what you're looking for?"
    };

    Candidate::new(text, 0.5, Method::Default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting_without_profile_defers() {
        assert!(rule_engine("hello", &ChatContext::default()).is_none());
    }

    #[test]
    fn test_greeting_with_plan_personalizes() {
        let ctx = ChatContext::default().with_profile("plan_type", "weight_loss");
        let c = rule_engine("hello!", &ctx).unwrap();
        assert!(c.text.contains("weight loss"));
        assert!(c.confidence > 0.6);
    }

    #[test]
    fn test_plan_question_uses_enrollment() {
        let ctx = ChatContext::default().with_profile("plan_type", "muscle_gain");
        let c = rule_engine("what's in my plan?", &ctx).unwrap();
        assert!(c.text.contains("muscle gain"));
    }

    #[test]
    fn test_progress_needs_goal() {
        assert!(rule_engine("how is my progress", &ChatContext::default()).is_none());
        let ctx = ChatContext::default().with_profile("goal", "lose_weight");
        assert!(rule_engine("how is my progress", &ctx).is_some());
    }

    #[test]
    fn test_default_always_answers() {
        for message in ["hello", "how do I lose weight", "protein?", "zzzz qqq"] {
            let c = default_response(message);
            assert!(!c.text.is_empty());
            assert_eq!(c.confidence, 0.5);
            assert_eq!(c.method, Method::Default);
        }
    }

    #[test]
    fn test_default_greeting_contains_greeting() {
        let c = default_response("hello");
        assert!(c.text.to_lowercase().contains("hello"));
    }
}
