//! Hybrid lexical similarity scoring.
//!
//! Scores a user utterance against a curated example utterance with a
//! layered metric:
//!
//! 1. Identical normalized texts → `1.0`.
//! 2. One normalized text contained in the other → `0.9`.
//! 3. Otherwise a weighted sum, capped at `1.0`:
//!    `0.6 × keyword + 0.3 × edit-distance + 0.1 × semantic boost`.
//!
//! The semantic boost rewards pairs that share terms from the same
//! nutrition-domain group (weight loss, weight gain, macros, fitness,
//! general health, BMI) even when the exact words differ.

use crate::text::{extract_keywords, normalize};

/// Fixed nutrition-domain term groups for the semantic boost.
const TERM_GROUPS: &[&[&str]] = &[
    // Weight loss
    &[
        "lose", "losing", "loss", "reduce", "slim", "deficit", "burn", "cutting",
    ],
    // Weight gain
    &["gain", "gaining", "bulk", "mass", "surplus", "increase"],
    // Nutrition / macros
    &[
        "protein", "carbs", "carbohydrate", "carbohydrates", "fat", "fats", "fiber", "vitamin",
        "vitamins", "mineral", "calorie", "calories", "nutrient", "nutrients", "macro", "macros",
    ],
    // Fitness
    &[
        "workout", "workouts", "exercise", "gym", "training", "cardio", "strength",
    ],
    // General health
    &[
        "health", "healthy", "wellness", "immunity", "energy", "sleep",
    ],
    // BMI / body composition
    &["bmi", "body", "index", "overweight", "underweight", "obese"],
];

/// Standard dynamic-programming Levenshtein distance with unit
/// insertion, deletion, and substitution costs. Operates on chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Edit-distance similarity: `1 − d / max(len)`, `1.0` for two empty
/// strings.
pub fn edit_distance_similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

/// Keyword-set similarity over extracted keywords.
///
/// `(exact matches + 0.5 × partial matches) / max(|A|, |B|)`, plus a
/// bonus of `run × 0.1` for the longest common contiguous token run
/// when that run is longer than one token. Clamped to `[0, 1]`.
pub fn keyword_similarity(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let mut exact = 0usize;
    let mut partial = 0usize;
    for ka in a {
        if b.iter().any(|kb| kb == ka) {
            exact += 1;
        } else if b.iter().any(|kb| kb.contains(ka.as_str()) || ka.contains(kb.as_str())) {
            partial += 1;
        }
    }

    let base = (exact as f64 + 0.5 * partial as f64) / a.len().max(b.len()) as f64;

    let run = longest_common_run(a, b);
    let bonus = if run > 1 { run as f64 * 0.1 } else { 0.0 };

    (base + bonus).clamp(0.0, 1.0)
}

/// Length of the longest common contiguous subsequence of tokens.
fn longest_common_run(a: &[String], b: &[String]) -> usize {
    let mut best = 0usize;
    for i in 0..a.len() {
        for j in 0..b.len() {
            let mut len = 0;
            while i + len < a.len() && j + len < b.len() && a[i + len] == b[j + len] {
                len += 1;
            }
            best = best.max(len);
        }
    }
    best
}

/// Domain-group semantic boost over normalized texts.
///
/// For each term group with hits on both sides, the group contributes
/// `min(hits_a, hits_b) / max(hits_a, hits_b) × 0.2`; the maximum over
/// all groups is returned, so the result lies in `[0, 0.2]`.
pub fn semantic_boost(a_normalized: &str, b_normalized: &str) -> f64 {
    let a_tokens: Vec<&str> = a_normalized.split_whitespace().collect();
    let b_tokens: Vec<&str> = b_normalized.split_whitespace().collect();

    let mut best = 0.0f64;
    for group in TERM_GROUPS {
        let hits_a = a_tokens.iter().filter(|t| group.contains(t)).count();
        let hits_b = b_tokens.iter().filter(|t| group.contains(t)).count();
        if hits_a > 0 && hits_b > 0 {
            let ratio = hits_a.min(hits_b) as f64 / hits_a.max(hits_b) as f64;
            best = best.max(ratio * 0.2);
        }
    }
    best
}

/// Score a user utterance against an example utterance. Result is
/// always in `[0, 1]`.
pub fn score(user_text: &str, example_text: &str) -> f64 {
    let a = normalize(user_text);
    let b = normalize(example_text);

    if a == b {
        return 1.0;
    }
    if !a.is_empty() && !b.is_empty() && (a.contains(&b) || b.contains(&a)) {
        return 0.9;
    }

    let kw = keyword_similarity(&extract_keywords(user_text), &extract_keywords(example_text));
    let edit = edit_distance_similarity(&a, &b);
    let boost = semantic_boost(&a, &b);

    (0.6 * kw + 0.3 * edit + 0.1 * boost).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_basics() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("abc", "abc"), 0);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("flaw", "lawn"), 2);
    }

    #[test]
    fn test_edit_similarity_identity() {
        assert_eq!(edit_distance_similarity("protein shake", "protein shake"), 1.0);
        assert_eq!(edit_distance_similarity("", ""), 1.0);
    }

    #[test]
    fn test_identical_after_normalization_scores_one() {
        assert_eq!(score("How do I lose weight?", "how do i LOSE weight"), 1.0);
    }

    #[test]
    fn test_substring_scores_point_nine() {
        assert_eq!(score("lose weight", "how can i lose weight fast"), 0.9);
    }

    #[test]
    fn test_unrelated_scores_low() {
        let s = score("hello there", "parliamentary procedures committee");
        assert!(s < 0.3, "unrelated texts scored {}", s);
    }

    #[test]
    fn test_shared_keywords_score_higher_than_unrelated() {
        let related = score("foods high in protein", "best protein rich meals");
        let unrelated = score("foods high in protein", "train ticket refund policy");
        assert!(related > unrelated);
    }

    #[test]
    fn test_score_always_in_unit_interval() {
        let pairs = [
            ("", ""),
            ("a", "completely different long sentence about nothing"),
            ("protein protein protein", "protein"),
            ("lose weight burn fat deficit", "losing weight burn burn deficit"),
        ];
        for (a, b) in pairs {
            let s = score(a, b);
            assert!((0.0..=1.0).contains(&s), "score({:?}, {:?}) = {}", a, b, s);
        }
    }

    #[test]
    fn test_keyword_similarity_rewards_common_run() {
        let a = extract_keywords("high protein breakfast ideas");
        let b = extract_keywords("high protein breakfast recipes");
        let c = extract_keywords("breakfast protein high recipes");
        assert!(keyword_similarity(&a, &b) > keyword_similarity(&a, &c));
    }

    #[test]
    fn test_semantic_boost_bounded() {
        let boost = semantic_boost("lose fat burn deficit", "losing burn burn");
        assert!(boost > 0.0);
        assert!(boost <= 0.2);
        assert_eq!(semantic_boost("hello there", "general kenobi"), 0.0);
    }
}
