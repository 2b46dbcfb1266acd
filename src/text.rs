//! Text normalization and keyword extraction.
//!
//! These are the leaf primitives of the lexical pipeline: deterministic,
//! side-effect free, and total (empty input yields empty output). All
//! similarity scoring and corpus matching builds on the normalized form
//! produced here.

/// Tokens that carry no matching signal and are dropped during
/// keyword extraction. Length-2-or-shorter tokens are dropped anyway,
/// so only longer stop-words need listing.
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "can", "had", "her", "was", "one",
    "our", "out", "has", "him", "his", "how", "its", "may", "new", "now", "old", "see", "two",
    "way", "who", "did", "get", "let", "say", "she", "too", "use", "what", "when", "where",
    "which", "with", "this", "that", "them", "then", "than", "these", "those", "will", "would",
    "could", "should", "have", "been", "about", "into", "your", "some", "very", "just", "much",
    "more", "most", "from", "they", "there", "their",
];

/// Maximum number of keywords (unigrams plus bigrams) per text.
pub const MAX_KEYWORDS: usize = 20;

/// Lower-case, replace punctuation with single spaces, and collapse
/// whitespace. Never fails; empty input yields an empty string.
pub fn normalize(text: &str) -> String {
    let lowered: String = text
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();

    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract keyword unigrams and adjacent-token bigrams from a text.
///
/// Tokens of length `<= 2` and stop-words are discarded. Bigrams are
/// formed over the surviving unigram sequence. Unigrams come first,
/// bigrams follow, and the result is capped at [`MAX_KEYWORDS`].
pub fn extract_keywords(text: &str) -> Vec<String> {
    let normalized = normalize(text);

    let unigrams: Vec<String> = normalized
        .split_whitespace()
        .filter(|t| t.len() > 2 && !STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect();

    let mut keywords = unigrams.clone();
    for pair in unigrams.windows(2) {
        keywords.push(format!("{} {}", pair[0], pair[1]));
    }

    keywords.truncate(MAX_KEYWORDS);
    keywords
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lowercases_and_strips_punctuation() {
        assert_eq!(normalize("Hello, World!"), "hello world");
        assert_eq!(normalize("What's   UP??"), "what s up");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("  ...  "), "");
    }

    #[test]
    fn test_extract_drops_short_tokens_and_stop_words() {
        let kw = extract_keywords("What is the best food for me?");
        assert!(!kw.contains(&"the".to_string()));
        assert!(!kw.contains(&"is".to_string()));
        assert!(kw.contains(&"best".to_string()));
        assert!(kw.contains(&"food".to_string()));
    }

    #[test]
    fn test_extract_emits_bigrams_after_unigrams() {
        let kw = extract_keywords("high protein foods");
        assert_eq!(
            kw,
            vec![
                "high".to_string(),
                "protein".to_string(),
                "foods".to_string(),
                "high protein".to_string(),
                "protein foods".to_string(),
            ]
        );
    }

    #[test]
    fn test_extract_caps_at_max() {
        let long: String = (0..40).map(|i| format!("token{} ", i)).collect();
        let kw = extract_keywords(&long);
        assert_eq!(kw.len(), MAX_KEYWORDS);
        // The cap keeps unigrams first.
        assert_eq!(kw[0], "token0");
    }

    #[test]
    fn test_extract_empty() {
        assert!(extract_keywords("").is_empty());
        assert!(extract_keywords("a an of").is_empty());
    }
}
