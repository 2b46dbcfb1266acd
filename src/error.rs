//! Input-error taxonomy.
//!
//! Only input validation failures are ever surfaced to callers; every
//! internal stage failure is absorbed by the cascade and logged. This
//! enum therefore covers exactly the caller-visible failure modes.

use thiserror::Error;

/// Patterns rejected before any cascade stage runs. Matching is done on
/// the lower-cased raw message.
const UNSAFE_PATTERNS: &[&str] = &["<script", "</script", "javascript:", "onerror=", "<iframe"];

/// A validation failure for an inbound message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("message must not be empty")]
    Empty,

    #[error("message is {len} characters, exceeding the {max} character limit")]
    TooLong { len: usize, max: usize },

    #[error("message contains a disallowed pattern: {pattern}")]
    UnsafeContent { pattern: String },
}

/// Validate an inbound message before the cascade runs.
pub fn validate_message(message: &str, max_chars: usize) -> Result<(), InputError> {
    if message.trim().is_empty() {
        return Err(InputError::Empty);
    }

    let len = message.chars().count();
    if len > max_chars {
        return Err(InputError::TooLong { len, max: max_chars });
    }

    let lowered = message.to_lowercase();
    for pattern in UNSAFE_PATTERNS {
        if lowered.contains(pattern) {
            return Err(InputError::UnsafeContent {
                pattern: (*pattern).to_string(),
            });
        }
    }

    Ok(())
}
