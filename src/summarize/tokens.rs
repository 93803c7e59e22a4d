//! Token counting for chunk-boundary decisions.
//!
//! Uses the GPT-2 (`r50k_base`) byte-pair encoding, matching what the
//! summarization models are priced against. Counts are only used to decide
//! where transcript chunks end, never sent to the API.

use crate::error::{Result, ScribeError};
use tiktoken_rs::CoreBPE;

pub struct TokenEstimator {
    bpe: CoreBPE,
}

impl TokenEstimator {
    pub fn new() -> Result<Self> {
        let bpe = tiktoken_rs::r50k_base()
            .map_err(|e| ScribeError::Config(format!("Failed to load tokenizer: {e}")))?;
        Ok(Self { bpe })
    }

    /// Number of tokens in `text`.
    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_is_zero_tokens() {
        let estimator = TokenEstimator::new().unwrap();
        assert_eq!(estimator.count(""), 0);
    }

    #[test]
    fn test_count_is_positive_for_text() {
        let estimator = TokenEstimator::new().unwrap();
        assert!(estimator.count("Hello, world") > 0);
    }

    #[test]
    fn test_longer_text_has_more_tokens() {
        let estimator = TokenEstimator::new().unwrap();
        let short = estimator.count("one sentence");
        let long = estimator.count(&"one sentence ".repeat(50));
        assert!(long > short);
    }

    #[test]
    fn test_count_roughly_tracks_words() {
        let estimator = TokenEstimator::new().unwrap();
        let text = "the quick brown fox jumps over the lazy dog";
        let count = estimator.count(text);
        // Common English words encode near one token each.
        assert!(count >= 9 && count <= 12, "unexpected count {count}");
    }
}
