//! Splits a transcript into token-bounded chunks on sentence boundaries.
//!
//! The stored transcript is hard-wrapped, so embedded line breaks are
//! normalized to spaces before splitting (deleting them outright would glue
//! the last word of one line to the first word of the next). Sentences are
//! accumulated until the running token count exceeds the threshold; the
//! buffer is then emitted as one chunk. A trailing partial buffer becomes
//! the final chunk.

use tracing::debug;

use super::tokens::TokenEstimator;

/// One token-bounded span of the transcript, used only as a request
/// payload and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptChunk {
    pub text: String,
    pub token_count: usize,
}

/// Partition `transcript` into ordered chunks along sentence boundaries.
/// Every chunk except possibly the last exceeds `token_threshold`.
pub fn split_into_chunks(
    transcript: &str,
    token_threshold: usize,
    estimator: &TokenEstimator,
) -> Vec<TranscriptChunk> {
    let unwrapped = transcript.replace('\n', " ");
    let sentences: Vec<&str> = unwrapped.split('.').collect();

    let mut chunks = Vec::new();
    let mut buffer = String::new();
    let mut token_count = 0;

    for sentence in &sentences {
        token_count += estimator.count(sentence);
        buffer.push_str(sentence);
        buffer.push('.');

        if token_count > token_threshold {
            chunks.push(TranscriptChunk {
                text: std::mem::take(&mut buffer),
                token_count,
            });
            token_count = 0;
        }
    }

    if !buffer.is_empty() {
        chunks.push(TranscriptChunk {
            text: buffer,
            token_count,
        });
    }

    debug!("Chunks: {} ({} sentences)", chunks.len(), sentences.len());
    chunks
}
