//! Two-phase summarization of a transcript.
//!
//! Phase 1 summarizes each token-bounded transcript chunk and joins the
//! partial summaries into the full summary. Phase 2 condenses the full
//! summary into a fixed number of sentences. Both artifacts resume from
//! disk: an existing summary file is loaded instead of regenerated, so a
//! restarted run repeats no generation calls for work already done.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::artifacts::{write_atomic, ArtifactPaths};
use crate::error::Result;
use crate::summarize::{split_into_chunks, Message, TextGenerator, TokenEstimator};

const SYSTEM_PROMPT: &str = "You are an AI assistant that summarizes transcripts";

/// Result of summarizing one transcript.
#[derive(Debug)]
pub struct SummaryOutcome {
    pub full_path: PathBuf,
    pub brief_path: PathBuf,
    pub full_summary: String,
    pub brief_summary: String,
    /// Transcript chunks phase 1 operated on (0 when the full summary was
    /// resumed from disk).
    pub chunk_count: usize,
    /// Token usage reported by the backend across both phases.
    pub tokens_used: u64,
    /// Estimated cost in USD; reported, never persisted.
    pub cost: f64,
}

pub struct SummaryDriver {
    generator: Arc<dyn TextGenerator>,
    estimator: TokenEstimator,
    token_threshold: usize,
    brief_sentences: usize,
    price_per_1k_tokens: f64,
}

impl SummaryDriver {
    pub fn new(
        generator: Box<dyn TextGenerator>,
        estimator: TokenEstimator,
        token_threshold: usize,
        brief_sentences: usize,
        price_per_1k_tokens: f64,
    ) -> Self {
        Self {
            generator: Arc::from(generator),
            estimator,
            token_threshold,
            brief_sentences,
            price_per_1k_tokens,
        }
    }

    pub async fn summarize(
        &self,
        paths: &ArtifactPaths,
        transcript: &str,
    ) -> Result<SummaryOutcome> {
        let engine = self.generator.engine().to_string();
        let full_path = paths.full_summary(&engine);
        let brief_path = paths.brief_summary(&engine);

        info!(
            "Summarizing with {} ({} transcript characters)",
            self.generator.name(),
            transcript.len()
        );

        let mut tokens_used = 0u64;

        // Phase 1: per-chunk partial summaries joined into the full summary.
        let (full_summary, chunk_count) = if full_path.exists() {
            info!("Full summary already exists, loading");
            (std::fs::read_to_string(&full_path)?, 0)
        } else {
            let chunks = split_into_chunks(transcript, self.token_threshold, &self.estimator);
            info!("Transcript chunks: {}", chunks.len());

            let mut summaries = Vec::with_capacity(chunks.len());
            for chunk in &chunks {
                let messages = [
                    Message::system(SYSTEM_PROMPT),
                    Message::user(format!(
                        "Summarize partial transcript into sentences:\n\n{}\n\nSummary:",
                        chunk.text
                    )),
                ];
                let completion = self.generator.generate(&messages).await?;
                debug!("Chunk summary used {} tokens", completion.total_tokens);
                tokens_used += completion.total_tokens;
                summaries.push(completion.text);
            }

            let full = summaries.join("\n\n");
            write_atomic(&full_path, &full)?;
            info!("Full summary saved to {}", full_path.display());
            (full, chunks.len())
        };

        // Phase 2: condense the full summary.
        let brief_summary = if brief_path.exists() {
            info!("Brief summary already exists, loading");
            std::fs::read_to_string(&brief_path)?
        } else {
            let messages = [
                Message::system(SYSTEM_PROMPT),
                Message::user(format!(
                    "Instructions:\nSummarize the following text into a list of {} sentences\n\
                     Contextualize the topics to the transcript\n\
                     Don't mention the transcript itself in the summary.\n\n\
                     Text: {}\n\nSummary:",
                    self.brief_sentences, full_summary
                )),
            ];
            let completion = self.generator.generate(&messages).await?;
            tokens_used += completion.total_tokens;

            write_atomic(&brief_path, &completion.text)?;
            info!(
                "Brief {} sentence summary saved to {}",
                self.brief_sentences,
                brief_path.display()
            );
            completion.text
        };

        let cost = tokens_used as f64 / 1000.0 * self.price_per_1k_tokens;
        info!("Chat cost: ${:.2} ({} tokens)", cost, tokens_used);

        Ok(SummaryOutcome {
            full_path,
            brief_path,
            full_summary,
            brief_summary,
            chunk_count,
            tokens_used,
            cost,
        })
    }
}
