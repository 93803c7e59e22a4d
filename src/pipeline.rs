//! One-file orchestration: transcription followed by summarization.
//!
//! Backends are composed once from the configuration; the pipeline itself
//! never reads the environment. Processing is fully sequential: a file's
//! transcription completes before its summarization starts.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::artifacts::{ensure_layout, ArtifactPaths};
use crate::audio::get_audio_duration;
use crate::config::{Backend, Config};
use crate::error::{Result, ScribeError};
use crate::summarize::{ChatClient, SummaryDriver, TextGenerator, TokenEstimator};
use crate::transcribe::{LocalWhisper, Transcriber, TranscriptionDriver, WhisperClient};

/// Everything produced by one end-to-end run over one audio file.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub transcript_path: PathBuf,
    pub full_summary_path: PathBuf,
    pub brief_summary_path: PathBuf,
    /// Transcription backend calls made (0 on transcript resume).
    pub segments_transcribed: usize,
    /// Generation token usage across both summarization phases.
    pub tokens_used: u64,
    /// Estimated summarization cost in USD.
    pub chat_cost: f64,
    pub transcription_time: Duration,
    pub summarization_time: Duration,
    pub total_time: Duration,
}

pub struct Pipeline {
    transcription: TranscriptionDriver,
    summarization: SummaryDriver,
    processed_dir: PathBuf,
    whisper_price_per_minute: f64,
}

impl Pipeline {
    pub fn new(
        transcription: TranscriptionDriver,
        summarization: SummaryDriver,
        processed_dir: PathBuf,
        whisper_price_per_minute: f64,
    ) -> Self {
        Self {
            transcription,
            summarization,
            processed_dir,
            whisper_price_per_minute,
        }
    }

    /// Compose both capability backends from configuration. Selection
    /// happens here, once; the drivers only ever see the traits.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.openai_api_key.clone().ok_or_else(|| {
            ScribeError::Config("OpenAI API key not set".to_string())
        })?;

        let transcriber: Box<dyn Transcriber> = match config.backend {
            Backend::Cloud => Box::new(
                WhisperClient::new(api_key.clone()).with_model(config.whisper_model.clone()),
            ),
            Backend::Local => {
                let bin = config.local_whisper_bin.clone().ok_or_else(|| {
                    ScribeError::Config("local_whisper_bin not set".to_string())
                })?;
                let model = config.local_whisper_model.clone().ok_or_else(|| {
                    ScribeError::Config("local_whisper_model not set".to_string())
                })?;
                Box::new(LocalWhisper::new(bin, model))
            }
        };

        let generator: Box<dyn TextGenerator> =
            Box::new(ChatClient::new(api_key).with_model(config.chat_model.clone()));

        let processed_dir = config.processed_dir.clone().ok_or_else(|| {
            ScribeError::Config("processed_dir not set".to_string())
        })?;

        Ok(Self::new(
            TranscriptionDriver::new(transcriber),
            SummaryDriver::new(
                generator,
                TokenEstimator::new()?,
                config.token_threshold,
                config.brief_sentences,
                config.pricing.chat_per_1k_tokens,
            ),
            processed_dir,
            config.pricing.whisper_per_minute,
        ))
    }

    /// Transcribe and summarize one audio file.
    pub async fn process_file(&self, audio_path: &Path) -> Result<PipelineOutcome> {
        let start_time = Instant::now();

        if !audio_path.exists() {
            return Err(ScribeError::FileNotFound(audio_path.display().to_string()));
        }

        ensure_layout(&self.processed_dir)?;
        let paths = ArtifactPaths::new(audio_path, &self.processed_dir)?;

        info!("Processing {}", audio_path.display());

        // Cost preview only; a probe failure must not block processing.
        match get_audio_duration(audio_path) {
            Ok(duration) => {
                let minutes = duration.as_secs_f64() / 60.0;
                info!(
                    "Estimated transcription cost: ${:.2} ({:.2} minutes)",
                    minutes * self.whisper_price_per_minute,
                    minutes
                );
            }
            Err(e) => debug!("Could not probe duration: {}", e),
        }

        let transcription_start = Instant::now();
        let transcript = self.transcription.transcribe_file(audio_path, &paths).await?;
        let transcription_time = transcription_start.elapsed();

        let summarization_start = Instant::now();
        let summary = self.summarization.summarize(&paths, &transcript.text).await?;
        let summarization_time = summarization_start.elapsed();

        let outcome = PipelineOutcome {
            transcript_path: transcript.path,
            full_summary_path: summary.full_path,
            brief_summary_path: summary.brief_path,
            segments_transcribed: transcript.segments_transcribed,
            tokens_used: summary.tokens_used,
            chat_cost: summary.cost,
            transcription_time,
            summarization_time,
            total_time: start_time.elapsed(),
        };

        info!("Completed {}", audio_path.display());
        Ok(outcome)
    }

    /// Move a processed source file out of the watched directory.
    pub fn relocate_source(&self, audio_path: &Path) -> Result<PathBuf> {
        let file_name = audio_path.file_name().ok_or_else(|| {
            ScribeError::Audio(format!("No file name in {}", audio_path.display()))
        })?;
        let target = self.processed_dir.join(file_name);

        // Rename fails across filesystems; fall back to copy + remove.
        if std::fs::rename(audio_path, &target).is_err() {
            std::fs::copy(audio_path, &target)?;
            std::fs::remove_file(audio_path)?;
        }

        info!("Moved {} to {}", audio_path.display(), target.display());
        Ok(target)
    }
}

/// Log a timing and cost report for one processed file.
pub fn print_summary(outcome: &PipelineOutcome) {
    info!("Transcript:    {}", outcome.transcript_path.display());
    info!("Full summary:  {}", outcome.full_summary_path.display());
    info!("Brief summary: {}", outcome.brief_summary_path.display());
    info!(
        "Transcribe: {:.2}s ({} segments)",
        outcome.transcription_time.as_secs_f64(),
        outcome.segments_transcribed
    );
    info!(
        "Summarize:  {:.2}s (${:.2}, {} tokens)",
        outcome.summarization_time.as_secs_f64(),
        outcome.chat_cost,
        outcome.tokens_used
    );
    if outcome.segments_transcribed == 0 {
        warn!("Transcript was resumed from a previous run; no transcription cost incurred");
    }
    info!("Total:      {:.2}s", outcome.total_time.as_secs_f64());
}
