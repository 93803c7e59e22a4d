//! Local transcription via a whisper.cpp command-line binary.
//!
//! The binary is invoked once per segment with `--no-timestamps` and the
//! transcript is read from stdout. whisper.cpp only accepts 16 kHz mono
//! PCM WAV, which is why this backend requests the resampled segment
//! format from the chunker.

use crate::audio::{AudioSegment, SegmentFormat};
use crate::error::{Result, ScribeError};
use crate::transcribe::Transcriber;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

pub struct LocalWhisper {
    binary: PathBuf,
    model: PathBuf,
}

impl LocalWhisper {
    pub fn new(binary: PathBuf, model: PathBuf) -> Self {
        Self { binary, model }
    }
}

#[async_trait]
impl Transcriber for LocalWhisper {
    async fn transcribe(&self, segment: &AudioSegment) -> Result<String> {
        if !segment.path.exists() {
            return Err(ScribeError::FileNotFound(segment.path.display().to_string()));
        }

        debug!(
            "Transcribing segment {} with {}: {:?}",
            segment.index,
            self.binary.display(),
            segment.path
        );

        let output = Command::new(&self.binary)
            .arg("--model")
            .arg(&self.model)
            .arg("--no-timestamps")
            .arg("--file")
            .arg(&segment.path)
            .output()
            .await
            .map_err(|e| {
                ScribeError::Transcription(format!(
                    "Failed to run {}: {e}",
                    self.binary.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ScribeError::Transcription(format!(
                "whisper.cpp exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if text.is_empty() {
            return Err(ScribeError::Transcription(format!(
                "whisper.cpp produced no output for {}",
                segment.path.display()
            )));
        }

        Ok(text)
    }

    fn name(&self) -> &'static str {
        "whisper.cpp"
    }

    fn required_format(&self) -> SegmentFormat {
        SegmentFormat::Wav16k
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_format_is_wav() {
        let backend = LocalWhisper::new(
            PathBuf::from("/usr/local/bin/whisper-cli"),
            PathBuf::from("/models/ggml-base.bin"),
        );
        assert_eq!(backend.required_format(), SegmentFormat::Wav16k);
        assert_eq!(backend.name(), "whisper.cpp");
    }

    #[tokio::test]
    async fn test_missing_segment_errors() {
        let backend = LocalWhisper::new(
            PathBuf::from("/usr/local/bin/whisper-cli"),
            PathBuf::from("/models/ggml-base.bin"),
        );
        let segment = AudioSegment {
            index: 0,
            path: PathBuf::from("/tmp/nonexistent_segment.wav"),
        };

        let result = backend.transcribe(&segment).await;
        assert!(matches!(result, Err(ScribeError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_missing_binary_errors() {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("seg.wav");
        std::fs::write(&wav, b"riff").unwrap();

        let backend = LocalWhisper::new(
            PathBuf::from("/nonexistent/whisper-cli"),
            PathBuf::from("/models/ggml-base.bin"),
        );
        let segment = AudioSegment { index: 0, path: wav };

        let result = backend.transcribe(&segment).await;
        assert!(matches!(result, Err(ScribeError::Transcription(_))));
    }
}
