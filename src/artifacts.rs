//! Processed-output tree layout and artifact persistence.
//!
//! Everything the pipeline writes lands under the processed root:
//! `whisper/` holds audio segments and transcripts, `gpt3/` holds summaries.
//! Artifacts are written to a temp file and renamed into place, so a path
//! that exists is a complete artifact and safe to resume from.

use crate::error::{Result, ScribeError};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const WHISPER_SUBDIR: &str = "whisper";
pub const GPT_SUBDIR: &str = "gpt3";

/// Derives every artifact path for one audio file.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    processed_dir: PathBuf,
    stem: String,
}

impl ArtifactPaths {
    pub fn new(audio_path: &Path, processed_dir: &Path) -> Result<Self> {
        let stem = audio_path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                ScribeError::Audio(format!("No file stem in {}", audio_path.display()))
            })?
            .to_string();

        Ok(Self {
            processed_dir: processed_dir.to_path_buf(),
            stem,
        })
    }

    pub fn whisper_dir(&self) -> PathBuf {
        self.processed_dir.join(WHISPER_SUBDIR)
    }

    pub fn gpt_dir(&self) -> PathBuf {
        self.processed_dir.join(GPT_SUBDIR)
    }

    /// Audio segment path: `whisper/<stem>_<index>.<ext>`.
    pub fn segment(&self, index: usize, ext: &str) -> PathBuf {
        self.whisper_dir()
            .join(format!("{}_{}.{}", self.stem, index, ext))
    }

    /// Transcript path: `whisper/<stem>-transcript.txt`.
    pub fn transcript(&self) -> PathBuf {
        self.whisper_dir()
            .join(format!("{}-transcript.txt", self.stem))
    }

    /// Full summary path: `gpt3/<stem>_<engine>_full.txt`.
    pub fn full_summary(&self, engine: &str) -> PathBuf {
        self.gpt_dir()
            .join(format!("{}_{}_full.txt", self.stem, engine))
    }

    /// Brief summary path: `gpt3/<stem>_<engine>_summary.txt`.
    pub fn brief_summary(&self, engine: &str) -> PathBuf {
        self.gpt_dir()
            .join(format!("{}_{}_summary.txt", self.stem, engine))
    }
}

/// Create the `whisper/` and `gpt3/` subdirectories under the processed root.
pub fn ensure_layout(processed_dir: &Path) -> Result<()> {
    for sub in [WHISPER_SUBDIR, GPT_SUBDIR] {
        std::fs::create_dir_all(processed_dir.join(sub))?;
    }
    Ok(())
}

/// Write `contents` to `path` atomically (temp file in the same directory,
/// then rename). A reader never observes a partially written artifact.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = path.parent().ok_or_else(|| {
        ScribeError::Io(std::io::Error::other(format!(
            "No parent directory for {}",
            path.display()
        )))
    })?;

    let tmp = NamedTempFile::new_in(dir)?;
    std::fs::write(tmp.path(), contents)?;
    tmp.persist(path)
        .map_err(|e| ScribeError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_path_template() {
        let paths =
            ArtifactPaths::new(Path::new("/in/meeting.mp3"), Path::new("/out")).unwrap();
        assert_eq!(
            paths.segment(0, "mp3"),
            PathBuf::from("/out/whisper/meeting_0.mp3")
        );
        assert_eq!(
            paths.segment(12, "wav"),
            PathBuf::from("/out/whisper/meeting_12.wav")
        );
    }

    #[test]
    fn test_transcript_path() {
        let paths =
            ArtifactPaths::new(Path::new("/in/meeting.mp3"), Path::new("/out")).unwrap();
        assert_eq!(
            paths.transcript(),
            PathBuf::from("/out/whisper/meeting-transcript.txt")
        );
    }

    #[test]
    fn test_summary_paths() {
        let paths =
            ArtifactPaths::new(Path::new("/in/standup.mp3"), Path::new("/out")).unwrap();
        assert_eq!(
            paths.full_summary("gpt-3.5-turbo"),
            PathBuf::from("/out/gpt3/standup_gpt-3.5-turbo_full.txt")
        );
        assert_eq!(
            paths.brief_summary("gpt-3.5-turbo"),
            PathBuf::from("/out/gpt3/standup_gpt-3.5-turbo_summary.txt")
        );
    }

    #[test]
    fn test_ensure_layout_and_atomic_write() {
        let root = tempfile::tempdir().unwrap();
        ensure_layout(root.path()).unwrap();
        assert!(root.path().join("whisper").is_dir());
        assert!(root.path().join("gpt3").is_dir());

        let target = root.path().join("whisper").join("a-transcript.txt");
        write_atomic(&target, "hello").unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "hello");

        // Overwrite goes through the same rename path.
        write_atomic(&target, "world").unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "world");
    }
}
