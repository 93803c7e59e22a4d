//! Splits oversized audio into bounded-duration segments.
//!
//! Files under the size threshold are passed through untouched (cloud
//! format) or converted once (WAV format). Larger files are cut into fixed
//! 25-minute segments named `<stem>_<index>.<ext>` under `whisper/`. An
//! existing segment 0 means a previous run already split this file, so the
//! segment list is loaded from disk instead of re-exported.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tracing::{debug, info};

use crate::artifacts::ArtifactPaths;
use crate::error::{Result, ScribeError};

use super::probe::{check_ffmpeg, get_audio_duration};
use super::AudioSegment;

/// Files at or above this size get split (Whisper API upload limit).
pub const CHUNK_SIZE_THRESHOLD: u64 = 25 * 1024 * 1024;

/// Fixed duration of each exported segment.
pub const SEGMENT_DURATION: Duration = Duration::from_secs(25 * 60);

/// Highest segment index considered when loading a previous run's segments.
const RESUME_SCAN_LIMIT: usize = 100;

/// Output encoding for exported segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentFormat {
    /// Keep the source container; below-threshold files are returned as-is.
    Passthrough,
    /// 16 kHz mono 16-bit PCM WAV, required by the local whisper.cpp backend.
    Wav16k,
}

impl SegmentFormat {
    fn extension(&self, source: &Path) -> String {
        match self {
            SegmentFormat::Passthrough => source
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("mp3")
                .to_string(),
            SegmentFormat::Wav16k => "wav".to_string(),
        }
    }
}

/// One planned cut: where it starts and how long it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    pub index: usize,
    pub start: Duration,
    pub duration: Duration,
}

/// Plan fixed-duration segments covering `total`. The last segment may be
/// shorter; indices are contiguous from 0.
pub fn plan_segments(total: Duration, segment: Duration) -> Vec<ChunkPlan> {
    let mut plans = Vec::new();
    let mut current = Duration::ZERO;

    while current < total {
        let end = (current + segment).min(total);
        plans.push(ChunkPlan {
            index: plans.len(),
            start: current,
            duration: end - current,
        });
        current = end;
    }

    plans
}

/// Split (or resume splitting) an audio file into ordered segments.
pub async fn chunk_audio(
    audio_path: &Path,
    paths: &ArtifactPaths,
    format: SegmentFormat,
) -> Result<Vec<AudioSegment>> {
    if !audio_path.exists() {
        return Err(ScribeError::FileNotFound(audio_path.display().to_string()));
    }

    let file_size = std::fs::metadata(audio_path)?.len();
    let ext = format.extension(audio_path);

    if file_size < CHUNK_SIZE_THRESHOLD {
        return match format {
            SegmentFormat::Passthrough => Ok(vec![AudioSegment {
                index: 0,
                path: audio_path.to_path_buf(),
            }]),
            // whisper.cpp only accepts WAV, so even small files get one
            // conversion pass (resumable like any other segment).
            SegmentFormat::Wav16k => {
                let target = paths.segment(0, &ext);
                if !target.exists() {
                    check_ffmpeg()?;
                    export_segment(audio_path, &target, None, format)?;
                }
                Ok(vec![AudioSegment {
                    index: 0,
                    path: target,
                }])
            }
        };
    }

    info!(
        "Audio file is {:.2} MB (>= 25 MB), chunking",
        file_size as f64 / 1024.0 / 1024.0
    );

    // Segment 0 on disk means a previous run already split this file.
    if paths.segment(0, &ext).exists() {
        info!("Segments already exist, loading");
        return Ok(load_existing_segments(paths, &ext));
    }

    check_ffmpeg()?;
    let total_duration = get_audio_duration(audio_path)?;
    let plans = plan_segments(total_duration, SEGMENT_DURATION);
    debug!(
        "Splitting {:.1} minutes into {} segments",
        total_duration.as_secs_f64() / 60.0,
        plans.len()
    );

    let mut segments = Vec::with_capacity(plans.len());
    for plan in &plans {
        let target = paths.segment(plan.index, &ext);
        export_segment(audio_path, &target, Some(plan), format)?;
        segments.push(AudioSegment {
            index: plan.index,
            path: target,
        });
    }

    info!("Exported {} segments", segments.len());
    Ok(segments)
}

/// Collect previously exported segments in index order, stopping at the
/// first missing index.
fn load_existing_segments(paths: &ArtifactPaths, ext: &str) -> Vec<AudioSegment> {
    let mut segments = Vec::new();
    for index in 0..RESUME_SCAN_LIMIT {
        let path = paths.segment(index, ext);
        if !path.exists() {
            break;
        }
        segments.push(AudioSegment { index, path });
    }
    segments
}

/// Export one segment with FFmpeg, writing to a `.part` file first so a
/// half-written export never passes the resume existence check.
fn export_segment(
    source: &Path,
    target: &Path,
    plan: Option<&ChunkPlan>,
    format: SegmentFormat,
) -> Result<()> {
    let part_path = partial_path(target);

    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-y");

    if let Some(plan) = plan {
        cmd.args(["-ss", &format!("{:.3}", plan.start.as_secs_f64())]);
        cmd.args(["-t", &format!("{:.3}", plan.duration.as_secs_f64())]);
    }

    cmd.arg("-i").arg(source);

    match format {
        SegmentFormat::Passthrough => {
            // The container is inferred from the partial file's extension;
            // extension names and muxer names differ (m4a vs mp4).
            cmd.args(["-vn", "-acodec", "copy"]);
        }
        SegmentFormat::Wav16k => {
            cmd.args(["-vn", "-acodec", "pcm_s16le", "-ar", "16000", "-ac", "1", "-f", "wav"]);
        }
    }

    let status = cmd
        .arg(&part_path)
        .status()
        .map_err(|e| ScribeError::Audio(format!("Failed to run FFmpeg: {e}")))?;

    if !status.success() {
        let _ = std::fs::remove_file(&part_path);
        return Err(ScribeError::Audio(format!(
            "FFmpeg export failed for {}",
            target.display()
        )));
    }

    std::fs::rename(&part_path, target)?;
    Ok(())
}

/// In-progress name for an export, with the real extension kept last so
/// FFmpeg still recognizes the output container.
fn partial_path(target: &Path) -> PathBuf {
    let stem = target
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("segment");
    match target.extension().and_then(|e| e.to_str()) {
        Some(ext) => target.with_file_name(format!("{stem}.part.{ext}")),
        None => target.with_file_name(format!("{stem}.part")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_segments_exact_hour() {
        // 60 minutes at 25-minute segments: 25, 25, 10.
        let plans = plan_segments(Duration::from_secs(3600), SEGMENT_DURATION);
        assert_eq!(plans.len(), 3);
        assert_eq!(plans[0].duration, Duration::from_secs(1500));
        assert_eq!(plans[1].duration, Duration::from_secs(1500));
        assert_eq!(plans[2].duration, Duration::from_secs(600));
        assert_eq!(plans[2].start, Duration::from_secs(3000));
        let indices: Vec<usize> = plans.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_plan_segments_short_file() {
        let plans = plan_segments(Duration::from_secs(600), SEGMENT_DURATION);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].duration, Duration::from_secs(600));
    }

    #[test]
    fn test_plan_segments_boundary() {
        // Exactly one segment duration produces one segment, not two.
        let plans = plan_segments(SEGMENT_DURATION, SEGMENT_DURATION);
        assert_eq!(plans.len(), 1);
    }

    #[test]
    fn test_segment_format_extension() {
        let mp3 = Path::new("/in/talk.mp3");
        assert_eq!(SegmentFormat::Passthrough.extension(mp3), "mp3");
        assert_eq!(SegmentFormat::Wav16k.extension(mp3), "wav");
    }

    #[tokio::test]
    async fn test_small_file_passthrough() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("short.mp3");
        std::fs::write(&audio, b"tiny").unwrap();
        let paths = ArtifactPaths::new(&audio, dir.path()).unwrap();

        let segments = chunk_audio(&audio, &paths, SegmentFormat::Passthrough)
            .await
            .unwrap();

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].index, 0);
        assert_eq!(segments[0].path, audio);
    }

    #[tokio::test]
    async fn test_resume_loads_existing_segments() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("long.mp3");

        // Sparse file over the threshold; never actually decoded because
        // the resume path wins.
        let f = std::fs::File::create(&audio).unwrap();
        f.set_len(CHUNK_SIZE_THRESHOLD + 1).unwrap();

        let paths = ArtifactPaths::new(&audio, dir.path()).unwrap();
        crate::artifacts::ensure_layout(dir.path()).unwrap();
        for i in 0..3 {
            std::fs::write(paths.segment(i, "mp3"), b"seg").unwrap();
        }

        let segments = chunk_audio(&audio, &paths, SegmentFormat::Passthrough)
            .await
            .unwrap();

        assert_eq!(segments.len(), 3);
        for (i, seg) in segments.iter().enumerate() {
            assert_eq!(seg.index, i);
            assert_eq!(seg.path, paths.segment(i, "mp3"));
        }
    }

    #[tokio::test]
    async fn test_resume_stops_at_first_gap() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("gap.mp3");
        let f = std::fs::File::create(&audio).unwrap();
        f.set_len(CHUNK_SIZE_THRESHOLD).unwrap();

        let paths = ArtifactPaths::new(&audio, dir.path()).unwrap();
        crate::artifacts::ensure_layout(dir.path()).unwrap();
        std::fs::write(paths.segment(0, "mp3"), b"seg").unwrap();
        // Index 1 missing, index 2 present: 2 must not be picked up.
        std::fs::write(paths.segment(2, "mp3"), b"seg").unwrap();

        let segments = chunk_audio(&audio, &paths, SegmentFormat::Passthrough)
            .await
            .unwrap();

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].index, 0);
    }

    #[tokio::test]
    async fn test_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("nope.mp3");
        let paths = ArtifactPaths::new(&audio, dir.path()).unwrap();

        let result = chunk_audio(&audio, &paths, SegmentFormat::Passthrough).await;
        assert!(matches!(result, Err(ScribeError::FileNotFound(_))));
    }

    #[test]
    fn test_partial_path_keeps_extension_last() {
        let p = partial_path(Path::new("/out/whisper/a_0.mp3"));
        assert_eq!(p, PathBuf::from("/out/whisper/a_0.part.mp3"));
        // Source formats whose extension is not a muxer name still export.
        let p = partial_path(Path::new("/out/whisper/talk_2.m4a"));
        assert_eq!(p, PathBuf::from("/out/whisper/talk_2.part.m4a"));
    }

    #[test]
    fn test_partial_path_never_collides_with_a_segment_name() {
        // A crash can leave a partial behind; the resume scan must not
        // mistake it for a finished segment.
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("crashy.m4a");
        let paths = ArtifactPaths::new(&audio, dir.path()).unwrap();
        for index in 0..3 {
            let target = paths.segment(index, "m4a");
            assert_ne!(partial_path(&target), target);
            for other in 0..RESUME_SCAN_LIMIT {
                assert_ne!(partial_path(&target), paths.segment(other, "m4a"));
            }
        }
    }
}
