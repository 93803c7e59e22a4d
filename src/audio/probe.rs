use std::path::Path;
use std::process::Command;
use std::time::Duration;

use hound::WavReader;
use tracing::debug;

use crate::error::{Result, ScribeError};

/// Check if FFmpeg is installed and accessible.
pub fn check_ffmpeg() -> Result<()> {
    let output = Command::new("ffmpeg").arg("-version").output().map_err(|e| {
        ScribeError::Audio(format!(
            "FFmpeg not found. Please install FFmpeg and ensure it's in your PATH. Error: {e}"
        ))
    })?;

    if !output.status.success() {
        return Err(ScribeError::Audio("FFmpeg check failed".to_string()));
    }

    debug!("FFmpeg is available");
    Ok(())
}

/// Check if FFprobe is installed and accessible.
pub fn check_ffprobe() -> Result<()> {
    let output = Command::new("ffprobe").arg("-version").output().map_err(|e| {
        ScribeError::Audio(format!(
            "FFprobe not found. Please install FFmpeg (includes FFprobe). Error: {e}"
        ))
    })?;

    if !output.status.success() {
        return Err(ScribeError::Audio("FFprobe check failed".to_string()));
    }

    debug!("FFprobe is available");
    Ok(())
}

/// Get audio duration. WAV files are read directly; everything else goes
/// through FFprobe.
pub fn get_audio_duration(input: &Path) -> Result<Duration> {
    if input
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"))
    {
        return wav_duration(input);
    }

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(input)
        .output()
        .map_err(|e| ScribeError::Audio(format!("Failed to run FFprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ScribeError::Audio(format!("FFprobe failed: {stderr}")));
    }

    let duration_str = String::from_utf8_lossy(&output.stdout);
    let duration_secs: f64 = duration_str.trim().parse().map_err(|e| {
        ScribeError::Audio(format!(
            "Failed to parse duration '{}': {e}",
            duration_str.trim()
        ))
    })?;

    Ok(Duration::from_secs_f64(duration_secs))
}

/// Duration of a RIFF WAV file from its header, no subprocess needed.
pub fn wav_duration(input: &Path) -> Result<Duration> {
    let reader = WavReader::open(input)
        .map_err(|e| ScribeError::Audio(format!("Failed to read WAV {}: {e}", input.display())))?;
    let spec = reader.spec();
    let samples = reader.duration(); // per-channel sample count
    Ok(Duration::from_secs_f64(f64::from(samples) / f64::from(spec.sample_rate)))
}
