pub mod chunk;
pub mod probe;

pub use chunk::{chunk_audio, plan_segments, ChunkPlan, SegmentFormat, CHUNK_SIZE_THRESHOLD,
    SEGMENT_DURATION};
pub use probe::{check_ffmpeg, check_ffprobe, get_audio_duration, wav_duration};

use std::path::PathBuf;

/// One bounded-duration audio segment ready for transcription.
#[derive(Debug, Clone)]
pub struct AudioSegment {
    pub index: usize,
    pub path: PathBuf,
}
