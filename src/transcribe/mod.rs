pub mod driver;
pub mod local;
pub mod whisper;

pub use driver::{TranscriptOutcome, TranscriptionDriver};
pub use local::LocalWhisper;
pub use whisper::WhisperClient;

use crate::audio::{AudioSegment, SegmentFormat};
use crate::error::Result;
use async_trait::async_trait;

/// Speech-to-text capability. An `Ok` return is a complete transcript for
/// the given segment; any backend failure surfaces as an error.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, segment: &AudioSegment) -> Result<String>;
    fn name(&self) -> &'static str;
    /// Segment encoding this backend can ingest.
    fn required_format(&self) -> SegmentFormat;
}
