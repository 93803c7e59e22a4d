pub mod artifacts;
pub mod audio;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod summarize;
pub mod transcribe;
pub mod watch;

pub use config::{Backend, Config};
pub use error::{Result, ScribeError};
pub use pipeline::{print_summary, Pipeline, PipelineOutcome};
pub use watch::WatchLoop;
