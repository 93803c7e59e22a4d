use anyhow::{Context, Result};
use clap::Parser;
use scribewatch::config::{Backend, Config};
use scribewatch::pipeline::{print_summary, Pipeline};
use scribewatch::watch::WatchLoop;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "scribewatch")]
#[command(version, about = "Watch-folder audio transcription and summarization")]
#[command(
    long_about = "Watches a directory for uploaded audio files, transcribes them with \
OpenAI Whisper or a local whisper.cpp binary, and writes hierarchical GPT summaries."
)]
struct Cli {
    /// Process a single audio file and exit (watch mode when omitted)
    input: Option<PathBuf>,

    /// Directory to watch for uploads
    #[arg(long)]
    watched_dir: Option<PathBuf>,

    /// Directory for segments, transcripts and summaries
    #[arg(long)]
    processed_dir: Option<PathBuf>,

    /// Transcription backend: cloud, local
    #[arg(short, long)]
    backend: Option<String>,

    /// Brief summary sentence count
    #[arg(long)]
    brief_sentences: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let mut config = Config::load().context("Failed to load configuration")?;

    // CLI flags win over file and environment.
    if let Some(dir) = cli.watched_dir {
        config.watched_dir = Some(dir);
    }
    if let Some(dir) = cli.processed_dir {
        config.processed_dir = Some(dir);
    }
    if let Some(backend) = cli.backend {
        let parsed: Backend = backend.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        config.backend = parsed;
    }
    if let Some(n) = cli.brief_sentences {
        config.brief_sentences = n;
    }

    // Single-file mode only needs the processed side.
    if cli.input.is_some() && config.watched_dir.is_none() {
        config.watched_dir = Some(PathBuf::from("."));
    }

    config.validate().context("Configuration validation failed")?;

    info!("Backend:   {}", config.backend);
    info!("Chat model: {}", config.chat_model);

    // Splitting large files needs FFmpeg; small cloud uploads do not, so
    // this is a warning rather than a startup failure.
    if let Err(e) = scribewatch::audio::check_ffmpeg().and_then(|_| scribewatch::audio::check_ffprobe()) {
        tracing::warn!("FFmpeg tooling unavailable; oversized files cannot be split: {e}");
    }

    let pipeline = Pipeline::from_config(&config)?;

    match cli.input {
        Some(input) => {
            if !input.exists() {
                anyhow::bail!("Input file not found: {}", input.display());
            }
            let outcome = pipeline.process_file(&input).await?;
            print_summary(&outcome);
        }
        None => {
            let watched_dir = config
                .watched_dir
                .clone()
                .ok_or_else(|| anyhow::anyhow!("watched_dir not set"))?;
            let mut watch = WatchLoop::new(
                pipeline,
                watched_dir,
                Duration::from_secs(config.poll_interval_secs),
                Duration::from_secs(config.settle_interval_secs),
                config.watch_extension.clone(),
            );
            watch.run().await?;
        }
    }

    Ok(())
}
