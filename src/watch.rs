//! Polling watch loop over the upload directory.
//!
//! Two logical states: polling (scan the directory on a fixed cadence) and
//! settling (a qualifying file appeared; wait until two consecutive size
//! readings show no growth before dispatching). Dispatch is serialized: one
//! file is fully transcribed and summarized before the next is considered.
//! A file that fails is logged, remembered, and skipped on later scans so
//! one bad upload cannot wedge or crash the loop.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::pipeline::{print_summary, Pipeline};

pub struct WatchLoop {
    pipeline: Pipeline,
    watched_dir: PathBuf,
    poll_interval: Duration,
    settle_interval: Duration,
    extension: String,
    /// Files that failed processing; skipped until restart.
    failed: HashSet<PathBuf>,
}

impl WatchLoop {
    pub fn new(
        pipeline: Pipeline,
        watched_dir: PathBuf,
        poll_interval: Duration,
        settle_interval: Duration,
        extension: String,
    ) -> Self {
        Self {
            pipeline,
            watched_dir,
            poll_interval,
            settle_interval,
            extension,
            failed: HashSet::new(),
        }
    }

    /// Run until ctrl-c.
    pub async fn run(&mut self) -> Result<()> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        // The signal listener is registered once and outlives every
        // dispatch. A ctrl-c that arrives while a file is being processed
        // latches the flag and stops the loop at the next check.
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = shutdown_tx.send(true);
            }
        });

        self.run_until_shutdown(&mut shutdown_rx).await
    }

    async fn run_until_shutdown(&mut self, shutdown: &mut watch::Receiver<bool>) -> Result<()> {
        let mut announce = true;

        loop {
            if *shutdown.borrow_and_update() {
                info!("Exiting");
                return Ok(());
            }

            if announce {
                info!(
                    "Watching {} for new .{} files (ctrl-c to quit)",
                    self.watched_dir.display(),
                    self.extension
                );
                announce = false;
            }

            // Re-announce after activity so the idle log shows up once per
            // quiet period, not once per poll.
            if self.scan_once().await? {
                announce = true;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        // Listener task is gone; only the poll timer remains.
                        sleep(self.poll_interval).await;
                    }
                }
                _ = sleep(self.poll_interval) => {}
            }
        }
    }

    /// Scan the watched directory once; returns true if any file was
    /// dispatched.
    async fn scan_once(&mut self) -> Result<bool> {
        let mut dispatched = false;

        let entries = std::fs::read_dir(&self.watched_dir)?;
        let mut candidates: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| matches_extension(p, &self.extension))
            .filter(|p| !self.failed.contains(p))
            .collect();
        candidates.sort();

        for path in candidates {
            info!(
                "Found {}, waiting for it to finish uploading",
                path.display()
            );
            if let Err(e) = self.wait_until_settled(&path).await {
                warn!("Lost {} while settling: {}", path.display(), e);
                continue;
            }

            // One file at a time, start to finish.
            match self.pipeline.process_file(&path).await {
                Ok(outcome) => {
                    print_summary(&outcome);
                    if let Err(e) = self.pipeline.relocate_source(&path) {
                        error!("Could not move {}: {}", path.display(), e);
                        self.failed.insert(path.clone());
                    }
                }
                Err(e) => {
                    error!("Processing {} failed: {}", path.display(), e);
                    self.failed.insert(path.clone());
                }
            }
            dispatched = true;
        }

        Ok(dispatched)
    }

    /// Block until two consecutive size readings show no growth.
    async fn wait_until_settled(&self, path: &Path) -> Result<()> {
        let mut last_size: Option<u64> = None;

        loop {
            let size = std::fs::metadata(path)?.len();
            match last_size {
                Some(previous) if size <= previous => return Ok(()),
                _ => {
                    last_size = Some(size);
                    sleep(self.settle_interval).await;
                }
            }
        }
    }
}

/// Case-insensitive extension match for qualifying uploads.
fn matches_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}
