//! Streaming an enclosure to a local file.
//!
//! [`StreamCopier`] reads a [`Payload`] in fixed-size chunks and writes it to a
//! target that must not exist yet. Each chunk advances a [`ProgressEstimator`];
//! a separate reporter task logs the latest snapshot on a fixed interval. On any
//! failure, cancellation included, the partial target is removed before the
//! error is returned.

use crate::config::Config;
use crate::error::{Error, Result, TransferError};
use crate::progress::{ProgressEstimator, ProgressSnapshot};
use crate::transport::{Payload, Transport};
use crate::utils::{format_bytes, get_available_space};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Result of a copy that did not fail
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CopyOutcome {
    /// The target was written
    Completed {
        /// Bytes written
        bytes: u64,
    },
    /// The target already existed and was left untouched
    Skipped,
}

/// Why the copy loop stopped early
enum Failure {
    Io(std::io::Error),
    Interrupted,
}

/// Copies payloads to disk with progress reporting
pub struct StreamCopier {
    transport: Arc<dyn Transport>,
    chunk_size: usize,
    report_interval: Duration,
    check_disk_space: bool,
}

impl StreamCopier {
    /// Create a copier reading through `transport`
    pub fn new(transport: Arc<dyn Transport>, config: &Config) -> Self {
        Self {
            transport,
            chunk_size: config.chunk_size.max(1),
            report_interval: config.report_interval,
            check_disk_space: config.check_disk_space,
        }
    }

    /// Open `url` and copy it to `target`
    ///
    /// An existing target is skipped before the source is opened.
    ///
    /// # Errors
    /// Transport errors, plus everything [`copy`](Self::copy) returns
    pub async fn fetch(
        &self,
        url: &str,
        target: &Path,
        cancel: &CancellationToken,
    ) -> Result<CopyOutcome> {
        if tokio::fs::try_exists(target).await.unwrap_or(false) {
            warn!(path = %target.display(), "target already exists, skipping");
            return Ok(CopyOutcome::Skipped);
        }

        let payload = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(TransferError::Interrupted {
                    target: target.to_path_buf(),
                }
                .into());
            }
            payload = self.transport.open(url) => payload?,
        };
        self.copy(url, payload, target, cancel).await
    }

    /// Copy an opened payload to `target`
    ///
    /// `url` only labels errors and log lines.
    ///
    /// # Errors
    /// - [`TransferError::Fault`] on an I/O error while reading or writing
    /// - [`TransferError::Interrupted`] when `cancel` fires mid-copy
    /// - [`TransferError::InsufficientSpace`] when the declared length does not fit
    ///
    /// The partial target is removed in each case.
    pub async fn copy(
        &self,
        url: &str,
        payload: Payload,
        target: &Path,
        cancel: &CancellationToken,
    ) -> Result<CopyOutcome> {
        let Payload { length, mut reader } = payload;

        // create_new makes the existence check and the creation one step
        let file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(target)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                warn!(path = %target.display(), "target already exists, skipping");
                return Ok(CopyOutcome::Skipped);
            }
            Err(e) => {
                return Err(TransferError::Fault {
                    url: url.to_string(),
                    target: target.to_path_buf(),
                    source: e,
                }
                .into());
            }
        };

        if let Some(required) = length
            && self.check_disk_space
            && let Err(e) = ensure_space(target, required)
        {
            drop(file);
            remove_partial(target, &e).await;
            return Err(e);
        }

        let label = target
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| target.display().to_string());
        info!(file = %label, url = %url, size = ?length, "starting transfer");

        let mut progress = ProgressEstimator::new(length);
        let (progress_tx, progress_rx) = watch::channel(progress.snapshot());
        let reporter_token = cancel.child_token();
        let reporter = spawn_progress_reporter(ProgressReporterParams {
            label: label.clone(),
            interval: self.report_interval,
            progress: progress_rx,
            cancel_token: reporter_token.clone(),
        });

        let result = self
            .stream(&mut reader, file, &mut progress, &progress_tx, cancel)
            .await;

        reporter_token.cancel();
        if let Err(e) = reporter.await {
            debug!(error = %e, "progress reporter ended abnormally");
        }

        match result {
            Ok(bytes) => {
                info!(
                    file = %label,
                    size = %format_bytes(bytes),
                    elapsed_secs = progress.elapsed_secs(),
                    rate = %format!("{}/s", format_bytes(progress.overall_rate() as u64)),
                    "transfer complete"
                );
                Ok(CopyOutcome::Completed { bytes })
            }
            Err(failure) => {
                let error = match failure {
                    Failure::Io(source) => Error::Transfer(TransferError::Fault {
                        url: url.to_string(),
                        target: target.to_path_buf(),
                        source,
                    }),
                    Failure::Interrupted => Error::Transfer(TransferError::Interrupted {
                        target: target.to_path_buf(),
                    }),
                };
                remove_partial(target, &error).await;
                Err(error)
            }
        }
    }

    /// Chunked read/write loop; the file is closed when this returns
    async fn stream(
        &self,
        reader: &mut Box<dyn AsyncRead + Unpin + Send>,
        mut file: tokio::fs::File,
        progress: &mut ProgressEstimator,
        progress_tx: &watch::Sender<ProgressSnapshot>,
        cancel: &CancellationToken,
    ) -> std::result::Result<u64, Failure> {
        let mut buffer = vec![0u8; self.chunk_size];
        let mut written: u64 = 0;

        loop {
            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Failure::Interrupted),
                read = reader.read(&mut buffer) => read.map_err(Failure::Io)?,
            };
            if read == 0 {
                break;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Failure::Interrupted),
                res = file.write_all(&buffer[..read]) => res.map_err(Failure::Io)?,
            }

            written += read as u64;
            progress.add(read as u64);
            progress_tx.send_replace(progress.snapshot());
        }

        file.flush().await.map_err(Failure::Io)?;
        Ok(written)
    }
}

/// Refuse transfers whose declared size exceeds the free space next to `target`
fn ensure_space(target: &Path, required: u64) -> Result<()> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    match get_available_space(dir) {
        Ok(available) if available < required => {
            Err(TransferError::InsufficientSpace {
                required,
                available,
            }
            .into())
        }
        Ok(_) => Ok(()),
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "could not query free disk space, continuing");
            Ok(())
        }
    }
}

async fn remove_partial(target: &Path, cause: &Error) {
    match tokio::fs::remove_file(target).await {
        Ok(()) => warn!(path = %target.display(), error = %cause, "removed partial download"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(
            path = %target.display(),
            error = %e,
            cause = %cause,
            "failed to remove partial download"
        ),
    }
}

/// Parameters for spawning a progress reporter background task
pub(crate) struct ProgressReporterParams {
    /// Name shown in report lines
    pub label: String,
    /// Time between reports
    pub interval: Duration,
    /// Latest snapshot published by the copy loop
    pub progress: watch::Receiver<ProgressSnapshot>,
    /// Stops the reporter
    pub cancel_token: CancellationToken,
}

/// Spawn a background task that periodically logs transfer progress.
///
/// The first report is emitted one interval after the start.
pub(crate) fn spawn_progress_reporter(
    params: ProgressReporterParams,
) -> tokio::task::JoinHandle<()> {
    let ProgressReporterParams {
        label,
        interval,
        progress,
        cancel_token,
    } = params;
    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + interval;
        let mut ticker = tokio::time::interval_at(start, interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let snapshot = *progress.borrow();
                    info!(
                        target: "vodcast_dl::progress",
                        file = %label,
                        "{}",
                        format_progress(&snapshot)
                    );
                }
                _ = cancel_token.cancelled() => {
                    break;
                }
            }
        }
    })
}

/// Render a snapshot as `42.0% [410/977 kb]. eta 3s (120kb/s)`
///
/// Unknown values are shown as `?`.
pub fn format_progress(snapshot: &ProgressSnapshot) -> String {
    let done_kb = snapshot.completed as f64 / 1024.0;
    let percent = snapshot
        .percent
        .map_or_else(|| "?".to_string(), |p| format!("{p:.1}"));
    let total_kb = snapshot
        .total
        .map_or_else(|| "?".to_string(), |t| format!("{:.0}", t as f64 / 1024.0));
    let eta = snapshot
        .eta_seconds()
        .map_or_else(|| "?".to_string(), |eta| format!("{}", eta.round() as u64));
    let rate_kb = snapshot
        .rate
        .map_or_else(|| "?".to_string(), |r| format!("{}", (r / 1024.0) as u64));

    format!("{percent}% [{done_kb:.0}/{total_kb} kb]. eta {eta}s ({rate_kb}kb/s)")
}
