//! Sequential download of the items a run selects.

use crate::config::{Config, FailurePolicy};
use crate::copier::{CopyOutcome, StreamCopier};
use crate::entry::{self, WorkItem};
use crate::error::{Error, Result, ToExitCode};
use crate::feed::FeedEntry;
use crate::filter::select_newer;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// One item that could not be downloaded or resolved
#[derive(Debug)]
pub struct ItemFailure {
    /// Entry title
    pub title: String,
    /// What went wrong
    pub error: Error,
}

/// Outcome of one orchestrated batch
#[derive(Debug, Default)]
pub struct RunReport {
    /// Items updated after the reference date
    pub candidates: usize,
    /// Items written to disk
    pub completed: usize,
    /// Items whose target already existed
    pub skipped: usize,
    /// Selected items whose transfer failed
    pub failures: Vec<ItemFailure>,
    /// Feed entries that could not be turned into work items
    pub rejected: Vec<ItemFailure>,
}

impl RunReport {
    /// Items whose copy returned successfully, skips included
    pub fn success_count(&self) -> usize {
        self.completed + self.skipped
    }

    /// Whether any selected item failed to transfer
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Downloads selected items one after another
pub struct DownloadOrchestrator {
    copier: StreamCopier,
    download_dir: PathBuf,
    policy: FailurePolicy,
    cancel: CancellationToken,
}

impl DownloadOrchestrator {
    /// Create an orchestrator writing into `config.download_dir`
    pub fn new(copier: StreamCopier, config: &Config, cancel: CancellationToken) -> Self {
        Self {
            copier,
            download_dir: config.download_dir.clone(),
            policy: config.failure_policy,
            cancel,
        }
    }

    /// Directory items are written to
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Resolve raw feed entries, then download the ones newer than `reference`
    ///
    /// Entries that cannot be resolved are handled by the failure policy:
    /// `abort` returns the first such error, `continue` records it in
    /// [`RunReport::rejected`] and moves on.
    pub async fn run_feed(
        &self,
        entries: &[FeedEntry],
        reference: DateTime<Utc>,
    ) -> Result<RunReport> {
        let mut items = Vec::with_capacity(entries.len());
        let mut rejected = Vec::new();

        for feed_entry in entries {
            match entry::resolve(feed_entry) {
                Ok(item) => items.push(item),
                Err(e) => match self.policy {
                    FailurePolicy::Abort => return Err(e),
                    FailurePolicy::Continue => {
                        warn!(
                            title = %feed_entry.title,
                            error = %e,
                            error_code = e.error_code(),
                            "skipping feed entry"
                        );
                        rejected.push(ItemFailure {
                            title: feed_entry.title.clone(),
                            error: e,
                        });
                    }
                },
            }
        }

        let mut report = self.run(&items, reference).await?;
        report.rejected = rejected;
        Ok(report)
    }

    /// Download every item updated strictly after `reference`, in feed order
    ///
    /// # Errors
    /// - an interruption, always
    /// - the first transfer error when the policy is `abort`
    pub async fn run(&self, items: &[WorkItem], reference: DateTime<Utc>) -> Result<RunReport> {
        let selected = select_newer(items, &reference);
        info!(
            "will download [{}] vodcasts updated after [{}]",
            selected.len(),
            reference.to_rfc3339()
        );

        let mut report = RunReport {
            candidates: selected.len(),
            ..RunReport::default()
        };

        for (index, item) in selected.into_iter().enumerate() {
            info!("[{:03}] downloading {}...", index + 1, item);

            match self.download(item).await {
                Ok(CopyOutcome::Completed { .. }) => report.completed += 1,
                Ok(CopyOutcome::Skipped) => report.skipped += 1,
                Err(e) if e.is_interrupted() => {
                    warn!(title = %item.title, "download interrupted, stopping");
                    return Err(e);
                }
                Err(e) => match self.policy {
                    FailurePolicy::Abort => {
                        error!(title = %item.title, error = %e, "download failed, aborting batch");
                        return Err(e);
                    }
                    FailurePolicy::Continue => {
                        error!(
                            title = %item.title,
                            error = %e,
                            error_code = e.error_code(),
                            "download failed, continuing with next item"
                        );
                        report.failures.push(ItemFailure {
                            title: item.title.clone(),
                            error: e,
                        });
                    }
                },
            }
        }

        info!("downloaded [{}] vodcasts", report.success_count());
        Ok(report)
    }

    async fn download(&self, item: &WorkItem) -> Result<CopyOutcome> {
        let target = self.download_dir.join(&item.local_filename);
        info!(
            target: "vodcast_dl::report",
            "{}({}) - {} - {}",
            target.display(),
            item.updated_at.to_rfc3339(),
            item.source_url,
            item.description.as_deref().unwrap_or("")
        );
        self.copier
            .fetch(&item.source_url, &target, &self.cancel)
            .await
    }
}
