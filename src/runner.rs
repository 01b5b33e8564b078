//! One complete pass over a feed.
//!
//! A run resolves the reference date, reads the feed, downloads what is newer
//! and, when nothing failed, records the run's start time as the next
//! reference date.

use crate::clock::TimeContext;
use crate::config::Config;
use crate::copier::StreamCopier;
use crate::error::Result;
use crate::feed::{FeedReader, FeedSource};
use crate::orchestrator::{DownloadOrchestrator, RunReport};
use crate::state::{FetchState, ReferenceDate, resolve_reference_date};
use crate::transport::{DefaultTransport, Transport};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What a finished run did
#[derive(Debug)]
pub struct RunSummary {
    /// Cutoff used for this run
    pub reference: ReferenceDate,
    /// Per-item results
    pub report: RunReport,
    /// Whether the run's start time was recorded as the next reference date
    pub persisted: bool,
}

/// Runs a configured feed end to end
pub struct FeedRunner {
    config: Config,
    ctx: TimeContext,
    transport: Arc<dyn Transport>,
    cancel: CancellationToken,
}

impl FeedRunner {
    /// Create a runner fetching media over HTTP(S) and from local files
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or the HTTP client cannot
    /// be created
    pub fn new(config: Config, ctx: TimeContext, cancel: CancellationToken) -> Result<Self> {
        let transport = Arc::new(DefaultTransport::new(&config)?);
        Self::with_transport(config, ctx, transport, cancel)
    }

    /// Create a runner with a custom media transport
    ///
    /// # Errors
    /// Returns error if the configuration is invalid
    pub fn with_transport(
        config: Config,
        ctx: TimeContext,
        transport: Arc<dyn Transport>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ctx,
            transport,
            cancel,
        })
    }

    /// State file for the configured feed
    pub fn state(&self) -> FetchState {
        FetchState::new(self.config.state_dir(), &self.config.feed_url)
    }

    /// Execute the run
    ///
    /// # Errors
    /// - the feed cannot be read or parsed
    /// - the batch aborted (interruption, or any failure under the `abort` policy)
    /// - the new reference date cannot be written
    pub async fn run(&self) -> Result<RunSummary> {
        let source = FeedSource::parse(&self.config.feed_url)?;
        debug!(
            threads = self.config.threads,
            "items are downloaded one at a time regardless of thread setting"
        );

        let state = self.state();
        let reference = resolve_reference_date(&state, &self.ctx, self.config.day_offset).await;

        info!("parsing feed at [{}]...", self.config.feed_url);
        let entries = FeedReader::new(&self.config)?.read(&source).await?;

        let copier = StreamCopier::new(self.transport.clone(), &self.config);
        let orchestrator = DownloadOrchestrator::new(copier, &self.config, self.cancel.clone());
        let report = orchestrator.run_feed(&entries, reference.instant).await?;

        let persisted = if report.has_failures() {
            warn!(
                failures = report.failures.len(),
                reference = %self.ctx.to_local(reference.instant).to_rfc3339(),
                "some downloads failed, keeping previous reference date"
            );
            false
        } else {
            state.save(self.ctx.now()).await?;
            info!(
                path = %state.path().display(),
                reference = %self.ctx.to_local(self.ctx.now()).to_rfc3339(),
                "recorded new reference date"
            );
            true
        };

        Ok(RunSummary {
            reference,
            report,
            persisted,
        })
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::state::ReferenceSource;
    use chrono::{FixedOffset, TimeZone, Utc};
    use tempfile::TempDir;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Extra 3</title>
    <link>http://media.example/</link>
    <description>Test feed</description>
    <item>
      <title>Extra 3 one</title>
      <pubDate>Thu, 28 Oct 2010 11:53:49 +0200</pubDate>
      <enclosure url="MEDIA_DIR/missing.mp4" type="video/mp4" length="10"/>
    </item>
  </channel>
</rss>"#;

    fn ctx() -> TimeContext {
        TimeContext::new(
            Utc.with_ymd_and_hms(2010, 10, 29, 8, 0, 0).unwrap(),
            FixedOffset::east_opt(2 * 3600).unwrap(),
        )
    }

    fn config(download: &TempDir, feed_path: &std::path::Path) -> Config {
        Config {
            feed_url: feed_path.display().to_string(),
            download_dir: download.path().to_path_buf(),
            ..Config::default()
        }
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let result = FeedRunner::new(Config::default(), ctx(), CancellationToken::new());
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn failed_download_keeps_previous_reference_date() {
        let download = TempDir::new().unwrap();
        let media = TempDir::new().unwrap();
        let feed_path = media.path().join("feed.xml");
        std::fs::write(
            &feed_path,
            FEED.replace("MEDIA_DIR", &media.path().display().to_string()),
        )
        .unwrap();

        let runner = FeedRunner::new(
            config(&download, &feed_path),
            ctx(),
            CancellationToken::new(),
        )
        .unwrap();
        let summary = runner.run().await.unwrap();

        assert_eq!(summary.reference.source, ReferenceSource::Fallback { days: 7 });
        assert_eq!(summary.report.failures.len(), 1);
        assert!(!summary.persisted);
        assert!(!runner.state().path().exists());
    }

    #[tokio::test]
    async fn successful_run_records_start_time() {
        let download = TempDir::new().unwrap();
        let media = TempDir::new().unwrap();
        let feed_path = media.path().join("feed.xml");
        std::fs::write(
            &feed_path,
            FEED.replace("MEDIA_DIR", &media.path().display().to_string()),
        )
        .unwrap();
        std::fs::write(media.path().join("missing.mp4"), b"0123456789").unwrap();

        let runner = FeedRunner::new(
            config(&download, &feed_path),
            ctx(),
            CancellationToken::new(),
        )
        .unwrap();
        let summary = runner.run().await.unwrap();

        assert_eq!(summary.report.success_count(), 1);
        assert!(summary.persisted);
        assert_eq!(runner.state().load(&ctx()).await.unwrap(), ctx().now());

        // Second run starts from the recorded date and finds nothing new
        let again = runner.run().await.unwrap();
        assert_eq!(again.reference.source, ReferenceSource::Persisted);
        assert_eq!(again.report.candidates, 0);
    }

    #[tokio::test]
    async fn unreadable_feed_is_an_error() {
        let download = TempDir::new().unwrap();
        let media = TempDir::new().unwrap();
        let feed_path = media.path().join("feed.xml");
        std::fs::write(&feed_path, "this is not xml").unwrap();

        let runner = FeedRunner::new(
            config(&download, &feed_path),
            ctx(),
            CancellationToken::new(),
        )
        .unwrap();

        let err = runner.run().await.unwrap_err();
        assert!(matches!(err, Error::Feed(_)));
        assert!(!runner.state().path().exists());
    }
}
