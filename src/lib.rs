//! # vodcast-dl
//!
//! Unattended fetcher for video podcasts: reads an RSS or Atom feed, picks the
//! entries published since the last successful run and streams their video
//! enclosures into a download directory.
//!
//! ## Design Philosophy
//!
//! vodcast-dl is designed to be:
//! - **Safe to re-run** - Existing files are skipped, partial files never survive a failure
//! - **Reproducible** - "Now" and the local offset are explicit values, never read implicitly
//! - **Library-first** - The `vodcast-dl` binary is a thin shell over [`FeedRunner`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use vodcast_dl::{Config, FeedRunner, TimeContext};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         feed_url: "http://some.domain/rss.xml".to_string(),
//!         download_dir: "/srv/vodcasts".into(),
//!         ..Default::default()
//!     };
//!
//!     let runner = FeedRunner::new(config, TimeContext::capture(None), CancellationToken::new())?;
//!     let summary = runner.run().await?;
//!     println!("downloaded {} vodcasts", summary.report.success_count());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Explicit run time and UTC offset
pub mod clock;
/// Configuration types
pub mod config;
/// Chunked enclosure copying with progress reporting
pub mod copier;
/// Feed entry resolution
pub mod entry;
/// Error types
pub mod error;
/// Feed retrieval and parsing
pub mod feed;
/// Recency filtering
pub mod filter;
/// Batch download orchestration
pub mod orchestrator;
/// Progress and ETA estimation
pub mod progress;
/// End-to-end feed runs
pub mod runner;
/// Signal handling
pub mod signal;
/// Persisted reference dates
pub mod state;
/// Media transports
pub mod transport;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use clock::TimeContext;
pub use config::{Config, FailurePolicy};
pub use copier::{CopyOutcome, StreamCopier};
pub use entry::WorkItem;
pub use error::{
    Error, FeedError, ResolveError, Result, StateError, ToExitCode, TransferError,
};
pub use feed::{FeedEntry, FeedReader, FeedSource};
pub use orchestrator::{DownloadOrchestrator, ItemFailure, RunReport};
pub use progress::{ProgressEstimator, ProgressSnapshot};
pub use runner::{FeedRunner, RunSummary};
pub use state::{FetchState, ReferenceDate, ReferenceSource};
pub use transport::{DefaultTransport, FileTransport, HttpTransport, Payload, Transport};
