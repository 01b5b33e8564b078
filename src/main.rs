use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use vodcast_dl::{Config, Error, FeedRunner, Result, RunSummary, TimeContext, ToExitCode};

/// Exit code when the run finished but some downloads failed
const PARTIAL_FAILURE_EXIT: u8 = 4;

/// Download the vodcasts a feed published since the last run
#[derive(Clone, Debug, Parser)]
#[command(name = "vodcast-dl", version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Cli {
    /// Download vodcasts from feed URL (http, https, file:// or a local path)
    #[arg(short = 'u', long = "url", value_name = "URL")]
    url: Option<String>,

    /// Save vodcasts in DIR
    #[arg(short = 'd', long = "download-directory", value_name = "DIR")]
    download_directory: Option<PathBuf>,

    /// Only download vodcasts DAYS old or younger when no earlier run was recorded
    #[arg(short = 'o', long = "day-offset", value_name = "DAYS")]
    day_offset: Option<u32>,

    /// How many THREADS to use for download
    #[arg(short = 't', long = "threads", value_name = "THREADS")]
    threads: Option<usize>,

    /// Directory for the per-feed reference date (default: the download directory)
    #[arg(long = "state-dir", value_name = "DIR")]
    state_dir: Option<PathBuf>,

    /// Offset from UTC in minutes for reading legacy timestamps (default: host offset)
    #[arg(long = "utc-offset", value_name = "MINUTES", allow_hyphen_values = true)]
    utc_offset: Option<i32>,

    /// Read settings from a TOML or JSON file; flags override its values
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print status messages; repeat for debug output
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path).map_err(|e| Error::Config {
                message: format!("cannot load {}: {}", path.display(), e),
                key: None,
            })?,
            None => Config::default(),
        };

        if let Some(url) = self.url {
            config.feed_url = url;
        }
        if let Some(dir) = self.download_directory {
            config.download_dir = dir;
        }
        if let Some(days) = self.day_offset {
            config.day_offset = days;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(dir) = self.state_dir {
            config.state_dir = Some(dir);
        }
        if let Some(minutes) = self.utc_offset {
            config.utc_offset_minutes = Some(minutes);
        }
        Ok(config)
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,vodcast_dl={level}")));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(cli: Cli) -> Result<RunSummary> {
    let config = cli.into_config()?;
    let ctx = TimeContext::capture(config.utc_offset_minutes);

    let cancel = CancellationToken::new();
    let listener = vodcast_dl::signal::cancel_on_signal(cancel.clone());

    let runner = FeedRunner::new(config, ctx, cancel.clone())?;
    let result = runner.run().await;

    cancel.cancel();
    listener.await.ok();
    result
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(summary) => {
            let report = &summary.report;
            info!(
                candidates = report.candidates,
                completed = report.completed,
                skipped = report.skipped,
                failed = report.failures.len(),
                rejected = report.rejected.len(),
                "run finished"
            );
            if report.has_failures() {
                for failure in &report.failures {
                    error!(title = %failure.title, error = %failure.error, "download failed");
                }
                ExitCode::from(PARTIAL_FAILURE_EXIT)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            error!(error = %e, error_code = e.error_code(), "run failed");
            ExitCode::from(e.exit_code())
        }
    }
}
