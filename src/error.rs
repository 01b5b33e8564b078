//! Error types for vodcast-dl
//!
//! This module provides the error taxonomy for the library, including:
//! - Domain-specific error types (feed, entry resolution, transfer, persisted state)
//! - Exit code mapping for the command line front end
//! - Machine-readable error codes for structured log fields

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for vodcast-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for vodcast-dl
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "download_dir")
        key: Option<String>,
    },

    /// Feed could not be fetched or parsed
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    /// A feed entry could not be turned into a work item
    #[error("entry error: {0}")]
    Resolve(#[from] ResolveError),

    /// Streaming an enclosure to disk failed or was interrupted
    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),

    /// The persisted reference date could not be used
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON (de)serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML configuration parse error
    #[error("configuration parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error stems from a deliberate interruption rather than a fault
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::Transfer(TransferError::Interrupted { .. }))
    }
}

/// Feed retrieval and parsing errors
#[derive(Debug, Error)]
pub enum FeedError {
    /// The feed source string is neither a URL nor a readable path
    #[error("invalid feed source '{source_str}': {reason}")]
    InvalidSource {
        /// The source as given by the caller
        source_str: String,
        /// Why it was rejected
        reason: String,
    },

    /// The feed could not be fetched
    #[error("failed to fetch feed {url}: {reason}")]
    FetchFailed {
        /// Feed location
        url: String,
        /// Underlying failure
        reason: String,
    },

    /// The feed content is neither RSS nor Atom
    #[error("failed to parse feed as RSS or Atom. RSS error: {rss}. Atom error: {atom}")]
    Parse {
        /// RSS parser message
        rss: String,
        /// Atom parser message
        atom: String,
    },
}

/// Errors raised while resolving a feed entry into a work item
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The enclosure's declared type is not a supported video container
    #[error("unsupported media type '{mime_type}' for entry '{title}'")]
    UnsupportedMediaType {
        /// Entry title
        title: String,
        /// Declared enclosure type
        mime_type: String,
    },

    /// The entry has no enclosure at all
    #[error("entry '{title}' has no enclosure")]
    MissingEnclosure {
        /// Entry title
        title: String,
    },

    /// The entry carries no parseable publish/update timestamp
    #[error("entry '{title}' has no usable timestamp")]
    MissingTimestamp {
        /// Entry title
        title: String,
    },

    /// No local file name can be derived from the enclosure URL
    #[error("cannot derive a file name from enclosure url '{url}'")]
    InvalidFilename {
        /// Enclosure URL
        url: String,
    },
}

/// Errors raised while streaming an enclosure to disk
#[derive(Debug, Error)]
pub enum TransferError {
    /// I/O failure while streaming; the partial target has been removed
    #[error("transfer of {url} to {target} failed: {source}")]
    Fault {
        /// Source URL
        url: String,
        /// Target file that was removed
        target: PathBuf,
        /// Triggering I/O error
        #[source]
        source: std::io::Error,
    },

    /// Transfer cancelled by the user; the partial target has been removed
    #[error("user interrupted transfer to {target}")]
    Interrupted {
        /// Target file that was removed
        target: PathBuf,
    },

    /// Remote answered with a non-success status
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// Source URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// The media request failed before a response arrived
    #[error("request for {url} failed: {source}")]
    Request {
        /// Source URL
        url: String,
        /// Underlying client error
        #[source]
        source: reqwest::Error,
    },

    /// No transport handles the URL's scheme
    #[error("no transport for '{url}'")]
    UnsupportedScheme {
        /// Source URL
        url: String,
    },

    /// Declared payload does not fit on the target filesystem
    #[error("insufficient disk space: need {required} bytes, have {available} bytes")]
    InsufficientSpace {
        /// Declared payload size
        required: u64,
        /// Free bytes reported by the filesystem
        available: u64,
    },
}

/// Reference date persistence errors (reference date unavailable)
#[derive(Debug, Error)]
pub enum StateError {
    /// No state file exists yet for this feed
    #[error("no reference date recorded at {path}")]
    Missing {
        /// Expected state file location
        path: PathBuf,
    },

    /// The state file exists but cannot be read or parsed
    #[error("reference date at {path} is unreadable: {reason}")]
    Unreadable {
        /// State file location
        path: PathBuf,
        /// Why it could not be used
        reason: String,
    },
}

/// Map errors to process exit codes and machine-readable codes
///
/// Used by the binary to pick its exit status and by log lines that want a
/// stable `error_code` field.
pub trait ToExitCode {
    /// Get the process exit code for this error
    fn exit_code(&self) -> u8;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToExitCode for Error {
    fn exit_code(&self) -> u8 {
        match self {
            // 2 - usage / configuration problems
            Error::Config { .. } => 2,
            Error::TomlParse(_) => 2,

            // 130 - conventional code for SIGINT
            Error::Transfer(TransferError::Interrupted { .. }) => 130,

            // 3 - feed could not be obtained
            Error::Feed(_) => 3,
            Error::Network(_) => 3,

            // 4 - entry or transfer failure
            Error::Resolve(_) => 4,
            Error::Transfer(_) => 4,

            // 1 - everything else
            Error::State(_) => 1,
            Error::Io(_) => 1,
            Error::Serialization(_) => 1,
            Error::Other(_) => 1,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::TomlParse(_) => "config_parse_error",
            Error::Feed(e) => match e {
                FeedError::InvalidSource { .. } => "invalid_feed_source",
                FeedError::FetchFailed { .. } => "feed_fetch_failed",
                FeedError::Parse { .. } => "feed_parse_failed",
            },
            Error::Resolve(e) => match e {
                ResolveError::UnsupportedMediaType { .. } => "unsupported_media_type",
                ResolveError::MissingEnclosure { .. } => "missing_enclosure",
                ResolveError::MissingTimestamp { .. } => "missing_timestamp",
                ResolveError::InvalidFilename { .. } => "invalid_filename",
            },
            Error::Transfer(e) => match e {
                TransferError::Fault { .. } => "transfer_fault",
                TransferError::Interrupted { .. } => "user_interrupted",
                TransferError::HttpStatus { .. } => "http_status",
                TransferError::Request { .. } => "request_failed",
                TransferError::UnsupportedScheme { .. } => "unsupported_scheme",
                TransferError::InsufficientSpace { .. } => "insufficient_space",
            },
            Error::State(e) => match e {
                StateError::Missing { .. } => "reference_date_missing",
                StateError::Unreadable { .. } => "reference_date_unreadable",
            },
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::Other(_) => "internal_error",
        }
    }
}
