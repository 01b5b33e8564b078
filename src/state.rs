//! Persisted "last fetched" instant per feed.
//!
//! Each feed gets one small file in the state directory, named after a SHA-224
//! digest of the feed URL so the same feed always maps to the same file. The
//! file holds a single RFC 3339 timestamp. Files written by older releases hold
//! a naive `Tue Oct 26 11:53:49 2010` style value, which is read in the
//! configured UTC offset.

use crate::clock::TimeContext;
use crate::error::{Result, StateError};
use chrono::{DateTime, NaiveDateTime, Utc};
use sha2::{Digest, Sha224};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Prefix of every state file name
pub const STATE_FILE_PREFIX: &str = ".vodcast-dl-";

/// Naive timestamp format used by older state files
pub const LEGACY_TIMESTAMP_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Hex SHA-224 digest identifying a feed
pub fn feed_digest(feed_url: &str) -> String {
    let mut hasher = Sha224::new();
    hasher.update(feed_url.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// The state file of one feed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchState {
    path: PathBuf,
}

impl FetchState {
    /// State file for `feed_url` inside `state_dir`
    pub fn new(state_dir: &Path, feed_url: &str) -> Self {
        let path = state_dir.join(format!("{}{}", STATE_FILE_PREFIX, feed_digest(feed_url)));
        Self { path }
    }

    /// Location of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the recorded instant
    ///
    /// # Errors
    /// - [`StateError::Missing`] when no file exists
    /// - [`StateError::Unreadable`] when it cannot be read or parsed
    pub async fn load(&self, ctx: &TimeContext) -> Result<DateTime<Utc>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StateError::Missing {
                    path: self.path.clone(),
                }
                .into());
            }
            Err(e) => return Err(self.unreadable(e.to_string())),
        };

        parse_state(content.trim(), ctx).ok_or_else(|| {
            self.unreadable(format!("unrecognised timestamp '{}'", content.trim()))
        })
    }

    /// Record `instant` as the new reference date
    ///
    /// Written to a sibling temporary file first and renamed into place.
    pub async fn save(&self, instant: DateTime<Utc>) -> Result<()> {
        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);

        tokio::fs::write(&temp, format!("{}\n", instant.to_rfc3339())).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        debug!(path = %self.path.display(), instant = %instant.to_rfc3339(), "saved reference date");
        Ok(())
    }

    fn unreadable(&self, reason: String) -> crate::error::Error {
        StateError::Unreadable {
            path: self.path.clone(),
            reason,
        }
        .into()
    }
}

fn parse_state(value: &str, ctx: &TimeContext) -> Option<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Some(instant.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, LEGACY_TIMESTAMP_FORMAT)
        .ok()
        .and_then(|naive| ctx.localize(naive))
}

/// Where a run's reference date came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReferenceSource {
    /// Read from the feed's state file
    Persisted,
    /// No usable state; `now` minus `days`
    Fallback {
        /// Days subtracted from the run start
        days: u32,
    },
}

/// The cutoff instant for a run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReferenceDate {
    /// Only items updated strictly after this are downloaded
    pub instant: DateTime<Utc>,
    /// Where it came from
    pub source: ReferenceSource,
}

/// Reference date from `state`, or `day_offset` days before the run start
pub async fn resolve_reference_date(
    state: &FetchState,
    ctx: &TimeContext,
    day_offset: u32,
) -> ReferenceDate {
    match state.load(ctx).await {
        Ok(instant) => {
            info!(
                reference = %ctx.to_local(instant).to_rfc3339(),
                "using recorded reference date"
            );
            ReferenceDate {
                instant,
                source: ReferenceSource::Persisted,
            }
        }
        Err(e) => {
            let instant = ctx.days_ago(day_offset);
            warn!(
                error = %e,
                days = day_offset,
                reference = %ctx.to_local(instant).to_rfc3339(),
                "reference date unavailable, falling back to day offset"
            );
            ReferenceDate {
                instant,
                source: ReferenceSource::Fallback { days: day_offset },
            }
        }
    }
}
