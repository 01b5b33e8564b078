//! Resolution of raw feed entries into work items.
//!
//! A [`WorkItem`] is the normalised view of one downloadable entry: the media URL,
//! the file name it will be stored under and its update time as an absolute UTC
//! instant. Resolution is pure; the same entry always yields the same result.

use crate::error::{ResolveError, Result};
use crate::feed::FeedEntry;
use crate::utils::file_name_from_url;
use chrono::{DateTime, Utc};
use std::fmt;

/// Enclosure types accepted for download
///
/// Anything else is rejected rather than guessed at.
pub const SUPPORTED_MEDIA_TYPES: &[&str] = &["video/mp4", "video/mpeg", "video/x-mp4"];

/// A resolved media entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkItem {
    /// Display title
    pub title: String,

    /// Absolute URL of the media payload
    pub source_url: String,

    /// Leaf file name derived from `source_url`
    pub local_filename: String,

    /// When the entry last changed, normalised to UTC
    pub updated_at: DateTime<Utc>,

    /// Entry description, informational only
    pub description: Option<String>,
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (name={}, url={}, updated={})",
            self.title,
            self.local_filename,
            self.source_url,
            self.updated_at.to_rfc3339()
        )
    }
}

/// Whether `mime_type` is one of [`SUPPORTED_MEDIA_TYPES`]
///
/// Parameters such as `; codecs=...` are ignored, the comparison is case-insensitive.
pub fn is_supported_media_type(mime_type: &str) -> bool {
    let essence = mime_type.split(';').next().unwrap_or("").trim();
    SUPPORTED_MEDIA_TYPES
        .iter()
        .any(|supported| supported.eq_ignore_ascii_case(essence))
}

/// Resolve one feed entry into a work item
///
/// Only the first enclosure is considered.
///
/// # Errors
/// - [`ResolveError::MissingEnclosure`] when the entry has no enclosure
/// - [`ResolveError::UnsupportedMediaType`] when the first enclosure is not a supported video type
/// - [`ResolveError::InvalidFilename`] when no file name can be derived from its URL
/// - [`ResolveError::MissingTimestamp`] when the entry has no parseable timestamp
pub fn resolve(entry: &FeedEntry) -> Result<WorkItem> {
    let enclosure = entry
        .enclosures
        .first()
        .ok_or_else(|| ResolveError::MissingEnclosure {
            title: entry.title.clone(),
        })?;

    if !is_supported_media_type(&enclosure.mime_type) {
        return Err(ResolveError::UnsupportedMediaType {
            title: entry.title.clone(),
            mime_type: enclosure.mime_type.clone(),
        }
        .into());
    }

    let local_filename =
        file_name_from_url(&enclosure.url).ok_or_else(|| ResolveError::InvalidFilename {
            url: enclosure.url.clone(),
        })?;

    let updated_at = entry
        .updated
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| ResolveError::MissingTimestamp {
            title: entry.title.clone(),
        })?;

    Ok(WorkItem {
        title: entry.title.clone(),
        source_url: enclosure.url.clone(),
        local_filename,
        updated_at,
        description: entry.description.clone(),
    })
}
