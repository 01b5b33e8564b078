//! Feed retrieval and parsing.
//!
//! Turns a feed location (http(s) URL, `file://` URL or local path) into a list of
//! [`FeedEntry`] values. Both RSS 2.0 and Atom are supported; RSS is tried first.
//! Entries are kept in document order and carry their timestamp with the offset
//! the feed used, so later stages can normalise it themselves.

use crate::config::Config;
use crate::error::{Error, FeedError, Result};
use chrono::{DateTime, FixedOffset};
use std::path::PathBuf;
use tracing::{debug, info};
use url::Url;

/// A media reference attached to a feed entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Enclosure {
    /// Media URL as written in the feed
    pub url: String,

    /// Declared content type (empty when the feed omits it)
    pub mime_type: String,

    /// Declared length in bytes, if present and numeric
    pub length: Option<u64>,
}

/// One entry of a parsed feed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedEntry {
    /// Entry title
    pub title: String,

    /// Entry description or summary
    pub description: Option<String>,

    /// Publish/update time with the feed's own offset
    pub updated: Option<DateTime<FixedOffset>>,

    /// Attached media, in document order
    pub enclosures: Vec<Enclosure>,
}

/// Where a feed is read from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeedSource {
    /// Remote feed fetched over HTTP(S)
    Http(Url),
    /// Local feed file
    File(PathBuf),
}

impl FeedSource {
    /// Classify a feed location given on the command line or in a config file
    pub fn parse(source: &str) -> Result<Self> {
        match Url::parse(source) {
            Ok(url) => match url.scheme() {
                "http" | "https" => Ok(FeedSource::Http(url)),
                "file" => url.to_file_path().map(FeedSource::File).map_err(|()| {
                    invalid_source(source, "file URL does not name a local path")
                }),
                // Windows drive letters parse as one-letter schemes
                scheme if scheme.len() == 1 => Ok(FeedSource::File(PathBuf::from(source))),
                scheme => Err(invalid_source(
                    source,
                    &format!("unsupported scheme '{scheme}'"),
                )),
            },
            // Anything that is not an absolute URL is treated as a path
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Ok(FeedSource::File(PathBuf::from(source)))
            }
            Err(e) => Err(invalid_source(source, &e.to_string())),
        }
    }
}

fn invalid_source(source: &str, reason: &str) -> Error {
    Error::Feed(FeedError::InvalidSource {
        source_str: source.to_string(),
        reason: reason.to_string(),
    })
}

/// Fetches and parses feeds
pub struct FeedReader {
    /// HTTP client for fetching remote feeds
    http_client: reqwest::Client,
}

impl FeedReader {
    /// Create a feed reader using the HTTP settings from `config`
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http_client })
    }

    /// Fetch a feed and parse its entries
    ///
    /// # Errors
    /// Returns error if:
    /// - the source cannot be read (HTTP failure, missing file)
    /// - the content is neither RSS nor Atom
    pub async fn read(&self, source: &FeedSource) -> Result<Vec<FeedEntry>> {
        info!(source = ?source, "parsing feed");
        let content = match source {
            FeedSource::Http(url) => self.fetch_remote(url).await?,
            FeedSource::File(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
                Error::Feed(FeedError::FetchFailed {
                    url: path.display().to_string(),
                    reason: e.to_string(),
                })
            })?,
        };

        let entries = parse_feed(&content)?;
        info!("found {} feed entries", entries.len());
        Ok(entries)
    }

    async fn fetch_remote(&self, url: &Url) -> Result<String> {
        let fetch_failed = |reason: String| {
            Error::Feed(FeedError::FetchFailed {
                url: url.to_string(),
                reason,
            })
        };

        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| fetch_failed(e.to_string()))?;

        // Check HTTP status before trying to parse the response body
        let status = response.status();
        if !status.is_success() {
            return Err(fetch_failed(format!("HTTP {}", status.as_u16())));
        }

        response.text().await.map_err(|e| fetch_failed(e.to_string()))
    }
}

/// Parse raw feed content, trying RSS first and Atom second
pub fn parse_feed(content: &str) -> Result<Vec<FeedEntry>> {
    match parse_as_rss(content) {
        Ok(entries) => {
            debug!("Successfully parsed as RSS, found {} entries", entries.len());
            Ok(entries)
        }
        Err(rss_err) => {
            debug!("Failed to parse as RSS: {}, trying Atom", rss_err);
            match parse_as_atom(content) {
                Ok(entries) => {
                    debug!("Successfully parsed as Atom, found {} entries", entries.len());
                    Ok(entries)
                }
                Err(atom_err) => Err(Error::Feed(FeedError::Parse {
                    rss: rss_err,
                    atom: atom_err,
                })),
            }
        }
    }
}

/// Parse feed content as RSS
fn parse_as_rss(content: &str) -> std::result::Result<Vec<FeedEntry>, String> {
    let channel = content
        .parse::<rss::Channel>()
        .map_err(|e| format!("RSS parse error: {}", e))?;

    let entries = channel
        .items()
        .iter()
        .map(|item| {
            // pubDate should be RFC 2822, some feeds put RFC 3339 there
            let updated = item.pub_date().and_then(parse_timestamp);

            let enclosures = item
                .enclosure()
                .map(|enc| Enclosure {
                    url: enc.url().trim().to_string(),
                    mime_type: enc.mime_type().trim().to_string(),
                    length: enc.length().trim().parse::<u64>().ok(),
                })
                .into_iter()
                .collect();

            FeedEntry {
                title: item.title().unwrap_or("").to_string(),
                description: item.description().map(|d| d.to_string()),
                updated,
                enclosures,
            }
        })
        .collect();

    Ok(entries)
}

/// Parse feed content as Atom
fn parse_as_atom(content: &str) -> std::result::Result<Vec<FeedEntry>, String> {
    let feed = atom_syndication::Feed::read_from(content.as_bytes())
        .map_err(|e| format!("Atom parse error: {}", e))?;

    let entries = feed
        .entries()
        .iter()
        .map(|entry| {
            // Publication date (prefer published, fallback to updated)
            let updated = entry
                .published()
                .or_else(|| Some(entry.updated()))
                .and_then(|dt| DateTime::parse_from_rfc3339(&dt.to_rfc3339()).ok());

            let enclosures = entry
                .links()
                .iter()
                .filter(|link| link.rel() == "enclosure")
                .map(|link| Enclosure {
                    url: link.href().trim().to_string(),
                    mime_type: link.mime_type().unwrap_or("").trim().to_string(),
                    length: link.length().and_then(|l| l.trim().parse::<u64>().ok()),
                })
                .collect();

            // Description from summary or content
            let description = entry.summary().map(|s| s.as_str().to_string()).or_else(|| {
                entry
                    .content()
                    .and_then(|c| c.value().map(|v| v.to_string()))
            });

            FeedEntry {
                title: entry.title().as_str().to_string(),
                description,
                updated,
                enclosures,
            }
        })
        .collect();

    Ok(entries)
}

/// Parse an RFC 2822 or RFC 3339 timestamp, keeping its offset
pub fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
}
