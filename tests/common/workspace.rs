//! Scratch directories for end-to-end runs

use chrono::{FixedOffset, TimeZone, Utc};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use vodcast_dl::{Config, TimeContext};

/// Media, download and state directories under one temporary root
pub struct Workspace {
    _root: TempDir,
    /// Where source media and feed files live
    pub media_dir: PathBuf,
    /// Download target
    pub download_dir: PathBuf,
    /// Reference date storage
    pub state_dir: PathBuf,
}

impl Workspace {
    /// Create the directory layout
    pub fn new() -> Self {
        let root = TempDir::new().expect("failed to create temp dir");
        let media_dir = root.path().join("media");
        let download_dir = root.path().join("downloads");
        let state_dir = root.path().join("state");
        for dir in [&media_dir, &download_dir, &state_dir] {
            std::fs::create_dir_all(dir).expect("failed to create test dir");
        }
        Self {
            _root: root,
            media_dir,
            download_dir,
            state_dir,
        }
    }

    /// Write a media file and return its `file://` URL
    pub fn write_media(&self, name: &str, content: &[u8]) -> String {
        let path = self.media_dir.join(name);
        std::fs::write(&path, content).expect("failed to write media");
        url::Url::from_file_path(&path)
            .expect("temp path must be absolute")
            .to_string()
    }

    /// Write a feed document and return its path
    pub fn write_feed(&self, content: &str) -> PathBuf {
        let path = self.media_dir.join("feed.xml");
        std::fs::write(&path, content).expect("failed to write feed");
        path
    }

    /// Configuration pointing at this workspace
    pub fn config(&self, feed_url: &str) -> Config {
        Config {
            feed_url: feed_url.to_string(),
            download_dir: self.download_dir.clone(),
            state_dir: Some(self.state_dir.clone()),
            chunk_size: 4 * 1024,
            ..Config::default()
        }
    }

    /// Path of a downloaded file
    pub fn downloaded(&self, name: &str) -> PathBuf {
        self.download_dir.join(name)
    }

    /// Names of all files in the download directory, sorted
    pub fn downloaded_names(&self) -> Vec<String> {
        list_names(&self.download_dir)
    }
}

/// Sorted file names in `dir`
pub fn list_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("failed to list dir")
        .map(|entry| {
            entry
                .expect("failed to read dir entry")
                .file_name()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    names.sort();
    names
}

/// Fixed run clock in Berlin summer time
pub fn clock(year: i32, month: u32, day: u32, hour: u32) -> TimeContext {
    TimeContext::new(
        Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
            .single()
            .expect("valid test date"),
        FixedOffset::east_opt(2 * 3600).expect("valid offset"),
    )
}
