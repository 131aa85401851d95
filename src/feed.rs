//! # Upstream Release Feed
//!
//! The release feed lists one entry per `(board, channel)`:
//!
//! ```json
//! {"omahaData": [{"board": {"publicCodename": "grunt-kernelnext"},
//!                 "channel": "beta", "milestone": 85,
//!                 "chromeOsVersion": "13310.41.0"}]}
//! ```
//!
//! Only beta-channel entries are kept. Board names have every `-` replaced by
//! `_`, versions are assembled as `R<milestone>-<chromeOsVersion>`, and when a
//! build target appears more than once the greatest OS version wins.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use log::{debug, warn};
use serde::Deserialize;

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::version::{parse_os, OsVersion};

/// The only channel consumed from the feed.
pub const BETA_CHANNEL: &str = "beta";

#[derive(Debug, Default, Deserialize)]
struct ReleaseFeed {
    #[serde(rename = "omahaData", default)]
    omaha_data: Vec<FeedEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct FeedEntry {
    #[serde(default)]
    board: FeedBoard,
    #[serde(default)]
    channel: String,
    #[serde(default)]
    milestone: u64,
    #[serde(rename = "chromeOsVersion", default)]
    chrome_os_version: String,
}

#[derive(Debug, Default, Deserialize)]
struct FeedBoard {
    #[serde(rename = "publicCodename", default)]
    public_codename: String,
}

/// Latest upstream OS version of one build target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamVersion {
    pub build_target: String,
    pub os_version: String,
}

impl UpstreamVersion {
    pub fn new(build_target: &str, os_version: &str) -> Self {
        Self {
            build_target: build_target.to_string(),
            os_version: os_version.to_string(),
        }
    }
}

/// Normalize a public board codename into a build target name.
pub fn normalize_board(name: &str) -> String {
    name.replace('-', "_")
}

/// Extract the newest beta-channel OS version per build target, ordered by
/// build target.
pub fn parse_release_feed(bytes: &[u8]) -> Result<Vec<UpstreamVersion>> {
    let feed: ReleaseFeed = serde_json::from_slice(bytes).map_err(|e| Error::Decode {
        message: format!("cannot decode release feed: {}", e),
    })?;

    let mut newest: BTreeMap<String, (OsVersion, String)> = BTreeMap::new();
    for entry in feed.omaha_data {
        if !entry.channel.eq_ignore_ascii_case(BETA_CHANNEL) {
            continue;
        }
        let build_target = normalize_board(&entry.board.public_codename);
        if build_target.is_empty() {
            debug!("Skipping feed entry without a board name");
            continue;
        }
        let version = format!("R{}-{}", entry.milestone, entry.chrome_os_version);
        let parsed = match parse_os(&version) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Skipping feed entry for {}: {}", build_target, e);
                continue;
            }
        };
        match newest.get(&build_target) {
            Some((current, _)) if current.cmp(&parsed) != Ordering::Less => {}
            _ => {
                newest.insert(build_target, (parsed, version));
            }
        }
    }

    Ok(newest
        .into_iter()
        .map(|(build_target, (_, os_version))| UpstreamVersion {
            build_target,
            os_version,
        })
        .collect())
}

/// Read the raw release feed from an `http(s)://` URL, a `gs://` object or a
/// local file.
pub fn fetch_release_feed(source: &str, cancel: &CancelToken) -> Result<Vec<u8>> {
    cancel.check()?;
    debug!("Reading release feed from {}", source);
    if source.starts_with("http://") || source.starts_with("https://") {
        crate::archive::http_get(source)
    } else if source.starts_with("gs://") {
        crate::gsutil::cat(source)
    } else if source.starts_with("file://") {
        let url = url::Url::parse(source)?;
        let path = url.to_file_path().map_err(|_| Error::Config {
            message: format!("not a local file URL: {}", source),
            hint: None,
        })?;
        Ok(std::fs::read(path)?)
    } else {
        Ok(std::fs::read(source)?)
    }
}
