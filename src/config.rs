//! # Tool Configuration
//!
//! This module defines the YAML configuration file read by `labfleet` at
//! startup, and the logic for locating, parsing and validating it.
//!
//! ## Example
//!
//! ```yaml
//! archive_root: gs://chromeos-image-archive
//! release_feed: https://example.com/omaha_status.json
//! manifest_repo: https://example.com/lab/config.git
//! manifest_branch: main
//! manifest_path: lab_platform/stable_version_data/stable_versions.cfg
//! push_ref: refs/for/main
//! strict_os_models: true
//! allow_lists:
//!   missing_boards: [fizz-labstation]
//!   failed_to_lookup: ["nami;kefka"]
//!   invalid_versions: ["octopus;bobba"]
//! ```
//!
//! Every field is optional; missing fields fall back to the values in
//! [`crate::defaults`]. Unknown keys are rejected so that typos surface
//! immediately.
//!
//! ## Lookup order
//!
//! 1.  The path given with `--config`.
//! 2.  The `LABFLEET_CONFIG` environment variable.
//! 3.  `<config dir>/labfleet/config.yaml` if it exists.
//! 4.  Built-in defaults.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{Error, Result};

/// Known-benign anomalies removed from deep-validation reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AllowLists {
    /// Build targets without archive records.
    #[serde(default)]
    pub missing_boards: BTreeSet<String>,
    /// `board;model` pairs whose firmware cannot be looked up.
    #[serde(default)]
    pub failed_to_lookup: BTreeSet<String>,
    /// `board;model` pairs whose firmware legitimately differs.
    #[serde(default)]
    pub invalid_versions: BTreeSet<String>,
}

impl AllowLists {
    pub fn is_empty(&self) -> bool {
        self.missing_boards.is_empty()
            && self.failed_to_lookup.is_empty()
            && self.invalid_versions.is_empty()
    }
}

/// Top-level tool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// Image archive root (`gs://`, `http(s)://`, `file://` or a local path).
    pub archive_root: String,
    /// Upstream release feed (`http(s)://`, `gs://` or a local path).
    pub release_feed: Option<String>,
    /// Git URL or local path of the repository holding the manifest.
    pub manifest_repo: Option<String>,
    /// Branch of `manifest_repo` to read.
    pub manifest_branch: String,
    /// Path of the manifest inside `manifest_repo`.
    pub manifest_path: String,
    /// Ref that new manifest revisions are pushed to.
    pub push_ref: String,
    /// Reject OS entries that carry a model during shallow validation.
    pub strict_os_models: bool,
    pub allow_lists: AllowLists,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            archive_root: defaults::ARCHIVE_ROOT.to_string(),
            release_feed: None,
            manifest_repo: None,
            manifest_branch: defaults::MANIFEST_BRANCH.to_string(),
            manifest_path: defaults::MANIFEST_PATH.to_string(),
            push_ref: defaults::PUSH_REF.to_string(),
            strict_os_models: true,
            allow_lists: AllowLists::default(),
        }
    }
}

impl Config {
    /// Check values serde cannot check on its own.
    pub fn validate(&self) -> Result<()> {
        if self.archive_root.trim().is_empty() {
            return Err(Error::Config {
                message: "archive_root must not be empty".to_string(),
                hint: None,
            });
        }
        if self.archive_root.contains("://") {
            url::Url::parse(&self.archive_root).map_err(|e| Error::Config {
                message: format!("invalid archive_root {:?}: {}", self.archive_root, e),
                hint: Some("use gs://bucket, https://host/path or a local directory".to_string()),
            })?;
        }

        let keyed = [
            ("failed_to_lookup", &self.allow_lists.failed_to_lookup),
            ("invalid_versions", &self.allow_lists.invalid_versions),
        ];
        for (list, entries) in keyed {
            for entry in entries {
                let valid = matches!(
                    entry.split_once(';'),
                    Some((board, model)) if !board.is_empty() && !model.is_empty() && !model.contains(';')
                );
                if !valid {
                    return Err(Error::Config {
                        message: format!("malformed allow_lists.{} entry {:?}", list, entry),
                        hint: Some("entries must look like \"board;model\"".to_string()),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Parses a YAML string into a `Config` and validates it.
pub fn parse(yaml_content: &str) -> Result<Config> {
    // An empty file means "all defaults"
    if yaml_content.trim().is_empty() {
        return Ok(Config::default());
    }
    let config: Config = serde_yaml::from_str(yaml_content)?;
    config.validate()?;
    Ok(config)
}

/// Parse a `Config` from a YAML file path
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("cannot read {}: {}", path.display(), e),
        hint: None,
    })?;
    parse(&content)
}

/// Load the configuration following the documented lookup order.
///
/// `explicit` carries `--config` (or `LABFLEET_CONFIG`, which clap folds into
/// the same flag). An explicit path that does not exist is an error; a
/// missing default file is not.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return from_file(path);
    }
    match defaults::default_config_path() {
        Some(path) if path.is_file() => from_file(path),
        _ => Ok(Config::default()),
    }
}

/// Resolve an optional path-or-URL setting, preferring the CLI override.
pub fn resolve(flag: Option<&str>, configured: Option<&str>, name: &str) -> Result<String> {
    flag.or(configured)
        .map(str::to_string)
        .ok_or_else(|| Error::Config {
            message: format!("no {} configured", name),
            hint: Some(format!(
                "pass --{} or set {} in the config file",
                name.replace('_', "-"),
                name
            )),
        })
}
