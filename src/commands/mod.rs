//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `labfleet` command-line tool. Each subcommand is defined in its own file to
//! keep the logic separated and maintainable.
//!
//! ## Structure
//!
//! Each command module typically contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args`, the loaded
//!   configuration and the cancellation token, and calls into the `labfleet`
//!   library to perform the core logic.
//!
//! Standard output is reserved for results (manifest bytes, reports,
//! dimensions); progress and summaries go to standard error.

pub mod dimensions;
pub mod dump;
pub mod locate_firmware;
pub mod update;
pub mod validate;

use std::path::PathBuf;

use clap::Args;
use labfleet::config::Config;
use labfleet::error::Error;

/// Overrides for the archive location.
#[derive(Args, Debug, Default)]
pub struct ArchiveArgs {
    /// Image archive root (gs://bucket, https://host/path or a local directory).
    #[arg(long, value_name = "URL")]
    pub archive_root: Option<String>,
}

impl ArchiveArgs {
    pub fn apply(&self, config: &mut Config) {
        if let Some(root) = &self.archive_root {
            config.archive_root = root.clone();
        }
    }
}

/// Overrides for the manifest repository.
#[derive(Args, Debug, Default)]
pub struct RepoArgs {
    /// Git URL or local path of the manifest repository.
    #[arg(long, value_name = "URL")]
    pub manifest_repo: Option<String>,

    /// Branch of the manifest repository.
    #[arg(long, value_name = "BRANCH")]
    pub manifest_branch: Option<String>,

    /// Path of the manifest inside the repository.
    #[arg(long, value_name = "PATH")]
    pub manifest_path: Option<String>,
}

impl RepoArgs {
    pub fn apply(&self, config: &mut Config) {
        if let Some(repo) = &self.manifest_repo {
            config.manifest_repo = Some(repo.clone());
        }
        if let Some(branch) = &self.manifest_branch {
            config.manifest_branch = branch.clone();
        }
        if let Some(path) = &self.manifest_path {
            config.manifest_path = path.clone();
        }
    }
}

/// Local manifest file, when given, replaces the repository.
pub fn manifest_source(
    file: Option<PathBuf>,
    revision: Option<String>,
) -> labfleet::orchestrator::ManifestSource {
    use labfleet::orchestrator::ManifestSource;
    match file {
        Some(path) => ManifestSource::File(path),
        None => ManifestSource::Repository { revision },
    }
}

/// Print the anomaly report of `err` to stdout, then hand the error back.
pub fn print_anomalies(err: Error) -> anyhow::Error {
    if let Error::Anomalies { report, .. } = &err {
        match serde_json::to_string_pretty(report) {
            Ok(json) => println!("{}", json),
            Err(e) => log::warn!("Cannot render anomaly report: {}", e),
        }
    }
    err.into()
}
