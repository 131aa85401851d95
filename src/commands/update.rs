//! # Update Command Implementation
//!
//! This module implements the `update` subcommand, which refreshes the
//! stable-version manifest from the upstream release feed.
//!
//! ## Functionality
//!
//! - **Reconciliation**: The newest beta-channel OS version of every build
//!   target is merged into the current manifest, and firmware versions are
//!   resolved through the image archive.
//!
//! - **Validation Gate**: The new manifest is deep-validated against the
//!   archive. Any anomaly left after allow-list filtering aborts the update
//!   and prints the report.
//!
//! - **Proposal**: The canonical manifest is committed and pushed to the
//!   configured review ref. With `--manifest`, the local file is rewritten
//!   instead.
//!
//! - **Dry Run**: `--dry-run` prints the canonical manifest to stdout and
//!   proposes nothing.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use labfleet::cancel::CancelToken;
use labfleet::config::{self, Config};
use labfleet::orchestrator::Orchestrator;

use super::{manifest_source, print_anomalies, ArchiveArgs, RepoArgs};

/// Update the manifest from the upstream release feed
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Print the new manifest instead of proposing it.
    #[arg(long)]
    pub dry_run: bool,

    /// Also write the new manifest to this file.
    #[arg(long, value_name = "FILE")]
    pub output_json: Option<PathBuf>,

    /// Read and rewrite a local manifest file instead of the repository.
    #[arg(long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// Release feed location (https URL, gs:// URL or local file).
    #[arg(long, value_name = "URL")]
    pub release_feed: Option<String>,

    #[command(flatten)]
    pub archive: ArchiveArgs,

    #[command(flatten)]
    pub repo: RepoArgs,
}

/// Execute the `update` command.
pub fn execute(args: UpdateArgs, mut config: Config, cancel: &CancelToken) -> Result<()> {
    args.archive.apply(&mut config);
    args.repo.apply(&mut config);
    config.validate()?;

    let feed = config::resolve(
        args.release_feed.as_deref(),
        config.release_feed.as_deref(),
        "release_feed",
    )?;
    let source = manifest_source(args.manifest, None);

    let orchestrator = Orchestrator::new(config, cancel.clone());
    let outcome = orchestrator
        .update(&source, &feed, args.dry_run, args.output_json.as_deref())
        .map_err(print_anomalies)?;

    if args.dry_run {
        let mut stdout = io::stdout().lock();
        stdout.write_all(&outcome.encoded)?;
        stdout.flush()?;
    }

    eprintln!(
        "{} OS version(s) changed, {} novel model(s) skipped, {} model(s) without a valid version{}",
        outcome.changes.len(),
        outcome.novel_models.len(),
        outcome.invalid_models.len(),
        if outcome.proposed { "" } else { " (not proposed)" }
    );
    Ok(())
}
