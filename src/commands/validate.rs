//! # Validate Command Implementation
//!
//! This module implements the `validate` subcommand, which checks a candidate
//! manifest before it is submitted.
//!
//! The manifest comes from a local file or, with `--remote`, from the
//! manifest repository (optionally at `--revision`). It is checked shallowly
//! (encoding, schema, casing, version grammars) and then against the image
//! archive. On success the command prints a fixed acceptance line; otherwise
//! it prints the anomaly report as indented JSON and fails.
//!
//! This command is a read-only operation.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use labfleet::cancel::CancelToken;
use labfleet::config::Config;
use labfleet::orchestrator::Orchestrator;
use labfleet::validation::FILE_SEEMS_LEGIT;

use super::{manifest_source, print_anomalies, ArchiveArgs, RepoArgs};

/// Validate a manifest file or a manifest repository revision
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Manifest file to validate.
    #[arg(value_name = "FILE", required_unless_present = "remote", conflicts_with = "remote")]
    pub path: Option<PathBuf>,

    /// Validate the manifest in the manifest repository instead of a file.
    #[arg(long)]
    pub remote: bool,

    /// Repository revision to validate (defaults to the branch head).
    #[arg(long, value_name = "REV", requires = "remote")]
    pub revision: Option<String>,

    /// Report every anomaly, ignoring the configured allow-lists.
    #[arg(long)]
    pub no_allow_list: bool,

    /// Accept OS entries that carry a model.
    #[arg(long)]
    pub allow_os_models: bool,

    #[command(flatten)]
    pub archive: ArchiveArgs,

    #[command(flatten)]
    pub repo: RepoArgs,
}

/// Execute the `validate` command.
pub fn execute(args: ValidateArgs, mut config: Config, cancel: &CancelToken) -> Result<()> {
    args.archive.apply(&mut config);
    args.repo.apply(&mut config);
    if args.allow_os_models {
        config.strict_os_models = false;
    }
    config.validate()?;

    let source = manifest_source(args.path, args.revision);
    let orchestrator = Orchestrator::new(config, cancel.clone());
    orchestrator
        .validate(&source, !args.no_allow_list)
        .map_err(print_anomalies)?;

    println!("{}", FILE_SEEMS_LEGIT);
    Ok(())
}
