//! # Dump Command Implementation
//!
//! Prints the canonical encoding of the current manifest, optionally limited
//! to the entries of one model.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use labfleet::cancel::CancelToken;
use labfleet::config::Config;
use labfleet::orchestrator::Orchestrator;

use super::{manifest_source, RepoArgs};

/// Print the canonical form of the current manifest
#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Only print entries of this model.
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Read a local manifest file instead of the repository.
    #[arg(long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    #[command(flatten)]
    pub repo: RepoArgs,
}

/// Execute the `dump` command.
pub fn execute(args: DumpArgs, mut config: Config, cancel: &CancelToken) -> Result<()> {
    args.repo.apply(&mut config);

    let source = manifest_source(args.manifest, None);
    let orchestrator = Orchestrator::new(config, cancel.clone());
    let bytes = orchestrator.dump(&source, args.model.as_deref())?;

    let mut stdout = io::stdout().lock();
    stdout.write_all(&bytes)?;
    stdout.flush()?;
    Ok(())
}
