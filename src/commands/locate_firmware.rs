//! # Locate-Firmware Command Implementation
//!
//! Finds the firmware bundle built closest to a given milestone. Candidates
//! are `<archive>/<board>-<release|firmware>/R<m>-<tip>.<branch>.0/<suffix>`,
//! probed for the requested milestone first, then a few milestones ahead and
//! then further back.

use anyhow::Result;
use clap::Args;
use labfleet::cancel::CancelToken;
use labfleet::config::Config;
use labfleet::defaults;
use labfleet::orchestrator::Orchestrator;

use super::ArchiveArgs;

/// Find the archive path of a firmware bundle
#[derive(Args, Debug)]
pub struct LocateFirmwareArgs {
    /// Board (build target) name.
    #[arg(long)]
    pub board: String,

    /// Release milestone, e.g. 85.
    #[arg(long)]
    pub milestone: u32,

    /// Tip build number.
    #[arg(long)]
    pub tip: u64,

    /// Branch build number.
    #[arg(long, default_value_t = 0)]
    pub branch: u64,

    /// Bundle file name.
    #[arg(long, default_value = defaults::FIRMWARE_BUNDLE_SUFFIX)]
    pub suffix: String,

    #[command(flatten)]
    pub archive: ArchiveArgs,
}

/// Execute the `locate-firmware` command.
pub fn execute(args: LocateFirmwareArgs, mut config: Config, cancel: &CancelToken) -> Result<()> {
    args.archive.apply(&mut config);
    config.validate()?;

    let orchestrator = Orchestrator::new(config, cancel.clone());
    let path = orchestrator.locate_firmware(
        &args.board,
        args.milestone,
        args.tip,
        args.branch,
        &args.suffix,
    )?;
    println!("{}", path);
    Ok(())
}
