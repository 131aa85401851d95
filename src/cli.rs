//! CLI argument parsing and command dispatch

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use labfleet::cancel::CancelToken;
use labfleet::config;

use crate::commands;

/// Lab Fleet - Maintain stable versions and scheduler dimensions of a device lab
#[derive(Parser, Debug)]
#[command(name = "labfleet")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,

    /// Path to the labfleet configuration file
    #[arg(long, global = true, value_name = "FILE", env = "LABFLEET_CONFIG")]
    config: Option<PathBuf>,

    /// Exit with status 0 even when the command fails
    #[arg(long, global = true)]
    always_exit_zero: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Update the manifest from the upstream release feed
    Update(commands::update::UpdateArgs),

    /// Validate a manifest file or a manifest repository revision
    Validate(commands::validate::ValidateArgs),

    /// Print the canonical form of the current manifest
    Dump(commands::dump::DumpArgs),

    /// Print scheduler dimensions of a device or a scheduling unit
    Dimensions(commands::dimensions::DimensionsArgs),

    /// Find the archive path of a firmware bundle
    LocateFirmware(commands::locate_firmware::LocateFirmwareArgs),
}

impl Cli {
    pub fn always_exit_zero(&self) -> bool {
        self.always_exit_zero
    }

    /// Initialize `env_logger`; `RUST_LOG` takes precedence over `--log-level`.
    pub fn init_logging(&self) {
        let mut builder =
            env_logger::Builder::from_env(Env::default().default_filter_or(self.log_level.as_str()));
        builder.format_timestamp(None);
        let _ = builder.try_init();
    }

    /// Execute the CLI command
    pub fn execute(self, cancel: &CancelToken) -> Result<()> {
        let config_path = self.config;
        let load = || config::load(config_path.as_deref());

        match self.command {
            Commands::Update(args) => commands::update::execute(args, load()?, cancel),
            Commands::Validate(args) => commands::validate::execute(args, load()?, cancel),
            Commands::Dump(args) => commands::dump::execute(args, load()?, cancel),
            Commands::Dimensions(args) => commands::dimensions::execute(args),
            Commands::LocateFirmware(args) => {
                commands::locate_firmware::execute(args, load()?, cancel)
            }
        }
    }
}
