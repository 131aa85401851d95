//! # Dimensions Command Implementation
//!
//! Projects inventory records into scheduler dimensions.
//!
//! - `labfleet dimensions device.json` prints the dimensions of one device.
//! - `labfleet dimensions --unit unit.json a.json b.json` prints the
//!   dimensions of a scheduling unit whose children are the given devices.
//! - `labfleet dimensions --revert dims.json` prints the device record
//!   rebuilt from a dimension map.
//!
//! All output is pretty-printed JSON.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use labfleet::dimensions::{
    project, revert, scheduling_unit_dimensions, DeviceRecord, Dimensions, SchedulingUnit,
};

/// Print scheduler dimensions of a device or a scheduling unit
#[derive(Args, Debug)]
pub struct DimensionsArgs {
    /// Device record files (JSON).
    #[arg(value_name = "DEVICE", required_unless_present = "revert")]
    pub records: Vec<PathBuf>,

    /// Scheduling unit file (JSON); the device records are its children.
    #[arg(long, value_name = "FILE", conflicts_with = "revert")]
    pub unit: Option<PathBuf>,

    /// Rebuild a device record from a dimension map file (JSON).
    #[arg(long, value_name = "FILE", conflicts_with = "records")]
    pub revert: Option<PathBuf>,
}

fn read(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("cannot read {}", path.display()))
}

/// Execute the `dimensions` command.
pub fn execute(args: DimensionsArgs) -> Result<()> {
    if let Some(path) = &args.revert {
        let dims: Dimensions = serde_json::from_slice(&read(path)?)
            .with_context(|| format!("{} is not a dimension map", path.display()))?;
        println!("{}", serde_json::to_string_pretty(&revert(&dims))?);
        return Ok(());
    }

    let children = args
        .records
        .iter()
        .map(|path| {
            let record = DeviceRecord::from_json(&read(path)?)
                .with_context(|| format!("in {}", path.display()))?;
            Ok(project(&record))
        })
        .collect::<Result<Vec<Dimensions>>>()?;

    let dims = match &args.unit {
        Some(path) => {
            let unit = SchedulingUnit::from_json(&read(path)?)
                .with_context(|| format!("in {}", path.display()))?;
            scheduling_unit_dimensions(&unit, &children)
        }
        None => match children.as_slice() {
            [single] => single.clone(),
            _ => anyhow::bail!(
                "expected exactly one device record without --unit, got {}",
                children.len()
            ),
        },
    };

    println!("{}", serde_json::to_string_pretty(&dims)?);
    Ok(())
}
