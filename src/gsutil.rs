//! Thin wrappers around the system `gsutil` command
//!
//! Using the installed `gsutil` means Google Cloud credentials are picked up
//! exactly as they are for an operator's shell session (`gcloud auth`,
//! service-account key files, boto config).

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use crate::error::Error;

fn run(args: &[&str], target: &str) -> Result<Output, Error> {
    Command::new("gsutil")
        .args(args)
        .arg(target)
        .output()
        .map_err(|e| Error::Command {
            command: format!("gsutil {} {}", args.join(" "), target),
            stderr: e.to_string(),
        })
}

fn failure(args: &[&str], target: &str, output: &Output) -> Error {
    Error::Command {
        command: format!("gsutil {} {}", args.join(" "), target),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

/// Copy a single object to a local file
pub fn copy(remote: &str, local: &Path) -> Result<(), Error> {
    if let Some(parent) = local.parent() {
        fs::create_dir_all(parent)?;
    }

    let output = Command::new("gsutil")
        .args(["-q", "cp", remote])
        .arg(local)
        .output()
        .map_err(|e| Error::Command {
            command: format!("gsutil cp {}", remote),
            stderr: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(failure(&["cp"], remote, &output));
    }
    Ok(())
}

/// Check whether an object exists
///
/// `gsutil -q stat` exits 1 with empty stderr for a missing object; anything
/// else on stderr is treated as a real failure.
pub fn exists(remote: &str) -> Result<bool, Error> {
    let args = ["-q", "stat"];
    let output = run(&args, remote)?;
    if output.status.success() {
        return Ok(true);
    }
    if output.stderr.iter().all(u8::is_ascii_whitespace) {
        return Ok(false);
    }
    Err(failure(&args, remote, &output))
}

/// Read an object into memory
pub fn cat(remote: &str) -> Result<Vec<u8>, Error> {
    let args = ["cat"];
    let output = run(&args, remote)?;
    if !output.status.success() {
        return Err(failure(&args, remote, &output));
    }
    Ok(output.stdout)
}
