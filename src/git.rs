//! Manifest repository access through the system `git` command

use std::fs;
use std::path::Path;
use std::process::Command;

use crate::error::Error;

fn git_error(command: &str, url: &str, stderr: &str) -> Error {
    // Provide helpful error message for common auth failures
    let stderr = if stderr.contains("Authentication failed")
        || stderr.contains("Permission denied")
        || stderr.contains("Could not read from remote repository")
    {
        format!(
            "Authentication failed. Make sure you have access to the repository.\n\
            Ensure you have:\n\
            - SSH key added to ssh-agent\n\
            - Git credentials configured\n\
            Error: {}",
            stderr
        )
    } else {
        stderr.trim().to_string()
    };
    Error::GitCommand {
        command: command.to_string(),
        url: url.to_string(),
        stderr,
    }
}

/// Run git inside `repo_dir` and return stdout
fn run_in(repo_dir: &Path, args: &[&str]) -> Result<Vec<u8>, Error> {
    let url = repo_dir.display().to_string();
    let output = Command::new("git")
        .arg("-C")
        .arg(repo_dir)
        .args(args)
        .output()
        .map_err(|e| git_error(&args.join(" "), &url, &e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(git_error(&args.join(" "), &url, &stderr));
    }
    Ok(output.stdout)
}

/// Clone a repository branch using shallow clone
///
/// This uses the system git command, which automatically handles:
/// - SSH keys from ~/.ssh/
/// - Git credential helpers
/// - Any authentication configured in ~/.gitconfig
pub fn clone_shallow(url: &str, branch: &str, target_dir: &Path) -> Result<(), Error> {
    // git won't clone into an existing non-empty dir
    if target_dir.exists() {
        fs::remove_dir_all(target_dir)?;
    }
    if let Some(parent) = target_dir.parent() {
        fs::create_dir_all(parent)?;
    }

    let output = Command::new("git")
        .args(["clone", "--depth=1", "--branch", branch, url])
        .arg(target_dir)
        .output()
        .map_err(|e| git_error("clone", url, &e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(git_error("clone", url, &stderr));
    }
    Ok(())
}

/// Fetch a single revision into a shallow clone
pub fn fetch_revision(repo_dir: &Path, revision: &str) -> Result<(), Error> {
    run_in(repo_dir, &["fetch", "--depth=1", "origin", revision]).map(|_| ())
}

/// Read a file as of `revision`
pub fn show_file(repo_dir: &Path, revision: &str, path: &str) -> Result<Vec<u8>, Error> {
    let spec = format!("{}:{}", revision, path);
    run_in(repo_dir, &["show", &spec])
}

/// Stage and commit a single file
pub fn commit_file(repo_dir: &Path, path: &str, message: &str) -> Result<(), Error> {
    run_in(repo_dir, &["add", "--", path])?;
    run_in(repo_dir, &["commit", "--quiet", "-m", message]).map(|_| ())
}

/// Push HEAD to `push_ref` on origin
pub fn push(repo_dir: &Path, push_ref: &str) -> Result<(), Error> {
    let refspec = format!("HEAD:{}", push_ref);
    run_in(repo_dir, &["push", "origin", &refspec]).map(|_| ())
}
