//! # Manifest Repository
//!
//! This module provides `ManifestRepository`, the interface used to read the
//! stable-version manifest out of version control and to propose a new
//! revision of it.
//!
//! ## Design
//!
//! Git access goes through the **`GitOperations`** trait. In the main
//! application `DefaultGitOperations` wraps the system `git` command, so
//! credentials and code-review hooks configured for the operator apply
//! unchanged. Tests replace it with a mock that records calls and serves
//! file contents from memory.
//!
//! A revision is proposed by committing the canonical manifest on top of the
//! shallow checkout and pushing `HEAD` to the configured push ref.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::cancel::CancelToken;
use crate::error::Result;

/// Trait for git operations - allows mocking in tests
pub trait GitOperations: Send + Sync {
    /// Shallow-clones `branch` of `url` into `target_dir`.
    fn clone_shallow(&self, url: &str, branch: &str, target_dir: &Path) -> Result<()>;

    /// Fetches one revision into an existing checkout.
    fn fetch_revision(&self, repo_dir: &Path, revision: &str) -> Result<()>;

    /// Reads `path` as of `revision`.
    fn show_file(&self, repo_dir: &Path, revision: &str, path: &str) -> Result<Vec<u8>>;

    /// Stages and commits one file.
    fn commit_file(&self, repo_dir: &Path, path: &str, message: &str) -> Result<()>;

    /// Pushes `HEAD` to `push_ref`.
    fn push(&self, repo_dir: &Path, push_ref: &str) -> Result<()>;
}

/// The default implementation of `GitOperations`, which uses the system's
/// `git` command to perform real Git operations.
pub struct DefaultGitOperations;

impl GitOperations for DefaultGitOperations {
    fn clone_shallow(&self, url: &str, branch: &str, target_dir: &Path) -> Result<()> {
        crate::git::clone_shallow(url, branch, target_dir)
    }

    fn fetch_revision(&self, repo_dir: &Path, revision: &str) -> Result<()> {
        crate::git::fetch_revision(repo_dir, revision)
    }

    fn show_file(&self, repo_dir: &Path, revision: &str, path: &str) -> Result<Vec<u8>> {
        crate::git::show_file(repo_dir, revision, path)
    }

    fn commit_file(&self, repo_dir: &Path, path: &str, message: &str) -> Result<()> {
        crate::git::commit_file(repo_dir, path, message)
    }

    fn push(&self, repo_dir: &Path, push_ref: &str) -> Result<()> {
        crate::git::push(repo_dir, push_ref)
    }
}

/// Location of the manifest inside version control.
pub struct ManifestRepository {
    url: String,
    branch: String,
    manifest_path: String,
    push_ref: String,
    git_ops: Box<dyn GitOperations>,
}

impl ManifestRepository {
    /// Creates a `ManifestRepository` backed by the system `git` command.
    pub fn new(url: &str, branch: &str, manifest_path: &str, push_ref: &str) -> Self {
        Self::with_operations(url, branch, manifest_path, push_ref, Box::new(DefaultGitOperations))
    }

    /// Creates a `ManifestRepository` with a custom `GitOperations`
    /// implementation.
    pub fn with_operations(
        url: &str,
        branch: &str,
        manifest_path: &str,
        push_ref: &str,
        git_ops: Box<dyn GitOperations>,
    ) -> Self {
        Self {
            url: url.to_string(),
            branch: branch.to_string(),
            manifest_path: manifest_path.to_string(),
            push_ref: push_ref.to_string(),
            git_ops,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn manifest_path(&self) -> &str {
        &self.manifest_path
    }

    /// Shallow-clones the configured branch under `workdir` and returns the
    /// checkout directory.
    pub fn checkout(&self, workdir: &Path, cancel: &CancelToken) -> Result<PathBuf> {
        cancel.check()?;
        let dir = workdir.join("manifest-repo");
        debug!("Cloning {} ({}) into {}", self.url, self.branch, dir.display());
        self.git_ops.clone_shallow(&self.url, &self.branch, &dir)?;
        Ok(dir)
    }

    /// Reads the manifest bytes at `revision`, or at the checked-out branch
    /// head when no revision is given.
    pub fn read_manifest(
        &self,
        checkout: &Path,
        revision: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<Vec<u8>> {
        cancel.check()?;
        let rev = match revision {
            Some(revision) => {
                self.git_ops.fetch_revision(checkout, revision)?;
                cancel.check()?;
                "FETCH_HEAD"
            }
            None => "HEAD",
        };
        self.git_ops.show_file(checkout, rev, &self.manifest_path)
    }

    /// Writes `contents` as the new manifest, commits it and pushes to the
    /// configured push ref.
    pub fn propose(
        &self,
        checkout: &Path,
        contents: &[u8],
        message: &str,
        cancel: &CancelToken,
    ) -> Result<()> {
        cancel.check()?;
        let target = checkout.join(&self.manifest_path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, contents)?;
        self.git_ops
            .commit_file(checkout, &self.manifest_path, message)?;
        cancel.check()?;
        self.git_ops.push(checkout, &self.push_ref)?;
        info!("Proposed new manifest revision to {} ({})", self.url, self.push_ref);
        Ok(())
    }
}
