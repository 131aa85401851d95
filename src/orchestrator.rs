//! Orchestrator for the update, validate, dump and locate flows
//!
//! Each flow acquires one scoped temporary directory for archive downloads
//! and repository checkouts. The directory is removed when the flow returns,
//! whether it succeeded, failed or was cancelled.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};
use tempfile::TempDir;

use crate::archive::{ArchiveOperations, ArchiveReader};
use crate::cancel::CancelToken;
use crate::config::{self, Config};
use crate::defaults;
use crate::error::{Error, Result};
use crate::feed;
use crate::manifest::{self, Manifest};
use crate::reconcile::{self, SkippedModel, VersionChange};
use crate::repository::ManifestRepository;
use crate::validation::{self, ShallowOptions, ValidationResult};

/// Where a flow reads the manifest from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    /// A local file. Updates are written back to it.
    File(PathBuf),
    /// The configured manifest repository, at `revision` or the branch head.
    Repository { revision: Option<String> },
}

/// Result of the update flow.
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub manifest: Manifest,
    /// Canonical encoding of `manifest`.
    pub encoded: Vec<u8>,
    pub changes: Vec<VersionChange>,
    pub novel_models: Vec<SkippedModel>,
    pub invalid_models: Vec<SkippedModel>,
    /// Whether the new manifest was written or proposed.
    pub proposed: bool,
}

/// Wires configuration, archive and repository access into the user-facing
/// flows.
pub struct Orchestrator {
    config: Config,
    cancel: CancelToken,
    archive_ops: Option<Arc<dyn ArchiveOperations>>,
    repository: Option<ManifestRepository>,
}

impl Orchestrator {
    pub fn new(config: Config, cancel: CancelToken) -> Self {
        Self {
            config,
            cancel,
            archive_ops: None,
            repository: None,
        }
    }

    /// Use `ops` instead of the backend derived from `archive_root`.
    pub fn with_archive_operations(mut self, ops: Arc<dyn ArchiveOperations>) -> Self {
        self.archive_ops = Some(ops);
        self
    }

    /// Use `repository` instead of the one described by the configuration.
    pub fn with_repository(mut self, repository: ManifestRepository) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn workdir(&self) -> Result<TempDir> {
        let dir = tempfile::Builder::new().prefix("labfleet-").tempdir()?;
        debug!("Using scratch directory {}", dir.path().display());
        Ok(dir)
    }

    fn archive_reader(&self, workdir: &Path) -> Result<ArchiveReader> {
        let root = &self.config.archive_root;
        match &self.archive_ops {
            Some(ops) => Ok(ArchiveReader::with_operations(
                root,
                Arc::clone(ops),
                workdir,
                self.cancel.clone(),
            )),
            None => ArchiveReader::new(root, workdir, self.cancel.clone()),
        }
    }

    fn configured_repository(&self) -> Result<ManifestRepository> {
        let url = config::resolve(None, self.config.manifest_repo.as_deref(), "manifest_repo")?;
        Ok(ManifestRepository::new(
            &url,
            &self.config.manifest_branch,
            &self.config.manifest_path,
            &self.config.push_ref,
        ))
    }

    fn shallow_options(&self) -> ShallowOptions {
        ShallowOptions {
            strict_os_models: self.config.strict_os_models,
        }
    }

    /// Fetch the release feed, reconcile it with the current manifest,
    /// deep-validate the result and propose it unless `dry_run` is set.
    ///
    /// `output` additionally receives the canonical bytes.
    pub fn update(
        &self,
        source: &ManifestSource,
        release_feed: &str,
        dry_run: bool,
        output: Option<&Path>,
    ) -> Result<UpdateOutcome> {
        let workdir = self.workdir()?;

        let upstream = feed::parse_release_feed(&feed::fetch_release_feed(
            release_feed,
            &self.cancel,
        )?)?;
        info!("Release feed lists {} build targets", upstream.len());

        let built;
        let mut checkout = None;
        let old_bytes = match source {
            ManifestSource::File(path) => fs::read(path)?,
            ManifestSource::Repository { revision } => {
                let repo = match &self.repository {
                    Some(repo) => repo,
                    None => {
                        built = self.configured_repository()?;
                        &built
                    }
                };
                let dir = repo.checkout(workdir.path(), &self.cancel)?;
                let bytes = repo.read_manifest(&dir, revision.as_deref(), &self.cancel)?;
                checkout = Some((repo, dir));
                bytes
            }
        };
        let old = manifest::decode(&old_bytes)?;

        let mut reader = self.archive_reader(workdir.path())?;
        let outcome = reconcile::reconcile(&old, &upstream, &mut reader)?;
        let changes = reconcile::os_changes(&old, &outcome.manifest);
        for change in &changes {
            info!(
                "{}:{} {} -> {}",
                change.build_target,
                change.model,
                change.old.as_deref().unwrap_or("(none)"),
                change.new
            );
        }
        let encoded = manifest::encode(&outcome.manifest)?;

        let report = validation::validate_manifest(&outcome.manifest, &mut reader)?
            .filtered(&self.config.allow_lists);
        let count = report.anomaly_count();
        if count > 0 {
            for anomaly in report.errors() {
                warn!("{}", anomaly);
            }
            return Err(Error::Anomalies {
                count,
                report: Box::new(report),
            });
        }

        if let Some(path) = output {
            fs::write(path, &encoded)?;
        }

        let proposed = if dry_run {
            false
        } else {
            self.cancel.check()?;
            match (source, checkout) {
                (_, Some((repo, dir))) => {
                    repo.propose(&dir, &encoded, defaults::UPDATE_COMMIT_MESSAGE, &self.cancel)?;
                }
                (ManifestSource::File(path), None) => {
                    fs::write(path, &encoded)?;
                    info!("Wrote new manifest to {}", path.display());
                }
                (ManifestSource::Repository { .. }, None) => {}
            }
            true
        };

        Ok(UpdateOutcome {
            manifest: outcome.manifest,
            encoded,
            changes,
            novel_models: outcome.novel_models,
            invalid_models: outcome.invalid_models,
            proposed,
        })
    }

    /// Shallow- then deep-validate a candidate manifest.
    ///
    /// Returns the (possibly filtered) report when it holds no anomalies and
    /// [`Error::Anomalies`] otherwise.
    pub fn validate(
        &self,
        source: &ManifestSource,
        apply_allow_lists: bool,
    ) -> Result<ValidationResult> {
        let workdir = self.workdir()?;
        let manifest = match source {
            ManifestSource::File(path) => validation::inspect_file(path, self.shallow_options())?,
            ManifestSource::Repository { .. } => {
                let bytes = self.read_repository(source, workdir.path())?;
                validation::inspect_buffer(&bytes, self.shallow_options())?
            }
        };

        let mut reader = self.archive_reader(workdir.path())?;
        let raw = validation::validate_manifest(&manifest, &mut reader)?;
        let report = if apply_allow_lists {
            raw.filtered(&self.config.allow_lists)
        } else {
            raw
        };

        let count = report.anomaly_count();
        if count > 0 {
            for anomaly in report.errors() {
                warn!("{}", anomaly);
            }
            return Err(Error::Anomalies {
                count,
                report: Box::new(report),
            });
        }
        Ok(report)
    }

    /// Canonical bytes of the current manifest, optionally restricted to
    /// entries of one model.
    pub fn dump(&self, source: &ManifestSource, model: Option<&str>) -> Result<Vec<u8>> {
        let workdir = self.workdir()?;
        let bytes = match source {
            ManifestSource::File(path) => fs::read(path)?,
            ManifestSource::Repository { .. } => self.read_repository(source, workdir.path())?,
        };
        let mut current = manifest::decode(&bytes)?;
        if let Some(model) = model {
            current = current.filter_model(model);
        }
        manifest::encode(&current)
    }

    /// Archive path of the best firmware bundle for a build.
    pub fn locate_firmware(
        &self,
        board: &str,
        milestone: u32,
        tip: u64,
        branch: u64,
        suffix: &str,
    ) -> Result<String> {
        let workdir = self.workdir()?;
        let reader = self.archive_reader(workdir.path())?;
        reader.locate_firmware_bundle(board, milestone, tip, branch, suffix)
    }

    fn read_repository(&self, source: &ManifestSource, workdir: &Path) -> Result<Vec<u8>> {
        let revision = match source {
            ManifestSource::Repository { revision } => revision.as_deref(),
            ManifestSource::File(_) => None,
        };
        let built;
        let repo = match &self.repository {
            Some(repo) => repo,
            None => {
                built = self.configured_repository()?;
                &built
            }
        };
        let dir = repo.checkout(workdir, &self.cancel)?;
        repo.read_manifest(&dir, revision, &self.cancel)
    }
}
