//! # Stable-Version Reconciliation
//!
//! Merges the current manifest with the newest upstream OS versions and
//! resolves the firmware version that goes with each surviving
//! `(build target, model)` pair.
//!
//! ## Process
//!
//! 1.  **Collection**: every build target named by the old manifest or the
//!     upstream feed gets a [`PerBuildTargetVersions`] record holding the
//!     upstream version, the legacy board-wide version (an OS entry without a
//!     model) and the per-model versions.
//!
//! 2.  **Archive scan**: each relevant OS version of a build target is looked
//!     up once in the archive. The models reported by those records are the
//!     models considered for the new manifest.
//!
//! 3.  **Best version**: for each model the larger of the upstream version
//!     and the pinned version wins. Pinned versions newer than upstream are
//!     kept so bring-up boards are never regressed.
//!
//! 4.  **Firmware**: the firmware comes from the archive record at the best
//!     version. When that record lacks the model, the old manifest's
//!     firmware entry is reused together with the legacy OS version it was
//!     qualified against. Models with neither are skipped as novel.
//!
//! The result replaces the `cros` and `firmware` sections of the old manifest,
//! keeps `faft` unchanged and is returned in canonical order.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use log::info;

use crate::archive::ArchiveReader;
use crate::cache::ModelFirmware;
use crate::error::{Error, Result};
use crate::feed::UpstreamVersion;
use crate::manifest::{Manifest, VersionEntry};
use crate::version::parse_os;

/// Known OS versions of one build target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerBuildTargetVersions {
    pub upstream_os: String,
    pub legacy_board_os: String,
    pub per_model_os: BTreeMap<String, String>,
}

impl PerBuildTargetVersions {
    /// Every non-empty OS version this build target refers to.
    pub fn relevant_versions(&self) -> BTreeSet<String> {
        std::iter::once(&self.upstream_os)
            .chain(std::iter::once(&self.legacy_board_os))
            .chain(self.per_model_os.values())
            .filter(|v| !v.is_empty())
            .cloned()
            .collect()
    }

    /// The OS version `model` should run.
    pub fn best_version(&self, model: &str) -> Result<String> {
        let new_v = self.upstream_os.as_str();
        let old_v = self
            .per_model_os
            .get(model)
            .map(String::as_str)
            .unwrap_or(self.legacy_board_os.as_str());

        match (parse_os(new_v), parse_os(old_v)) {
            (Ok(new), Ok(old)) => Ok(match new.cmp(&old) {
                Ordering::Less => old_v.to_string(),
                _ => new_v.to_string(),
            }),
            (Ok(_), Err(_)) => Ok(new_v.to_string()),
            (Err(_), Ok(_)) => Ok(old_v.to_string()),
            (Err(_), Err(_)) => Err(Error::NoValidVersion {
                model: model.to_string(),
            }),
        }
    }
}

/// Build one record per build target named by either input.
pub fn collect_versions(
    old: &Manifest,
    upstream: &[UpstreamVersion],
) -> BTreeMap<String, PerBuildTargetVersions> {
    let mut out: BTreeMap<String, PerBuildTargetVersions> = BTreeMap::new();
    for entry in &old.cros {
        let record = out.entry(entry.build_target().to_string()).or_default();
        if entry.model().is_empty() {
            record.legacy_board_os = entry.version.clone();
        } else {
            record
                .per_model_os
                .insert(entry.model().to_string(), entry.version.clone());
        }
    }
    for u in upstream {
        out.entry(u.build_target.clone()).or_default().upstream_os = u.os_version.clone();
    }
    out
}

/// A `(build target, model)` pair left out of the new manifest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SkippedModel {
    pub build_target: String,
    pub model: String,
}

/// Outcome of one reconciliation.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub manifest: Manifest,
    /// Models with no firmware in the archive or the old manifest.
    pub novel_models: Vec<SkippedModel>,
    /// Models with no valid OS version.
    pub invalid_models: Vec<SkippedModel>,
}

/// Compute the new manifest.
///
/// Archive failures are logged and skipped; only cancellation aborts.
pub fn reconcile(
    old: &Manifest,
    upstream: &[UpstreamVersion],
    reader: &mut ArchiveReader,
) -> Result<Reconciliation> {
    let mut os_entries = Vec::new();
    let mut firmware_entries = Vec::new();
    let mut novel_models = Vec::new();
    let mut invalid_models = Vec::new();

    for (bt, versions) in collect_versions(old, upstream) {
        if bt.is_empty() {
            continue;
        }

        let mut all_firmware: BTreeMap<String, ModelFirmware> = BTreeMap::new();
        let mut models: BTreeSet<String> = BTreeSet::new();
        for v in versions.relevant_versions() {
            match reader.firmware_versions_for(&bt, &v) {
                Ok(record) => {
                    models.extend(record.keys().cloned());
                    all_firmware.insert(v, record);
                }
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                // Already logged by the reader
                Err(_) => continue,
            }
        }

        for model in models {
            let skipped = || SkippedModel {
                build_target: bt.clone(),
                model: model.clone(),
            };
            let best = match versions.best_version(&model) {
                Ok(best) => best,
                Err(e) => {
                    info!("Dropping {};{}: {}", bt, model, e);
                    invalid_models.push(skipped());
                    continue;
                }
            };

            let archived = all_firmware
                .get(&best)
                .and_then(|record| record.get(&model));
            let (os, firmware) = match archived {
                Some(firmware) => (best, firmware.clone()),
                None => match fallback(old, &versions, &bt, &model) {
                    Some(pair) => pair,
                    None => {
                        info!("Skipping novel model {};{}: no firmware at {}", bt, model, best);
                        novel_models.push(skipped());
                        continue;
                    }
                },
            };
            os_entries.push(VersionEntry::new(&bt, &model, &os));
            firmware_entries.push(VersionEntry::new(&bt, &model, &firmware));
        }
    }

    let mut manifest = old.clone();
    manifest.cros = os_entries;
    manifest.firmware = firmware_entries;
    manifest.sort_in_place();

    Ok(Reconciliation {
        manifest,
        novel_models,
        invalid_models,
    })
}

/// Reuse the old firmware entry with the OS version it was pinned against.
fn fallback(
    old: &Manifest,
    versions: &PerBuildTargetVersions,
    bt: &str,
    model: &str,
) -> Option<(String, String)> {
    let firmware = old.firmware_for(bt, model)?;
    let os = if !versions.legacy_board_os.is_empty() {
        versions.legacy_board_os.clone()
    } else {
        versions.per_model_os.get(model)?.clone()
    };
    Some((os, firmware.to_string()))
}

/// OS version change of one entry between two manifests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionChange {
    pub build_target: String,
    pub model: String,
    pub old: Option<String>,
    pub new: String,
}

/// OS entries of `new` whose version differs from what `old` pinned.
pub fn os_changes(old: &Manifest, new: &Manifest) -> Vec<VersionChange> {
    new.cros
        .iter()
        .filter_map(|entry| {
            let bt = entry.build_target();
            let model = entry.model();
            let previous = old
                .os_for(bt, model)
                .or_else(|| old.os_for(bt, ""))
                .map(str::to_string);
            if previous.as_deref() == Some(entry.version.as_str()) {
                return None;
            }
            Some(VersionChange {
                build_target: bt.to_string(),
                model: model.to_string(),
                old: previous,
                new: entry.version.clone(),
            })
        })
        .collect()
}
