//! # Manifest Validation
//!
//! Two layers of checks are applied to a candidate manifest.
//!
//! ## Shallow validation
//!
//! [`inspect_buffer`] checks the raw bytes without touching the network:
//! encoding, JSON syntax, schema shape, required sections, per-entry key and
//! version rules, and duplicate keys. The first problem found is returned as
//! an error whose message comes from the catalogue below, so operators see
//! the same wording regardless of how the file reached the tool.
//!
//! ## Deep validation
//!
//! [`validate_manifest`] cross-checks every entry against the image archive
//! and returns a [`ValidationResult`] instead of failing. Known-benign
//! anomalies can then be stripped with [`ValidationResult::remove_allowed`].

use std::collections::HashSet;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::archive::ArchiveReader;
use crate::config::AllowLists;
use crate::error::{Error, Result};
use crate::manifest::{Manifest, Section, VersionEntry};
use crate::version::{validate_firmware_like, validate_os};

/// Printed when a file passes every check.
pub const FILE_SEEMS_LEGIT: &str = "File appears to be a valid stable version config file.";
pub const FILE_NOT_READABLE: &str = "File cannot be read";
pub const FILE_LEN_ZERO: &str = "File unexpectedly has length zero";
pub const FILE_NOT_UTF8: &str = "File is not valid UTF-8";
pub const FILE_NOT_JSON: &str = "File is not valid JSON";
pub const FILE_JSON_NULL: &str = "File is null JSON literal";
pub const FILE_NOT_STABLE_VERSION_PROTO: &str = "File does not conform to stable_version proto";
pub const FILE_MISSING_FIRMWARE_KEY: &str = "File is missing \"firmware\" key";
pub const FILE_NO_CROS_ENTRIES: &str = "File has no \"cros\" entries";

// Not raised by inspect_buffer: an absent "cros" key is reported as
// FILE_NO_CROS_ENTRIES, "faft" is optional and "firmware" may be empty.
pub const FILE_MISSING_CROS_KEY: &str = "File is missing \"cros\" key";
pub const FILE_MISSING_FAFT_KEY: &str = "File is missing \"faft\" key";
pub const FILE_NO_FIRMWARE_ENTRIES: &str = "File has no \"firmware\" entries";

/// Strictness knobs for shallow validation.
#[derive(Debug, Clone, Copy)]
pub struct ShallowOptions {
    /// Reject OS entries that carry a model.
    pub strict_os_models: bool,
}

impl Default for ShallowOptions {
    fn default() -> Self {
        Self {
            strict_os_models: true,
        }
    }
}

/// True when `s` contains no uppercase letters.
pub fn is_lowercase(s: &str) -> bool {
    !s.chars().any(char::is_uppercase)
}

fn section_label(section: Section) -> &'static str {
    match section {
        Section::Cros => "CrOS",
        Section::Firmware => "firmware",
        Section::Faft => "faft",
    }
}

fn malformed(section: Section, reason: &str, index: usize, entry: &VersionEntry) -> String {
    format!(
        "File has bad {} version entry position ({}): ({}) buildTarget: ({}) model:({}) version: ({})",
        section_label(section),
        reason,
        index,
        entry.build_target(),
        entry.model(),
        entry.version
    )
}

/// Shallow-validate the file at `path`.
pub fn inspect_file(path: &Path, options: ShallowOptions) -> Result<Manifest> {
    let contents = std::fs::read(path).map_err(|e| Error::Decode {
        message: format!("{} ({})", FILE_NOT_READABLE, e),
    })?;
    inspect_buffer(&contents, options)
}

/// Shallow-validate manifest bytes and return the decoded manifest.
pub fn inspect_buffer(contents: &[u8], options: ShallowOptions) -> Result<Manifest> {
    let decode_error = |message: &str| Error::Decode {
        message: message.to_string(),
    };

    if contents.is_empty() {
        return Err(decode_error(FILE_LEN_ZERO));
    }
    let text = std::str::from_utf8(contents).map_err(|_| decode_error(FILE_NOT_UTF8))?;
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|_| decode_error(FILE_NOT_JSON))?;
    if value.is_null() {
        return Err(decode_error(FILE_JSON_NULL));
    }
    let object = value
        .as_object()
        .ok_or_else(|| decode_error(FILE_NOT_STABLE_VERSION_PROTO))?;
    let has_firmware_key = object.contains_key("firmware");

    let manifest: Manifest = serde_json::from_value(value).map_err(|e| Error::Decode {
        message: format!("{}: {}", FILE_NOT_STABLE_VERSION_PROTO, e),
    })?;

    if manifest.cros.is_empty() {
        return Err(Error::SchemaViolation {
            message: FILE_NO_CROS_ENTRIES.to_string(),
        });
    }
    if !has_firmware_key {
        return Err(Error::SchemaViolation {
            message: FILE_MISSING_FIRMWARE_KEY.to_string(),
        });
    }

    for section in Section::ALL {
        check_section(&manifest, section, options)?;
    }
    Ok(manifest)
}

fn check_section(manifest: &Manifest, section: Section, options: ShallowOptions) -> Result<()> {
    let mut seen = HashSet::new();
    for (index, entry) in manifest.section(section).iter().enumerate() {
        let schema = |reason: &str| Error::SchemaViolation {
            message: malformed(section, reason, index, entry),
        };

        if !is_lowercase(entry.build_target()) || !is_lowercase(entry.model()) {
            return Err(Error::NonLowercase {
                entry: format!(
                    "{} position ({}) buildTarget: ({}) model:({})",
                    section_label(section),
                    index,
                    entry.build_target(),
                    entry.model()
                ),
            });
        }
        if entry.build_target().is_empty() {
            return Err(schema("empty buildTarget"));
        }
        match section {
            Section::Cros if options.strict_os_models && !entry.model().is_empty() => {
                return Err(schema(
                    "non-empty models are NOT supported in CrOS versions",
                ));
            }
            Section::Firmware | Section::Faft if entry.model().is_empty() => {
                return Err(schema("empty model"));
            }
            _ => {}
        }
        if !seen.insert(entry.key.composite()) {
            return Err(schema("duplicate entry"));
        }
        let version_check = match section {
            Section::Cros => validate_os(&entry.version),
            Section::Firmware | Section::Faft => validate_firmware_like(&entry.version),
        };
        if version_check.is_err() {
            return Err(Error::InvalidFormat {
                message: malformed(section, "invalid version", index, entry),
            });
        }
    }
    Ok(())
}

/// A `(build target, model)` pair named in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardModel {
    pub build_target: String,
    pub model: String,
}

impl BoardModel {
    /// Allow-list key `board;model`.
    pub fn allow_key(&self) -> String {
        format!("{};{}", self.build_target, self.model)
    }
}

/// Archive firmware disagreeing with the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMismatch {
    pub build_target: String,
    pub model: String,
    /// Version reported by the archive.
    pub wanted: String,
    /// Version recorded in the manifest.
    pub got: String,
}

impl VersionMismatch {
    pub fn allow_key(&self) -> String {
        format!("{};{}", self.build_target, self.model)
    }
}

/// Deep-validation anomaly report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    #[serde(default)]
    pub non_lowercase_entries: Vec<String>,
    #[serde(default)]
    pub missing_boards: Vec<String>,
    #[serde(default)]
    pub failed_to_lookup: Vec<BoardModel>,
    #[serde(default)]
    pub invalid_versions: Vec<VersionMismatch>,
}

impl ValidationResult {
    /// Total number of anomalies across all four lists.
    pub fn anomaly_count(&self) -> usize {
        self.non_lowercase_entries.len()
            + self.missing_boards.len()
            + self.failed_to_lookup.len()
            + self.invalid_versions.len()
    }

    /// Strip anomalies named by the allow-lists.
    pub fn remove_allowed(&mut self, allow: &AllowLists) {
        self.missing_boards
            .retain(|bt| !allow.missing_boards.contains(bt));
        self.failed_to_lookup
            .retain(|item| !allow.failed_to_lookup.contains(&item.allow_key()));
        self.invalid_versions
            .retain(|item| !allow.invalid_versions.contains(&item.allow_key()));
    }

    /// A filtered copy; the raw report is left intact.
    pub fn filtered(&self, allow: &AllowLists) -> ValidationResult {
        let mut out = self.clone();
        out.remove_allowed(allow);
        out
    }

    /// One error per anomaly, in report order.
    pub fn errors(&self) -> Vec<Error> {
        let non_lowercase = self.non_lowercase_entries.iter().map(|entry| Error::NonLowercase {
            entry: entry.clone(),
        });
        let missing = self.missing_boards.iter().map(|bt| Error::MissingBoard {
            build_target: bt.clone(),
        });
        let lookup = self.failed_to_lookup.iter().map(|item| Error::FailedToLookup {
            build_target: item.build_target.clone(),
            model: item.model.clone(),
        });
        let invalid = self.invalid_versions.iter().map(|item| Error::InvalidVersion {
            build_target: item.build_target.clone(),
            model: item.model.clone(),
            wanted: item.wanted.clone(),
            got: item.got.clone(),
        });
        non_lowercase.chain(missing).chain(lookup).chain(invalid).collect()
    }
}

/// `bt` for board-wide keys, `bt;model` otherwise.
fn combined_key(build_target: &str, model: &str) -> String {
    if model.is_empty() {
        build_target.to_string()
    } else {
        format!("{};{}", build_target, model)
    }
}

/// Cross-check a manifest against the image archive.
///
/// Only cancellation is returned as an error; every other problem becomes an
/// entry in the report.
pub fn validate_manifest(manifest: &Manifest, reader: &mut ArchiveReader) -> Result<ValidationResult> {
    let mut out = ValidationResult::default();
    let mut os_versions = std::collections::HashMap::new();

    for entry in &manifest.cros {
        let bt = entry.build_target();
        let model = entry.model();
        if !is_lowercase(bt) {
            out.non_lowercase_entries.push(bt.to_string());
            continue;
        }
        if !is_lowercase(model) {
            out.non_lowercase_entries.push(model.to_string());
            continue;
        }
        match reader.firmware_versions_for(bt, &entry.version) {
            Ok(_) => {
                os_versions.insert(combined_key(bt, model), entry.version.clone());
            }
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => {
                debug!("Missing board {}: {}", bt, e);
                out.missing_boards.push(bt.to_string());
            }
        }
    }

    for entry in &manifest.firmware {
        let bt = entry.build_target();
        let model = entry.model();
        if !is_lowercase(bt) || !is_lowercase(model) {
            out.non_lowercase_entries.push(format!("{};{}", bt, model));
            continue;
        }
        let lookup_failed = || BoardModel {
            build_target: bt.to_string(),
            model: model.to_string(),
        };
        let Some(os_version) = os_versions.get(&combined_key(bt, model)) else {
            out.failed_to_lookup.push(lookup_failed());
            continue;
        };
        match reader.firmware_version(bt, model, os_version) {
            Ok(real) if real == entry.version => {}
            Ok(real) => out.invalid_versions.push(VersionMismatch {
                build_target: bt.to_string(),
                model: model.to_string(),
                wanted: real,
                got: entry.version.clone(),
            }),
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(_) => out.failed_to_lookup.push(lookup_failed()),
        }
    }

    Ok(out)
}
