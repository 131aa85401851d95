//! # Stable-Version Manifest
//!
//! The manifest is a three-section JSON document mapping `(build target,
//! model)` keys to approved versions:
//!
//! ```json
//! { "cros": [...], "firmware": [...], "faft": [...] }
//! ```
//!
//! Each entry is `{"key": {"buildTarget": {"name": ..}, "modelId": {"value": ..}}, "version": ..}`.
//!
//! ## Canonical form
//!
//! [`encode`] always sorts every section by the lowercased composite key
//! `buildtarget[:model]`, pretty-prints with tab indentation, omits empty
//! sections and empty `modelId` objects, and terminates the document with a
//! newline. Two equivalent manifests therefore encode byte-identically.
//!
//! Unknown fields are ignored by [`decode`].

use std::cmp::Ordering;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// The three manifest sections, in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Cros,
    Firmware,
    Faft,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::Cros, Section::Firmware, Section::Faft];

    pub fn as_str(self) -> &'static str {
        match self {
            Section::Cros => "cros",
            Section::Firmware => "firmware",
            Section::Faft => "faft",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildTargetId {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelId {
    #[serde(default)]
    pub value: String,
}

impl ModelId {
    fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// `(build target, model)` key of a manifest entry. The model is empty only
/// for legacy board-wide OS entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryKey {
    #[serde(rename = "buildTarget", default)]
    pub build_target: BuildTargetId,
    #[serde(rename = "modelId", default, skip_serializing_if = "ModelId::is_empty")]
    pub model_id: ModelId,
}

impl EntryKey {
    pub fn new(build_target: &str, model: &str) -> Self {
        Self {
            build_target: BuildTargetId {
                name: build_target.to_string(),
            },
            model_id: ModelId {
                value: model.to_string(),
            },
        }
    }

    pub fn build_target(&self) -> &str {
        &self.build_target.name
    }

    pub fn model(&self) -> &str {
        &self.model_id.value
    }

    /// `bt` for board-wide keys, `bt:model` otherwise.
    pub fn composite(&self) -> String {
        if self.model().is_empty() {
            self.build_target().to_string()
        } else {
            format!("{}:{}", self.build_target(), self.model())
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionEntry {
    #[serde(default)]
    pub key: EntryKey,
    #[serde(default)]
    pub version: String,
}

impl VersionEntry {
    pub fn new(build_target: &str, model: &str, version: &str) -> Self {
        Self {
            key: EntryKey::new(build_target, model),
            version: version.to_string(),
        }
    }

    pub fn build_target(&self) -> &str {
        self.key.build_target()
    }

    pub fn model(&self) -> &str {
        self.key.model()
    }
}

/// A decoded stable-version manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub cros: Vec<VersionEntry>,
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub firmware: Vec<VersionEntry>,
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub faft: Vec<VersionEntry>,
}

/// A `null` section reads as an empty one.
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<VersionEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<VersionEntry>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl Manifest {
    pub fn section(&self, section: Section) -> &[VersionEntry] {
        match section {
            Section::Cros => &self.cros,
            Section::Firmware => &self.firmware,
            Section::Faft => &self.faft,
        }
    }

    pub fn section_mut(&mut self, section: Section) -> &mut Vec<VersionEntry> {
        match section {
            Section::Cros => &mut self.cros,
            Section::Firmware => &mut self.firmware,
            Section::Faft => &mut self.faft,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cros.is_empty() && self.firmware.is_empty() && self.faft.is_empty()
    }

    /// Read and decode a manifest from disk.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        decode(&bytes)
    }

    /// Merge `updated` into the OS section.
    pub fn add_updated_cros(&self, updated: &[VersionEntry]) -> Manifest {
        self.add_updated(Section::Cros, updated)
    }

    /// Merge `updated` into the firmware section.
    pub fn add_updated_firmware(&self, updated: &[VersionEntry]) -> Manifest {
        self.add_updated(Section::Firmware, updated)
    }

    /// Merge `updated` into the faft section.
    pub fn add_updated_faft(&self, updated: &[VersionEntry]) -> Manifest {
        self.add_updated(Section::Faft, updated)
    }

    fn add_updated(&self, section: Section, updated: &[VersionEntry]) -> Manifest {
        let mut merged = self.clone();
        let entries = merged.section_mut(section);
        *entries = merge_entries(entries, updated);
        merged
    }

    /// Keep only the entries whose model matches `model` exactly.
    pub fn filter_model(&self, model: &str) -> Manifest {
        let keep = |entries: &[VersionEntry]| -> Vec<VersionEntry> {
            entries
                .iter()
                .filter(|e| e.model() == model)
                .cloned()
                .collect()
        };
        Manifest {
            cros: keep(&self.cros),
            firmware: keep(&self.firmware),
            faft: keep(&self.faft),
        }
    }

    /// Version of the OS entry whose key is exactly `(bt, model)`.
    pub fn os_for(&self, build_target: &str, model: &str) -> Option<&str> {
        find_version(&self.cros, build_target, model)
    }

    /// Version of the firmware entry whose key is exactly `(bt, model)`.
    pub fn firmware_for(&self, build_target: &str, model: &str) -> Option<&str> {
        find_version(&self.firmware, build_target, model)
    }

    /// Establish canonical order within every section.
    pub fn sort_in_place(&mut self) {
        for section in Section::ALL {
            self.section_mut(section).sort_by(compare_entries);
        }
    }
}

fn find_version<'a>(entries: &'a [VersionEntry], build_target: &str, model: &str) -> Option<&'a str> {
    entries
        .iter()
        .find(|e| e.build_target() == build_target && e.model() == model)
        .map(|e| e.version.as_str())
}

/// Update entries of `old` whose key appears in `updated` and append the
/// rest of `updated` in order.
pub fn merge_entries(old: &[VersionEntry], updated: &[VersionEntry]) -> Vec<VersionEntry> {
    let mut merged = old.to_vec();
    for entry in updated {
        match merged.iter_mut().find(|e| e.key == entry.key) {
            Some(existing) => existing.version = entry.version.clone(),
            None => merged.push(entry.clone()),
        }
    }
    merged
}

fn compare_entries(a: &VersionEntry, b: &VersionEntry) -> Ordering {
    let (ca, cb) = (a.key.composite(), b.key.composite());
    ca.to_lowercase()
        .cmp(&cb.to_lowercase())
        .then_with(|| ca.cmp(&cb))
        .then_with(|| a.version.cmp(&b.version))
}

/// Decode manifest bytes. Unknown fields are ignored.
pub fn decode(bytes: &[u8]) -> Result<Manifest> {
    serde_json::from_slice(bytes).map_err(|e| Error::Decode {
        message: format!("cannot decode stable version manifest: {}", e),
    })
}

/// Encode a manifest in canonical form.
pub fn encode(manifest: &Manifest) -> Result<Vec<u8>> {
    let mut sorted = manifest.clone();
    sorted.sort_in_place();

    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    sorted.serialize(&mut serializer)?;
    out.push(b'\n');
    Ok(out)
}

/// Encode as a string; canonical bytes are always UTF-8.
pub fn encode_string(manifest: &Manifest) -> Result<String> {
    let bytes = encode(manifest)?;
    String::from_utf8(bytes).map_err(|e| Error::Decode {
        message: e.to_string(),
    })
}
