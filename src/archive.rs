//! # Image Archive Reader
//!
//! Reads per-build `metadata.json` records from the image archive and
//! memoizes the firmware versions they declare.
//!
//! ## Layout
//!
//! The metadata record for `(build target, OS version)` lives at
//! `<archive>/<bt>-release/<v>/metadata.json`. A record is either
//!
//! - **unibuild** (`"unibuild": true`): `board-metadata -> <board> -> models ->
//!   <model>` objects carrying `main-readwrite-firmware-version` and
//!   `main-readonly-firmware-version`; the readwrite string is preferred, or
//! - **non-unibuild**: a single top-level `main-firmware-version`, reported
//!   under the model name equal to the build target.
//!
//! ## Backends
//!
//! Archive access goes through [`ArchiveOperations`] so tests can substitute
//! an in-memory archive. `gs://` roots use the system `gsutil`, `http(s)://`
//! roots use `ureq`, and `file://` URLs or bare paths read the local disk.
//!
//! ## Firmware bundles
//!
//! [`ArchiveReader::locate_firmware_bundle`] probes candidate bundle paths in
//! strict priority order. All candidates of one milestone are probed in
//! parallel with `rayon`; the winner is chosen by position, never by which
//! probe finished first.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};
use rayon::prelude::*;
use serde_json::Value;

use crate::cache::{CacheKey, FirmwareCache, ModelFirmware};
use crate::cancel::CancelToken;
use crate::error::{Error, Result};

/// Milestones probed after the requested one.
const MILESTONES_AHEAD: u32 = 5;
/// Milestones probed before the requested one.
const MILESTONES_BEHIND: u32 = 40;
/// Archive directory variants, in probe order.
const BUNDLE_VARIANTS: [&str; 2] = ["release", "firmware"];

/// Trait for archive operations - allows mocking in tests
pub trait ArchiveOperations: Send + Sync {
    /// Copies one archive object to a local file.
    fn download(&self, remote: &str, local: &Path) -> Result<()>;

    /// Reports whether an archive object exists.
    fn exists(&self, remote: &str) -> Result<bool>;
}

/// Google Cloud Storage archive driven by the system `gsutil`.
pub struct GsutilArchive;

impl ArchiveOperations for GsutilArchive {
    fn download(&self, remote: &str, local: &Path) -> Result<()> {
        crate::gsutil::copy(remote, local)
    }

    fn exists(&self, remote: &str) -> Result<bool> {
        crate::gsutil::exists(remote)
    }
}

/// Archive mirrored on the local filesystem.
pub struct LocalArchive;

impl LocalArchive {
    fn resolve(remote: &str) -> Result<PathBuf> {
        if remote.starts_with("file://") {
            let url = url::Url::parse(remote)?;
            url.to_file_path().map_err(|_| Error::Config {
                message: format!("not a local file URL: {}", remote),
                hint: None,
            })
        } else {
            Ok(PathBuf::from(remote))
        }
    }
}

impl ArchiveOperations for LocalArchive {
    fn download(&self, remote: &str, local: &Path) -> Result<()> {
        let source = Self::resolve(remote)?;
        if let Some(parent) = local.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&source, local)?;
        Ok(())
    }

    fn exists(&self, remote: &str) -> Result<bool> {
        Ok(Self::resolve(remote)?.is_file())
    }
}

/// Archive served over plain HTTP(S).
pub struct HttpArchive;

impl ArchiveOperations for HttpArchive {
    fn download(&self, remote: &str, local: &Path) -> Result<()> {
        let bytes = http_get(remote)?;
        if let Some(parent) = local.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(local, bytes)?;
        Ok(())
    }

    fn exists(&self, remote: &str) -> Result<bool> {
        match ureq::head(remote).call() {
            Ok(_) => Ok(true),
            Err(ureq::Error::Status(404, _)) => Ok(false),
            Err(e) => Err(Error::Network {
                url: remote.to_string(),
                message: e.to_string(),
            }),
        }
    }
}

/// Fetch a URL into memory.
pub fn http_get(url: &str) -> Result<Vec<u8>> {
    let response = ureq::get(url).call().map_err(|e| Error::Network {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    let mut bytes = Vec::new();
    response.into_reader().read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Pick the backend serving `root`.
pub fn operations_for(root: &str) -> Result<Arc<dyn ArchiveOperations>> {
    if !root.contains("://") {
        return Ok(Arc::new(LocalArchive));
    }
    let url = url::Url::parse(root)?;
    match url.scheme() {
        "gs" => Ok(Arc::new(GsutilArchive)),
        "http" | "https" => Ok(Arc::new(HttpArchive)),
        "file" => Ok(Arc::new(LocalArchive)),
        other => Err(Error::Config {
            message: format!("unsupported archive scheme {:?} in {}", other, root),
            hint: Some("use gs://, http(s)://, file:// or a local directory".to_string()),
        }),
    }
}

/// Parse one `metadata.json` record into `model -> firmware version`.
pub fn parse_metadata(build_target: &str, bytes: &[u8]) -> Result<ModelFirmware> {
    let doc: Value = serde_json::from_slice(bytes)?;
    if !doc.is_object() {
        return Err(Error::Decode {
            message: "metadata record is not a JSON object".to_string(),
        });
    }

    let mut out = ModelFirmware::new();
    if doc.get("unibuild").and_then(Value::as_bool) == Some(true) {
        let boards = doc.get("board-metadata").and_then(Value::as_object);
        for board in boards.into_iter().flat_map(|b| b.values()) {
            let models = board.get("models").and_then(Value::as_object);
            for (model, record) in models.into_iter().flatten() {
                let field = |name: &str| record.get(name).and_then(Value::as_str).unwrap_or("");
                let readwrite = field("main-readwrite-firmware-version");
                let chosen = if readwrite.is_empty() {
                    field("main-readonly-firmware-version")
                } else {
                    readwrite
                };
                if !chosen.is_empty() {
                    out.insert(model.clone(), chosen.to_string());
                }
            }
        }
    } else {
        let firmware = doc
            .get("main-firmware-version")
            .and_then(Value::as_str)
            .or_else(|| {
                doc.get("board-metadata")
                    .and_then(|b| b.get(build_target))
                    .and_then(|b| b.get("main-firmware-version"))
                    .and_then(Value::as_str)
            })
            .unwrap_or("");
        if !firmware.is_empty() {
            out.insert(build_target.to_string(), firmware.to_string());
        }
    }
    Ok(out)
}

/// Memoizing reader over one archive root.
pub struct ArchiveReader {
    root: String,
    ops: Arc<dyn ArchiveOperations>,
    workdir: PathBuf,
    cancel: CancelToken,
    cache: FirmwareCache,
    fetches: usize,
}

impl ArchiveReader {
    /// Creates a reader with the backend matching `root`. Downloads land
    /// under `workdir`, which the caller owns.
    pub fn new(root: &str, workdir: &Path, cancel: CancelToken) -> Result<Self> {
        let ops = operations_for(root)?;
        Ok(Self::with_operations(root, ops, workdir, cancel))
    }

    /// Creates a reader with a custom backend.
    pub fn with_operations(
        root: &str,
        ops: Arc<dyn ArchiveOperations>,
        workdir: &Path,
        cancel: CancelToken,
    ) -> Self {
        Self {
            root: root.trim_end_matches('/').to_string(),
            ops,
            workdir: workdir.to_path_buf(),
            cancel,
            cache: FirmwareCache::new(),
            fetches: 0,
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Remote location of the metadata record for `(bt, v)`.
    pub fn metadata_path(&self, build_target: &str, version: &str) -> String {
        format!("{}/{}-release/{}/metadata.json", self.root, build_target, version)
    }

    /// Number of metadata fetches attempted so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches
    }

    /// Firmware versions per model for `(bt, v)`, fetched at most once.
    ///
    /// Any fetch or parse failure becomes [`Error::ArchiveUnavailable`] and
    /// leaves the cache unchanged. Cancellation is reported as-is.
    pub fn firmware_versions_for(&mut self, build_target: &str, version: &str) -> Result<ModelFirmware> {
        self.cancel.check()?;

        let key = CacheKey::new(build_target, version);
        let remote = self.metadata_path(build_target, version);
        let local = self
            .workdir
            .join(build_target)
            .join(version)
            .join("metadata.json");

        let Self {
            ops,
            cache,
            fetches,
            ..
        } = self;

        cache
            .get_or_fetch(&key, || {
                *fetches += 1;
                debug!("Fetching {}", remote);
                ops.download(&remote, &local)?;
                let bytes = fs::read(&local)?;
                parse_metadata(build_target, &bytes)
            })
            .map_err(|e| match e {
                Error::Cancelled => Error::Cancelled,
                other => {
                    info!(
                        "Archive record for {} {} unavailable: {}",
                        build_target, version, other
                    );
                    Error::ArchiveUnavailable {
                        build_target: build_target.to_string(),
                        version: version.to_string(),
                        message: other.to_string(),
                    }
                }
            })
    }

    /// Firmware version of one model at `(bt, v)`.
    pub fn firmware_version(&mut self, build_target: &str, model: &str, version: &str) -> Result<String> {
        let models = self.firmware_versions_for(build_target, version)?;
        models
            .get(model)
            .cloned()
            .ok_or_else(|| Error::FailedToLookup {
                build_target: build_target.to_string(),
                model: model.to_string(),
            })
    }

    /// Candidate firmware bundle paths grouped by milestone, in priority
    /// order.
    pub fn bundle_candidates(
        &self,
        board: &str,
        milestone: u32,
        tip: u64,
        branch: u64,
        suffix: &str,
    ) -> Vec<Vec<String>> {
        let ahead = (1..=MILESTONES_AHEAD).filter_map(|k| milestone.checked_add(k));
        let behind = (1..=MILESTONES_BEHIND).filter_map(|k| milestone.checked_sub(k));

        std::iter::once(milestone)
            .chain(ahead)
            .chain(behind)
            .map(|m| {
                BUNDLE_VARIANTS
                    .iter()
                    .map(|variant| {
                        format!(
                            "{}/{}-{}/R{}-{}.{}.0/{}",
                            self.root, board, variant, m, tip, branch, suffix
                        )
                    })
                    .collect()
            })
            .collect()
    }

    /// Find the highest-priority firmware bundle that exists.
    ///
    /// Returns [`Error::NotFound`] carrying the first candidate when nothing
    /// exists. Probes do not touch the firmware-version cache.
    pub fn locate_firmware_bundle(
        &self,
        board: &str,
        milestone: u32,
        tip: u64,
        branch: u64,
        suffix: &str,
    ) -> Result<String> {
        let groups = self.bundle_candidates(board, milestone, tip, branch, suffix);
        let first = groups
            .first()
            .and_then(|g| g.first())
            .cloned()
            .unwrap_or_default();

        for group in &groups {
            self.cancel.check()?;
            let found: Vec<bool> = group
                .par_iter()
                .map(|candidate| self.probe(candidate))
                .collect::<Result<Vec<bool>>>()?;
            if let Some(idx) = found.iter().position(|hit| *hit) {
                return Ok(group[idx].clone());
            }
        }

        Err(Error::NotFound { path: first })
    }

    fn probe(&self, candidate: &str) -> Result<bool> {
        self.cancel.check()?;
        match self.ops.exists(candidate) {
            Ok(hit) => Ok(hit),
            Err(e) => {
                debug!("Probe of {} failed: {}", candidate, e);
                Ok(false)
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::MemoryArchive;
    use super::*;
    use tempfile::TempDir;

    const ROOT: &str = "gs://archive";

    const UNIBUILD: &str = r#"{
        "version": {"full": "R81-12835.0.0"},
        "unibuild": true,
        "board-metadata": {
            "nami": {
                "models": {
                    "sona": {
                        "main-readonly-firmware-version": "Google_Nami.4.7.9",
                        "main-readwrite-firmware-version": "Google_Nami.42.43.44"
                    },
                    "akali360": {
                        "main-readonly-firmware-version": "Google_Nami.5.8.13",
                        "main-readwrite-firmware-version": ""
                    },
                    "ghost": {}
                }
            }
        }
    }"#;

    fn reader(archive: Arc<MemoryArchive>, dir: &TempDir) -> ArchiveReader {
        ArchiveReader::with_operations(ROOT, archive, dir.path(), CancelToken::new())
    }

    #[test]
    fn test_parse_unibuild_prefers_readwrite() {
        let parsed = parse_metadata("nami", UNIBUILD.as_bytes()).unwrap();
        assert_eq!(parsed.get("sona").map(String::as_str), Some("Google_Nami.42.43.44"));
        assert_eq!(parsed.get("akali360").map(String::as_str), Some("Google_Nami.5.8.13"));
        assert!(!parsed.contains_key("ghost"));
    }

    #[test]
    fn test_parse_non_unibuild() {
        let parsed = parse_metadata(
            "eve",
            br#"{"unibuild": false, "main-firmware-version": "Google_Eve.9584.174.0"}"#,
        )
        .unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.get("eve").map(String::as_str), Some("Google_Eve.9584.174.0"));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_metadata("nami", b"{").is_err());
        assert!(parse_metadata("nami", b"[]").is_err());
    }

    #[test]
    fn test_metadata_path() {
        let dir = TempDir::new().unwrap();
        let archive = Arc::new(MemoryArchive::new());
        let reader = ArchiveReader::with_operations(
            "gs://archive/",
            archive,
            dir.path(),
            CancelToken::new(),
        );
        assert_eq!(
            reader.metadata_path("nami", "R77-12371.52.22"),
            "gs://archive/nami-release/R77-12371.52.22/metadata.json"
        );
    }

    #[test]
    fn test_firmware_versions_fetched_once() {
        let dir = TempDir::new().unwrap();
        let archive = Arc::new(MemoryArchive::new());
        archive.put_unibuild(ROOT, "nami", "R77-1.0.0", &[("sona", "Google_Nami.1.2.3")]);
        let mut reader = reader(Arc::clone(&archive), &dir);

        let first = reader.firmware_versions_for("nami", "R77-1.0.0").unwrap();
        let second = reader.firmware_versions_for("nami", "R77-1.0.0").unwrap();
        assert_eq!(first, second);
        assert_eq!(archive.downloads(), 1);
        assert_eq!(reader.fetch_count(), 1);
    }

    #[test]
    fn test_unavailable_record_is_retried() {
        let dir = TempDir::new().unwrap();
        let archive = Arc::new(MemoryArchive::new());
        let mut reader = reader(Arc::clone(&archive), &dir);

        let err = reader.firmware_versions_for("nami", "R77-1.0.0").unwrap_err();
        assert!(matches!(err, Error::ArchiveUnavailable { .. }));

        archive.put_unibuild(ROOT, "nami", "R77-1.0.0", &[("sona", "Google_Nami.1.2.3")]);
        assert!(reader.firmware_versions_for("nami", "R77-1.0.0").is_ok());
        assert_eq!(archive.downloads(), 2);
    }

    #[test]
    fn test_malformed_record_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let archive = Arc::new(MemoryArchive::new());
        archive.put(&format!("{}/nami-release/R1-1.0.0/metadata.json", ROOT), "{nope");
        let mut reader = reader(archive, &dir);
        assert!(matches!(
            reader.firmware_versions_for("nami", "R1-1.0.0"),
            Err(Error::ArchiveUnavailable { .. })
        ));
    }

    #[test]
    fn test_firmware_version_missing_model() {
        let dir = TempDir::new().unwrap();
        let archive = Arc::new(MemoryArchive::new());
        archive.put_unibuild(ROOT, "nami", "R77-1.0.0", &[("sona", "Google_Nami.1.2.3")]);
        let mut reader = reader(archive, &dir);
        assert_eq!(
            reader.firmware_version("nami", "sona", "R77-1.0.0").unwrap(),
            "Google_Nami.1.2.3"
        );
        assert!(matches!(
            reader.firmware_version("nami", "vayne", "R77-1.0.0"),
            Err(Error::FailedToLookup { .. })
        ));
    }

    #[test]
    fn test_cancelled_reader_does_not_fetch() {
        let dir = TempDir::new().unwrap();
        let archive = Arc::new(MemoryArchive::new());
        let cancel = CancelToken::new();
        let mut reader = ArchiveReader::with_operations(
            ROOT,
            Arc::clone(&archive) as Arc<dyn ArchiveOperations>,
            dir.path(),
            cancel.clone(),
        );
        cancel.cancel();
        assert!(matches!(
            reader.firmware_versions_for("nami", "R1-1.0.0"),
            Err(Error::Cancelled)
        ));
        assert_eq!(archive.downloads(), 0);
    }

    #[test]
    fn test_bundle_candidates_priority_order() {
        let dir = TempDir::new().unwrap();
        let reader = reader(Arc::new(MemoryArchive::new()), &dir);
        let groups = reader.bundle_candidates("nami", 80, 12739, 3, "fw.tar.bz2");

        // m, m+1..m+5, m-1..m-40
        assert_eq!(groups.len(), 46);
        assert_eq!(
            groups[0],
            vec![
                "gs://archive/nami-release/R80-12739.3.0/fw.tar.bz2".to_string(),
                "gs://archive/nami-firmware/R80-12739.3.0/fw.tar.bz2".to_string(),
            ]
        );
        assert!(groups[1][0].contains("/R81-"));
        assert!(groups[5][0].contains("/R85-"));
        assert!(groups[6][0].contains("/R79-"));
        assert!(groups[45][0].contains("/R40-"));
    }

    #[test]
    fn test_bundle_candidates_stop_at_zero() {
        let dir = TempDir::new().unwrap();
        let reader = reader(Arc::new(MemoryArchive::new()), &dir);
        let groups = reader.bundle_candidates("nami", 2, 1, 0, "fw");
        // 2, 3..7, 1, 0
        assert_eq!(groups.len(), 8);
    }

    #[test]
    fn test_locate_prefers_priority_over_milestone_distance() {
        let dir = TempDir::new().unwrap();
        let archive = Arc::new(MemoryArchive::new());
        archive.put("gs://archive/nami-firmware/R80-1.2.0/fw", "x");
        archive.put("gs://archive/nami-release/R81-1.2.0/fw", "x");
        archive.put("gs://archive/nami-release/R79-1.2.0/fw", "x");
        let reader = reader(archive, &dir);

        // Requested milestone wins even though only the firmware variant exists there
        assert_eq!(
            reader.locate_firmware_bundle("nami", 80, 1, 2, "fw").unwrap(),
            "gs://archive/nami-firmware/R80-1.2.0/fw"
        );
    }

    #[test]
    fn test_locate_looks_ahead_before_behind() {
        let dir = TempDir::new().unwrap();
        let archive = Arc::new(MemoryArchive::new());
        archive.put("gs://archive/nami-release/R85-1.2.0/fw", "x");
        archive.put("gs://archive/nami-release/R79-1.2.0/fw", "x");
        let reader = reader(archive, &dir);
        assert_eq!(
            reader.locate_firmware_bundle("nami", 80, 1, 2, "fw").unwrap(),
            "gs://archive/nami-release/R85-1.2.0/fw"
        );
    }

    #[test]
    fn test_locate_release_before_firmware_variant() {
        let dir = TempDir::new().unwrap();
        let archive = Arc::new(MemoryArchive::new());
        archive.put("gs://archive/nami-release/R78-1.2.0/fw", "x");
        archive.put("gs://archive/nami-firmware/R78-1.2.0/fw", "x");
        let reader = reader(archive, &dir);
        assert_eq!(
            reader.locate_firmware_bundle("nami", 80, 1, 2, "fw").unwrap(),
            "gs://archive/nami-release/R78-1.2.0/fw"
        );
    }

    #[test]
    fn test_locate_not_found_echoes_first_candidate() {
        let dir = TempDir::new().unwrap();
        let reader = reader(Arc::new(MemoryArchive::new()), &dir);
        match reader.locate_firmware_bundle("nami", 80, 1, 2, "fw") {
            Err(Error::NotFound { path }) => {
                assert_eq!(path, "gs://archive/nami-release/R80-1.2.0/fw")
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_locate_does_not_touch_cache() {
        let dir = TempDir::new().unwrap();
        let archive = Arc::new(MemoryArchive::new());
        archive.put("gs://archive/nami-release/R80-1.2.0/fw", "x");
        let reader = reader(Arc::clone(&archive), &dir);
        reader.locate_firmware_bundle("nami", 80, 1, 2, "fw").unwrap();
        assert_eq!(reader.fetch_count(), 0);
        assert_eq!(archive.downloads(), 0);
    }

    #[test]
    fn test_local_archive_backend() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("archive");
        let record = root.join("eve-release/R80-1.0.0/metadata.json");
        fs::create_dir_all(record.parent().unwrap()).unwrap();
        fs::write(&record, r#"{"main-firmware-version": "Google_Eve.1.2.3"}"#).unwrap();

        let work = TempDir::new().unwrap();
        let mut reader =
            ArchiveReader::new(root.to_str().unwrap(), work.path(), CancelToken::new()).unwrap();
        let models = reader.firmware_versions_for("eve", "R80-1.0.0").unwrap();
        assert_eq!(models.get("eve").map(String::as_str), Some("Google_Eve.1.2.3"));
    }

    #[test]
    fn test_operations_for_rejects_unknown_scheme() {
        assert!(matches!(
            operations_for("ftp://archive"),
            Err(Error::Config { .. })
        ));
        assert!(operations_for("gs://chromeos-image-archive").is_ok());
        assert!(operations_for("/srv/archive").is_ok());
    }
}
