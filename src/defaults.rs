//! Default values for labfleet configuration.
//!
//! This module provides centralized default values used across commands,
//! ensuring consistency and avoiding duplication.

use std::path::PathBuf;

/// Image archive holding per-build `metadata.json` records.
pub const ARCHIVE_ROOT: &str = "gs://chromeos-image-archive";

/// Branch of the manifest repository that is read and updated.
pub const MANIFEST_BRANCH: &str = "main";

/// Location of the manifest inside its repository.
pub const MANIFEST_PATH: &str = "lab_platform/stable_version_data/stable_versions.cfg";

/// Ref that receives proposed manifest revisions.
pub const PUSH_REF: &str = "refs/for/main";

/// File name of firmware bundles searched by `locate-firmware`.
pub const FIRMWARE_BUNDLE_SUFFIX: &str = "firmware_from_source.tar.bz2";

/// Commit message used when proposing a new manifest revision.
pub const UPDATE_COMMIT_MESSAGE: &str = "Update stable versions from the beta channel";

/// Returns the default configuration file path.
///
/// Uses the platform-appropriate config directory:
/// - Linux: `~/.config/labfleet/config.yaml` (XDG Base Directory)
/// - macOS: `~/Library/Application Support/labfleet/config.yaml`
/// - Windows: `{FOLDERID_RoamingAppData}\labfleet\config.yaml`
///
/// Returns `None` when the platform config directory cannot be determined.
/// This can be overridden by the `--config` CLI flag or the
/// `LABFLEET_CONFIG` environment variable.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("labfleet").join("config.yaml"))
}
