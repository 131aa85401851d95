//! Shared test utilities for E2E tests.
//!
//! This module provides a fixture that lays out a local image archive, a
//! release feed, manifests and a configuration file inside one temporary
//! directory, so the CLI can run end to end without network access.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new()
//!         .with_unibuild("nami", "R77-12371.52.22", &[("vayne", "Google_Nami.1.0.0")])
//!         .with_manifest("sv.cfg", manifests::NAMI);
//!     fixture.command().arg("validate").arg(fixture.child("sv.cfg").path());
//! }
//! ```

use std::env;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_fs::prelude::*;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::manifests;
    #[allow(unused_imports)]
    pub use super::should_skip_network_tests;
    pub use super::TestFixture;
}

/// Manifest snippets for testing.
#[allow(dead_code)]
pub mod manifests {
    /// One unibuild model pinned at R77-12371.52.22.
    pub const NAMI: &str = r#"{
  "cros": [
    {"key": {"buildTarget": {"name": "nami"}, "modelId": {"value": "vayne"}}, "version": "R77-12371.52.22"}
  ],
  "firmware": [
    {"key": {"buildTarget": {"name": "nami"}, "modelId": {"value": "vayne"}}, "version": "Google_Nami.8438.184.0"}
  ],
  "faft": [
    {"key": {"buildTarget": {"name": "nami"}, "modelId": {"value": "vayne"}}, "version": "nami-firmware/R77-12371.52.22"}
  ]
}
"#;

    /// Same as [`NAMI`] with a firmware version the archive disagrees with.
    pub const NAMI_WRONG_FIRMWARE: &str = r#"{
  "cros": [
    {"key": {"buildTarget": {"name": "nami"}, "modelId": {"value": "vayne"}}, "version": "R77-12371.52.22"}
  ],
  "firmware": [
    {"key": {"buildTarget": {"name": "nami"}, "modelId": {"value": "vayne"}}, "version": "Google_Nami.1.1.1"}
  ]
}
"#;

    /// Upper-case build target.
    pub const UPPERCASE: &str = r#"{
  "cros": [
    {"key": {"buildTarget": {"name": "NAMI"}}, "version": "R77-12371.52.22"}
  ],
  "firmware": [
    {"key": {"buildTarget": {"name": "NAMI"}, "modelId": {"value": "vayne"}}, "version": "Google_Nami.8438.184.0"}
  ]
}
"#;

    /// Manifest without any OS entry.
    pub const NO_CROS: &str = r#"{
  "firmware": [
    {"key": {"buildTarget": {"name": "nami"}, "modelId": {"value": "vayne"}}, "version": "Google_Nami.8438.184.0"}
  ]
}
"#;
}

/// Check if network tests should be skipped.
///
/// Returns `true` if the `SKIP_NETWORK_TESTS` environment variable is set.
#[allow(dead_code)]
pub fn should_skip_network_tests() -> bool {
    env::var("SKIP_NETWORK_TESTS").is_ok()
}

/// A temporary directory holding an archive, a config file and inputs.
///
/// The archive lives under `archive/` and follows the
/// `<bt>-release/<version>/metadata.json` layout. The config file points at
/// it and disables strict OS-model checking.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a fixture with an empty archive and the default config.
    pub fn new() -> Self {
        let fixture = Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        };
        fixture
            .temp_dir
            .child("archive")
            .create_dir_all()
            .expect("Failed to create archive directory");
        fixture.with_config("")
    }

    /// Write `labfleet.yaml`; `extra` is appended after the archive root.
    pub fn with_config(self, extra: &str) -> Self {
        let yaml = format!(
            "archive_root: {}\nstrict_os_models: false\n{}",
            self.archive_root().display(),
            extra
        );
        self.temp_dir
            .child("labfleet.yaml")
            .write_str(&yaml)
            .expect("Failed to write config file");
        self
    }

    /// Publish a unibuild metadata record in the archive.
    pub fn with_unibuild(self, build_target: &str, version: &str, models: &[(&str, &str)]) -> Self {
        let models: serde_json::Map<String, serde_json::Value> = models
            .iter()
            .map(|(model, fw)| {
                (
                    model.to_string(),
                    serde_json::json!({ "main-readwrite-firmware-version": fw }),
                )
            })
            .collect();
        let doc = serde_json::json!({
            "unibuild": true,
            "board-metadata": { build_target: { "models": models } },
        });
        self.with_file(
            &format!("archive/{}-release/{}/metadata.json", build_target, version),
            &doc.to_string(),
        )
    }

    /// Write a release feed with one beta entry per `(board, milestone, version)`.
    pub fn with_feed(self, entries: &[(&str, u64, &str)]) -> Self {
        let entries: Vec<serde_json::Value> = entries
            .iter()
            .map(|(board, milestone, version)| {
                serde_json::json!({
                    "board": {"publicCodename": board},
                    "channel": "beta",
                    "milestone": milestone,
                    "chromeOsVersion": version,
                })
            })
            .collect();
        let feed = serde_json::json!({ "omahaData": entries });
        self.with_file("feed.json", &feed.to_string())
    }

    /// Write a manifest file.
    pub fn with_manifest(self, path: &str, content: &str) -> Self {
        self.with_file(path, content)
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn archive_root(&self) -> PathBuf {
        self.temp_dir.path().join("archive")
    }

    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join("labfleet.yaml")
    }

    pub fn feed_path(&self) -> PathBuf {
        self.temp_dir.path().join("feed.json")
    }

    /// Create a child path in the temp directory.
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// A `labfleet` command running in the fixture with its config file.
    pub fn command(&self) -> Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("labfleet");
        cmd.current_dir(self.path())
            .env_remove("LABFLEET_CONFIG")
            .env_remove("RUST_LOG")
            .arg("--config")
            .arg(self.config_path());
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
