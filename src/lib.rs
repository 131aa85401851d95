//! # Lab Fleet Library
//!
//! This library maintains the "stable version" manifest of a device lab and
//! derives the scheduler dimensions its worker agents advertise. It is
//! designed to be used by the `labfleet` command-line tool but can also be
//! embedded in other fleet services.
//!
//! ## Quick Example
//!
//! ```
//! use labfleet::manifest::{self, Manifest, VersionEntry};
//! use labfleet::version;
//!
//! let parsed = version::parse_os("R85-13310.41.0").unwrap();
//! assert_eq!(parsed.release, 85);
//!
//! let m = Manifest {
//!     cros: vec![VersionEntry::new("nami", "vayne", "R85-13310.41.0")],
//!     ..Default::default()
//! };
//! let bytes = manifest::encode(&m).unwrap();
//! assert_eq!(manifest::decode(&bytes).unwrap(), m);
//! ```
//!
//! ## Core Concepts
//!
//! - **Versions (`version`)**: Grammars and ordering of OS, firmware and faft
//!   version strings.
//! - **Manifest (`manifest`)**: The three-section stable-version document and
//!   its canonical encoding.
//! - **Archive (`archive`, `cache`)**: Firmware versions read from per-build
//!   metadata records, memoized for the duration of one run.
//! - **Reconciliation (`feed`, `reconcile`)**: Merging the upstream release
//!   feed into the manifest.
//! - **Validation (`validation`)**: Shallow checks of a manifest file and deep
//!   checks against the archive, with allow-list filtering.
//! - **Dimensions (`dimensions`)**: Projection of device records into
//!   scheduler dimensions and aggregation of scheduling units.
//!
//! ## Execution Flow
//!
//! The [`orchestrator`] wires the pieces together. An update:
//!
//! 1.  Reads the release feed and the current manifest.
//! 2.  Reconciles them, resolving firmware through the archive.
//! 3.  Deep-validates the result and applies the allow-lists.
//! 4.  Proposes the canonical encoding as a new manifest revision.

pub mod archive;
pub mod cache;
pub mod cancel;
pub mod config;
pub mod defaults;
pub mod dimensions;
pub mod error;
pub mod feed;
pub mod git;
pub mod gsutil;
pub mod manifest;
pub mod orchestrator;
pub mod reconcile;
pub mod repository;
pub mod validation;
pub mod version;

#[cfg(test)]
mod version_proptest;
