//! # Error Handling
//!
//! This module defines the centralized error type for `labfleet`. It uses the
//! `thiserror` library to build a single `Error` enum that covers every
//! failure mode of the stable-version pipeline and the dimension projector.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Each variant corresponds to one error kind
//!   and carries the context an operator needs to act on it (build target,
//!   model, offending version string, archive path).
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! ## Propagation
//!
//! Codec errors (`InvalidFormat`, `Decode`, `SchemaViolation`, `NonLowercase`)
//! are fatal to the surrounding operation. `ArchiveUnavailable`,
//! `FailedToLookup` and `NoValidVersion` are usually absorbed by the caller
//! and turned into log lines or report entries. `Cancelled` must always be
//! propagated as-is so scoped resources are released on the way out.

use thiserror::Error;

use crate::validation::ValidationResult;

/// Main error type for labfleet operations
#[derive(Error, Debug)]
pub enum Error {
    /// A version string does not match its grammar, or a manifest entry
    /// carries such a version.
    #[error("{message}")]
    InvalidFormat { message: String },

    /// Input bytes could not be decoded (empty, not UTF-8, not JSON, or not
    /// shaped like the expected document).
    #[error("{message}")]
    Decode { message: String },

    /// A manifest decoded but breaks a structural rule (missing or empty
    /// section, duplicate key, empty build target or model).
    #[error("{message}")]
    SchemaViolation { message: String },

    /// A build target or model contains uppercase letters.
    #[error("File has non-lowercase entry: {entry}")]
    NonLowercase { entry: String },

    /// The archive metadata for `(build_target, version)` could not be
    /// fetched or parsed.
    #[error("archive unavailable for {build_target} {version}: {message}")]
    ArchiveUnavailable {
        build_target: String,
        version: String,
        message: String,
    },

    /// No archive record exists for a board named in the manifest.
    #[error("missing board: {build_target}")]
    MissingBoard { build_target: String },

    /// An archive record exists but has no entry for the model.
    #[error("failed to lookup firmware for {build_target};{model}")]
    FailedToLookup { build_target: String, model: String },

    /// The archive firmware version disagrees with the manifest.
    #[error("invalid firmware version for {build_target};{model}: wanted {wanted}, got {got}")]
    InvalidVersion {
        build_target: String,
        model: String,
        wanted: String,
        got: String,
    },

    /// Neither the upstream nor the pinned OS version of a model is valid.
    #[error("no valid OS version for model {model}")]
    NoValidVersion { model: String },

    /// No firmware bundle exists at any candidate location.
    #[error("firmware bundle not found (first candidate: {path})")]
    NotFound { path: String },

    /// Deep validation left anomalies after allow-list filtering.
    #[error("validation found {count} anomalies")]
    Anomalies {
        count: usize,
        report: Box<ValidationResult>,
    },

    /// The operation was cancelled before it completed.
    #[error("operation cancelled")]
    Cancelled,

    /// An error occurred while loading the tool configuration.
    ///
    /// This error includes the specific issue and optionally a hint about
    /// how to fix it.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Config {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// An external command (such as `gsutil`) failed.
    #[error("Command failed: {command} - {stderr}")]
    Command { command: String, stderr: String },

    /// An error occurred while executing a Git command.
    #[error("Git command failed for {url}: {command} - {stderr}")]
    GitCommand {
        command: String,
        url: String,
        stderr: String,
    },

    /// An error occurred during a network operation.
    #[error("Network operation error: {url} - {message}")]
    Network { url: String, message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl Error {
    /// Returns true for errors that must abort the whole flow immediately.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
