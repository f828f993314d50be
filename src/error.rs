//! Domain-specific error types for the bootstrapper.
//!
//! Internal modules return typed errors while command handlers at the CLI
//! boundary convert them to [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! InstallError   : detection, installation, download and verification failures
//! PlatformError  : host classification failures
//! ConfigError    : catalog loading and parsing
//! ```

use thiserror::Error;

/// Errors that arise while provisioning a single capability.
///
/// Every variant that originates from an external command carries the
/// captured exit code and standard error so nothing is silently swallowed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstallError {
    /// The detection step could not tell whether the tool satisfies the
    /// declared requirement (e.g. the version string is unparseable).
    #[error("cannot determine state of '{capability}': {detail}")]
    DetectionAmbiguous {
        /// Capability being detected.
        capability: String,
        /// What made the result ambiguous.
        detail: String,
    },

    /// An install command exited non-zero.
    #[error("{strategy} failed (exit {}): {stderr}", exit_label(.code))]
    InstallFailed {
        /// Description of the strategy that failed.
        strategy: String,
        /// Exit code, if any.
        code: Option<i32>,
        /// Captured standard error (or stdout when stderr is empty).
        stderr: String,
    },

    /// A download or network-dependent command failed.
    #[error("network failure for {target}: {detail}")]
    NetworkFailure {
        /// URL or strategy that needed the network.
        target: String,
        /// Last error observed.
        detail: String,
    },

    /// The operation needs elevated privileges that are not available.
    #[error("privilege denied for {strategy}: {detail}")]
    PrivilegeDenied {
        /// Description of the strategy that was denied.
        strategy: String,
        /// Captured detail.
        detail: String,
    },

    /// No install strategy exists for this platform or architecture.
    #[error("'{capability}' has no install strategy for platform {platform}")]
    UnsupportedPlatform {
        /// Capability being installed.
        capability: String,
        /// Platform (or architecture) name.
        platform: String,
    },

    /// An install step claimed success but verification disagreed.
    #[error("verification failed for '{capability}' after {strategy}: {detail}")]
    VerificationMismatch {
        /// Capability being installed.
        capability: String,
        /// Strategy that claimed success.
        strategy: String,
        /// What verification observed.
        detail: String,
    },
}

/// Render an optional exit code for display.
#[allow(clippy::ref_option)]
fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| c.to_string())
}

/// Errors that arise from host platform classification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// The host matches more than one supported family.
    #[error("ambiguous platform: '{id}' looks like both {first} and {second}")]
    Ambiguous {
        /// Raw distribution identifier.
        id: String,
        /// First matching family.
        first: String,
        /// Second matching family.
        second: String,
    },

    /// No recognised marker was found.
    #[error("unrecognised platform: {0}")]
    Unrecognised(String),
}

/// Errors that arise from loading the capability catalog.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The catalog file could not be read.
    #[error("IO error reading catalog {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The catalog is not valid TOML or does not match the schema.
    #[error("invalid catalog {path}: {message}")]
    Parse {
        /// Path (or `<builtin>`) of the catalog.
        path: String,
        /// Parser message.
        message: String,
    },
}
