//! Error types for the micro TPU inference engine.
//!
//! ```text
//! TpuError
//! ├── Configuration   (missing/malformed artifact or config)
//! ├── Io / Npy / SafeTensors / Json (artifact decoding, with path)
//! ├── Shape / Range   (loaded tensor violates the fixed topology)
//! ├── KeyNotFound     (bias lookup miss)
//! └── TileLink        (hardware round trip failed)
//! ```
//!
//! A link that cannot be opened at construction is not an error: the
//! dispatcher logs it and falls back to the software backend.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type TpuResult<T> = Result<T, TpuError>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum TpuError {
    /// A required artifact or config is missing or malformed.
    #[error("configuration error at `{path}`: {message}")]
    Configuration {
        path: PathBuf,
        message: String,
    },

    /// Low-level I/O failure while reading or writing an artifact.
    #[error("I/O error at `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An NPY weight file could not be decoded.
    #[error("cannot read NPY array `{path}`: {message}")]
    Npy {
        path: PathBuf,
        message: String,
    },

    /// The safetensors model artifact could not be decoded.
    #[error("cannot read model artifact `{path}`: {message}")]
    SafeTensors {
        path: PathBuf,
        message: String,
    },

    /// A JSON record could not be parsed.
    #[error("cannot parse JSON `{path}`: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A tensor does not have the shape the topology requires.
    #[error("shape mismatch for {name}: expected {expected:?}, got {actual:?}")]
    Shape {
        name: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// A value lies outside the int4 domain.
    #[error("value {value} at flat index {index} of {name} is outside the int4 range [-8, 7]")]
    Range {
        name: String,
        index: usize,
        value: i64,
    },

    /// A bias tensor was not found in the model artifact.
    #[error("key `{key}` not found, available: {available:?}")]
    KeyNotFound {
        key: String,
        available: Vec<String>,
    },

    /// A hardware tile round trip failed.
    #[error("tile link error: {0}")]
    TileLink(#[from] LinkError),
}

impl TpuError {
    pub fn configuration<S: Into<String>>(path: impl Into<PathBuf>, message: S) -> Self {
        TpuError::Configuration { path: path.into(), message: message.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TpuError::Io { path: path.into(), source }
    }

    pub fn shape<S: Into<String>>(name: S, expected: Vec<usize>, actual: Vec<usize>) -> Self {
        TpuError::Shape { name: name.into(), expected, actual }
    }
}

/// Failures of the link to the accelerator.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The link could not be opened or reset.
    #[error("accelerator at `{address}` unreachable: {reason}")]
    Unreachable {
        address: String,
        reason: String,
    },

    /// No response arrived within the configured timeout.
    #[error("timed out after {timeout_ms} ms waiting for tile result")]
    Timeout {
        timeout_ms: u64,
    },

    /// The response carried fewer result values than a tile produces.
    #[error("tile read returned {got} of {expected} values (timeout or corruption)")]
    ShortRead {
        expected: usize,
        got: usize,
    },

    /// The link was already closed.
    #[error("link is closed")]
    Closed,

    /// Transport-level I/O failure.
    #[error("link I/O failure: {0}")]
    Io(#[from] std::io::Error),
}
