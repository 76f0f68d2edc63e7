use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the speed-test visualizer.
#[derive(Error, Debug)]
pub enum VizError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record blob failed to decode or lacks a required field.
    ///
    /// `index` is the 0-based position of the blob in the input sequence.
    #[error("Malformed record #{index} in {series}: field `{field}`: {reason}")]
    MalformedRecord {
        series: String,
        index: usize,
        field: String,
        reason: String,
    },

    /// The requested profile name is not in the catalog.
    #[error("Unknown profile: {0}")]
    UnknownProfile(String),

    /// A profile definition failed catalog validation.
    #[error("Invalid profile {name}: {reason}")]
    InvalidProfile { name: String, reason: String },

    /// A timezone name is not a recognised IANA identifier.
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// No JSONL input files were found under the given path.
    #[error("No JSONL files found in {0}")]
    NoInputFiles(PathBuf),

    /// A JSON document could not be produced or parsed outside record loading.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl VizError {
    /// Shorthand for building a [`VizError::MalformedRecord`].
    pub fn malformed(
        series: impl Into<String>,
        index: usize,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        VizError::MalformedRecord {
            series: series.into(),
            index,
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias used throughout the visualizer crates.
pub type Result<T> = std::result::Result<T, VizError>;
