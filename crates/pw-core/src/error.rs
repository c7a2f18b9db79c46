//! Error types for PDF reweighting

use std::path::PathBuf;

use thiserror::Error;

/// Reweighting error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reference density evaluated to zero (or a weight came out non-finite).
    #[error("degenerate density: {0}")]
    DegenerateDensity(String),

    /// Set name is not part of the closed model table.
    #[error("unknown model family for PDF set '{0}'")]
    UnknownModelFamily(String),

    /// Fill or uncertainty requested for an observable that was never registered.
    #[error("observable '{0}' is not registered")]
    MissingObservable(String),

    /// Normalization table holds fewer scale factors than the set has members.
    #[error(
        "missing normalization factors for PDF set '{set}' (dataset {dataset}): found {found}, expected {expected}"
    )]
    MissingNormalizationRows {
        /// PDF set name.
        set: String,
        /// Dataset id that was looked up.
        dataset: u32,
        /// Number of members with a factor.
        found: usize,
        /// Number of members in the set.
        expected: usize,
    },

    /// A configuration file (normalization table, grid file) could not be read or written.
    #[error("cannot access '{path}': {source}")]
    ConfigurationIo {
        /// File that failed to open or read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Momentum fraction outside (0, 1] or non-positive scale.
    #[error("invalid kinematics: {0}")]
    InvalidKinematics(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl Error {
    /// Attach a path to an I/O error raised on a configuration file.
    pub fn config_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::ConfigurationIo { path: path.into(), source }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
