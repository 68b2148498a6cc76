//! Unified error type for the crate's fallible operations (spec §7).

use thiserror::Error;

/// Errors surfaced by the data model, sparse codec, and format specializers.
///
/// Taxonomy follows the six classes the I/O layer distinguishes: IO
/// failure, format mismatch, semantic mismatch, data corruption, type
/// mismatch, and resource exhaustion.
#[derive(Debug, Error)]
pub enum RapioError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("format mismatch: expected {expected}, path {path}")]
    FormatMismatch { expected: &'static str, path: String },

    #[error("semantic mismatch: {reason}")]
    SemanticMismatch { reason: String },

    #[error("data corruption: {reason}")]
    DataCorruption { reason: String },

    #[error("type mismatch for attribute '{attribute}': expected {expected}, found {found}")]
    TypeMismatch {
        attribute: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("resource exhausted: {reason}")]
    ResourceExhausted { reason: String },

    #[error("netcdf error: {0}")]
    Netcdf(#[from] netcdf::error::Error),

    #[error("hdf5 error: {0}")]
    Hdf5(#[from] hdf5::Error),

    #[error("grib2 error: {0}")]
    Grib(String),
}

pub type Result<T> = std::result::Result<T, RapioError>;

impl RapioError {
    pub fn semantic(reason: impl Into<String>) -> Self {
        RapioError::SemanticMismatch { reason: reason.into() }
    }

    pub fn corruption(reason: impl Into<String>) -> Self {
        RapioError::DataCorruption { reason: reason.into() }
    }
}
