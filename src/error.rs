//! Typed failures of the acquisition and rendering pipeline.
//!
//! Transport and validation failures are retried inside a cycle, storage and
//! preprocessing failures end it. None of them reach the rendering side, which
//! only ever sees an image or its absence. Application boundaries wrap these in
//! `anyhow::Error`.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to retrieve one source resource. Retryable.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("timed out fetching {resource}")]
    Timeout { resource: String },

    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("protocol error fetching {resource}: {message}")]
    Protocol { resource: String, message: String },

    #[error("failed to read {resource}: {source}")]
    Io {
        resource: String,
        #[source]
        source: std::io::Error,
    },
}

/// A fetched raster failed structural checks. Retried like a transport failure.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("tile ({col}, {row}) is not a decodable image: {source}")]
    Decode {
        col: u32,
        row: u32,
        #[source]
        source: image::ImageError,
    },

    #[error("tile ({col}, {row}) is {width}x{height}, expected {expected_width}x{expected_height}")]
    TileMismatch {
        col: u32,
        row: u32,
        width: u32,
        height: u32,
        expected_width: u32,
        expected_height: u32,
    },

    #[error("source raster is {width}x{height}, expected a square")]
    NotSquare { width: u32, height: u32 },

    #[error("source raster is {size} px, below the minimum of {minimum} px")]
    TooSmall { size: u32, minimum: u32 },
}

/// What a single fetch attempt can fail with.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Cache storage failure. Fatal to the current cycle.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode disk image: {0}")]
    Encode(#[source] image::ImageError),
}

impl StorageError {
    pub(crate) fn io(
        action: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PreprocessError {
    #[error("source raster is empty")]
    EmptyRaster,

    #[error("canonical size must be positive")]
    ZeroSize,
}

/// Why an acquisition cycle did not publish.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("gave up after {attempts} attempt(s): {last}")]
    AttemptsExhausted {
        attempts: u32,
        #[source]
        last: AttemptError,
    },

    #[error("cycle interrupted by shutdown")]
    Cancelled,

    #[error("preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Caller-supplied wallpaper parameters outside their contract. Not retried.
#[derive(Debug, Error, PartialEq)]
pub enum RequestValidationError {
    #[error("{field} must be greater than {min} and at most {max} pixels (got {value})")]
    Dimension {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    #[error("{field} must be between {min} and {max} (got {value})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("timezone offset must be between -{max} and {max} minutes (got {value})")]
    TimezoneOffset { value: i32, max: i32 },

    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),

    #[error("unknown resolution '{0}' (expected one of 4K, WQHD, WUXGA, HD, FHD)")]
    UnknownResolution(String),
}

/// Rendering failed after the cached image was found.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to encode wallpaper: {0}")]
    Encode(#[from] image::ImageError),
}
