//! Error types for tilescan.

use crate::spatial::Point;
use thiserror::Error;

/// Errors raised by indexing and proximity queries.
///
/// A failed directional scan is not an error on its own: it is reported as
/// [`PartialScanFailure`](crate::assemble::PartialScanFailure) on the query
/// outcome. Only when every direction fails does a query return
/// [`SpatialError::StorageUnavailable`].
#[derive(Error, Debug)]
pub enum SpatialError {
    /// The point lies outside the configured region.
    #[error("point {point} is outside the indexed region: {reason}")]
    OutOfRegion { point: Point, reason: &'static str },

    /// Bad input or configuration, rejected before any storage call.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Every directional scan of a query failed.
    #[error("storage unavailable: all {attempted} directional scans failed (last error: {last_error})")]
    StorageUnavailable { attempted: usize, last_error: String },

    /// A single scan could not be served by the storage port.
    #[error("scan failed: {0}")]
    ScanFailed(String),

    /// Lock acquisition failed
    #[error("failed to acquire lock")]
    Lock,

    /// A configuration document could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SpatialError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        SpatialError::InvalidArgument(msg.into())
    }
}

/// Result type alias for tilescan operations
pub type Result<T> = std::result::Result<T, SpatialError>;
