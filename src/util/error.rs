//! Error types for qrmark.

use thiserror::Error;

/// Result alias for qrmark operations.
pub type QrMarkResult<T> = std::result::Result<T, QrMarkError>;

/// Errors that can occur while preparing references or running a detection.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QrMarkError {
    /// The reference pattern asset could not be found. Fatal for the
    /// process: no detection can run without the reference.
    #[error("reference image missing: {path}")]
    ReferenceMissing { path: String },
    /// The target image file does not exist. Fatal for this call only.
    #[error("target image missing: {path}")]
    TargetMissing { path: String },
    /// The target image exists but could not be read.
    #[error("target image unreadable: {path}: {reason}")]
    TargetUnreadable { path: String, reason: String },
    /// The image bytes are corrupt or in an unsupported format.
    #[error("image decode failed: {reason}")]
    Decode { reason: String },
    /// Width or height is zero.
    #[error("invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Row stride is smaller than the row width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// The pixel buffer is too short for the declared dimensions.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// A requested sub-region does not fit inside the image.
    #[error("roi {width}x{height} at ({x}, {y}) exceeds image {img_width}x{img_height}")]
    RoiOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// Patch ratios outside (0, 1) or yielding a sub-minimum patch.
    #[error("invalid patch ratios: {reason}")]
    InvalidPatchRatios { reason: &'static str },
    /// A detection config field failed validation.
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: &'static str },
    /// The configured deadline expired before the search finished.
    #[error("detection deadline exceeded")]
    DeadlineExceeded,
}
