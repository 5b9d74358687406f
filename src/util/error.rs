//! Error types for autoedit.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for autoedit operations.
pub type AutoEditResult<T> = std::result::Result<T, AutoEditError>;

/// Errors that can occur when loading images, building matchers, or matching.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AutoEditError {
    /// The image path does not point to an existing file.
    #[error("image not found: {path}")]
    ImageNotFound { path: PathBuf },
    /// The image path has an extension outside the supported set.
    #[error("unsupported image format {extension:?}: {path}")]
    UnsupportedFormat { path: PathBuf, extension: String },
    /// The image file exists but could not be decoded.
    #[error("failed to load image {path}: {reason}")]
    ImageDecode { path: PathBuf, reason: String },
    /// Width or height is zero or overflows the buffer size.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// The backing buffer is shorter than the view requires.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// The stride is shorter than the row width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// A region of interest extends past the image bounds.
    #[error("roi ({x}, {y}, {width}x{height}) out of bounds for {img_width}x{img_height}")]
    RoiOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// A matcher parameter is out of its valid range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),
    /// A method name is not valid for the matcher kind.
    #[error("invalid {kind} method: {method}")]
    InvalidMethod { kind: &'static str, method: String },
    /// The descriptor names a matcher kind this crate does not know.
    #[error("unknown matcher kind: {0}")]
    UnknownMatcherKind(String),
    /// The descriptor version is not recognized.
    #[error("unsupported matcher spec version: {0}")]
    UnsupportedSpecVersion(u32),
    /// The descriptor item list or an item's parameters are malformed.
    #[error("malformed matcher spec: {0}")]
    MalformedSpec(String),
    /// A matcher failed internally; degraded to an empty result by the guard.
    #[error("matching failed: {reason}")]
    MatchFailed { reason: String },
}

impl AutoEditError {
    /// Returns true for errors raised while loading caller-supplied images.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::ImageNotFound { .. } | Self::UnsupportedFormat { .. } | Self::ImageDecode { .. }
        )
    }

    /// Returns true for errors raised while rebuilding a matcher chain.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownMatcherKind(_)
                | Self::UnsupportedSpecVersion(_)
                | Self::MalformedSpec(_)
                | Self::InvalidMethod { .. }
                | Self::InvalidParameter(_)
        )
    }
}
