//! Image loading from paths or in-memory buffers.
//!
//! Decoding relies on the `image` crate; the codecs are enabled by the
//! `image-io` feature.

use crate::util::{AutoEditError, AutoEditResult};
use image::RgbImage;
use std::path::{Path, PathBuf};

/// File extensions accepted by [`load_image`] (compared case-insensitively).
pub const SUPPORTED_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// An image supplied by the caller: either a file path or a decoded buffer.
#[derive(Clone, Debug)]
pub enum ImageSource {
    Path(PathBuf),
    Buffer(RgbImage),
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<&str> for ImageSource {
    fn from(path: &str) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl From<RgbImage> for ImageSource {
    fn from(img: RgbImage) -> Self {
        Self::Buffer(img)
    }
}

impl ImageSource {
    /// Resolves the source to an owned RGB buffer.
    pub fn load(&self) -> AutoEditResult<RgbImage> {
        match self {
            Self::Path(path) => load_image(path),
            Self::Buffer(img) => Ok(img.clone()),
        }
    }
}

/// Loads an image file and converts it to 8-bit RGB.
pub fn load_image<P: AsRef<Path>>(path: P) -> AutoEditResult<RgbImage> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(AutoEditError::ImageNotFound {
            path: path.to_path_buf(),
        });
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AutoEditError::UnsupportedFormat {
            path: path.to_path_buf(),
            extension,
        });
    }

    let img = image::open(path).map_err(|err| AutoEditError::ImageDecode {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    Ok(img.to_rgb8())
}

/// Loads every target in order; the first failure aborts the call.
pub fn load_targets(targets: &[ImageSource]) -> AutoEditResult<Vec<RgbImage>> {
    targets.iter().map(ImageSource::load).collect()
}
