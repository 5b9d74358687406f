//! Image views, grayscale conversion, and loading.
//!
//! `ImageView` is a borrowed 2D view into a 1D buffer with an explicit stride.
//! The stride counts elements between the starts of consecutive rows, so a
//! stride larger than the width represents padded rows. ROI slices are zero-copy
//! views into the same backing slice and retain the original stride.
//!
//! Color buffers are `image::RgbImage` (height x width x 3, `u8`, RGB order).
//! An interleaved RGB row is exposed to the kernels as a view whose width is
//! `3 * pixels`.

use crate::util::{AutoEditError, AutoEditResult};
use ::image::{GrayImage, Luma, RgbImage};

pub mod io;
pub mod resize;

pub use io::{load_image, load_targets, ImageSource, SUPPORTED_EXTENSIONS};

/// Borrowed 2D image view with an explicit stride.
#[derive(Copy, Clone)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a, T> ImageView<'a, T> {
    /// Creates a contiguous view with `stride == width`.
    pub fn from_slice(data: &'a [T], width: usize, height: usize) -> AutoEditResult<Self> {
        Self::new(data, width, height, width)
    }

    /// Creates a view with an explicit stride.
    pub fn new(data: &'a [T], width: usize, height: usize, stride: usize) -> AutoEditResult<Self> {
        let needed = required_len(width, height, stride)?;
        if data.len() < needed {
            return Err(AutoEditError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// Returns the image width in elements.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the backing slice including any row padding.
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Returns the element at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<&'a T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y.checked_mul(self.stride)?.checked_add(x)?;
        self.data.get(idx)
    }

    /// Returns a contiguous slice for row `y` with length `width`.
    pub fn row(&self, y: usize) -> Option<&'a [T]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?;
        let end = start.checked_add(self.width)?;
        self.data.get(start..end)
    }

    /// Returns a zero-copy ROI view into the same backing buffer.
    pub fn roi(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> AutoEditResult<ImageView<'a, T>> {
        if width == 0 || height == 0 {
            return Err(AutoEditError::InvalidDimensions { width, height });
        }

        let out_of_bounds = AutoEditError::RoiOutOfBounds {
            x,
            y,
            width,
            height,
            img_width: self.width,
            img_height: self.height,
        };
        let end_x = x.checked_add(width).ok_or_else(|| out_of_bounds.clone())?;
        let end_y = y.checked_add(height).ok_or_else(|| out_of_bounds.clone())?;
        if end_x > self.width || end_y > self.height {
            return Err(out_of_bounds);
        }

        let start = y
            .checked_mul(self.stride)
            .and_then(|v| v.checked_add(x))
            .ok_or(AutoEditError::InvalidDimensions {
                width: self.width,
                height: self.height,
            })?;
        let data = self
            .data
            .get(start..)
            .ok_or(AutoEditError::BufferTooSmall {
                needed: start.saturating_add(1),
                got: self.data.len(),
            })?;

        ImageView::new(data, width, height, self.stride)
    }
}

fn required_len(width: usize, height: usize, stride: usize) -> AutoEditResult<usize> {
    if width == 0 || height == 0 {
        return Err(AutoEditError::InvalidDimensions { width, height });
    }
    if stride < width {
        return Err(AutoEditError::InvalidStride { width, stride });
    }
    (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .ok_or(AutoEditError::InvalidDimensions { width, height })
}

/// Borrows a grayscale image as a view.
pub fn gray_view(img: &GrayImage) -> AutoEditResult<ImageView<'_, u8>> {
    ImageView::from_slice(img.as_raw(), img.width() as usize, img.height() as usize)
}

/// Borrows an RGB image as an interleaved view (`width` counts channel samples).
pub fn rgb_view(img: &RgbImage) -> AutoEditResult<ImageView<'_, u8>> {
    ImageView::from_slice(
        img.as_raw(),
        img.width() as usize * 3,
        img.height() as usize,
    )
}

/// Converts RGB to 8-bit luma with BT.601 weights, rounded to nearest.
pub fn to_gray(img: &RgbImage) -> GrayImage {
    let mut out = GrayImage::new(img.width(), img.height());
    for (src, dst) in img.pixels().zip(out.pixels_mut()) {
        let [r, g, b] = src.0;
        let luma = 0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b);
        *dst = Luma([luma.round().clamp(0.0, 255.0) as u8]);
    }
    out
}
