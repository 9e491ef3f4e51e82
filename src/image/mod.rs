//! Grayscale image views and buffers.
//!
//! `GrayView` is a borrowed 2D view into a 1D `u8` buffer with an explicit
//! stride. The stride counts pixels between the starts of consecutive rows,
//! so a stride larger than the width represents padded rows. ROI slices are
//! zero-copy views into the same backing slice and retain the original
//! stride. `GrayBuffer` is the owned, tightly packed counterpart.

use crate::util::{QrMarkError, QrMarkResult};

#[cfg(feature = "image-io")]
pub mod io;

/// Borrowed grayscale image view with an explicit stride.
#[derive(Copy, Clone)]
pub struct GrayView<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a> GrayView<'a> {
    /// Creates a contiguous view with `stride == width`.
    pub fn from_slice(data: &'a [u8], width: usize, height: usize) -> QrMarkResult<Self> {
        Self::new(data, width, height, width)
    }

    /// Creates a view with an explicit stride.
    pub fn new(data: &'a [u8], width: usize, height: usize, stride: usize) -> QrMarkResult<Self> {
        let needed = required_len(width, height, stride)?;
        if data.len() < needed {
            return Err(QrMarkError::BufferTooSmall {
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

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the stride in pixels between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the backing slice including any row padding.
    pub fn as_slice(&self) -> &'a [u8] {
        self.data
    }

    /// Returns the pixel at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y.checked_mul(self.stride)?.checked_add(x)?;
        self.data.get(idx).copied()
    }

    /// Returns a contiguous slice for row `y` with length `width`.
    pub fn row(&self, y: usize) -> Option<&'a [u8]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?;
        let end = start.checked_add(self.width)?;
        self.data.get(start..end)
    }

    /// Returns a zero-copy ROI view into the same backing buffer.
    pub fn roi(&self, x: usize, y: usize, width: usize, height: usize) -> QrMarkResult<GrayView<'a>> {
        if width == 0 || height == 0 {
            return Err(QrMarkError::InvalidDimensions { width, height });
        }

        let oob = || QrMarkError::RoiOutOfBounds {
            x,
            y,
            width,
            height,
            img_width: self.width,
            img_height: self.height,
        };

        let end_x = x.checked_add(width).ok_or_else(oob)?;
        let end_y = y.checked_add(height).ok_or_else(oob)?;
        if end_x > self.width || end_y > self.height {
            return Err(oob());
        }

        let start = y
            .checked_mul(self.stride)
            .and_then(|v| v.checked_add(x))
            .ok_or_else(oob)?;
        let data = self.data.get(start..).ok_or(QrMarkError::BufferTooSmall {
            needed: start.saturating_add(1),
            got: self.data.len(),
        })?;

        GrayView::new(data, width, height, self.stride)
    }
}

fn required_len(width: usize, height: usize, stride: usize) -> QrMarkResult<usize> {
    if width == 0 || height == 0 {
        return Err(QrMarkError::InvalidDimensions { width, height });
    }
    if stride < width {
        return Err(QrMarkError::InvalidStride { width, stride });
    }
    (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .ok_or(QrMarkError::InvalidDimensions { width, height })
}

/// Owned contiguous grayscale image buffer.
#[derive(Clone)]
pub struct GrayBuffer {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl GrayBuffer {
    /// Takes ownership of a tightly packed pixel vector.
    pub fn from_vec(data: Vec<u8>, width: usize, height: usize) -> QrMarkResult<Self> {
        if width == 0 || height == 0 {
            return Err(QrMarkError::InvalidDimensions { width, height });
        }
        let needed = width
            .checked_mul(height)
            .ok_or(QrMarkError::InvalidDimensions { width, height })?;
        if data.len() < needed {
            return Err(QrMarkError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(QrMarkError::InvalidDimensions { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Copies a view (padded or not) into a tightly packed buffer.
    pub fn from_view(view: GrayView<'_>) -> QrMarkResult<Self> {
        let width = view.width();
        let height = view.height();
        let needed = width
            .checked_mul(height)
            .ok_or(QrMarkError::InvalidDimensions { width, height })?;
        let mut data = vec![0u8; needed];
        for y in 0..height {
            let row = view.row(y).ok_or(QrMarkError::BufferTooSmall {
                needed,
                got: view.as_slice().len(),
            })?;
            data[y * width..(y + 1) * width].copy_from_slice(row);
        }
        Self::from_vec(data, width, height)
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the packed pixel data, row-major.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Returns a borrowed view of the whole buffer.
    pub fn view(&self) -> GrayView<'_> {
        GrayView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width,
        }
    }
}
