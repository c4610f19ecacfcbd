//! Multi-dimensional addressing over flat, row-major buffers.
//!
//! No shape metadata travels with a buffer: every kernel receives its extents
//! as plain integers and uses these helpers to turn `(h, w, c)`-style
//! coordinates into flat offsets. Constructors come in two flavours: `new`
//! (unchecked, `const`) for hot paths and `try_new`/`check_*` for the edges
//! where a caller wants a recoverable error.

use crate::error::KernelError;
use thiserror::Error;

/// Errors arising from buffer/shape validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    #[error("{axis} must be non-zero")]
    ZeroDimension { axis: &'static str },

    #[error("{name} has {actual} elements, expected {expected}")]
    LengthMismatch { name: &'static str, expected: usize, actual: usize },
}

// ---------------------------------------------------------------------------
// Generic N-D view
// ---------------------------------------------------------------------------

/// Row-major extents of an N-dimensional buffer, last axis contiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dims<const N: usize> {
    shape: [usize; N],
}

impl<const N: usize> Dims<N> {
    #[must_use]
    pub const fn new(shape: [usize; N]) -> Self {
        Self { shape }
    }

    #[must_use]
    pub const fn shape(&self) -> [usize; N] {
        self.shape
    }

    /// Number of elements covered by these extents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row-major strides (in elements) for each axis.
    #[must_use]
    pub fn strides(&self) -> [usize; N] {
        let mut strides = [1usize; N];
        for axis in (0..N.saturating_sub(1)).rev() {
            strides[axis] = strides[axis + 1] * self.shape[axis + 1];
        }
        strides
    }

    /// Flat offset of `index`.
    #[inline(always)]
    #[must_use]
    pub fn offset(&self, index: [usize; N]) -> usize {
        let mut offset = 0;
        for axis in 0..N {
            debug_assert!(
                index[axis] < self.shape[axis],
                "index {} out of bounds for axis {axis} of extent {}",
                index[axis],
                self.shape[axis]
            );
            offset = offset * self.shape[axis] + index[axis];
        }
        offset
    }

    /// Check that a buffer holds exactly `len()` elements.
    pub fn check_len(&self, actual: usize, name: &'static str) -> Result<(), ShapeError> {
        let expected = self.len();
        if actual != expected {
            return Err(ShapeError::LengthMismatch { name, expected, actual });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// NHWC
// ---------------------------------------------------------------------------

/// `[height, width, channels]` image tensor, channels innermost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nhwc {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl Nhwc {
    #[must_use]
    pub const fn new(height: usize, width: usize, channels: usize) -> Self {
        Self { height, width, channels }
    }

    /// Checked constructor rejecting zero extents.
    pub fn try_new(height: usize, width: usize, channels: usize) -> Result<Self, ShapeError> {
        if height == 0 {
            return Err(ShapeError::ZeroDimension { axis: "height" });
        }
        if width == 0 {
            return Err(ShapeError::ZeroDimension { axis: "width" });
        }
        if channels == 0 {
            return Err(ShapeError::ZeroDimension { axis: "channels" });
        }
        Ok(Self::new(height, width, channels))
    }

    #[inline(always)]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.height * self.width * self.channels
    }

    #[inline(always)]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of spatial positions (`height * width`).
    #[inline(always)]
    #[must_use]
    pub const fn pixels(&self) -> usize {
        self.height * self.width
    }

    /// Offset of the first channel of pixel `(h, w)`.
    #[inline(always)]
    #[must_use]
    pub fn pixel(&self, h: usize, w: usize) -> usize {
        debug_assert!(h < self.height && w < self.width);
        (h * self.width + w) * self.channels
    }

    #[inline(always)]
    #[must_use]
    pub fn index(&self, h: usize, w: usize, c: usize) -> usize {
        debug_assert!(c < self.channels);
        self.pixel(h, w) + c
    }

    #[must_use]
    pub const fn dims(&self) -> Dims<3> {
        Dims::new([self.height, self.width, self.channels])
    }

    pub fn check_len(&self, actual: usize, name: &'static str) -> Result<(), ShapeError> {
        self.dims().check_len(actual, name)
    }
}

// ---------------------------------------------------------------------------
// Non-overlapping patch grid
// ---------------------------------------------------------------------------

/// Tiling of an image into non-overlapping `patch x patch` squares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchGrid {
    pub height: usize,
    pub width: usize,
    pub patch: usize,
}

impl PatchGrid {
    /// Fails unless both extents are non-zero multiples of `patch`.
    pub fn new(height: usize, width: usize, patch: usize) -> Result<Self, KernelError> {
        if patch == 0
            || height == 0
            || width == 0
            || !height.is_multiple_of(patch)
            || !width.is_multiple_of(patch)
        {
            return Err(KernelError::InvalidPatchGeometry { height, width, patch });
        }
        Ok(Self::new_unchecked(height, width, patch))
    }

    /// Grid for extents the caller has already validated.
    #[inline(always)]
    #[must_use]
    pub const fn new_unchecked(height: usize, width: usize, patch: usize) -> Self {
        Self { height, width, patch }
    }

    /// Offset of pixel `(kh, kw)` of patch `(ph, pw)` within the source image.
    #[inline(always)]
    #[must_use]
    pub fn source(&self, image: &Nhwc, ph: usize, pw: usize, kh: usize, kw: usize) -> usize {
        debug_assert!(kh < self.patch && kw < self.patch);
        image.pixel(ph * self.patch + kh, pw * self.patch + kw)
    }

    #[must_use]
    pub const fn rows(&self) -> usize {
        self.height / self.patch
    }

    #[must_use]
    pub const fn cols(&self) -> usize {
        self.width / self.patch
    }

    /// Total number of patches (rows of the im2row matrix).
    #[must_use]
    pub const fn count(&self) -> usize {
        self.rows() * self.cols()
    }

    /// Length of one flattened patch for `channels` input channels.
    #[must_use]
    pub const fn row_len(&self, channels: usize) -> usize {
        self.patch * self.patch * channels
    }
}
