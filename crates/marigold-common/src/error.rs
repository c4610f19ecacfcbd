//! Error types for the Marigold kernels
//!
//! The kernels themselves never return errors: buffer and shape contracts are
//! checked with `debug_assert!` only. These types cover the checked edges
//! (configuration, layout construction, width lookup) where a caller can
//! still recover.

use crate::layout::ShapeError;
use thiserror::Error;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum MarigoldError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("shape error: {0}")]
    Shape(#[from] ShapeError),

    #[error("failed to parse {key}: {reason}")]
    Parse { key: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while preparing a kernel call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    #[error("no specialized kernel for {channels} channels")]
    UnsupportedWidth { channels: usize },

    #[error("image {height}x{width} is not tiled exactly by {patch}x{patch} patches")]
    InvalidPatchGeometry { height: usize, width: usize, patch: usize },
}

impl KernelError {
    /// Whether the caller can fix the call by changing its arguments.
    ///
    /// `UnsupportedWidth` is not recoverable: the generic path still runs, it
    /// is only reported to callers that insist on a specialized instantiation.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::UnsupportedWidth { .. })
    }
}

pub type Result<T> = std::result::Result<T, MarigoldError>;
