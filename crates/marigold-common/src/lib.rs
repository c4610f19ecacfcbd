//! Common types and utilities for the Marigold compute kernels
//!
//! This crate provides the foundational pieces used by `marigold-kernels`:
//! error handling, kernel hyperparameter configuration, the NHWC
//! addressing helpers, and rate-limited logging.

pub mod config;
pub mod error;
pub mod layout;
pub mod warn_once;

pub use config::*;
pub use error::*;
pub use layout::{Dims, Nhwc, PatchGrid, ShapeError};
pub use warn_once::warn_once_fn;
