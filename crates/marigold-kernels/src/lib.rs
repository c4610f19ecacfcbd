//! Forward/backward compute kernels over caller-owned NHWC buffers
//!
//! Every kernel is a plain function over `&[f32]` / `&mut [f32]` slices plus
//! explicit shape integers. Nothing here allocates: scratch space (transpose
//! buffers, im2row rows, padded images, reduction sums) is passed in by the
//! caller. Shape preconditions are `debug_assert!`ed and compiled out of
//! release builds.
//!
//! Output conventions:
//! - activations are overwritten by forward kernels;
//! - gradients accumulate into caller-zeroed buffers, except
//!   [`cpu::loss::mean_squared_error_backward`], which starts the chain and
//!   overwrites.

pub mod cpu;
#[cfg(feature = "ffi")]
pub mod ffi;

pub use cpu::width::{SPECIALIZED_WIDTHS, SupportedWidth};
pub use marigold_common::{
    DropoutConfig, KernelConfig, KernelError, Nhwc, NormalizationConfig, OptimizerConfig, PatchGrid,
};
