//! CPU kernel implementations

pub mod activations;
pub mod buffer;
pub mod depthwise;
pub mod dropout;
pub mod gemm;
pub mod heatmap;
pub mod instance_norm;
pub mod loss;
pub mod optimizer;
pub mod patchify;
pub mod pointwise;
pub mod shuffle;
pub mod width;

pub use activations::{hard_swish_backward, hard_swish_forward};
pub use buffer::{accumulate, merge, zero};
pub use depthwise::{depthwise_convolution_backward, depthwise_convolution_forward};
pub use dropout::{dropout_backward, dropout_forward, fill_dropout_mask};
pub use gemm::{
    matmul_accumulate, matmul_accumulate_transpose_a, matmul_accumulate_transpose_b,
    matmul_accumulate_transpose_b_cached,
};
pub use instance_norm::{instance_normalization_backward, instance_normalization_forward};
pub use loss::{mean_squared_error_backward, mean_squared_error_forward};
pub use optimizer::adam_update;
pub use patchify::{PATCH_SIZE, patchified_convolution_backward, patchified_convolution_forward};
pub use pointwise::{pointwise_convolution_backward, pointwise_convolution_forward};
pub use shuffle::{
    pixel_shuffle_backward, pixel_shuffle_forward, pixel_unshuffle_backward,
    pixel_unshuffle_forward,
};
