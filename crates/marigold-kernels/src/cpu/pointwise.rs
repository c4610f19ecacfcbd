//! Pointwise (1×1) convolution.
//!
//! A per-pixel fully-connected layer, run as one GEMM over all pixels with
//! `m = height * width`, `k = channels_in`, `n = channels_out`. The kernel
//! matrix is `[channels_in, channels_out]`, row-major.

use super::gemm::{matmul_accumulate, matmul_accumulate_transpose_a, matmul_accumulate_transpose_b_cached};

/// `output[h,w,:] = bias + input[h,w,:] · kernel`.
#[allow(clippy::too_many_arguments)]
pub fn pointwise_convolution_forward(
    input: &[f32],
    output: &mut [f32],
    kernel: &[f32],
    bias: &[f32],
    height: usize,
    width: usize,
    channels_in: usize,
    channels_out: usize,
) {
    debug_assert!(channels_out > 0);
    let pixels = height * width;
    debug_assert_eq!(input.len(), pixels * channels_in);
    debug_assert_eq!(output.len(), pixels * channels_out);
    debug_assert_eq!(kernel.len(), channels_in * channels_out);
    debug_assert_eq!(bias.len(), channels_out);
    tracing::trace!(height, width, channels_in, channels_out, "pointwise forward");

    for pixel in output.chunks_exact_mut(channels_out) {
        pixel.copy_from_slice(bias);
    }
    matmul_accumulate(input, kernel, output, pixels, channels_in, channels_out);
}

/// Accumulate `d_input`, `d_kernel` and `d_bias` for
/// [`pointwise_convolution_forward`].
///
/// `scratch` holds the transposed kernel and needs
/// `channels_in * channels_out` elements.
#[allow(clippy::too_many_arguments)]
pub fn pointwise_convolution_backward(
    d_output: &[f32],
    d_input: &mut [f32],
    d_kernel: &mut [f32],
    d_bias: &mut [f32],
    input: &[f32],
    kernel: &[f32],
    scratch: &mut [f32],
    height: usize,
    width: usize,
    channels_in: usize,
    channels_out: usize,
) {
    debug_assert!(channels_out > 0);
    let pixels = height * width;
    debug_assert_eq!(d_output.len(), pixels * channels_out);
    debug_assert_eq!(d_input.len(), pixels * channels_in);
    debug_assert_eq!(d_kernel.len(), channels_in * channels_out);
    debug_assert_eq!(d_bias.len(), channels_out);
    tracing::trace!(height, width, channels_in, channels_out, "pointwise backward");

    // d_in += d_out · kernelᵗ
    matmul_accumulate_transpose_b_cached(
        d_output,
        kernel,
        d_input,
        scratch,
        pixels,
        channels_out,
        channels_in,
    );
    // d_kernel += inᵗ · d_out
    matmul_accumulate_transpose_a(input, d_output, d_kernel, channels_in, pixels, channels_out);

    for pixel in d_output.chunks_exact(channels_out) {
        for (db, &g) in d_bias.iter_mut().zip(pixel) {
            *db += g;
        }
    }
}
