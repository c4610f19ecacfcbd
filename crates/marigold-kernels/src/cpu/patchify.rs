//! Patch-embedding convolution: non-overlapping 8×8 patches, stride 8.
//!
//! The input `[H, W, Cin]` is flattened into an im2row matrix of
//! `P = (H/8)·(W/8)` rows, each row one patch in `(kh, kw, c)` order, and
//! multiplied by the `[8·8·Cin, Cout]` kernel in a single GEMM. The output
//! is `[H/8, W/8, Cout]`.
//!
//! The rows buffer filled by the forward pass is the saved state the
//! backward pass reads to form the kernel gradient.

use super::gemm::{matmul_accumulate, matmul_accumulate_transpose_a, matmul_accumulate_transpose_b};
use marigold_common::{Dims, Nhwc, PatchGrid};

/// Patch edge length and stride.
pub const PATCH_SIZE: usize = 8;

/// Elements in the im2row buffer for an `height × width × channels_in` image.
#[must_use]
pub const fn rows_len(height: usize, width: usize, channels_in: usize) -> usize {
    height * width * channels_in
}

/// Flatten every patch of `x` into one row of `rows`.
pub fn im2row(x: &[f32], rows: &mut [f32], height: usize, width: usize, channels_in: usize) {
    debug_assert!(height.is_multiple_of(PATCH_SIZE) && width.is_multiple_of(PATCH_SIZE));
    debug_assert_eq!(x.len(), height * width * channels_in);
    debug_assert_eq!(rows.len(), rows_len(height, width, channels_in));

    let image = Nhwc::new(height, width, channels_in);
    let grid = PatchGrid::new_unchecked(height, width, PATCH_SIZE);
    let segment = PATCH_SIZE * channels_in;
    let mut dst = rows.chunks_exact_mut(segment);
    for ph in 0..grid.rows() {
        for pw in 0..grid.cols() {
            for kh in 0..PATCH_SIZE {
                let start = grid.source(&image, ph, pw, kh, 0);
                if let Some(out) = dst.next() {
                    out.copy_from_slice(&x[start..start + segment]);
                }
            }
        }
    }
}

/// `y = bias + im2row(x) · kernel`; `y` is zeroed when `bias` is `None`.
///
/// `rows` receives the im2row matrix and must be kept for the backward pass.
#[allow(clippy::too_many_arguments)]
pub fn patchified_convolution_forward(
    x: &[f32],
    y: &mut [f32],
    kernel: &[f32],
    bias: Option<&[f32]>,
    rows: &mut [f32],
    height: usize,
    width: usize,
    channels_in: usize,
    channels_out: usize,
) {
    debug_assert!(channels_out > 0);
    let grid = PatchGrid::new_unchecked(height, width, PATCH_SIZE);
    let (patches, row_len) = (grid.count(), grid.row_len(channels_in));
    debug_assert_eq!(y.len(), patches * channels_out);
    debug_assert_eq!(kernel.len(), row_len * channels_out);
    tracing::trace!(height, width, channels_in, channels_out, patches, "patchified forward");

    match bias {
        Some(bias) => {
            debug_assert_eq!(bias.len(), channels_out);
            for out in y.chunks_exact_mut(channels_out) {
                out.copy_from_slice(bias);
            }
        }
        None => y.fill(0.0),
    }

    im2row(x, rows, height, width, channels_in);
    matmul_accumulate(rows, kernel, y, patches, row_len, channels_out);
}

/// Accumulate `d_kernel`, and optionally `d_x` and `d_bias`, for
/// [`patchified_convolution_forward`].
///
/// Pass `None` for `d_x` when the patch layer is the first layer and no
/// upstream gradient is needed.
#[allow(clippy::too_many_arguments)]
pub fn patchified_convolution_backward(
    d_y: &[f32],
    d_kernel: &mut [f32],
    d_x: Option<&mut [f32]>,
    d_bias: Option<&mut [f32]>,
    rows: &[f32],
    kernel: &[f32],
    height: usize,
    width: usize,
    channels_in: usize,
    channels_out: usize,
) {
    debug_assert!(channels_out > 0);
    let grid = PatchGrid::new_unchecked(height, width, PATCH_SIZE);
    let (patches, row_len) = (grid.count(), grid.row_len(channels_in));
    debug_assert_eq!(d_y.len(), patches * channels_out);
    debug_assert_eq!(d_kernel.len(), row_len * channels_out);
    debug_assert_eq!(rows.len(), patches * row_len);
    tracing::trace!(height, width, channels_in, channels_out, patches, "patchified backward");

    // d_kernel += rowsᵗ · d_y
    matmul_accumulate_transpose_a(rows, d_y, d_kernel, row_len, patches, channels_out);

    if let Some(d_x) = d_x {
        let image = Nhwc::new(height, width, channels_in);
        debug_assert_eq!(d_x.len(), image.len());
        // kernel rows are (kh, kw, c); one kh band spans PATCH_SIZE·Cin rows
        let bands = Dims::new([PATCH_SIZE, PATCH_SIZE * channels_in * channels_out]);
        let segment = PATCH_SIZE * channels_in;
        for (patch, g) in d_y.chunks_exact(channels_out).enumerate() {
            let (ph, pw) = (patch / grid.cols(), patch % grid.cols());
            for kh in 0..PATCH_SIZE {
                let start = grid.source(&image, ph, pw, kh, 0);
                let k_block = &kernel[bands.offset([kh, 0])..][..segment * channels_out];
                // one kernel row-band per patch row: d_x_seg += g · k_blockᵗ
                matmul_accumulate_transpose_b(
                    g,
                    k_block,
                    &mut d_x[start..start + segment],
                    1,
                    channels_out,
                    segment,
                );
            }
        }
    }

    if let Some(d_bias) = d_bias {
        debug_assert_eq!(d_bias.len(), channels_out);
        for g in d_y.chunks_exact(channels_out) {
            for (db, &v) in d_bias.iter_mut().zip(g) {
                *db += v;
            }
        }
    }
}
