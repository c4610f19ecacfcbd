//! Flat C ABI for linear-memory hosts.
//!
//! Every entry point takes raw `f32` pointers, `i32` extents and `f32`
//! hyperparameters, rebuilds slices of the implied lengths and forwards to
//! the safe kernel in [`crate::cpu`]. Optional buffers may be null.
//!
//! # Safety
//!
//! For every function here the caller guarantees that each non-null pointer
//! addresses a live, properly aligned buffer of at least the length implied
//! by the extents, that output buffers do not alias any other argument, and
//! that all extents are non-negative.

#![allow(clippy::missing_safety_doc, clippy::too_many_arguments)]

use crate::cpu::{
    activations, buffer, depthwise, dropout, gemm, heatmap, instance_norm, loss, optimizer,
    patchify, pointwise, shuffle,
};
use marigold_common::{DropoutConfig, NormalizationConfig, OptimizerConfig, PatchGrid};

#[inline]
fn dim(v: i32) -> usize {
    debug_assert!(v >= 0, "negative extent {v}");
    usize::try_from(v).unwrap_or(0)
}

/// # Safety
/// `ptr` must be valid for `len` reads, or `len` must be zero.
#[inline]
unsafe fn slice<'a>(ptr: *const f32, len: usize) -> &'a [f32] {
    if len == 0 {
        return &[];
    }
    debug_assert!(!ptr.is_null());
    // SAFETY: upheld by the caller.
    unsafe { std::slice::from_raw_parts(ptr, len) }
}

/// # Safety
/// `ptr` must be valid for `len` writes, or `len` must be zero.
#[inline]
unsafe fn slice_mut<'a>(ptr: *mut f32, len: usize) -> &'a mut [f32] {
    if len == 0 {
        return &mut [];
    }
    debug_assert!(!ptr.is_null());
    // SAFETY: upheld by the caller.
    unsafe { std::slice::from_raw_parts_mut(ptr, len) }
}

#[inline]
unsafe fn optional<'a>(ptr: *const f32, len: usize) -> Option<&'a [f32]> {
    // SAFETY: non-null pointers are valid per the module contract.
    (!ptr.is_null()).then(|| unsafe { slice(ptr, len) })
}

#[inline]
unsafe fn optional_mut<'a>(ptr: *mut f32, len: usize) -> Option<&'a mut [f32]> {
    // SAFETY: non-null pointers are valid per the module contract.
    (!ptr.is_null()).then(|| unsafe { slice_mut(ptr, len) })
}

// ── GEMM ───────────────────────────────────────────────────────────

#[unsafe(no_mangle)]
pub unsafe extern "C" fn marigold_matmul_accumulate(
    a: *const f32,
    b: *const f32,
    c: *mut f32,
    m: i32,
    k: i32,
    n: i32,
) {
    let (m, k, n) = (dim(m), dim(k), dim(n));
    unsafe {
        gemm::matmul_accumulate(slice(a, m * k), slice(b, k * n), slice_mut(c, m * n), m, k, n);
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn marigold_matmul_accumulate_transpose_a(
    a: *const f32,
    b: *const f32,
    c: *mut f32,
    m: i32,
    k: i32,
    n: i32,
) {
    let (m, k, n) = (dim(m), dim(k), dim(n));
    unsafe {
        gemm::matmul_accumulate_transpose_a(
            slice(a, k * m),
            slice(b, k * n),
            slice_mut(c, m * n),
            m,
            k,
            n,
        );
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn marigold_matmul_accumulate_transpose_b(
    a: *const f32,
    b: *const f32,
    c: *mut f32,
    m: i32,
    k: i32,
    n: i32,
) {
    let (m, k, n) = (dim(m), dim(k), dim(n));
    unsafe {
        gemm::matmul_accumulate_transpose_b(
            slice(a, m * k),
            slice(b, n * k),
            slice_mut(c, m * n),
            m,
            k,
            n,
        );
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn marigold_matmul_accumulate_transpose_b_cached(
    a: *const f32,
    b: *const f32,
    c: *mut f32,
    scratch: *mut f32,
    m: i32,
    k: i32,
    n: i32,
) {
    let (m, k, n) = (dim(m), dim(k), dim(n));
    unsafe {
        gemm::matmul_accumulate_transpose_b_cached(
            slice(a, m * k),
            slice(b, n * k),
            slice_mut(c, m * n),
            slice_mut(scratch, k * n),
            m,
            k,
            n,
        );
    }
}

// ── Pointwise convolution ──────────────────────────────────────────

#[unsafe(no_mangle)]
pub unsafe extern "C" fn marigold_pointwise_convolution_forward(
    input: *const f32,
    output: *mut f32,
    kernel: *const f32,
    bias: *const f32,
    height: i32,
    width: i32,
    channels_in: i32,
    channels_out: i32,
) {
    let (h, w, ci, co) = (dim(height), dim(width), dim(channels_in), dim(channels_out));
    unsafe {
        pointwise::pointwise_convolution_forward(
            slice(input, h * w * ci),
            slice_mut(output, h * w * co),
            slice(kernel, ci * co),
            slice(bias, co),
            h,
            w,
            ci,
            co,
        );
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn marigold_pointwise_convolution_backward(
    d_output: *const f32,
    d_input: *mut f32,
    d_kernel: *mut f32,
    d_bias: *mut f32,
    input: *const f32,
    kernel: *const f32,
    scratch: *mut f32,
    height: i32,
    width: i32,
    channels_in: i32,
    channels_out: i32,
) {
    let (h, w, ci, co) = (dim(height), dim(width), dim(channels_in), dim(channels_out));
    unsafe {
        pointwise::pointwise_convolution_backward(
            slice(d_output, h * w * co),
            slice_mut(d_input, h * w * ci),
            slice_mut(d_kernel, ci * co),
            slice_mut(d_bias, co),
            slice(input, h * w * ci),
            slice(kernel, ci * co),
            slice_mut(scratch, ci * co),
            h,
            w,
            ci,
            co,
        );
    }
}

// ── Depthwise convolution ──────────────────────────────────────────

macro_rules! depthwise_exports {
    ($k:literal, $forward:ident, $backward:ident) => {
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $forward(
            x: *const f32,
            y: *mut f32,
            kernel: *const f32,
            bias: *const f32,
            height: i32,
            width: i32,
            channels: i32,
        ) {
            let (h, w, c) = (dim(height), dim(width), dim(channels));
            unsafe {
                depthwise::depthwise_convolution_forward::<$k>(
                    slice(x, h * w * c),
                    slice_mut(y, h * w * c),
                    slice(kernel, $k * $k * c),
                    slice(bias, c),
                    h,
                    w,
                    c,
                );
            }
        }

        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $backward(
            d_y: *const f32,
            d_x: *mut f32,
            d_kernel: *mut f32,
            d_bias: *mut f32,
            x: *const f32,
            kernel: *const f32,
            height: i32,
            width: i32,
            channels: i32,
        ) {
            let (h, w, c) = (dim(height), dim(width), dim(channels));
            unsafe {
                depthwise::depthwise_convolution_backward::<$k>(
                    slice(d_y, h * w * c),
                    slice_mut(d_x, h * w * c),
                    slice_mut(d_kernel, $k * $k * c),
                    slice_mut(d_bias, c),
                    slice(x, h * w * c),
                    slice(kernel, $k * $k * c),
                    h,
                    w,
                    c,
                );
            }
        }
    };
}

depthwise_exports!(3, marigold_depthwise_convolution_3_forward, marigold_depthwise_convolution_3_backward);
depthwise_exports!(5, marigold_depthwise_convolution_5_forward, marigold_depthwise_convolution_5_backward);

// ── Patchified convolution ─────────────────────────────────────────

/// `bias` may be null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn marigold_patchified_convolution_forward(
    x: *const f32,
    y: *mut f32,
    kernel: *const f32,
    bias: *const f32,
    rows: *mut f32,
    height: i32,
    width: i32,
    channels_in: i32,
    channels_out: i32,
) {
    let (h, w, ci, co) = (dim(height), dim(width), dim(channels_in), dim(channels_out));
    let grid = PatchGrid::new_unchecked(h, w, patchify::PATCH_SIZE);
    let (patches, row_len) = (grid.count(), grid.row_len(ci));
    unsafe {
        patchify::patchified_convolution_forward(
            slice(x, h * w * ci),
            slice_mut(y, patches * co),
            slice(kernel, row_len * co),
            optional(bias, co),
            slice_mut(rows, patchify::rows_len(h, w, ci)),
            h,
            w,
            ci,
            co,
        );
    }
}

/// `d_x` and `d_bias` may be null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn marigold_patchified_convolution_backward(
    d_y: *const f32,
    d_kernel: *mut f32,
    d_x: *mut f32,
    d_bias: *mut f32,
    rows: *const f32,
    kernel: *const f32,
    height: i32,
    width: i32,
    channels_in: i32,
    channels_out: i32,
) {
    let (h, w, ci, co) = (dim(height), dim(width), dim(channels_in), dim(channels_out));
    let grid = PatchGrid::new_unchecked(h, w, patchify::PATCH_SIZE);
    let (patches, row_len) = (grid.count(), grid.row_len(ci));
    unsafe {
        patchify::patchified_convolution_backward(
            slice(d_y, patches * co),
            slice_mut(d_kernel, row_len * co),
            optional_mut(d_x, h * w * ci),
            optional_mut(d_bias, co),
            slice(rows, patchify::rows_len(h, w, ci)),
            slice(kernel, row_len * co),
            h,
            w,
            ci,
            co,
        );
    }
}

// ── Instance normalization ─────────────────────────────────────────

#[unsafe(no_mangle)]
pub unsafe extern "C" fn marigold_instance_normalization_forward(
    x: *const f32,
    y: *mut f32,
    gamma: *const f32,
    beta: *const f32,
    mean: *mut f32,
    std_dev: *mut f32,
    epsilon: f32,
    height: i32,
    width: i32,
    channels: i32,
) {
    let (h, w, c) = (dim(height), dim(width), dim(channels));
    let normalization = NormalizationConfig { epsilon };
    unsafe {
        instance_norm::instance_normalization_forward(
            slice(x, h * w * c),
            slice_mut(y, h * w * c),
            slice(gamma, c),
            slice(beta, c),
            slice_mut(mean, c),
            slice_mut(std_dev, c),
            &normalization,
            h,
            w,
            c,
        );
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn marigold_instance_normalization_backward(
    d_y: *const f32,
    d_x: *mut f32,
    d_gamma: *mut f32,
    d_beta: *mut f32,
    x: *const f32,
    gamma: *const f32,
    mean: *const f32,
    std_dev: *const f32,
    sum_1: *mut f32,
    sum_2: *mut f32,
    height: i32,
    width: i32,
    channels: i32,
) {
    let (h, w, c) = (dim(height), dim(width), dim(channels));
    unsafe {
        instance_norm::instance_normalization_backward(
            slice(d_y, h * w * c),
            slice_mut(d_x, h * w * c),
            slice_mut(d_gamma, c),
            slice_mut(d_beta, c),
            slice(x, h * w * c),
            slice(gamma, c),
            slice(mean, c),
            slice(std_dev, c),
            slice_mut(sum_1, c),
            slice_mut(sum_2, c),
            h,
            w,
            c,
        );
    }
}

// ── Elementwise ────────────────────────────────────────────────────

#[unsafe(no_mangle)]
pub unsafe extern "C" fn marigold_hard_swish_forward(x: *const f32, y: *mut f32, size: i32) {
    let n = dim(size);
    unsafe { activations::hard_swish_forward(slice(x, n), slice_mut(y, n)) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn marigold_hard_swish_backward(
    d_y: *const f32,
    d_x: *mut f32,
    x: *const f32,
    size: i32,
) {
    let n = dim(size);
    unsafe { activations::hard_swish_backward(slice(d_y, n), slice_mut(d_x, n), slice(x, n)) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn marigold_mean_squared_error_forward(
    prediction: *const f32,
    target: *const f32,
    size: i32,
) -> f32 {
    let n = dim(size);
    unsafe { loss::mean_squared_error_forward(slice(prediction, n), slice(target, n)) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn marigold_mean_squared_error_backward(
    d_y: f32,
    d_x: *mut f32,
    prediction: *const f32,
    target: *const f32,
    size: i32,
) {
    let n = dim(size);
    unsafe {
        loss::mean_squared_error_backward(d_y, slice_mut(d_x, n), slice(prediction, n), slice(target, n));
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn marigold_dropout_forward(
    x: *const f32,
    y: *mut f32,
    mask: *const f32,
    p: f32,
    height: i32,
    width: i32,
    channels: i32,
) {
    let (h, w, c) = (dim(height), dim(width), dim(channels));
    let dropout = DropoutConfig { probability: p };
    unsafe {
        dropout::dropout_forward(slice(x, h * w * c), slice_mut(y, h * w * c), slice(mask, c), &dropout, c);
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn marigold_dropout_backward(
    d_y: *const f32,
    d_x: *mut f32,
    mask: *const f32,
    height: i32,
    width: i32,
    channels: i32,
) {
    let (h, w, c) = (dim(height), dim(width), dim(channels));
    unsafe {
        dropout::dropout_backward(slice(d_y, h * w * c), slice_mut(d_x, h * w * c), slice(mask, c), c);
    }
}

// ── Pixel shuffle ──────────────────────────────────────────────────

macro_rules! shuffle_exports {
    ($r:literal, $sf:ident, $sb:ident, $uf:ident, $ub:ident) => {
        /// `height`, `width`: input extents; `channels`: output channels.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $sf(x: *const f32, y: *mut f32, height: i32, width: i32, channels: i32) {
            let (h, w, c) = (dim(height), dim(width), dim(channels));
            let n = h * w * c * $r * $r;
            unsafe { shuffle::pixel_shuffle_forward::<$r>(slice(x, n), slice_mut(y, n), h, w, c) }
        }

        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $sb(d_y: *const f32, d_x: *mut f32, height: i32, width: i32, channels: i32) {
            let (h, w, c) = (dim(height), dim(width), dim(channels));
            let n = h * w * c * $r * $r;
            unsafe { shuffle::pixel_shuffle_backward::<$r>(slice(d_y, n), slice_mut(d_x, n), h, w, c) }
        }

        /// `height`, `width`, `channels`: input extents.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $uf(x: *const f32, y: *mut f32, height: i32, width: i32, channels: i32) {
            let (h, w, c) = (dim(height), dim(width), dim(channels));
            let n = h * w * c;
            unsafe { shuffle::pixel_unshuffle_forward::<$r>(slice(x, n), slice_mut(y, n), h, w, c) }
        }

        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $ub(d_y: *const f32, d_x: *mut f32, height: i32, width: i32, channels: i32) {
            let (h, w, c) = (dim(height), dim(width), dim(channels));
            let n = h * w * c;
            unsafe { shuffle::pixel_unshuffle_backward::<$r>(slice(d_y, n), slice_mut(d_x, n), h, w, c) }
        }
    };
}

shuffle_exports!(
    4,
    marigold_pixel_shuffle_4_forward,
    marigold_pixel_shuffle_4_backward,
    marigold_pixel_unshuffle_4_forward,
    marigold_pixel_unshuffle_4_backward
);
shuffle_exports!(
    8,
    marigold_pixel_shuffle_8_forward,
    marigold_pixel_shuffle_8_backward,
    marigold_pixel_unshuffle_8_forward,
    marigold_pixel_unshuffle_8_backward
);

// ── Optimizer ──────────────────────────────────────────────────────

/// Adam step count from a C `int`. A non-positive step reaches the kernel
/// as 0, whose zero bias correction turns the update into NaN.
fn adam_step(t: i32) -> u32 {
    debug_assert!(t >= 1, "step count is 1-indexed, got {t}");
    u32::try_from(t).unwrap_or(0)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn marigold_adam_update(
    gradients: *const f32,
    parameters: *mut f32,
    m: *mut f32,
    v: *mut f32,
    size: i32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    schedule_multiplier: f32,
    learning_rate: f32,
    weight_decay: f32,
    t: i32,
) {
    let n = dim(size);
    let config = OptimizerConfig {
        learning_rate,
        beta1,
        beta2,
        epsilon,
        weight_decay,
        schedule_multiplier,
    };
    let step = adam_step(t);
    unsafe {
        optimizer::adam_update(
            slice(gradients, n),
            slice_mut(parameters, n),
            slice_mut(m, n),
            slice_mut(v, n),
            &config,
            step,
        );
    }
}

// ── Buffers ────────────────────────────────────────────────────────

#[unsafe(no_mangle)]
pub unsafe extern "C" fn marigold_zero(x: *mut f32, size: i32) {
    unsafe { buffer::zero(slice_mut(x, dim(size))) }
}

/// `y += x`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn marigold_accumulate(x: *const f32, y: *mut f32, size: i32) {
    let n = dim(size);
    unsafe { buffer::accumulate(slice(x, n), slice_mut(y, n)) }
}

/// `y = x1 + x2`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn marigold_merge(x1: *const f32, x2: *const f32, y: *mut f32, size: i32) {
    let n = dim(size);
    unsafe { buffer::merge(slice(x1, n), slice(x2, n), slice_mut(y, n)) }
}

/// `coords` holds `(y, x)` pairs, one per channel.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn marigold_draw_gaussians(
    data: *mut f32,
    height: i32,
    width: i32,
    channels: i32,
    coords: *const f32,
    sigma: f32,
) {
    let (h, w, c) = (dim(height), dim(width), dim(channels));
    unsafe { heatmap::draw_gaussians(slice_mut(data, h * w * c), h, w, c, slice(coords, 2 * c), sigma) }
}
