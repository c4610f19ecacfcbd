//! Channel dropout with a caller-supplied per-channel mask.
//!
//! The forward pass scales kept channels by `1 / (1 - p)`, with `p` taken
//! from [`DropoutConfig`]; the backward pass re-applies the mask only. The
//! two are not symmetric: the backward gradient is the forward derivative
//! divided by `1 / (1 - p)`.

use marigold_common::DropoutConfig;

/// Fill `mask` with `0.0` (dropped, probability `p`) or `1.0` (kept),
/// drawing one `[0, 1)` sample per channel from `random`.
pub fn fill_dropout_mask(mask: &mut [f32], dropout: &DropoutConfig, mut random: impl FnMut() -> f32) {
    let p = dropout.probability;
    debug_assert!((0.0..1.0).contains(&p));
    for m in mask.iter_mut() {
        *m = if random() < p { 0.0 } else { 1.0 };
    }
}

/// `y[h,w,c] = x[h,w,c] * mask[c] / (1 - p)`.
pub fn dropout_forward(x: &[f32], y: &mut [f32], mask: &[f32], dropout: &DropoutConfig, channels: usize) {
    debug_assert!(channels > 0);
    debug_assert_eq!(mask.len(), channels);
    debug_assert_eq!(x.len(), y.len());
    debug_assert!(x.len().is_multiple_of(channels));
    let scale = 1.0 / (1.0 - dropout.probability);
    for (out, px) in y.chunks_exact_mut(channels).zip(x.chunks_exact(channels)) {
        for ((o, &v), &m) in out.iter_mut().zip(px).zip(mask) {
            *o = v * m * scale;
        }
    }
}

/// `d_x[h,w,c] += d_y[h,w,c] * mask[c]`.
pub fn dropout_backward(d_y: &[f32], d_x: &mut [f32], mask: &[f32], channels: usize) {
    debug_assert!(channels > 0);
    debug_assert_eq!(mask.len(), channels);
    debug_assert_eq!(d_x.len(), d_y.len());
    for (dx, g) in d_x.chunks_exact_mut(channels).zip(d_y.chunks_exact(channels)) {
        for ((d, &v), &m) in dx.iter_mut().zip(g).zip(mask) {
            *d += v * m;
        }
    }
}
