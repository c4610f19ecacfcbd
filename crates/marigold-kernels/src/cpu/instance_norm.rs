//! Instance normalization over the spatial extent of one `[H, W, C]` image.
//!
//! Statistics are per channel, population variance, accumulated in `f32`
//! in row-major pixel order. `std_dev = sqrt(var + epsilon)`, with `epsilon`
//! taken from [`NormalizationConfig`]. The forward
//! pass writes `mean` and `std_dev` for the backward pass to reuse.
//!
//! A constant channel with `epsilon == 0` has `std_dev == 0` and produces
//! NaN/Inf. That is propagated, not clamped.

use super::width::Width;
use crate::dispatch_width;
use marigold_common::NormalizationConfig;

/// `y = (x - mean) / std_dev * gamma + beta`, per channel.
#[allow(clippy::too_many_arguments)]
pub fn instance_normalization_forward(
    x: &[f32],
    y: &mut [f32],
    gamma: &[f32],
    beta: &[f32],
    mean: &mut [f32],
    std_dev: &mut [f32],
    normalization: &NormalizationConfig,
    height: usize,
    width: usize,
    channels: usize,
) {
    let epsilon = normalization.epsilon;
    debug_assert!(channels > 0);
    debug_assert_eq!(x.len(), height * width * channels);
    debug_assert_eq!(y.len(), x.len());
    debug_assert!(gamma.len() == channels && beta.len() == channels);
    debug_assert!(mean.len() == channels && std_dev.len() == channels);
    debug_assert!(epsilon >= 0.0 || epsilon.is_nan());

    dispatch_width!(channels, |c| {
        forward::<_>(x, y, gamma, beta, mean, std_dev, epsilon, height * width, c)
    });
}

#[allow(clippy::too_many_arguments)]
fn forward<W: Width>(
    x: &[f32],
    y: &mut [f32],
    gamma: &[f32],
    beta: &[f32],
    mean: &mut [f32],
    std_dev: &mut [f32],
    epsilon: f32,
    pixels: usize,
    c: W,
) {
    let n = c.get();
    let count = pixels as f32;
    let (mean, std_dev) = (&mut mean[..n], &mut std_dev[..n]);

    mean.fill(0.0);
    for px in x.chunks_exact(n) {
        for ch in 0..c.get() {
            mean[ch] += px[ch];
        }
    }
    for m in mean.iter_mut() {
        *m /= count;
    }

    // variance accumulates in std_dev
    std_dev.fill(0.0);
    for px in x.chunks_exact(n) {
        for ch in 0..c.get() {
            let d = px[ch] - mean[ch];
            std_dev[ch] += d * d;
        }
    }
    for s in std_dev.iter_mut() {
        *s = (*s / count + epsilon).sqrt();
    }

    for (out, px) in y.chunks_exact_mut(n).zip(x.chunks_exact(n)) {
        for ch in 0..c.get() {
            out[ch] = (px[ch] - mean[ch]) / std_dev[ch] * gamma[ch] + beta[ch];
        }
    }
}

/// Backward pass of [`instance_normalization_forward`].
///
/// Accumulates into `d_x`, `d_gamma` and `d_beta`. `sum_1` and `sum_2` are
/// per-channel scratch (`channels` elements each) and are overwritten with
/// `Σ d_y·gamma / N` and `Σ d_y·gamma·x̂ / N`.
#[allow(clippy::too_many_arguments)]
pub fn instance_normalization_backward(
    d_y: &[f32],
    d_x: &mut [f32],
    d_gamma: &mut [f32],
    d_beta: &mut [f32],
    x: &[f32],
    gamma: &[f32],
    mean: &[f32],
    std_dev: &[f32],
    sum_1: &mut [f32],
    sum_2: &mut [f32],
    height: usize,
    width: usize,
    channels: usize,
) {
    debug_assert!(channels > 0);
    debug_assert_eq!(x.len(), height * width * channels);
    debug_assert!(d_y.len() == x.len() && d_x.len() == x.len());
    debug_assert!(d_gamma.len() == channels && d_beta.len() == channels);
    debug_assert!(sum_1.len() == channels && sum_2.len() == channels);

    let grads = Grads { d_x, d_gamma, d_beta };
    let sums = (sum_1, sum_2);
    dispatch_width!(channels, |c| {
        backward::<_>(d_y, grads, x, gamma, mean, std_dev, sums, height * width, c)
    });
}

struct Grads<'a> {
    d_x: &'a mut [f32],
    d_gamma: &'a mut [f32],
    d_beta: &'a mut [f32],
}

#[allow(clippy::too_many_arguments)]
fn backward<W: Width>(
    d_y: &[f32],
    grads: Grads<'_>,
    x: &[f32],
    gamma: &[f32],
    mean: &[f32],
    std_dev: &[f32],
    (sum_1, sum_2): (&mut [f32], &mut [f32]),
    pixels: usize,
    c: W,
) {
    let n = c.get();
    let count = pixels as f32;
    let Grads { d_x, d_gamma, d_beta } = grads;

    sum_1.fill(0.0);
    sum_2.fill(0.0);
    for (g, px) in d_y.chunks_exact(n).zip(x.chunks_exact(n)) {
        for ch in 0..c.get() {
            let x_hat = (px[ch] - mean[ch]) / std_dev[ch];
            let g_gamma = g[ch] * gamma[ch];
            d_beta[ch] += g[ch];
            d_gamma[ch] += g[ch] * x_hat;
            sum_1[ch] += g_gamma;
            sum_2[ch] += g_gamma * x_hat;
        }
    }
    for ch in 0..n {
        sum_1[ch] /= count;
        sum_2[ch] /= count;
    }

    for ((dx, g), px) in d_x.chunks_exact_mut(n).zip(d_y.chunks_exact(n)).zip(x.chunks_exact(n)) {
        for ch in 0..c.get() {
            let x_hat = (px[ch] - mean[ch]) / std_dev[ch];
            dx[ch] += (g[ch] * gamma[ch] - x_hat * sum_2[ch] - sum_1[ch]) / std_dev[ch];
        }
    }
}
