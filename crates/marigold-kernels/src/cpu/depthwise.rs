//! Depthwise K×K convolution, stride 1, zero "same" padding.
//!
//! Each channel is convolved with its own K×K filter; channels never mix.
//! Filters are laid out `[K, K, C]`, images `[H, W, C]`.
//!
//! Two strategies are provided:
//!
//! - The region-split path ([`depthwise_convolution_forward`],
//!   [`depthwise_convolution_backward`]) cuts each axis into a leading edge
//!   of `p = (K - 1) / 2` positions, an interior and a trailing edge. Edge
//!   bands clip their tap range; interior bands use the full `0..K` range
//!   with no bounds checks. Rows × columns gives the nine regions.
//! - The padded path copies the image into a `(H + 2p) × (W + 2p) × C`
//!   scratch buffer with a zero border and runs one uniform loop.
//!
//! Both visit output pixels in row-major order and taps in `(kh, kw)` order,
//! so every sum is formed in the same sequence, and for finite filters the
//! results are bit-identical. A non-finite weight on a tap that falls
//! outside the image differs: the padded path multiplies it by the zero
//! border (`inf * 0 = NaN`) while the region split never visits it.
//!
//! The backward padded path produces a padded input gradient;
//! [`unpad_accumulate`] folds its interior back into the caller's gradient.

use super::width::Width;
use crate::dispatch_width;
use marigold_common::{Dims, Nhwc};
use std::ops::Range;

// ── Region split ───────────────────────────────────────────────────

/// Leading edge, interior and trailing edge of `0..extent`.
#[inline]
fn bands<const K: usize>(extent: usize) -> [Range<usize>; 3] {
    let p = K / 2;
    let lead_end = p.min(extent);
    let trail_start = extent.saturating_sub(p).max(lead_end);
    [0..lead_end, lead_end..trail_start, trail_start..extent]
}

/// Taps of a K-wide window centred on `pos` that land inside `0..extent`.
#[inline]
fn taps<const K: usize>(pos: usize, extent: usize) -> Range<usize> {
    let p = K / 2;
    p.saturating_sub(pos)..(extent + p - pos).min(K)
}

/// Visit every output pixel in row-major order with its valid tap ranges.
#[inline(always)]
fn for_each_region<const K: usize>(
    height: usize,
    width: usize,
    mut visit: impl FnMut(usize, usize, Range<usize>, Range<usize>),
) {
    let [top, middle, bottom] = bands::<K>(height);
    let [left, centre, right] = bands::<K>(width);

    let mut row = |h: usize, kh: Range<usize>| {
        for w in left.clone() {
            visit(h, w, kh.clone(), taps::<K>(w, width));
        }
        for w in centre.clone() {
            visit(h, w, kh.clone(), 0..K);
        }
        for w in right.clone() {
            visit(h, w, kh.clone(), taps::<K>(w, width));
        }
    };

    for h in top {
        row(h, taps::<K>(h, height));
    }
    for h in middle {
        row(h, 0..K);
    }
    for h in bottom {
        row(h, taps::<K>(h, height));
    }
}

/// `y = bias + depthwise_conv(x, kernel)` using the region split.
#[allow(clippy::too_many_arguments)]
pub fn depthwise_convolution_forward<const K: usize>(
    x: &[f32],
    y: &mut [f32],
    kernel: &[f32],
    bias: &[f32],
    height: usize,
    width: usize,
    channels: usize,
) {
    debug_assert!(K % 2 == 1, "kernel size must be odd");
    debug_assert_eq!(x.len(), height * width * channels);
    debug_assert_eq!(y.len(), height * width * channels);
    debug_assert_eq!(kernel.len(), K * K * channels);
    debug_assert_eq!(bias.len(), channels);

    dispatch_width!(channels, |c| forward_regions::<K, _>(x, y, kernel, bias, height, width, c));
}

fn forward_regions<const K: usize, W: Width>(
    x: &[f32],
    y: &mut [f32],
    kernel: &[f32],
    bias: &[f32],
    height: usize,
    width: usize,
    c: W,
) {
    let p = K / 2;
    let ch = c.get();
    let (image, filter) = (Nhwc::new(height, width, ch), Dims::new([K, K, ch]));
    for_each_region::<K>(height, width, |h, w, kh, kw| {
        let out = &mut y[image.pixel(h, w)..][..ch];
        out.copy_from_slice(&bias[..ch]);
        for i in kh {
            for j in kw.clone() {
                let src = &x[image.pixel(h + i - p, w + j - p)..][..ch];
                let k = &kernel[filter.offset([i, j, 0])..][..ch];
                for n in 0..c.get() {
                    out[n] += k[n] * src[n];
                }
            }
        }
    });
}

/// Accumulate `d_x`, `d_kernel` and `d_bias` for
/// [`depthwise_convolution_forward`].
#[allow(clippy::too_many_arguments)]
pub fn depthwise_convolution_backward<const K: usize>(
    d_y: &[f32],
    d_x: &mut [f32],
    d_kernel: &mut [f32],
    d_bias: &mut [f32],
    x: &[f32],
    kernel: &[f32],
    height: usize,
    width: usize,
    channels: usize,
) {
    debug_assert!(K % 2 == 1, "kernel size must be odd");
    debug_assert_eq!(d_y.len(), height * width * channels);
    debug_assert_eq!(d_x.len(), height * width * channels);
    debug_assert_eq!(x.len(), height * width * channels);
    debug_assert_eq!(d_kernel.len(), K * K * channels);
    debug_assert_eq!(kernel.len(), K * K * channels);
    debug_assert_eq!(d_bias.len(), channels);

    dispatch_width!(channels, |c| {
        backward_regions::<K, _>(d_y, d_x, d_kernel, d_bias, x, kernel, height, width, c)
    });
}

#[allow(clippy::too_many_arguments)]
fn backward_regions<const K: usize, W: Width>(
    d_y: &[f32],
    d_x: &mut [f32],
    d_kernel: &mut [f32],
    d_bias: &mut [f32],
    x: &[f32],
    kernel: &[f32],
    height: usize,
    width: usize,
    c: W,
) {
    let p = K / 2;
    let ch = c.get();
    let (image, filter) = (Nhwc::new(height, width, ch), Dims::new([K, K, ch]));
    for_each_region::<K>(height, width, |h, w, kh, kw| {
        let g = &d_y[image.pixel(h, w)..][..ch];
        for n in 0..c.get() {
            d_bias[n] += g[n];
        }
        for i in kh {
            for j in kw.clone() {
                let at = image.pixel(h + i - p, w + j - p);
                let tap = filter.offset([i, j, 0]);
                let src = &x[at..][..ch];
                let k = &kernel[tap..][..ch];
                let dx = &mut d_x[at..][..ch];
                let dk = &mut d_kernel[tap..][..ch];
                for n in 0..c.get() {
                    dx[n] += k[n] * g[n];
                    dk[n] += src[n] * g[n];
                }
            }
        }
    });
}

// ── Padded path ────────────────────────────────────────────────────

/// Copy `x` (`H×W×C`) into the centre of `x_padded` (`(H+2p)×(W+2p)×C`)
/// and zero the border.
pub fn pad(x: &[f32], x_padded: &mut [f32], height: usize, width: usize, channels: usize, p: usize) {
    let padded_width = width + 2 * p;
    debug_assert_eq!(x.len(), height * width * channels);
    debug_assert_eq!(x_padded.len(), (height + 2 * p) * padded_width * channels);

    x_padded.fill(0.0);
    let padded = Nhwc::new(height + 2 * p, padded_width, channels);
    let row_len = width * channels;
    for (h, src) in x.chunks_exact(row_len).enumerate() {
        let start = padded.pixel(h + p, p);
        x_padded[start..start + row_len].copy_from_slice(src);
    }
}

/// `d_x += interior of d_x_padded`.
pub fn unpad_accumulate(
    d_x_padded: &[f32],
    d_x: &mut [f32],
    height: usize,
    width: usize,
    channels: usize,
    p: usize,
) {
    let padded_width = width + 2 * p;
    debug_assert_eq!(d_x.len(), height * width * channels);
    debug_assert_eq!(d_x_padded.len(), (height + 2 * p) * padded_width * channels);

    let padded = Nhwc::new(height + 2 * p, padded_width, channels);
    let row_len = width * channels;
    for (h, dst) in d_x.chunks_exact_mut(row_len).enumerate() {
        let start = padded.pixel(h + p, p);
        for (d, &s) in dst.iter_mut().zip(&d_x_padded[start..start + row_len]) {
            *d += s;
        }
    }
}

/// `y = bias + depthwise_conv(x)` from an already padded input.
///
/// `height` and `width` are the unpadded (output) extents.
#[allow(clippy::too_many_arguments)]
pub fn depthwise_convolution_forward_padded<const K: usize>(
    x_padded: &[f32],
    y: &mut [f32],
    kernel: &[f32],
    bias: &[f32],
    height: usize,
    width: usize,
    channels: usize,
) {
    let padded_width = width + K - 1;
    debug_assert_eq!(x_padded.len(), (height + K - 1) * padded_width * channels);
    debug_assert_eq!(y.len(), height * width * channels);

    let image = Nhwc::new(height, width, channels);
    let padded = Nhwc::new(height + K - 1, padded_width, channels);
    let filter = Dims::new([K, K, channels]);
    for h in 0..height {
        for w in 0..width {
            let out = &mut y[image.pixel(h, w)..][..channels];
            out.copy_from_slice(bias);
            for i in 0..K {
                for j in 0..K {
                    let src = &x_padded[padded.pixel(h + i, w + j)..][..channels];
                    let k = &kernel[filter.offset([i, j, 0])..][..channels];
                    for n in 0..channels {
                        out[n] += k[n] * src[n];
                    }
                }
            }
        }
    }
}

/// Padded counterpart of [`depthwise_convolution_backward`]. Accumulates
/// into `d_x_padded`; follow with [`unpad_accumulate`].
#[allow(clippy::too_many_arguments)]
pub fn depthwise_convolution_backward_padded<const K: usize>(
    d_y: &[f32],
    d_x_padded: &mut [f32],
    d_kernel: &mut [f32],
    d_bias: &mut [f32],
    x_padded: &[f32],
    kernel: &[f32],
    height: usize,
    width: usize,
    channels: usize,
) {
    let padded_width = width + K - 1;
    debug_assert_eq!(x_padded.len(), (height + K - 1) * padded_width * channels);
    debug_assert_eq!(d_x_padded.len(), x_padded.len());
    debug_assert_eq!(d_y.len(), height * width * channels);

    let image = Nhwc::new(height, width, channels);
    let padded = Nhwc::new(height + K - 1, padded_width, channels);
    let filter = Dims::new([K, K, channels]);
    for h in 0..height {
        for w in 0..width {
            let g = &d_y[image.pixel(h, w)..][..channels];
            for n in 0..channels {
                d_bias[n] += g[n];
            }
            for i in 0..K {
                for j in 0..K {
                    let at = padded.pixel(h + i, w + j);
                    let tap = filter.offset([i, j, 0]);
                    for n in 0..channels {
                        d_x_padded[at + n] += kernel[tap + n] * g[n];
                        d_kernel[tap + n] += x_padded[at + n] * g[n];
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_cover_extent_without_overlap() {
        for extent in 0..12 {
            let [a, b, c] = bands::<5>(extent);
            assert_eq!(a.start, 0);
            assert_eq!(a.end, b.start);
            assert_eq!(b.end, c.start);
            assert_eq!(c.end, extent);
        }
        assert_eq!(bands::<3>(8), [0..1, 1..7, 7..8]);
        assert_eq!(bands::<5>(3), [0..2, 2..2, 2..3]);
    }

    #[test]
    fn taps_clip_at_borders() {
        assert_eq!(taps::<3>(0, 8), 1..3);
        assert_eq!(taps::<3>(4, 8), 0..3);
        assert_eq!(taps::<3>(7, 8), 0..2);
        assert_eq!(taps::<5>(1, 8), 1..5);
        assert_eq!(taps::<5>(6, 8), 0..4);
        // a single pixel only sees the centre tap
        assert_eq!(taps::<3>(0, 1), 1..2);
    }

    #[test]
    fn identity_filter_copies_input() {
        let (h, w, c) = (4, 5, 2);
        let x: Vec<f32> = (0..h * w * c).map(|i| i as f32).collect();
        let mut kernel = vec![0.0; 9 * c];
        kernel[4 * c..5 * c].fill(1.0);
        let mut y = vec![0.0; x.len()];
        depthwise_convolution_forward::<3>(&x, &mut y, &kernel, &[0.0; 2], h, w, c);
        assert_eq!(y, x);
    }

    #[test]
    fn box_filter_counts_neighbours() {
        // all-ones input and filter: each output counts its in-bounds taps
        let (h, w, c) = (3, 3, 1);
        let x = vec![1.0; 9];
        let kernel = vec![1.0; 9];
        let mut y = vec![0.0; 9];
        depthwise_convolution_forward::<3>(&x, &mut y, &kernel, &[0.5], h, w, c);
        assert_eq!(y, [4.5, 6.5, 4.5, 6.5, 9.5, 6.5, 4.5, 6.5, 4.5]);
    }

    #[test]
    fn channels_do_not_mix() {
        let (h, w, c) = (3, 3, 2);
        let mut x = vec![0.0; h * w * c];
        for px in 0..h * w {
            x[px * c] = 1.0;
        }
        let kernel = vec![1.0; 9 * c];
        let mut y = vec![0.0; x.len()];
        depthwise_convolution_forward::<3>(&x, &mut y, &kernel, &[0.0, 0.0], h, w, c);
        for px in 0..h * w {
            assert!(y[px * c] > 0.0);
            assert_eq!(y[px * c + 1], 0.0);
        }
    }

    #[test]
    fn backward_bias_is_spatial_sum() {
        let (h, w, c) = (2, 3, 2);
        let d_y: Vec<f32> = (0..h * w * c).map(|i| i as f32).collect();
        let x = vec![0.0; d_y.len()];
        let kernel = vec![0.0; 9 * c];
        let mut d_x = vec![0.0; d_y.len()];
        let mut d_kernel = vec![0.0; 9 * c];
        let mut d_bias = vec![1.0; c];
        depthwise_convolution_backward::<3>(
            &d_y,
            &mut d_x,
            &mut d_kernel,
            &mut d_bias,
            &x,
            &kernel,
            h,
            w,
            c,
        );
        assert_eq!(d_bias, [1.0 + 0.0 + 2.0 + 4.0 + 6.0 + 8.0 + 10.0, 1.0 + 1.0 + 3.0 + 5.0 + 7.0 + 9.0 + 11.0]);
    }

    #[test]
    fn pad_then_unpad_accumulates_interior() {
        let (h, w, c, p) = (2, 2, 1, 1);
        let x = [1.0, 2.0, 3.0, 4.0];
        let mut padded = vec![7.0; 16];
        pad(&x, &mut padded, h, w, c, p);
        assert_eq!(
            padded,
            [0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 0.0, 0.0, 3.0, 4.0, 0.0, 0.0, 0.0, 0.0, 0.0]
        );
        let mut out = [10.0; 4];
        unpad_accumulate(&padded, &mut out, h, w, c, p);
        assert_eq!(out, [11.0, 12.0, 13.0, 14.0]);
    }
}
