//! Pixel shuffle (channel → space) and pixel unshuffle (space → channel).
//!
//! With scale `R`, a low-resolution `[h, w, c·R²]` tensor and a
//! high-resolution `[h·R, w·R, c]` tensor correspond element for element:
//!
//! ```text
//! hi[h·R + i, w·R + j, ch] == lo[h, w, ch·R² + i·R + j]
//! ```
//!
//! Shuffle reads `lo` and writes `hi`; unshuffle does the reverse. Both are
//! pure permutations. Backward passes apply the inverse map and accumulate.

use marigold_common::Nhwc;

/// Visit every `(lo_index, hi_index)` pair of the permutation.
///
/// `height`, `width` are the low-resolution extents and `channels` the
/// high-resolution channel count.
#[inline(always)]
fn for_each_pair<const R: usize>(
    height: usize,
    width: usize,
    channels: usize,
    mut visit: impl FnMut(usize, usize),
) {
    let high = Nhwc::new(height * R, width * R, channels);
    let low = Nhwc::new(height, width, channels * R * R);
    for h in 0..height {
        for i in 0..R {
            for w in 0..width {
                for j in 0..R {
                    let hi = high.pixel(h * R + i, w * R + j);
                    let lo = low.pixel(h, w) + i * R + j;
                    for ch in 0..channels {
                        visit(lo + ch * R * R, hi + ch);
                    }
                }
            }
        }
    }
}

/// `[h, w, c·R²] → [h·R, w·R, c]`.
///
/// `height` and `width` are the input extents, `channels` the output
/// channel count.
pub fn pixel_shuffle_forward<const R: usize>(
    x: &[f32],
    y: &mut [f32],
    height: usize,
    width: usize,
    channels: usize,
) {
    debug_assert_eq!(x.len(), height * width * channels * R * R);
    debug_assert_eq!(y.len(), x.len());
    for_each_pair::<R>(height, width, channels, |lo, hi| y[hi] = x[lo]);
}

/// `d_x += unshuffle(d_y)`, same shape arguments as the forward pass.
pub fn pixel_shuffle_backward<const R: usize>(
    d_y: &[f32],
    d_x: &mut [f32],
    height: usize,
    width: usize,
    channels: usize,
) {
    debug_assert_eq!(d_x.len(), height * width * channels * R * R);
    debug_assert_eq!(d_y.len(), d_x.len());
    for_each_pair::<R>(height, width, channels, |lo, hi| d_x[lo] += d_y[hi]);
}

/// `[H, W, c] → [H/R, W/R, c·R²]`.
///
/// `height` and `width` are the input (high-resolution) extents and must be
/// multiples of `R`; `channels` is the input channel count.
pub fn pixel_unshuffle_forward<const R: usize>(
    x: &[f32],
    y: &mut [f32],
    height: usize,
    width: usize,
    channels: usize,
) {
    debug_assert!(height.is_multiple_of(R) && width.is_multiple_of(R));
    debug_assert_eq!(x.len(), height * width * channels);
    debug_assert_eq!(y.len(), x.len());
    for_each_pair::<R>(height / R, width / R, channels, |lo, hi| y[lo] = x[hi]);
}

/// `d_x += shuffle(d_y)`, same shape arguments as the forward pass.
pub fn pixel_unshuffle_backward<const R: usize>(
    d_y: &[f32],
    d_x: &mut [f32],
    height: usize,
    width: usize,
    channels: usize,
) {
    debug_assert!(height.is_multiple_of(R) && width.is_multiple_of(R));
    debug_assert_eq!(d_x.len(), height * width * channels);
    debug_assert_eq!(d_y.len(), d_x.len());
    for_each_pair::<R>(height / R, width / R, channels, |lo, hi| d_x[hi] += d_y[lo]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shuffle_places_channel_blocks_spatially() {
        // 1×1×4 with R = 2 becomes a 2×2×1 image
        let x = [1.0, 2.0, 3.0, 4.0];
        let mut y = [0.0; 4];
        pixel_shuffle_forward::<2>(&x, &mut y, 1, 1, 1);
        assert_eq!(y, [1.0, 2.0, 3.0, 4.0]);

        // two output channels interleave per pixel
        let x = [10.0, 11.0, 12.0, 13.0, 20.0, 21.0, 22.0, 23.0];
        let mut y = [0.0; 8];
        pixel_shuffle_forward::<2>(&x, &mut y, 1, 1, 2);
        assert_eq!(y, [10.0, 20.0, 11.0, 21.0, 12.0, 22.0, 13.0, 23.0]);
    }

    #[test]
    fn shuffle_matches_index_formula() {
        const R: usize = 4;
        let (h, w, c) = (2, 3, 2);
        let x: Vec<f32> = (0..h * w * c * R * R).map(|i| i as f32).collect();
        let mut y = vec![0.0; x.len()];
        pixel_shuffle_forward::<R>(&x, &mut y, h, w, c);
        let (hh, ww) = (h * R, w * R);
        for yh in 0..hh {
            for yw in 0..ww {
                for ch in 0..c {
                    let lo = ((yh / R) * w + yw / R) * c * R * R + ch * R * R + (yh % R) * R + yw % R;
                    assert_eq!(y[(yh * ww + yw) * c + ch], x[lo]);
                }
            }
        }
    }

    #[test]
    fn unshuffle_inverts_shuffle() {
        let (h, w, c) = (2, 2, 3);
        let x: Vec<f32> = (0..h * w * c * 64).map(|i| i as f32 * 0.5).collect();
        let mut hi = vec![0.0; x.len()];
        let mut back = vec![0.0; x.len()];
        pixel_shuffle_forward::<8>(&x, &mut hi, h, w, c);
        pixel_unshuffle_forward::<8>(&hi, &mut back, h * 8, w * 8, c);
        assert_eq!(back, x);
    }

    #[test]
    fn backward_accumulates_through_inverse_map() {
        let d_y = [1.0, 2.0, 3.0, 4.0];
        let mut d_x = [1.0; 4];
        pixel_shuffle_backward::<2>(&d_y, &mut d_x, 1, 1, 1);
        assert_eq!(d_x, [2.0, 3.0, 4.0, 5.0]);

        let mut d_hi = [0.0; 4];
        pixel_unshuffle_backward::<2>(&d_y, &mut d_hi, 2, 2, 1);
        assert_eq!(d_hi, [1.0, 2.0, 3.0, 4.0]);
    }
}
