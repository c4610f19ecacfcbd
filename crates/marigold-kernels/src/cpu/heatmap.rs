//! Standardised Gaussian heat-map targets.
//!
//! One Gaussian bump per channel, centred at caller-supplied `(y, x)` pixel
//! coordinates (pixel centres sit at `+0.5`). Every channel is standardised
//! with the mean and standard deviation of a reference bump of the same
//! sigma centred in the image, so all channels share one affine scale
//! regardless of where their bump lands.

use super::buffer::{mean, std_dev};

#[inline]
fn bump(h: usize, w: usize, centre_y: f32, centre_x: f32, sigma: f32) -> f32 {
    let dx = w as f32 + 0.5 - centre_x;
    let dy = h as f32 + 0.5 - centre_y;
    (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp()
}

/// Write `channels` standardised bumps into `data` (`[height, width, channels]`).
///
/// `coords[2c]` is the y and `coords[2c + 1]` the x coordinate of channel
/// `c`. The first `height * width` elements of `data` double as scratch for
/// the reference bump before being overwritten.
pub fn draw_gaussians(
    data: &mut [f32],
    height: usize,
    width: usize,
    channels: usize,
    coords: &[f32],
    sigma: f32,
) {
    debug_assert_eq!(data.len(), height * width * channels);
    debug_assert_eq!(coords.len(), 2 * channels);
    debug_assert!(channels >= 1);

    let plane = height * width;
    let (centre_y, centre_x) = (height as f32 / 2.0, width as f32 / 2.0);
    for (i, v) in data[..plane].iter_mut().enumerate() {
        *v = bump(i / width, i % width, centre_y, centre_x, sigma);
    }
    let m = mean(&data[..plane]);
    let s = std_dev(&data[..plane], m);

    for (i, px) in data.chunks_exact_mut(channels).enumerate() {
        let (h, w) = (i / width, i % width);
        for (c, out) in px.iter_mut().enumerate() {
            *out = (bump(h, w, coords[2 * c], coords[2 * c + 1], sigma) - m) / s;
        }
    }
}
