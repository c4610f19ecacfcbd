//! Mean-squared-error loss.

/// `Σ (pred - target)² / N`, summed in `f64` and returned as `f32`.
pub fn mean_squared_error_forward(prediction: &[f32], target: &[f32]) -> f32 {
    debug_assert_eq!(prediction.len(), target.len());
    let sum: f64 = prediction
        .iter()
        .zip(target)
        .map(|(&p, &t)| {
            let d = f64::from(p) - f64::from(t);
            d * d
        })
        .sum();
    (sum / prediction.len() as f64) as f32
}

/// `d_x = 2 (pred - target) / N * d_y`.
///
/// Overwrites `d_x`: this is where the backward chain starts.
pub fn mean_squared_error_backward(d_y: f32, d_x: &mut [f32], prediction: &[f32], target: &[f32]) {
    debug_assert!(prediction.len() == target.len() && d_x.len() == target.len());
    let n = prediction.len() as f32;
    for ((dx, &p), &t) in d_x.iter_mut().zip(prediction).zip(target) {
        *dx = 2.0 * (p - t) / n * d_y;
    }
}
