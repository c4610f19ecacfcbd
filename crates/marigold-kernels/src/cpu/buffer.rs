//! Whole-buffer helpers used between layers.

/// `x = 0`.
pub fn zero(x: &mut [f32]) {
    x.fill(0.0);
}

/// `y += x`.
pub fn accumulate(x: &[f32], y: &mut [f32]) {
    debug_assert_eq!(x.len(), y.len());
    for (out, &v) in y.iter_mut().zip(x) {
        *out += v;
    }
}

/// `y = x1 + x2`, the forward pass of a residual addition.
pub fn merge(x1: &[f32], x2: &[f32], y: &mut [f32]) {
    debug_assert!(x1.len() == y.len() && x2.len() == y.len());
    for ((out, &a), &b) in y.iter_mut().zip(x1).zip(x2) {
        *out = a + b;
    }
}

/// Arithmetic mean, `f32` accumulation.
pub fn mean(x: &[f32]) -> f32 {
    x.iter().sum::<f32>() / x.len() as f32
}

/// Population standard deviation around `mean`, no epsilon.
pub fn std_dev(x: &[f32], mean: f32) -> f32 {
    let sum: f32 = x.iter().map(|&v| (v - mean) * (v - mean)).sum();
    (sum / x.len() as f32).sqrt()
}
