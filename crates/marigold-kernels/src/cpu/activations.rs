//! Hard-swish activation.

/// Hard swish: `0` for `x <= -3`, `x` for `x >= 3`, `x(x+3)/6` between.
/// NaN falls through to the middle branch and propagates.
#[inline]
pub fn hard_swish(x: f32) -> f32 {
    if x <= -3.0 {
        0.0
    } else if x >= 3.0 {
        x
    } else {
        x * (x + 3.0) / 6.0
    }
}

/// Derivative of [`hard_swish`]: `0`, `1`, or `(2x+3)/6`.
#[inline]
pub fn hard_swish_derivative(x: f32) -> f32 {
    if x <= -3.0 {
        0.0
    } else if x >= 3.0 {
        1.0
    } else {
        (2.0 * x + 3.0) / 6.0
    }
}

/// `y = hard_swish(x)`, elementwise.
pub fn hard_swish_forward(x: &[f32], y: &mut [f32]) {
    debug_assert_eq!(x.len(), y.len());
    for (out, &v) in y.iter_mut().zip(x) {
        *out = hard_swish(v);
    }
}

/// `d_x += d_y * hard_swish'(x)`, elementwise.
pub fn hard_swish_backward(d_y: &[f32], d_x: &mut [f32], x: &[f32]) {
    debug_assert!(d_y.len() == x.len() && d_x.len() == x.len());
    for ((dx, &g), &v) in d_x.iter_mut().zip(d_y).zip(x) {
        *dx += g * hard_swish_derivative(v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn piecewise_values() {
        assert_eq!(hard_swish(-4.0), 0.0);
        assert_eq!(hard_swish(-3.0), 0.0);
        assert_eq!(hard_swish(0.0), 0.0);
        assert_eq!(hard_swish(1.0), 4.0 / 6.0);
        assert_eq!(hard_swish(3.0), 3.0);
        assert_eq!(hard_swish(10.0), 10.0);
    }

    #[test]
    fn derivative_values() {
        assert_eq!(hard_swish_derivative(-5.0), 0.0);
        assert_eq!(hard_swish_derivative(0.0), 0.5);
        assert_eq!(hard_swish_derivative(1.5), 1.0);
        assert_eq!(hard_swish_derivative(4.0), 1.0);
    }

    #[test]
    fn nan_propagates() {
        assert!(hard_swish(f32::NAN).is_nan());
        assert!(hard_swish_derivative(f32::NAN).is_nan());
    }

    #[test]
    fn backward_accumulates() {
        let x = [-4.0, 0.0, 4.0];
        let d_y = [1.0, 2.0, 3.0];
        let mut d_x = [10.0; 3];
        hard_swish_backward(&d_y, &mut d_x, &x);
        assert_eq!(d_x, [10.0, 11.0, 13.0]);
    }
}
