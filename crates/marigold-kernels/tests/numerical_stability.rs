//! Non-finite values propagate through the kernels; none are clamped or
//! silently replaced.

use marigold_kernels::{NormalizationConfig, OptimizerConfig};
use marigold_kernels::cpu::activations::{hard_swish, hard_swish_backward, hard_swish_forward};
use marigold_kernels::cpu::depthwise::depthwise_convolution_forward;
use marigold_kernels::cpu::gemm::matmul_accumulate;
use marigold_kernels::cpu::instance_norm::instance_normalization_forward;
use marigold_kernels::cpu::optimizer::adam_update;

// ── GEMM ───────────────────────────────────────────────────────────

#[test]
fn gemm_nan_poisons_its_row_only() {
    let (m, k, n) = (4, 4, 4);
    let mut a = vec![1.0f32; m * k];
    a[k + 2] = f32::NAN; // row 1
    let b = vec![0.5f32; k * n];
    let mut c = vec![0.0f32; m * n];
    matmul_accumulate(&a, &b, &mut c, m, k, n);

    for i in 0..m {
        let row = &c[i * n..(i + 1) * n];
        if i == 1 {
            assert!(row.iter().all(|v| v.is_nan()));
        } else {
            assert!(row.iter().all(|&v| v == 2.0));
        }
    }
}

#[test]
fn gemm_infinity_times_zero_is_nan() {
    let a = [f32::INFINITY];
    let b = [0.0, 1.0];
    let mut c = [0.0; 2];
    matmul_accumulate(&a, &b, &mut c, 1, 1, 2);
    assert!(c[0].is_nan());
    assert_eq!(c[1], f32::INFINITY);
}

// ── Depthwise ──────────────────────────────────────────────────────

#[test]
fn depthwise_nan_spreads_to_the_receptive_field() {
    let (h, w, c) = (7, 7, 8);
    let mut x = vec![1.0f32; h * w * c];
    // channel 3 of pixel (3, 3)
    x[(3 * w + 3) * c + 3] = f32::NAN;
    let kernel = vec![0.1f32; 9 * c];
    let bias = vec![0.0f32; c];
    let mut y = vec![0.0f32; x.len()];
    depthwise_convolution_forward::<3>(&x, &mut y, &kernel, &bias, h, w, c);

    for row in 0..h {
        for col in 0..w {
            for ch in 0..c {
                let v = y[(row * w + col) * c + ch];
                let touched = ch == 3 && row.abs_diff(3) <= 1 && col.abs_diff(3) <= 1;
                assert_eq!(v.is_nan(), touched, "({row}, {col}, {ch})");
            }
        }
    }
}

// ── Instance normalization ─────────────────────────────────────────

#[test]
fn constant_channel_without_epsilon_is_nan() {
    let (h, w, c) = (4, 4, 8);
    // channel 0 constant, the others vary
    let x: Vec<f32> = (0..h * w * c)
        .map(|i| if i % c == 0 { 2.0 } else { (i % 7) as f32 })
        .collect();
    let mut y = vec![0.0; x.len()];
    let (mut mean, mut std_dev) = (vec![0.0; c], vec![0.0; c]);
    instance_normalization_forward(
        &x,
        &mut y,
        &vec![1.0; c],
        &vec![0.0; c],
        &mut mean,
        &mut std_dev,
        &NormalizationConfig { epsilon: 0.0 },
        h,
        w,
        c,
    );

    assert_eq!(std_dev[0], 0.0);
    assert!(y.iter().step_by(c).all(|v| v.is_nan()));
    assert!(y.iter().enumerate().filter(|(i, _)| i % c != 0).all(|(_, v)| v.is_finite()));
}

#[test]
fn constant_channel_with_epsilon_is_finite() {
    let (h, w, c) = (4, 4, 8);
    let x = vec![2.0f32; h * w * c];
    let mut y = vec![0.0; x.len()];
    let (mut mean, mut std_dev) = (vec![0.0; c], vec![0.0; c]);
    instance_normalization_forward(
        &x,
        &mut y,
        &vec![1.0; c],
        &vec![0.5; c],
        &mut mean,
        &mut std_dev,
        &NormalizationConfig::default(),
        h,
        w,
        c,
    );
    assert!(y.iter().all(|&v| v == 0.5));
}

// ── Activations ────────────────────────────────────────────────────

#[test]
fn hard_swish_non_finite() {
    assert!(hard_swish(f32::NAN).is_nan());
    assert_eq!(hard_swish(f32::INFINITY), f32::INFINITY);
    assert_eq!(hard_swish(f32::NEG_INFINITY), 0.0);

    let x = [f32::NAN, 1.0];
    let mut y = [0.0; 2];
    hard_swish_forward(&x, &mut y);
    assert!(y[0].is_nan());
    assert!(y[1].is_finite());

    let mut d_x = [0.0; 2];
    hard_swish_backward(&[1.0, 1.0], &mut d_x, &x);
    assert!(d_x[0].is_nan());
    assert!((d_x[1] - 5.0 / 6.0).abs() < 1e-7);
}

// ── Optimizer ──────────────────────────────────────────────────────

#[test]
fn adam_nan_gradient_poisons_only_its_parameter() {
    let config = OptimizerConfig::default();
    let mut p = [1.0f32, 1.0];
    let (mut m, mut v) = ([0.0; 2], [0.0; 2]);
    adam_update(&[f32::NAN, 0.5], &mut p, &mut m, &mut v, &config, 1);
    assert!(p[0].is_nan() && m[0].is_nan() && v[0].is_nan());
    assert!(p[1].is_finite() && p[1] < 1.0);
}
