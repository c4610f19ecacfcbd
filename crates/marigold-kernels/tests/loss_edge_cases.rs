use marigold_kernels::cpu::loss::{mean_squared_error_backward, mean_squared_error_forward};

#[test]
fn literal_forward_and_backward() {
    let prediction = [1.0, 2.0, 3.0];
    let target = [1.0, 2.0, 4.0];
    let loss = mean_squared_error_forward(&prediction, &target);
    assert!((loss - 1.0 / 3.0).abs() < 1e-7, "loss {loss}");

    let mut d_x = [0.0; 3];
    mean_squared_error_backward(1.0, &mut d_x, &prediction, &target);
    assert_eq!(&d_x[..2], &[0.0, 0.0]);
    assert!((d_x[2] + 2.0 / 3.0).abs() < 1e-7);
}

#[test]
fn perfect_prediction_is_zero() {
    let x = [0.5, -1.5, 2.25, 8.0];
    assert_eq!(mean_squared_error_forward(&x, &x), 0.0);
    let mut d_x = [1.0; 4];
    mean_squared_error_backward(1.0, &mut d_x, &x, &x);
    assert!(d_x.iter().all(|&g| g == 0.0));
}

#[test]
fn upstream_gradient_scales_backward() {
    let (prediction, target) = ([2.0, 0.0], [0.0, 0.0]);
    let mut unit = [0.0; 2];
    mean_squared_error_backward(1.0, &mut unit, &prediction, &target);
    let mut scaled = [0.0; 2];
    mean_squared_error_backward(0.25, &mut scaled, &prediction, &target);
    assert_eq!(unit, [2.0, 0.0]);
    assert_eq!(scaled, [0.5, 0.0]);
}

#[test]
fn non_finite_inputs_propagate() {
    let target = [0.0, 0.0];
    assert!(mean_squared_error_forward(&[f32::NAN, 1.0], &target).is_nan());
    assert_eq!(mean_squared_error_forward(&[f32::INFINITY, 1.0], &target), f32::INFINITY);

    let mut d_x = [0.0; 2];
    mean_squared_error_backward(1.0, &mut d_x, &[f32::NAN, 1.0], &target);
    assert!(d_x[0].is_nan());
    assert_eq!(d_x[1], 1.0);
}

#[test]
fn large_errors_do_not_overflow_the_sum() {
    // each squared error fits in f32 but their sum does not
    let prediction = vec![1.5e19f32; 4];
    let target = vec![0.0f32; 4];
    let loss = mean_squared_error_forward(&prediction, &target);
    assert!(loss.is_finite());
    assert!((loss / 2.25e38 - 1.0).abs() < 1e-6);
}
