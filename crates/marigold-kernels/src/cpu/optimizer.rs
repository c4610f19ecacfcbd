//! Adam parameter update.

use marigold_common::{OptimizerConfig, warn_once};

/// One Adam step over a parameter tensor and its moment buffers.
///
/// `t` is the 1-indexed step count. `m` and `v` are updated in place and
/// must persist between calls. `weight_decay` and `schedule_multiplier` in
/// `config` are reserved: they are accepted but not applied, and a non-inert
/// value is reported once through `warn_once!`.
pub fn adam_update(
    gradients: &[f32],
    parameters: &mut [f32],
    m: &mut [f32],
    v: &mut [f32],
    config: &OptimizerConfig,
    t: u32,
) {
    debug_assert!(t >= 1, "step count is 1-indexed");
    debug_assert_eq!(gradients.len(), parameters.len());
    debug_assert!(m.len() == parameters.len() && v.len() == parameters.len());

    if config.uses_reserved_parameters() {
        warn_once!(
            "adam.reserved_parameters",
            "weight_decay={} and schedule_multiplier={} are not applied by adam_update",
            config.weight_decay,
            config.schedule_multiplier
        );
    }

    let OptimizerConfig { learning_rate, beta1, beta2, epsilon, .. } = *config;
    let step = i32::try_from(t).unwrap_or(i32::MAX);
    let correction1 = 1.0 - beta1.powi(step);
    let correction2 = 1.0 - beta2.powi(step);

    for (((p, &g), m), v) in parameters.iter_mut().zip(gradients).zip(m.iter_mut()).zip(v.iter_mut()) {
        *m = beta1 * *m + (1.0 - beta1) * g;
        *v = beta2 * *v + (1.0 - beta2) * g * g;
        let m_hat = *m / correction1;
        let v_hat = *v / correction2;
        *p -= learning_rate * m_hat / (v_hat.sqrt() + epsilon);
    }
}
