/// Acceleration due to gravity in m/s^2.
pub const GRAVITY: f64 = 9.8;

/// Depth in meters reached by a body in free fall after `t` seconds.
///
/// Callers only pass non-negative elapsed times.
pub fn depth(t: f64) -> f64 {
    GRAVITY * t * t / 2.0
}

/// Sample the depth curve at fixed time steps from `0` up to and including `until`.
///
/// Used for the explanatory chart; goes through [`depth`] so the chart and the
/// live readout always agree.
pub fn curve(step: f64, until: f64) -> Vec<(f64, f64)> {
    if step.is_nan() || step <= 0.0 || until < 0.0 {
        return Vec::new();
    }
    let steps = (until / step).floor() as usize;
    (0..=steps)
        .map(|i| {
            let t = i as f64 * step;
            (t, depth(t))
        })
        .collect()
}
