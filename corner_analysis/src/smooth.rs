/// Default number of samples averaged by the smoother.
pub const DEFAULT_WINDOW: usize = 9;

/// Widest window accepted by configuration validation.
pub const MAX_WINDOW: usize = 1_001;

/// Symmetric moving average that preserves the input length.
///
/// Both ends are padded with `window / 2` copies of the edge value. Inputs
/// of two samples or fewer, and windows of one or less, are returned
/// unchanged.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    if window <= 1 || values.len() <= 2 {
        return values.to_vec();
    }

    let half = window / 2;
    let (first, last) = (values[0], values[values.len() - 1]);
    let mut extended = Vec::with_capacity(values.len() + 2 * half);
    extended.extend(std::iter::repeat(first).take(half));
    extended.extend_from_slice(values);
    extended.extend(std::iter::repeat(last).take(half));

    extended
        .windows(window)
        .take(values.len())
        .map(|w| w.iter().sum::<f64>() / w.len() as f64)
        .collect()
}
