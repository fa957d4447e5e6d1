/// Asserts that a numerical value is in the provided interval `[a,b]` and panics
/// with a helpful message if not
///
/// ### Example
/// ```should_panic
/// # use maze_rl::assert_interval;
/// let alpha = 2.0;
/// assert_interval!(alpha, 0.0, 1.0);
/// ```
/// This will panic with the message "Invalid value for \`alpha\`. Must be in the interval \[0, 1\]."
#[macro_export]
macro_rules! assert_interval {
    ($var:expr, $a:expr, $b:expr) => {
        assert!(
            $var >= $a && $var <= $b,
            "Invalid value for `{}`. Must be in the interval [{}, {}].",
            stringify!($var),
            $a,
            $b,
        );
    };
}

/// Arithmetic mean, `0.0` for an empty slice
pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
