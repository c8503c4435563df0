/// Asserts that a numerical value is in the provided interval `[a,b]` and panics
/// with a helpful message if not
///
/// ### Example
/// ```
/// # use rl_tabular::assert_interval;
/// let gamma = 0.9;
/// assert_interval!(gamma, 0.0, 1.0);
/// ```
/// An out of range value panics with the message "Invalid value for \`gamma\`. Must be in the interval \[0, 1\]."
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

/// Index of the largest value, ties going to the lowest index
///
/// Returns `None` for an empty slice.
pub(crate) fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }

    best.map(|(i, _)| i)
}
