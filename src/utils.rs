//! Small numeric helpers: majority-class resolution for leaves and the
//! conversion of tree thresholds into integer match bounds.

/// Determines the majority class from a leaf's per-class sample counts.
///
/// Finds the class index with the largest count. Ties are broken by choosing
/// the class with the lower index (first maximum wins), mirroring
/// scikit-learn's `argmax` over `tree_.value`.
///
/// # Arguments
/// * `counts` - A slice where `counts[i]` is the number of samples of class `i`.
///
/// # Returns
/// The index of the majority class. Returns 0 if the slice is empty.
pub fn get_majority_class(counts: &[f64]) -> usize {
    let mut max_count = f64::NEG_INFINITY;
    let mut winning_index = 0;

    for (index, &count) in counts.iter().enumerate() {
        // Strictly greater: an equal count never displaces an earlier class.
        if count > max_count {
            max_count = count;
            winning_index = index;
        }
    }
    winning_index
}

/// Integer part of a threshold, rounded towards negative infinity.
///
/// Saturates at the `i64` limits, which every configured domain lies within.
#[inline]
pub fn floor_threshold(threshold: f64) -> i64 {
    // `as` saturates for out-of-range floats.
    threshold.floor() as i64
}

/// Fraction of `(predicted, expected)` pairs that agree. Returns 0.0 when empty.
pub fn accuracy(pairs: &[(i64, i64)]) -> f64 {
    if pairs.is_empty() {
        return 0.0;
    }
    let correct = pairs.iter().filter(|(p, e)| p == e).count();
    correct as f64 / pairs.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_majority() {
        assert_eq!(get_majority_class(&[1.0, 5.0, 2.0]), 1);
        // Tie-breaking check: index 0 and index 2 both have 5. Lower index wins.
        assert_eq!(get_majority_class(&[5.0, 1.0, 5.0]), 0);
        assert_eq!(get_majority_class(&[1.0, 1.0, 1.0]), 0);
        assert_eq!(get_majority_class(&[]), 0);
        assert_eq!(get_majority_class(&[0.0, 0.0, 1.0]), 2);
        assert_eq!(get_majority_class(&[3.0, 9.0, 9.0]), 1); // Tie, index 1 wins over 2
        assert_eq!(get_majority_class(&[5.0, 2.0]), 0);
    }

    #[test]
    fn test_get_majority_fractional_counts() {
        // sklearn may store weighted fractions instead of raw counts.
        assert_eq!(get_majority_class(&[0.25, 0.75]), 1);
        assert_eq!(get_majority_class(&[0.5, 0.5]), 0);
    }

    #[test]
    fn test_floor_threshold() {
        assert_eq!(floor_threshold(40.0), 40);
        assert_eq!(floor_threshold(40.5), 40);
        assert_eq!(floor_threshold(40.999), 40);
        assert_eq!(floor_threshold(-0.5), -1);
        assert_eq!(floor_threshold(f64::INFINITY), i64::MAX);
    }

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&[]), 0.0);
        assert_eq!(accuracy(&[(1, 1), (0, 1), (2, 2), (3, 0)]), 0.5);
        assert_eq!(accuracy(&[(4, 4)]), 1.0);
    }
}
