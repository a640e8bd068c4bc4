//! Utility functions shared by kernels, constructors and reduction strategies

pub use self::distance::{manhattan_distance, sign, squared_distance, squared_norms};
pub use self::selection::{argmax, argmin};

/// Distance helpers over dense rows
pub mod distance {
    use ndarray::{Array1, ArrayView1, ArrayView2, Axis};

    /// Squared Euclidean distance ‖x - y‖²
    pub fn squared_distance(x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> f64 {
        x.iter().zip(y.iter()).map(|(a, b)| (a - b) * (a - b)).sum()
    }

    /// Manhattan distance ‖x - y‖₁
    pub fn manhattan_distance(x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> f64 {
        x.iter().zip(y.iter()).map(|(a, b)| (a - b).abs()).sum()
    }

    /// Squared Euclidean norm of every row
    pub fn squared_norms(x: ArrayView2<'_, f64>) -> Array1<f64> {
        x.map_axis(Axis(1), |row| row.dot(&row))
    }

    /// Sign of `v`, with sign(0) = 0
    pub fn sign(v: f64) -> f64 {
        if v > 0.0 {
            1.0
        } else if v < 0.0 {
            -1.0
        } else {
            0.0
        }
    }
}

/// Index selection over score vectors
///
/// Ties go to the lowest index and NaN entries are never selected, so greedy
/// loops built on these are deterministic for a given input.
pub mod selection {
    use ndarray::ArrayView1;

    /// Index of the first maximum, or `None` if every entry is NaN
    pub fn argmax(values: ArrayView1<'_, f64>) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &v) in values.iter().enumerate() {
            if v.is_nan() {
                continue;
            }
            match best {
                Some((_, b)) if v <= b => {}
                _ => best = Some((i, v)),
            }
        }
        best.map(|(i, _)| i)
    }

    /// Index of the first minimum, or `None` if every entry is NaN
    pub fn argmin(values: ArrayView1<'_, f64>) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &v) in values.iter().enumerate() {
            if v.is_nan() {
                continue;
            }
            match best {
                Some((_, b)) if v >= b => {}
                _ => best = Some((i, v)),
            }
        }
        best.map(|(i, _)| i)
    }
}

/// Partitioning helpers for divide-and-conquer reduction
pub mod partition {
    use std::ops::Range;

    /// Split `0..n` into contiguous ranges of exactly `max_len`, with a
    /// shorter remainder last. Returns no ranges for n = 0.
    ///
    /// # Panics
    /// Panics if `max_len` is zero
    pub fn leaf_ranges(n: usize, max_len: usize) -> Vec<Range<usize>> {
        assert!(max_len > 0, "Partition length must be positive");
        (0..n)
            .step_by(max_len)
            .map(|start| start..(start + max_len).min(n))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::partition::leaf_ranges;
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_distances() {
        let x = array![1.0, 2.0, 3.0];
        let y = array![0.0, 4.0, 3.0];
        assert_abs_diff_eq!(squared_distance(x.view(), y.view()), 5.0);
        assert_abs_diff_eq!(manhattan_distance(x.view(), y.view()), 3.0);

        let norms = squared_norms(array![[1.0, 2.0], [3.0, 0.0]].view());
        assert_eq!(norms, array![5.0, 9.0]);
    }

    #[test]
    fn test_sign() {
        assert_eq!(sign(2.5), 1.0);
        assert_eq!(sign(-0.1), -1.0);
        assert_eq!(sign(0.0), 0.0);
    }

    #[test]
    fn test_argmax_first_occurrence() {
        assert_eq!(argmax(array![0.6, 0.75, 0.55].view()), Some(1));
        assert_eq!(argmax(array![1.0, 3.0, 3.0].view()), Some(1));
        assert_eq!(argmax(array![f64::NAN, -1.0, f64::NEG_INFINITY].view()), Some(1));
        assert_eq!(argmax(array![f64::NAN].view()), None);
        assert_eq!(argmax(ndarray::Array1::<f64>::zeros(0).view()), None);
    }

    #[test]
    fn test_argmin_first_occurrence() {
        assert_eq!(argmin(array![2.0, 0.5, 0.5].view()), Some(1));
        assert_eq!(argmin(array![f64::INFINITY, 4.0, f64::NAN].view()), Some(1));
    }

    #[test]
    fn test_leaf_ranges() {
        assert_eq!(leaf_ranges(10, 4), vec![0..4, 4..8, 8..10]);
        assert_eq!(leaf_ranges(3, 10), vec![0..3]);
        assert_eq!(leaf_ranges(16, 8), vec![0..8, 8..16]);
        assert!(leaf_ranges(0, 5).is_empty());

        for (n, max_len) in [(17, 5), (100, 7), (8, 8), (9, 8)] {
            let ranges = leaf_ranges(n, max_len);
            assert_eq!(ranges.iter().map(|r| r.len()).sum::<usize>(), n);
            assert_eq!(ranges[0].len(), max_len.min(n));
            assert!(ranges.iter().all(|r| r.len() <= max_len && !r.is_empty()));
        }
    }
}
