//! Length-scale heuristics

use crate::utils::squared_distance;
use ndarray::{ArrayView2, Axis};
use rand::Rng;

/// Median Euclidean distance over all pairs of distinct rows (i < j)
///
/// Returns 0.0 for fewer than two rows and when at least half the pairs
/// coincide. Callers must substitute a positive fallback in that case, since
/// kernels reject a zero length scale.
pub fn median_heuristic(x: ArrayView2<'_, f64>) -> f64 {
    let n = x.nrows();
    if n < 2 {
        return 0.0;
    }

    let mut distances = Vec::with_capacity(n * (n - 1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            distances.push(squared_distance(x.row(i), x.row(j)).sqrt());
        }
    }
    median(&mut distances)
}

/// Median heuristic over a uniform sample of at most `max_samples` rows,
/// drawn without replacement, so the cost stays O(max_samples²)
pub fn median_heuristic_sampled<R: Rng + ?Sized>(
    x: ArrayView2<'_, f64>,
    max_samples: usize,
    rng: &mut R,
) -> f64 {
    if x.nrows() <= max_samples {
        return median_heuristic(x);
    }
    let mut indices = rand::seq::index::sample(rng, x.nrows(), max_samples).into_vec();
    indices.sort_unstable();
    median_heuristic(x.select(Axis(0), &indices).view())
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        0.5 * (values[mid - 1] + values[mid])
    } else {
        values[mid]
    }
}
