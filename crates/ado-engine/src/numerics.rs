//! Stable log-space arithmetic, entropies and grid-index helpers.

use nalgebra::{DMatrix, DVector};

/// `x · ln x` with the convention `0 · ln 0 = 0`.
pub fn xlogx(x: f64) -> f64 {
    if x > 0.0 {
        x * x.ln()
    } else {
        0.0
    }
}

/// Shannon entropy (nats) of a discrete distribution.
pub fn entropy(probs: &[f64]) -> f64 {
    -probs.iter().copied().map(xlogx).sum::<f64>()
}

/// `ln Σ exp(v_i)` computed by shifting with the maximum.
///
/// Returns `-inf` when every entry is `-inf` or the slice is empty.
pub fn logsumexp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    let sum: f64 = values.iter().map(|&v| (v - max).exp()).sum();
    max + sum.ln()
}

/// Normalizes log weights into probabilities (softmax).
///
/// Only `v - max(v)` is ever exponentiated, so arbitrarily large or small log
/// weights are safe. Returns `None` when no entry carries finite mass.
pub fn softmax(log_weights: &DVector<f64>) -> Option<DVector<f64>> {
    let max = log_weights.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return None;
    }
    let shifted = log_weights.map(|v| (v - max).exp());
    let total = shifted.sum();
    Some(shifted / total)
}

/// Inverse participation ratio `1 / Σ p_i²`.
pub fn effective_sample_size(probs: &DVector<f64>) -> f64 {
    let sq = probs.iter().map(|p| p * p).sum::<f64>();
    if sq > 0.0 {
        1.0 / sq
    } else {
        0.0
    }
}

/// Index of the largest entry; ties resolve to the lowest index.
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &value) in values.iter().enumerate() {
        match best {
            Some((_, current)) if value <= current => {}
            _ if value.is_nan() => {}
            _ => best = Some((idx, value)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Row of `rows` closest to `point` in Euclidean distance (lowest index on ties).
pub fn nearest_row(rows: &DMatrix<f64>, point: &[f64]) -> Option<usize> {
    if rows.nrows() == 0 || rows.ncols() != point.len() {
        return None;
    }
    let mut best = (0usize, f64::INFINITY);
    for (idx, row) in rows.row_iter().enumerate() {
        let dist: f64 = row
            .iter()
            .zip(point.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        if dist < best.1 {
            best = (idx, dist);
        }
    }
    Some(best.0)
}

/// Row-major strides for a Cartesian product whose first axis varies slowest.
pub fn strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; shape.len()];
    for axis in (0..shape.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * shape[axis + 1];
    }
    strides
}

/// Splits a flat product index into per-axis positions.
pub fn unravel(index: usize, shape: &[usize]) -> Vec<usize> {
    strides(shape)
        .iter()
        .zip(shape.iter())
        .map(|(&stride, &len)| (index / stride) % len.max(1))
        .collect()
}

/// Combines per-axis positions into a flat product index.
pub fn ravel(positions: &[usize], shape: &[usize]) -> usize {
    positions
        .iter()
        .zip(strides(shape))
        .map(|(&pos, stride)| pos * stride)
        .sum()
}

/// Cartesian product of `axes`, first axis slowest, as a `Π len × k` matrix.
pub fn cartesian_product(axes: &[&[f64]]) -> DMatrix<f64> {
    let shape: Vec<usize> = axes.iter().map(|axis| axis.len()).collect();
    let rows: usize = shape.iter().product();
    let mut out = DMatrix::zeros(rows, axes.len());
    for row in 0..rows {
        for (col, pos) in unravel(row, &shape).into_iter().enumerate() {
            out[(row, col)] = axes[col][pos];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logsumexp_is_shift_stable() {
        let big = [1000.0, 1000.0];
        assert!((logsumexp(&big) - (1000.0 + 2f64.ln())).abs() < 1e-12);
        assert_eq!(logsumexp(&[f64::NEG_INFINITY; 3]), f64::NEG_INFINITY);
        assert!((logsumexp(&[0.0, f64::NEG_INFINITY]) - 0.0).abs() < 1e-15);
    }

    #[test]
    fn softmax_handles_neg_infinity() {
        let weights = DVector::from_vec(vec![0.0, f64::NEG_INFINITY, 0.0]);
        let probs = softmax(&weights).unwrap();
        assert_eq!(probs[1], 0.0);
        assert!((probs[0] - 0.5).abs() < 1e-15);
        assert!(softmax(&DVector::from_element(2, f64::NEG_INFINITY)).is_none());
    }

    #[test]
    fn entropy_uses_zero_log_zero() {
        assert_eq!(entropy(&[1.0, 0.0]), 0.0);
        assert!((entropy(&[0.5, 0.5]) - 2f64.ln()).abs() < 1e-15);
    }

    #[test]
    fn argmax_prefers_lowest_index() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0]), Some(1));
        assert_eq!(argmax(&[f64::NAN, 0.5]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn product_order_and_index_helpers_agree() {
        let a = [1.0, 2.0];
        let b = [10.0, 20.0, 30.0];
        let grid = cartesian_product(&[&a, &b]);
        assert_eq!(grid.nrows(), 6);
        assert_eq!(grid.row(0).iter().copied().collect::<Vec<_>>(), vec![1.0, 10.0]);
        assert_eq!(grid.row(1).iter().copied().collect::<Vec<_>>(), vec![1.0, 20.0]);
        assert_eq!(grid.row(3).iter().copied().collect::<Vec<_>>(), vec![2.0, 10.0]);
        let shape = [2, 3];
        for idx in 0..6 {
            assert_eq!(ravel(&unravel(idx, &shape), &shape), idx);
        }
    }

    #[test]
    fn nearest_row_matches_offgrid_points() {
        let grid = cartesian_product(&[&[-1.0, 0.0, 1.0]]);
        assert_eq!(nearest_row(&grid, &[0.4]), Some(1));
        assert_eq!(nearest_row(&grid, &[0.5]), Some(1));
        assert_eq!(nearest_row(&grid, &[7.0]), Some(2));
        assert_eq!(nearest_row(&grid, &[0.0, 1.0]), None);
    }
}
