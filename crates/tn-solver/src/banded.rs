//! Square banded matrices with LU factorization in band storage.
//!
//! Entry `(i, j)` is stored when `i - lower <= j <= i + upper`. Rows are
//! laid out contiguously with width `lower + upper + 1`, so storage and
//! work are `O(n * width)`.

use crate::error::{SolverError, SolverResult};
use nalgebra::DMatrix;

/// Square matrix whose nonzeros are confined to `lower` sub-diagonals and
/// `upper` super-diagonals.
#[derive(Clone, Debug, PartialEq)]
pub struct BandedMatrix {
    n: usize,
    lower: usize,
    upper: usize,
    data: Vec<f64>,
}

impl BandedMatrix {
    /// Zero matrix of dimension `n` with the given bandwidths.
    pub fn new(n: usize, lower: usize, upper: usize) -> Self {
        Self {
            n,
            lower,
            upper,
            data: vec![0.0; n * (lower + upper + 1)],
        }
    }

    pub fn identity(n: usize, lower: usize, upper: usize) -> Self {
        let mut m = Self::new(n, lower, upper);
        for i in 0..n {
            let p = m.slot(i, i);
            m.data[p] = 1.0;
        }
        m
    }

    pub fn dim(&self) -> usize {
        self.n
    }

    pub fn lower(&self) -> usize {
        self.lower
    }

    pub fn upper(&self) -> usize {
        self.upper
    }

    fn width(&self) -> usize {
        self.lower + self.upper + 1
    }

    fn in_band(&self, row: usize, col: usize) -> bool {
        row < self.n && col < self.n && col + self.lower >= row && col <= row + self.upper
    }

    // Caller guarantees `in_band(row, col)`.
    #[inline]
    fn slot(&self, row: usize, col: usize) -> usize {
        row * self.width() + (col + self.lower - row)
    }

    /// Entry `(row, col)`; zero outside the band.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        if self.in_band(row, col) {
            self.data[self.slot(row, col)]
        } else {
            0.0
        }
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) -> SolverResult<()> {
        if !self.in_band(row, col) {
            return Err(SolverError::OutsideBand { row, col });
        }
        let p = self.slot(row, col);
        self.data[p] = value;
        Ok(())
    }

    /// Largest absolute entry in the band.
    pub fn max_abs(&self) -> f64 {
        self.data.iter().fold(0.0, |acc, v| acc.max(v.abs()))
    }

    #[inline]
    fn col_range(&self, row: usize) -> std::ops::Range<usize> {
        row.saturating_sub(self.lower)..(row + self.upper + 1).min(self.n)
    }

    fn check_len(&self, x: &[f64], what: &'static str) -> SolverResult<()> {
        if x.len() != self.n {
            return Err(SolverError::DimensionMismatch {
                what,
                expected: self.n,
                actual: x.len(),
            });
        }
        Ok(())
    }

    /// Matrix-vector product `A x`, touching band entries only.
    pub fn apply(&self, x: &[f64]) -> SolverResult<Vec<f64>> {
        self.check_len(x, "banded apply input")?;
        let mut y = vec![0.0; self.n];
        for (i, yi) in y.iter_mut().enumerate() {
            *yi = self
                .col_range(i)
                .map(|j| self.data[self.slot(i, j)] * x[j])
                .sum();
        }
        Ok(y)
    }

    /// Transposed product `A^T x`.
    pub fn apply_transpose(&self, x: &[f64]) -> SolverResult<Vec<f64>> {
        self.check_len(x, "banded transpose input")?;
        let mut y = vec![0.0; self.n];
        for (i, &xi) in x.iter().enumerate() {
            if xi == 0.0 {
                continue;
            }
            for j in self.col_range(i) {
                y[j] += self.data[self.slot(i, j)] * xi;
            }
        }
        Ok(y)
    }

    pub fn to_dense(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.n, self.n, |i, j| self.get(i, j))
    }
}

/// LU factors of a [`BandedMatrix`] computed without pivoting.
///
/// The unit lower factor and the upper factor share the input band and
/// are packed into one matrix. Immutable once built.
#[derive(Clone, Debug)]
pub struct BandedLu {
    factors: BandedMatrix,
}

/// Factorize `a` in band storage.
///
/// A pivot that is non-finite or no larger than `eps * max|a_ij|` is
/// reported as [`SolverError::Singular`].
pub fn factorize(a: &BandedMatrix) -> SolverResult<BandedLu> {
    let mut f = a.clone();
    let n = f.n;
    let threshold = f64::EPSILON * f.max_abs();

    for k in 0..n {
        let pivot = f.data[f.slot(k, k)];
        if !pivot.is_finite() || pivot.abs() <= threshold {
            return Err(SolverError::Singular { row: k, pivot });
        }

        let row_end = (k + f.lower + 1).min(n);
        let col_end = (k + f.upper + 1).min(n);
        for i in k + 1..row_end {
            let p = f.slot(i, k);
            let l = f.data[p] / pivot;
            f.data[p] = l;
            if l == 0.0 {
                continue;
            }
            for j in k + 1..col_end {
                let src = f.data[f.slot(k, j)];
                let dst = f.slot(i, j);
                f.data[dst] -= l * src;
            }
        }
    }

    Ok(BandedLu { factors: f })
}

impl BandedLu {
    /// Solve `A x = rhs` by forward then backward substitution.
    pub fn solve(&self, rhs: &[f64]) -> SolverResult<Vec<f64>> {
        let f = &self.factors;
        f.check_len(rhs, "banded solve rhs")?;
        let n = f.n;
        let mut x = rhs.to_vec();

        // L y = b, unit diagonal
        for i in 0..n {
            let start = i.saturating_sub(f.lower);
            let mut acc = x[i];
            for j in start..i {
                acc -= f.data[f.slot(i, j)] * x[j];
            }
            x[i] = acc;
        }

        // U x = y
        for i in (0..n).rev() {
            let end = (i + f.upper + 1).min(n);
            let mut acc = x[i];
            for j in i + 1..end {
                acc -= f.data[f.slot(i, j)] * x[j];
            }
            x[i] = acc / f.data[f.slot(i, i)];
        }

        Ok(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tridiag(n: usize, sub: f64, diag: f64, sup: f64) -> BandedMatrix {
        let mut m = BandedMatrix::new(n, 1, 1);
        for i in 0..n {
            m.set(i, i, diag).unwrap();
            if i > 0 {
                m.set(i, i - 1, sub).unwrap();
            }
            if i + 1 < n {
                m.set(i, i + 1, sup).unwrap();
            }
        }
        m
    }

    #[test]
    fn identity_solve_returns_rhs() {
        let lu = factorize(&BandedMatrix::identity(5, 2, 0)).unwrap();
        let b = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(lu.solve(&b).unwrap(), b);
    }

    #[test]
    fn laplacian_solve_satisfies_system() {
        let a = tridiag(6, -1.0, 2.0, -1.0);
        let b = vec![1.0, 0.0, 0.0, 0.0, 0.0, 1.0];
        let x = factorize(&a).unwrap().solve(&b).unwrap();
        let ax = a.apply(&x).unwrap();
        for i in 0..6 {
            assert!((ax[i] - b[i]).abs() < 1e-12, "row {i}: {} vs {}", ax[i], b[i]);
            // exact solution is all ones
            assert!((x[i] - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn lower_triangular_band_with_gap() {
        // pattern used by the tank operators: diagonal, -1 and -cols
        let n = 6;
        let cols = 3;
        let mut a = BandedMatrix::new(n, cols, 0);
        for i in 0..n {
            a.set(i, i, 2.0).unwrap();
            if i % cols != 0 {
                a.set(i, i - 1, -0.5).unwrap();
            }
            if i >= cols {
                a.set(i, i - cols, -0.25).unwrap();
            }
        }
        let x_true: Vec<f64> = (0..n).map(|i| 1.0 + i as f64).collect();
        let b = a.apply(&x_true).unwrap();
        let x = factorize(&a).unwrap().solve(&b).unwrap();
        for i in 0..n {
            assert!((x[i] - x_true[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn zero_pivot_is_singular() {
        let mut a = BandedMatrix::identity(3, 1, 1);
        a.set(1, 1, 0.0).unwrap();
        let err = factorize(&a).unwrap_err();
        assert_eq!(err, SolverError::Singular { row: 1, pivot: 0.0 });
    }

    #[test]
    fn write_outside_band_rejected() {
        let mut a = BandedMatrix::new(4, 1, 0);
        assert_eq!(
            a.set(0, 1, 1.0),
            Err(SolverError::OutsideBand { row: 0, col: 1 })
        );
        assert_eq!(
            a.set(3, 1, 1.0),
            Err(SolverError::OutsideBand { row: 3, col: 1 })
        );
        assert_eq!(a.get(0, 3), 0.0);
    }

    #[test]
    fn wrong_rhs_length_rejected() {
        let lu = factorize(&BandedMatrix::identity(3, 0, 0)).unwrap();
        assert!(matches!(
            lu.solve(&[1.0, 2.0]),
            Err(SolverError::DimensionMismatch {
                expected: 3,
                actual: 2,
                ..
            })
        ));
    }

    #[test]
    fn transpose_matches_dense() {
        let a = tridiag(4, -1.0, 3.0, 0.5);
        let x = vec![1.0, -2.0, 0.5, 4.0];
        let y = a.apply_transpose(&x).unwrap();
        let dense = a.to_dense().transpose() * nalgebra::DVector::from_vec(x);
        for i in 0..4 {
            assert!((y[i] - dense[i]).abs() < 1e-14);
        }
    }

    #[test]
    fn dense_copy_keeps_band_and_zeros_outside() {
        let a = tridiag(4, -1.0, 3.0, 0.5);
        let dense = a.to_dense();
        for i in 0..4 {
            for j in 0..4 {
                assert_eq!(dense[(i, j)], a.get(i, j));
            }
        }
        assert_eq!(dense[(0, 3)], 0.0);
        assert_eq!((a.dim(), a.lower(), a.upper()), (4, 1, 1));
    }
}
