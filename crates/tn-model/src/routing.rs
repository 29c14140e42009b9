//! Outflow routing between neighbouring tanks.
//!
//! Each tank sends half of its passed-through outflow to the tank below and
//! half to the tank on its right. Seen from the receiving tank, inflow comes
//! from the tank above and the tank to the left, so the routing operator is
//! strictly lower triangular in row-major order.

use tn_core::GridShape;

#[derive(Clone, Debug, PartialEq)]
pub struct Routing {
    shape: GridShape,
    passthrough: Vec<f64>,
}

impl Routing {
    /// Caller guarantees `passthrough.len() == shape.tanks()`.
    pub fn new(shape: GridShape, passthrough: Vec<f64>) -> Self {
        debug_assert_eq!(passthrough.len(), shape.tanks());
        Self { shape, passthrough }
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn passthrough(&self) -> &[f64] {
        &self.passthrough
    }

    /// Weight with which tank `k` feeds each of its downstream neighbours.
    #[inline]
    pub fn weight(&self, k: usize) -> f64 {
        0.5 * self.passthrough[k]
    }

    /// Row `k` of `S x`. Reads only entries before `k`.
    #[inline]
    pub fn inflow_at(&self, k: usize, x: &[f64]) -> f64 {
        let mut acc = 0.0;
        if let Some(up) = self.shape.up(k) {
            acc += self.weight(up) * x[up];
        }
        if let Some(left) = self.shape.left(k) {
            acc += self.weight(left) * x[left];
        }
        acc
    }

    /// `out = S x`: routed inflow produced by outflows `x`.
    pub fn apply(&self, x: &[f64], out: &mut [f64]) {
        for (k, o) in out.iter_mut().enumerate() {
            *o = self.inflow_at(k, x);
        }
    }

    /// `out = S^T x`.
    pub fn apply_transpose(&self, x: &[f64], out: &mut [f64]) {
        let n = self.shape.tanks();
        let cols = self.shape.cols();
        for (j, o) in out.iter_mut().enumerate() {
            let mut acc = 0.0;
            if j + cols < n {
                acc += x[j + cols];
            }
            if (j + 1) % cols != 0 {
                acc += x[j + 1];
            }
            *o = self.weight(j) * acc;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tn_core::numeric::dot;

    #[test]
    fn first_tank_has_no_predecessor() {
        let shape = GridShape::new(2, 2).unwrap();
        let r = Routing::new(shape, vec![1.0; 4]);
        let mut out = vec![0.0; 4];
        r.apply(&[2.0, 4.0, 6.0, 8.0], &mut out);
        assert_eq!(out, vec![0.0, 1.0, 1.0, 2.0 + 3.0]);
    }

    #[test]
    fn inflow_ignores_later_tanks() {
        let shape = GridShape::new(2, 3).unwrap();
        let r = Routing::new(shape, vec![1.0; 6]);
        let mut x = vec![2.0, 4.0, 6.0, 8.0, 10.0, 12.0];
        let before = r.inflow_at(4, &x);
        x[4] = -1.0;
        x[5] = 99.0;
        assert_eq!(r.inflow_at(4, &x), before);
        assert_eq!(before, 0.5 * 4.0 + 0.5 * 8.0);
    }

    #[test]
    fn closed_tank_routes_nothing() {
        let shape = GridShape::new(1, 3).unwrap();
        let r = Routing::new(shape, vec![1.0, 0.0, 1.0]);
        let mut out = vec![0.0; 3];
        r.apply(&[2.0, 2.0, 2.0], &mut out);
        assert_eq!(out, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn transpose_is_adjoint() {
        let shape = GridShape::new(3, 4).unwrap();
        let p: Vec<f64> = (0..12).map(|k| 0.1 * (k % 7) as f64).collect();
        let r = Routing::new(shape, p);
        let x: Vec<f64> = (0..12).map(|k| (k as f64).sin()).collect();
        let y: Vec<f64> = (0..12).map(|k| (k as f64 * 0.7).cos()).collect();
        let mut sx = vec![0.0; 12];
        let mut sty = vec![0.0; 12];
        r.apply(&x, &mut sx);
        r.apply_transpose(&y, &mut sty);
        assert!((dot(&sx, &y) - dot(&x, &sty)).abs() < 1e-13);
    }
}
