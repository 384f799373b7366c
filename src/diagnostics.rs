//! Weight-matrix diagnostics. Purely observational.

use crate::Matrix;
use crate::matmul;

const POWER_ITERS: usize = 1000;
const POWER_TOL: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerDiagnostics {
    pub layer: usize,
    pub frobenius_norm: f64,
    /// Largest eigenvalue of `W·Wᵀ` (the squared spectral norm of `W`).
    pub max_eigenvalue: f64,
}

pub fn weight_diagnostics(weights: &[Matrix]) -> Vec<LayerDiagnostics> {
    weights
        .iter()
        .enumerate()
        .map(|(layer, w)| LayerDiagnostics {
            layer,
            frobenius_norm: w.frobenius_norm(),
            max_eigenvalue: max_eigenvalue_wwt(w),
        })
        .collect()
}

/// Largest eigenvalue of `W·Wᵀ`.
///
/// `W·Wᵀ` and `Wᵀ·W` share their nonzero spectrum, so power iteration runs on
/// whichever Gram matrix is smaller.
pub fn max_eigenvalue_wwt(w: &Matrix) -> f64 {
    let gram = if w.rows() <= w.cols() {
        matmul::mul(w.view(), false, w.view(), true)
    } else {
        matmul::mul(w.view(), true, w.view(), false)
    };
    power_iteration(&gram)
}

/// Dominant eigenvalue of a symmetric positive semi-definite matrix.
fn power_iteration(g: &Matrix) -> f64 {
    let n = g.rows();
    let a = g.as_slice();

    // Non-uniform start so it is unlikely to be orthogonal to the top eigenvector.
    let mut v: Vec<f64> = (0..n).map(|i| 1.0 + i as f64 / n as f64).collect();
    normalize(&mut v);
    let mut gv = vec![0.0; n];
    let mut lambda = 0.0_f64;

    for _ in 0..POWER_ITERS {
        for (r, out) in gv.iter_mut().enumerate() {
            let row = &a[r * n..(r + 1) * n];
            *out = row.iter().zip(&v).map(|(x, y)| x * y).sum();
        }

        let rayleigh: f64 = v.iter().zip(&gv).map(|(x, y)| x * y).sum();
        let norm = gv.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm == 0.0 {
            return 0.0;
        }

        let converged = (rayleigh - lambda).abs() <= POWER_TOL * rayleigh.abs();
        lambda = rayleigh;
        if converged {
            break;
        }
        for (vi, &gi) in v.iter_mut().zip(&gv) {
            *vi = gi / norm;
        }
    }
    lambda
}

fn normalize(v: &mut [f64]) {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        for x in v {
            *x /= norm;
        }
    }
}
