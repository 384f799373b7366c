//! Softmax cross-entropy and weight regularization.
//!
//! The data term is computed from the max-subtracted logits cached by the
//! forward pass, never from the probabilities, so it stays finite even when a
//! probability underflows to zero.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Matrix, Result};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Weight penalty kind.
pub enum Regularization {
    /// `λ · Σ|w|`, gradient `λ · sign(w)`.
    L1,
    /// `λ · ½ Σw²`, gradient `λ · w`.
    #[default]
    L2,
}

impl Regularization {
    /// Penalty contributed by one weight matrix.
    pub fn penalty(self, weights: &Matrix, strength: f64) -> f64 {
        if strength == 0.0 {
            return 0.0;
        }
        let w = weights.as_slice();
        let raw = match self {
            Regularization::L1 => w.iter().map(|v| v.abs()).sum::<f64>(),
            Regularization::L2 => 0.5 * w.iter().map(|v| v * v).sum::<f64>(),
        };
        strength * raw
    }

    /// `grad += ∂penalty/∂w`.
    pub(crate) fn add_gradient(self, grad: &mut Matrix, weights: &Matrix, strength: f64) {
        if strength == 0.0 {
            return;
        }
        debug_assert_eq!(grad.shape(), weights.shape());
        let g = grad.as_mut_slice();
        for (g, &w) in g.iter_mut().zip(weights.as_slice()) {
            *g += match self {
                Regularization::L1 => strength * sign(w),
                Regularization::L2 => strength * w,
            };
        }
    }
}

#[inline]
fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Cross-entropy summed over the batch.
///
/// Per example: `−Σ_k y_k · (logit_k − ln Σ_j exp(logit_j))`. With one-hot
/// labels this is `−(logit_true − logsumexp)`.
///
/// Returns `Error::Shape` unless `logits.shape() == labels.shape()` (classes × batch).
pub fn softmax_cross_entropy(logits: &Matrix, labels: &Matrix) -> Result<f64> {
    if logits.shape() != labels.shape() {
        return Err(Error::Shape(format!(
            "logits shape {:?} does not match labels shape {:?}",
            logits.shape(),
            labels.shape()
        )));
    }

    let (rows, cols) = logits.shape();
    let z = logits.as_slice();
    let y = labels.as_slice();

    let mut total = 0.0_f64;
    for c in 0..cols {
        let mut sum_exp = 0.0_f64;
        for r in 0..rows {
            sum_exp += z[r * cols + c].exp();
        }
        let log_sum_exp = sum_exp.ln();

        for r in 0..rows {
            let t = y[r * cols + c];
            if t != 0.0 {
                total -= t * (z[r * cols + c] - log_sum_exp);
            }
        }
    }
    Ok(total)
}
