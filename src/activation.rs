//! Activation functions.
//!
//! A layer computes a pre-activation `z = Wᵀ · [1; x]` and then applies its
//! activation. Hidden activations act element-wise; softmax acts per column
//! (per example) and is only legal on the output layer.
//!
//! The forward pass caches `z` for every layer, so derivatives here are
//! expressed in terms of the pre-activation rather than the output.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Matrix};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Nonlinearity applied after a layer's affine transform.
pub enum Activation {
    Identity,
    ReLU,
    Tanh,
    /// Column-wise softmax. Output layer only.
    Softmax,
}

impl Activation {
    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            Activation::Identity => "identity",
            Activation::ReLU => "relu",
            Activation::Tanh => "tanh",
            Activation::Softmax => "softmax",
        }
    }

    #[inline]
    pub(crate) fn forward(self, z: f64) -> f64 {
        match self {
            Activation::Tanh => z.tanh(),
            Activation::ReLU => z.max(0.0),
            Activation::Identity | Activation::Softmax => z,
        }
    }

    /// Derivative of an element-wise activation at pre-activation `z`.
    ///
    /// Softmax never reaches this: its Jacobian is folded into the
    /// cross-entropy output delta.
    #[inline]
    pub(crate) fn grad_from_pre_activation(self, z: f64) -> f64 {
        match self {
            Activation::Tanh => {
                let t = z.tanh();
                1.0 - t * t
            }
            Activation::ReLU => {
                if z > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Identity | Activation::Softmax => 1.0,
        }
    }

    /// Apply an element-wise activation to a whole matrix.
    pub(crate) fn apply(self, z: &Matrix) -> Matrix {
        debug_assert_ne!(self, Activation::Softmax);
        z.map(|v| self.forward(v))
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Activation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "identity" | "linear" => Ok(Activation::Identity),
            "relu" => Ok(Activation::ReLU),
            "tanh" => Ok(Activation::Tanh),
            "softmax" => Ok(Activation::Softmax),
            other => Err(Error::Config(format!("unknown activation kind '{other}'"))),
        }
    }
}

/// Column-wise softmax.
///
/// Returns `(probabilities, logits)` where `logits` are the max-subtracted
/// pre-normalization values. Subtracting the column max keeps every exponent
/// `<= 0`, so the sum is at least 1 and nothing overflows.
pub(crate) fn softmax_columns(z: &Matrix) -> (Matrix, Matrix) {
    let (rows, cols) = z.shape();
    let mut logits = z.clone();
    let mut probs = Matrix::zeros(rows, cols);

    let zl = logits.as_mut_slice();
    let p = probs.as_mut_slice();
    for c in 0..cols {
        let mut max_z = f64::NEG_INFINITY;
        for r in 0..rows {
            max_z = max_z.max(zl[r * cols + c]);
        }

        let mut sum_exp = 0.0_f64;
        for r in 0..rows {
            let idx = r * cols + c;
            zl[idx] -= max_z;
            let e = zl[idx].exp();
            p[idx] = e;
            sum_exp += e;
        }

        let inv_sum = 1.0 / sum_exp;
        for r in 0..rows {
            p[r * cols + c] *= inv_sum;
        }
    }

    (probs, logits)
}
