//! Network configuration record.
//!
//! A `NetworkConfig` carries everything needed to build a `Network`: the
//! architecture (widths, activations, dropout keep-probabilities), the
//! optimizer and its hyperparameters, regularization, and the epoch schedule.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Activation, Error, Optimizer, Regularization, Result, Schedule};

/// Standard deviation of the zero-mean Gaussian used for weight init.
pub const DEFAULT_INIT_STD: f64 = 0.01;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    /// Layer widths, input first. Length `L >= 2`.
    pub widths: Vec<usize>,
    /// One activation per weight layer (`L - 1`). Softmax must be last.
    pub activations: Vec<Activation>,
    /// Keep-probability of each weight layer's *input* (`L - 1`), in `(0, 1]`.
    pub keep_probs: Vec<f64>,
    pub optimizer: Optimizer,
    pub lr: f64,
    /// SGD velocity coefficient, or Adam's first-moment decay.
    pub momentum: f64,
    /// Adam's second-moment decay. Unused by SGD.
    pub second_moment_decay: f64,
    pub reg_strength: f64,
    pub regularization: Regularization,
    pub schedule: Schedule,
    pub init_std: f64,
}

impl NetworkConfig {
    /// Architecture with default hyperparameters (plain SGD, lr 0.01, no regularization).
    pub fn new(widths: Vec<usize>, activations: Vec<Activation>, keep_probs: Vec<f64>) -> Self {
        Self {
            widths,
            activations,
            keep_probs,
            optimizer: Optimizer::NesterovSgd,
            lr: 1e-2,
            momentum: 0.0,
            second_moment_decay: 0.999,
            reg_strength: 0.0,
            regularization: Regularization::L2,
            schedule: Schedule::default(),
            init_std: DEFAULT_INIT_STD,
        }
    }

    /// Number of weight layers (`widths.len() - 1`).
    #[inline]
    pub fn num_layers(&self) -> usize {
        self.widths.len().saturating_sub(1)
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.widths.first().copied().unwrap_or(0)
    }

    #[inline]
    pub fn output_dim(&self) -> usize {
        self.widths.last().copied().unwrap_or(0)
    }

    /// Shape of weight matrix `layer`: `(widths[layer] + 1, widths[layer + 1])`.
    #[inline]
    pub fn weight_shape(&self, layer: usize) -> (usize, usize) {
        (self.widths[layer] + 1, self.widths[layer + 1])
    }

    pub fn validate(&self) -> Result<()> {
        if self.widths.len() < 2 {
            return Err(Error::Config(
                "widths must include input and output dims".to_owned(),
            ));
        }
        if self.widths.contains(&0) {
            return Err(Error::Config("all layer widths must be > 0".to_owned()));
        }

        let n = self.num_layers();
        if self.activations.len() != n {
            return Err(Error::Config(format!(
                "activations length {} does not match widths.len() - 1 ({n})",
                self.activations.len()
            )));
        }
        if self.keep_probs.len() != n {
            return Err(Error::Config(format!(
                "keep_probs length {} does not match widths.len() - 1 ({n})",
                self.keep_probs.len()
            )));
        }

        for (i, &act) in self.activations.iter().enumerate() {
            let last = i + 1 == n;
            if act == Activation::Softmax && !last {
                return Err(Error::Config(format!(
                    "softmax is only supported on the output layer, found at layer {i}"
                )));
            }
            if last && act != Activation::Softmax {
                return Err(Error::Config(format!(
                    "output layer must use softmax: loss and backward are defined for a softmax + cross-entropy head only, got {act}"
                )));
            }
        }

        for (i, &p) in self.keep_probs.iter().enumerate() {
            if !(p > 0.0 && p <= 1.0) {
                return Err(Error::Config(format!(
                    "keep probability for layer {i} must be in (0, 1], got {p}"
                )));
            }
        }

        if !(self.lr.is_finite() && self.lr > 0.0) {
            return Err(Error::Config(format!(
                "learning rate must be finite and > 0, got {}",
                self.lr
            )));
        }
        if !(self.momentum.is_finite() && (0.0..1.0).contains(&self.momentum)) {
            return Err(Error::Config(format!(
                "momentum must be finite and in [0, 1), got {}",
                self.momentum
            )));
        }
        if !(self.second_moment_decay.is_finite()
            && (0.0..1.0).contains(&self.second_moment_decay))
        {
            return Err(Error::Config(format!(
                "second moment decay must be finite and in [0, 1), got {}",
                self.second_moment_decay
            )));
        }
        if !(self.reg_strength.is_finite() && self.reg_strength >= 0.0) {
            return Err(Error::Config(format!(
                "regularization strength must be finite and >= 0, got {}",
                self.reg_strength
            )));
        }
        if !(self.init_std.is_finite() && self.init_std > 0.0) {
            return Err(Error::Config(format!(
                "init_std must be finite and > 0, got {}",
                self.init_std
            )));
        }

        self.schedule.validate()
    }
}
