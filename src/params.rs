//! Parameter store: weights, gradients and optimizer moments.
//!
//! Each weight matrix has shape `(fan_in + 1) × fan_out`; row 0 multiplies the
//! constant-1 bias feature. Gradients and both moment buffers mirror those
//! shapes exactly. The per-layer collections are sized once and never grow.

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::{Error, Matrix, NetworkConfig, Regularization, Result};

/// Owned copy of everything needed to warm-start a network.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSnapshot {
    pub weights: Vec<Matrix>,
    pub first_moment: Vec<Matrix>,
    pub second_moment: Vec<Matrix>,
    /// Optimizer step counter, so Adam's bias correction resumes where it left off.
    pub step: u64,
}

#[derive(Debug, Clone)]
pub struct ParamStore {
    weights: Box<[Matrix]>,
    grads: Box<[Matrix]>,
    first_moment: Box<[Matrix]>,
    second_moment: Box<[Matrix]>,
}

impl ParamStore {
    /// Allocate every buffer for `config` and draw weights from `N(0, init_std²)`.
    ///
    /// Gradients and moments start at zero.
    pub fn initialize<R: Rng + ?Sized>(config: &NetworkConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;

        let normal = Normal::new(0.0, config.init_std)
            .map_err(|e| Error::Config(format!("invalid init_std {}: {e}", config.init_std)))?;

        let weights = (0..config.num_layers())
            .map(|layer| {
                let (rows, cols) = config.weight_shape(layer);
                let data = (0..rows * cols).map(|_| normal.sample(rng)).collect();
                Matrix::from_vec(rows, cols, data)
            })
            .collect::<Result<Vec<_>>>()?;

        Self::from_weights(weights)
    }

    /// Wrap caller-supplied weights, with zeroed gradients and moments.
    pub fn from_weights(weights: Vec<Matrix>) -> Result<Self> {
        if weights.is_empty() {
            return Err(Error::Shape("at least one weight matrix is required".to_owned()));
        }
        let zeros = || {
            weights
                .iter()
                .map(|w| Matrix::zeros(w.rows(), w.cols()))
                .collect::<Box<[_]>>()
        };
        Ok(Self {
            grads: zeros(),
            first_moment: zeros(),
            second_moment: zeros(),
            weights: weights.into_boxed_slice(),
        })
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.weights.len()
    }

    #[inline]
    pub fn weights(&self) -> &[Matrix] {
        &self.weights
    }

    #[inline]
    pub fn gradients(&self) -> &[Matrix] {
        &self.grads
    }

    #[inline]
    pub fn first_moment(&self) -> &[Matrix] {
        &self.first_moment
    }

    #[inline]
    pub fn second_moment(&self) -> &[Matrix] {
        &self.second_moment
    }

    /// Read one weight entry.
    pub fn get_entry(&self, layer: usize, row: usize, col: usize) -> Result<f64> {
        self.weights
            .get(layer)
            .and_then(|w| w.get(row, col))
            .ok_or_else(|| out_of_range(layer, row, col))
    }

    /// Overwrite one weight entry. Nothing else changes.
    pub fn set_entry(&mut self, layer: usize, row: usize, col: usize, value: f64) -> Result<()> {
        let slot = self
            .weights
            .get_mut(layer)
            .and_then(|w| w.get_mut(row, col))
            .ok_or_else(|| out_of_range(layer, row, col))?;
        *slot = value;
        Ok(())
    }

    /// Replace weights and both moment buffers wholesale (warm start).
    ///
    /// Every supplied matrix must match the current shape of its slot; on
    /// error nothing is modified.
    pub fn load_external(
        &mut self,
        weights: Vec<Matrix>,
        first_moment: Vec<Matrix>,
        second_moment: Vec<Matrix>,
    ) -> Result<()> {
        check_shapes("weights", &self.weights, &weights)?;
        check_shapes("first moment", &self.weights, &first_moment)?;
        check_shapes("second moment", &self.weights, &second_moment)?;

        self.weights = weights.into_boxed_slice();
        self.first_moment = first_moment.into_boxed_slice();
        self.second_moment = second_moment.into_boxed_slice();
        Ok(())
    }

    pub(crate) fn snapshot(&self, step: u64) -> ModelSnapshot {
        ModelSnapshot {
            weights: self.weights.to_vec(),
            first_moment: self.first_moment.to_vec(),
            second_moment: self.second_moment.to_vec(),
            step,
        }
    }

    pub(crate) fn add_penalty_gradient(&mut self, layer: usize, reg: Regularization, strength: f64) {
        reg.add_gradient(&mut self.grads[layer], &self.weights[layer], strength);
    }

    pub(crate) fn zero_grads(&mut self) {
        for g in self.grads.iter_mut() {
            g.as_mut_slice().fill(0.0);
        }
    }

    #[inline]
    pub(crate) fn weight(&self, layer: usize) -> &Matrix {
        &self.weights[layer]
    }

    #[inline]
    pub(crate) fn grad_mut(&mut self, layer: usize) -> &mut Matrix {
        &mut self.grads[layer]
    }

    /// Disjoint borrows of `(weights, grads, first_moment, second_moment)` for one layer.
    #[inline]
    pub(crate) fn layer_mut(
        &mut self,
        layer: usize,
    ) -> (&mut Matrix, &Matrix, &mut Matrix, &mut Matrix) {
        (
            &mut self.weights[layer],
            &self.grads[layer],
            &mut self.first_moment[layer],
            &mut self.second_moment[layer],
        )
    }
}

fn out_of_range(layer: usize, row: usize, col: usize) -> Error {
    Error::Shape(format!(
        "weight entry ({layer}, {row}, {col}) is out of range"
    ))
}

fn check_shapes(what: &str, expected: &[Matrix], got: &[Matrix]) -> Result<()> {
    if expected.len() != got.len() {
        return Err(Error::Shape(format!(
            "{what}: expected {} matrices, got {}",
            expected.len(),
            got.len()
        )));
    }
    for (i, (e, g)) in expected.iter().zip(got).enumerate() {
        if e.shape() != g.shape() {
            return Err(Error::Shape(format!(
                "{what}: layer {i} has shape {:?}, expected {:?}",
                g.shape(),
                e.shape()
            )));
        }
    }
    Ok(())
}
