//! The training engine: forward pass, backward pass, loss and optimizer step.
//!
//! A `Network` owns its parameters, optimizer state and the per-step caches
//! (bias-augmented layer inputs, dropout masks, pre-activations, logits). One
//! training step is:
//!
//! `forward` → `loss` (optional, for reporting) → `backward` → `step`
//!
//! followed by `reset_step_caches` before the next independent batch.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::activation::softmax_columns;
use crate::diagnostics::{self, LayerDiagnostics};
use crate::dropout::{self, Mode};
use crate::matmul;
use crate::{
    Activation, Error, Hyperparams, Matrix, ModelSnapshot, NetworkConfig, Optimizer,
    OptimizerState, ParamStore, Result,
};

#[derive(Debug, Clone)]
pub struct Network {
    config: NetworkConfig,
    params: ParamStore,
    optimizer: OptimizerState,
    hyper: Hyperparams,
    mode: Mode,
    cache: StepCache,
    grads_ready: bool,
}

/// What the backward pass needs from one layer's forward computation.
#[derive(Debug, Clone)]
struct LayerCache {
    /// `[1; x ⊙ mask]`, shape `(fan_in + 1) × batch`.
    input: Matrix,
    /// `None` when no dropout was applied to this layer's input.
    mask: Option<Matrix>,
    /// `z = Wᵀ · input`, shape `fan_out × batch`.
    pre_activation: Matrix,
}

#[derive(Debug, Clone)]
struct StepCache {
    layers: Box<[Option<LayerCache>]>,
    logits: Option<Matrix>,
    batch_size: Option<usize>,
}

impl StepCache {
    fn new(num_layers: usize) -> Self {
        Self {
            layers: vec![None; num_layers].into_boxed_slice(),
            logits: None,
            batch_size: None,
        }
    }

    fn clear(&mut self) {
        for layer in self.layers.iter_mut() {
            *layer = None;
        }
        self.logits = None;
        self.batch_size = None;
    }
}

impl Network {
    pub fn new_with_seed(config: NetworkConfig, seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::new_with_rng(config, &mut rng)
    }

    pub fn new_with_rng<R: Rng + ?Sized>(config: NetworkConfig, rng: &mut R) -> Result<Self> {
        let params = ParamStore::initialize(&config, rng)?;
        log::debug!(
            "network {:?} activations {:?} keep {:?} optimizer {:?}",
            config.widths,
            config.activations,
            config.keep_probs,
            config.optimizer
        );

        Ok(Self {
            optimizer: OptimizerState::new(config.optimizer),
            hyper: Hyperparams::from_config(&config),
            mode: Mode::Train,
            cache: StepCache::new(config.num_layers()),
            grads_ready: false,
            params,
            config,
        })
    }

    #[inline]
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.params.num_layers()
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.config.input_dim()
    }

    #[inline]
    pub fn output_dim(&self) -> usize {
        self.config.output_dim()
    }

    #[inline]
    pub fn params(&self) -> &ParamStore {
        &self.params
    }

    #[inline]
    pub fn hyperparams(&self) -> &Hyperparams {
        &self.hyper
    }

    /// Completed optimizer steps (the `t` of Adam's bias correction).
    #[inline]
    pub fn optimizer_step(&self) -> u64 {
        self.optimizer.step_count()
    }

    #[inline]
    pub fn epoch(&self) -> u64 {
        self.hyper.epoch
    }

    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_train_mode(&mut self) {
        self.mode = Mode::Train;
    }

    pub fn set_evaluate_mode(&mut self) {
        self.mode = Mode::Evaluate;
    }

    /// Forward pass over a `features × batch` matrix.
    ///
    /// In train mode every layer whose keep-probability is below 1 draws a
    /// fresh dropout mask from `rng` for its input. Evaluate mode never
    /// touches `rng`.
    ///
    /// Overwrites the step caches consumed by `loss` and `backward`.
    /// Returns `classes × batch` probabilities.
    pub fn forward<R: Rng + ?Sized>(&mut self, input: &Matrix, rng: &mut R) -> Result<Matrix> {
        self.check_input(input)?;
        self.cache.clear();

        let batch = input.cols();
        let mut x = input.clone();

        for layer in 0..self.config.num_layers() {
            let keep = self.config.keep_probs[layer];
            let mask = if self.mode == Mode::Train && keep < 1.0 {
                let mask = dropout::draw_mask(x.rows(), batch, keep, rng)?;
                x.hadamard_in_place(&mask);
                Some(mask)
            } else {
                None
            };

            let augmented = x.with_bias_row();
            let z = matmul::mul(
                self.params.weight(layer).view(),
                true,
                augmented.view(),
                false,
            );

            x = match self.config.activations[layer] {
                Activation::Softmax => {
                    let (probs, logits) = softmax_columns(&z);
                    self.cache.logits = Some(logits);
                    probs
                }
                act => act.apply(&z),
            };

            self.cache.layers[layer] = Some(LayerCache {
                input: augmented,
                mask,
                pre_activation: z,
            });
        }

        self.cache.batch_size = Some(batch);
        Ok(x)
    }

    /// Inference without dropout that leaves the mode flag and step caches untouched.
    pub fn predict(&self, input: &Matrix) -> Result<Matrix> {
        self.check_input(input)?;

        let mut x = input.clone();
        for layer in 0..self.config.num_layers() {
            let augmented = x.with_bias_row();
            let z = matmul::mul(
                self.params.weight(layer).view(),
                true,
                augmented.view(),
                false,
            );
            x = match self.config.activations[layer] {
                Activation::Softmax => softmax_columns(&z).0,
                act => act.apply(&z),
            };
        }
        Ok(x)
    }

    /// Summed cross-entropy of the last forward pass, plus the weight penalty
    /// when training with SGD.
    ///
    /// Reads the cached logits; `labels` must be `classes × batch`.
    pub fn loss(&self, labels: &Matrix) -> Result<f64> {
        let logits = self
            .cache
            .logits
            .as_ref()
            .ok_or_else(|| Error::State("loss called before forward".to_owned()))?;
        if labels.shape() != logits.shape() {
            return Err(Error::Shape(format!(
                "labels shape {:?} does not match cached logits {:?}",
                labels.shape(),
                logits.shape()
            )));
        }

        let mut total = crate::loss::softmax_cross_entropy(logits, labels)?;
        if self.optimizer.kind() == Optimizer::NesterovSgd {
            let reg = self.hyper.regularization;
            let strength = self.hyper.reg_strength;
            total += self
                .params
                .weights()
                .iter()
                .map(|w| reg.penalty(w, strength))
                .sum::<f64>();
        }
        Ok(total)
    }

    /// Backward pass: fills the gradient buffers from the cached forward pass.
    ///
    /// `output` is what `forward` returned and `labels` the matching one-hot
    /// targets. Gradients are averaged over the batch; with SGD the
    /// regularization gradient is added afterwards.
    pub fn backward(&mut self, output: &Matrix, labels: &Matrix) -> Result<()> {
        let batch = self
            .cache
            .batch_size
            .ok_or_else(|| Error::State("backward called before forward".to_owned()))?;
        if batch == 0 {
            return Err(Error::Shape("cannot backpropagate an empty batch".to_owned()));
        }

        let expected = (self.config.output_dim(), batch);
        if output.shape() != expected {
            return Err(Error::Shape(format!(
                "network output shape {:?} does not match cached batch {expected:?}",
                output.shape()
            )));
        }
        if labels.shape() != expected {
            return Err(Error::Shape(format!(
                "labels shape {:?} does not match cached batch {expected:?}",
                labels.shape()
            )));
        }

        self.params.zero_grads();
        self.grads_ready = false;

        let inv_batch = 1.0 / batch as f64;
        let add_penalty = self.optimizer.kind() == Optimizer::NesterovSgd;
        let reg = self.hyper.regularization;
        let strength = self.hyper.reg_strength;

        // Softmax + cross-entropy: ∂L/∂z at the head is simply p − y.
        let mut delta = output.sub(labels)?;

        for layer in (0..self.config.num_layers()).rev() {
            let cached = self.cache.layers[layer]
                .as_ref()
                .ok_or_else(|| Error::State(format!("no cached forward state for layer {layer}")))?;

            matmul::mul_into(
                cached.input.view(),
                false,
                delta.view(),
                true,
                inv_batch,
                self.params.grad_mut(layer),
            );
            if add_penalty {
                self.params.add_penalty_gradient(layer, reg, strength);
            }

            if layer == 0 {
                break;
            }

            // Through the affine map (bias row has no upstream), then the dropout mask.
            let mut d_input = matmul::mul(
                self.params.weight(layer).rows_from(1),
                false,
                delta.view(),
                false,
            );
            if let Some(mask) = &cached.mask {
                d_input.hadamard_in_place(mask);
            }

            let prev = self.cache.layers[layer - 1].as_ref().ok_or_else(|| {
                Error::State(format!("no cached forward state for layer {}", layer - 1))
            })?;
            let act = self.config.activations[layer - 1];
            for (d, &z) in d_input
                .as_mut_slice()
                .iter_mut()
                .zip(prev.pre_activation.as_slice())
            {
                *d *= act.grad_from_pre_activation(z);
            }
            delta = d_input;
        }

        self.grads_ready = true;
        Ok(())
    }

    /// Apply one optimizer update with the gradients from the last `backward`.
    pub fn step(&mut self) -> Result<()> {
        if !self.grads_ready {
            return Err(Error::State(
                "step requires fresh gradients from backward".to_owned(),
            ));
        }
        self.optimizer.step(&mut self.params, &self.hyper);
        self.grads_ready = false;
        Ok(())
    }

    /// Drop cached activations, masks and logits. Optionally zero the gradients too.
    pub fn reset_step_caches(&mut self, zero_grads: bool) {
        self.cache.clear();
        if zero_grads {
            self.params.zero_grads();
            self.grads_ready = false;
        }
    }

    /// Advance the epoch counter and apply the learning-rate schedule if due.
    pub fn decay_schedule(&mut self) -> bool {
        self.config
            .schedule
            .advance_epoch(self.optimizer.kind(), &mut self.hyper)
    }

    /// Apply the momentum ramp if the current epoch is on its cadence.
    pub fn bump_momentum(&mut self) -> bool {
        self.config.schedule.bump_momentum(&mut self.hyper)
    }

    /// Copy of weights, moments and the optimizer step counter.
    pub fn snapshot_weights(&self) -> ModelSnapshot {
        self.params.snapshot(self.optimizer.step_count())
    }

    /// Restore a snapshot taken from a network with the same architecture.
    ///
    /// Step caches and gradients are discarded since they no longer match the weights.
    pub fn load_weights(&mut self, snapshot: ModelSnapshot) -> Result<()> {
        let ModelSnapshot {
            weights,
            first_moment,
            second_moment,
            step,
        } = snapshot;
        self.params
            .load_external(weights, first_moment, second_moment)?;
        self.optimizer.set_step_count(step);
        self.reset_step_caches(true);
        log::debug!("loaded weights for {} layers at step {step}", self.num_layers());
        Ok(())
    }

    pub fn get_weights(&self) -> Vec<Matrix> {
        self.params.weights().to_vec()
    }

    pub fn get_gradients(&self) -> Vec<Matrix> {
        self.params.gradients().to_vec()
    }

    pub fn weight_entry(&self, layer: usize, row: usize, col: usize) -> Result<f64> {
        self.params.get_entry(layer, row, col)
    }

    /// Point mutation for numeric gradient checking.
    pub fn set_weight_entry(&mut self, layer: usize, row: usize, col: usize, value: f64) -> Result<()> {
        self.params.set_entry(layer, row, col, value)
    }

    /// Per-layer Frobenius norm and largest eigenvalue of `W·Wᵀ`.
    pub fn weight_diagnostics(&self) -> Vec<LayerDiagnostics> {
        diagnostics::weight_diagnostics(self.params.weights())
    }

    fn check_input(&self, input: &Matrix) -> Result<()> {
        if input.cols() == 0 {
            return Err(Error::Shape(
                "input batch must contain at least one example".to_owned(),
            ));
        }
        if input.rows() != self.input_dim() {
            return Err(Error::Shape(format!(
                "input has {} features, network expects {}",
                input.rows(),
                self.input_dim()
            )));
        }
        Ok(())
    }
}
