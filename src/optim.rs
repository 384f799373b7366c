//! Optimizers.
//!
//! Two update rules share one step counter:
//!
//! - Nesterov SGD, in the look-ahead form
//!   `v' = μ·v − lr·g`, `w' = w − μ·v + (1 + μ)·v'`
//! - Adam with bias correction and decoupled weight decay
//!   `w' = w − lr·m̂ / (√v̂ + ε) − λ·w`
//!
//! The moment buffers live in the [`ParamStore`]; SGD keeps its velocity in the
//! first-moment slot and leaves the second untouched.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{NetworkConfig, ParamStore, Regularization};

/// Added to `√v̂` so the Adam update never divides by zero.
pub const ADAM_EPS: f64 = 1e-8;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Optimizer choice, fixed at construction.
pub enum Optimizer {
    /// SGD with Nesterov momentum. Regularization enters through the gradient.
    #[default]
    NesterovSgd,
    /// Adam with decoupled weight decay.
    Adam,
}

/// Scalar hyperparameters that evolve over training.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hyperparams {
    pub lr: f64,
    pub momentum: f64,
    pub second_moment_decay: f64,
    pub reg_strength: f64,
    pub regularization: Regularization,
    /// Retained so the Adam schedule can recompute `lr` from scratch.
    pub initial_lr: f64,
    pub initial_reg: f64,
    /// Completed epochs, advanced by the schedule.
    pub epoch: u64,
}

impl Hyperparams {
    pub(crate) fn from_config(cfg: &NetworkConfig) -> Self {
        Self {
            lr: cfg.lr,
            momentum: cfg.momentum,
            second_moment_decay: cfg.second_moment_decay,
            reg_strength: cfg.reg_strength,
            regularization: cfg.regularization,
            initial_lr: cfg.lr,
            initial_reg: cfg.reg_strength,
            epoch: 0,
        }
    }
}

#[derive(Debug, Clone)]
/// Optimizer kind plus the step counter used for bias correction.
pub struct OptimizerState {
    kind: Optimizer,
    step: u64,
}

impl OptimizerState {
    pub fn new(kind: Optimizer) -> Self {
        Self { kind, step: 0 }
    }

    #[inline]
    pub fn kind(&self) -> Optimizer {
        self.kind
    }

    /// Number of completed optimizer steps.
    #[inline]
    pub fn step_count(&self) -> u64 {
        self.step
    }

    pub(crate) fn set_step_count(&mut self, step: u64) {
        self.step = step;
    }

    /// Apply one update to every layer using the gradients stored in `params`.
    ///
    /// The step counter advances exactly once per call, before the update, so
    /// the first Adam step uses `t = 1`.
    pub fn step(&mut self, params: &mut ParamStore, hp: &Hyperparams) {
        self.step += 1;
        log::trace!("optimizer step {}", self.step);

        match self.kind {
            Optimizer::NesterovSgd => {
                let mu = hp.momentum;
                let lr = hp.lr;
                for layer in 0..params.num_layers() {
                    let (w, g, v, _) = params.layer_mut(layer);
                    let w = w.as_mut_slice();
                    let v = v.as_mut_slice();
                    for ((w, v), &g) in w.iter_mut().zip(v.iter_mut()).zip(g.as_slice()) {
                        let v_prev = *v;
                        let v_new = mu * v_prev - lr * g;
                        *w += -mu * v_prev + (1.0 + mu) * v_new;
                        *v = v_new;
                    }
                }
            }
            Optimizer::Adam => {
                let beta1 = hp.momentum;
                let beta2 = hp.second_moment_decay;
                let t = self.step as f64;
                let corr1 = 1.0 - beta1.powf(t);
                let corr2 = 1.0 - beta2.powf(t);
                let lr = hp.lr;
                let decay = hp.reg_strength;

                for layer in 0..params.num_layers() {
                    let (w, g, m, v) = params.layer_mut(layer);
                    let w = w.as_mut_slice();
                    let m = m.as_mut_slice();
                    let v = v.as_mut_slice();
                    let g = g.as_slice();
                    for i in 0..w.len() {
                        let gi = g[i];
                        m[i] = beta1 * m[i] + (1.0 - beta1) * gi;
                        v[i] = beta2 * v[i] + (1.0 - beta2) * (gi * gi);

                        let m_hat = m[i] / corr1;
                        let v_hat = v[i] / corr2;
                        w[i] = w[i] - lr * m_hat / (v_hat.sqrt() + ADAM_EPS) - decay * w[i];
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::Matrix;

    fn hp(lr: f64, momentum: f64, beta2: f64, reg: f64) -> Hyperparams {
        Hyperparams {
            lr,
            momentum,
            second_moment_decay: beta2,
            reg_strength: reg,
            regularization: Regularization::L2,
            initial_lr: lr,
            initial_reg: reg,
            epoch: 0,
        }
    }

    fn single_entry(w: f64, g: f64) -> ParamStore {
        let mut params =
            ParamStore::from_weights(vec![Matrix::from_vec(1, 1, vec![w]).unwrap()]).unwrap();
        params.grad_mut(0).as_mut_slice()[0] = g;
        params
    }

    #[test]
    fn sgd_without_momentum_is_plain_gradient_descent() {
        let mut params = single_entry(1.0, 3.0);
        let mut opt = OptimizerState::new(Optimizer::NesterovSgd);
        opt.step(&mut params, &hp(0.1, 0.0, 0.0, 0.0));
        assert!((params.weights()[0].as_slice()[0] - 0.7).abs() < 1e-15);
        assert_eq!(opt.step_count(), 1);
    }

    #[test]
    fn nesterov_uses_previous_velocity() {
        let mut params = single_entry(1.0, 2.0);
        let mut opt = OptimizerState::new(Optimizer::NesterovSgd);
        let h = hp(0.1, 0.9, 0.0, 0.0);

        // Step 1: v0 = 0, v1 = -0.2, w = 1 - 0 + 1.9 * -0.2 = 0.62
        opt.step(&mut params, &h);
        let w1 = params.weights()[0].as_slice()[0];
        assert!((w1 - 0.62).abs() < 1e-12);
        assert!((params.first_moment()[0].as_slice()[0] + 0.2).abs() < 1e-12);

        // Step 2: v1 = -0.2, v2 = 0.9 * -0.2 - 0.2 = -0.38
        //         w = 0.62 + 0.18 + 1.9 * -0.38 = 0.078
        opt.step(&mut params, &h);
        let w2 = params.weights()[0].as_slice()[0];
        assert!((w2 - 0.078).abs() < 1e-12);
    }

    #[test]
    fn adam_bias_correction_at_first_step() {
        // m = 0.1 * g, v = 0.001 * g^2; m_hat = g, v_hat = g^2 at t = 1.
        let g = 0.5;
        let mut params = single_entry(2.0, g);
        let mut opt = OptimizerState::new(Optimizer::Adam);
        opt.step(&mut params, &hp(0.01, 0.9, 0.999, 0.0));

        let m = params.first_moment()[0].as_slice()[0];
        let v = params.second_moment()[0].as_slice()[0];
        assert!((m - 0.1 * g).abs() < 1e-15);
        assert!((v - 0.001 * g * g).abs() < 1e-15);

        let m_hat = m / (1.0 - 0.9);
        let v_hat = v / (1.0 - 0.999);
        assert!((m_hat - g).abs() < 1e-12);
        assert!((v_hat - g * g).abs() < 1e-12);

        let expected = 2.0 - 0.01 * m_hat / (v_hat.sqrt() + ADAM_EPS);
        assert!((params.weights()[0].as_slice()[0] - expected).abs() < 1e-15);
    }

    #[test]
    fn adam_second_step_uses_t_equals_two() {
        let mut params = single_entry(0.0, 1.0);
        let mut opt = OptimizerState::new(Optimizer::Adam);
        let h = hp(0.1, 0.5, 0.75, 0.0);
        opt.step(&mut params, &h);
        params.grad_mut(0).as_mut_slice()[0] = 3.0;
        let w1 = params.weights()[0].as_slice()[0];
        opt.step(&mut params, &h);

        // m = 0.5*0.5 + 0.5*3 = 1.75 ; v = 0.75*0.25 + 0.25*9 = 2.4375
        let m_hat = 1.75 / (1.0 - 0.25);
        let v_hat: f64 = 2.4375 / (1.0 - 0.5625);
        let expected = w1 - 0.1 * m_hat / (v_hat.sqrt() + ADAM_EPS);
        assert!((params.weights()[0].as_slice()[0] - expected).abs() < 1e-12);
        assert_eq!(opt.step_count(), 2);
    }

    #[test]
    fn adam_applies_decoupled_weight_decay_with_zero_gradient() {
        let mut params = single_entry(4.0, 0.0);
        let mut opt = OptimizerState::new(Optimizer::Adam);
        opt.step(&mut params, &hp(0.1, 0.9, 0.999, 0.01));
        assert!((params.weights()[0].as_slice()[0] - (4.0 - 0.04)).abs() < 1e-12);
    }

    #[test]
    fn identical_state_gives_bit_identical_updates() {
        for kind in [Optimizer::NesterovSgd, Optimizer::Adam] {
            let h = hp(0.05, 0.9, 0.999, 0.001);
            let mut a = single_entry(0.3, -0.7);
            let mut b = a.clone();
            let mut oa = OptimizerState::new(kind);
            let mut ob = oa.clone();
            for _ in 0..3 {
                oa.step(&mut a, &h);
                ob.step(&mut b, &h);
            }
            assert_eq!(a.weights(), b.weights());
            assert_eq!(a.first_moment(), b.first_moment());
            assert_eq!(a.second_moment(), b.second_moment());
        }
    }
}
