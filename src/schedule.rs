//! Epoch-level schedules: learning-rate/regularization decay and momentum ramp.
//!
//! Both run once per epoch, outside the per-step loop, and only touch
//! [`Hyperparams`].

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Hyperparams, Optimizer, Result};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Schedule {
    /// Fire the learning-rate schedule every this many epochs. `None` disables it.
    pub lr_decay_every: Option<usize>,
    /// Floor for the halved SGD learning rate.
    pub min_lr: f64,
    /// Ramp momentum every this many epochs. `None` disables it.
    pub momentum_every: Option<usize>,
    pub momentum_increment: f64,
    pub max_momentum: f64,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            lr_decay_every: None,
            min_lr: 1e-6,
            momentum_every: None,
            momentum_increment: 0.05,
            max_momentum: 0.9,
        }
    }
}

impl Schedule {
    pub fn validate(&self) -> Result<()> {
        if self.lr_decay_every == Some(0) {
            return Err(Error::Config("lr_decay_every must be > 0".to_owned()));
        }
        if self.momentum_every == Some(0) {
            return Err(Error::Config("momentum_every must be > 0".to_owned()));
        }
        if !(self.min_lr.is_finite() && self.min_lr >= 0.0) {
            return Err(Error::Config(format!(
                "min_lr must be finite and >= 0, got {}",
                self.min_lr
            )));
        }
        if !(self.momentum_increment.is_finite() && self.momentum_increment >= 0.0) {
            return Err(Error::Config(format!(
                "momentum_increment must be finite and >= 0, got {}",
                self.momentum_increment
            )));
        }
        if !(self.max_momentum.is_finite() && (0.0..1.0).contains(&self.max_momentum)) {
            return Err(Error::Config(format!(
                "max_momentum must be finite and in [0, 1), got {}",
                self.max_momentum
            )));
        }
        Ok(())
    }

    /// Advance the epoch counter and apply the learning-rate schedule if it is due.
    ///
    /// - SGD halves `lr`, floored at `min_lr`.
    /// - Adam recomputes `lr` and `reg_strength` as `initial / sqrt(epoch)`.
    ///
    /// Returns `true` if the schedule fired.
    pub(crate) fn advance_epoch(&self, optimizer: Optimizer, hp: &mut Hyperparams) -> bool {
        hp.epoch += 1;

        let Some(every) = self.lr_decay_every else {
            return false;
        };
        if hp.epoch % every as u64 != 0 {
            return false;
        }

        match optimizer {
            Optimizer::NesterovSgd => {
                hp.lr = (hp.lr * 0.5).max(self.min_lr);
            }
            Optimizer::Adam => {
                let scale = (hp.epoch as f64).sqrt();
                hp.lr = hp.initial_lr / scale;
                hp.reg_strength = hp.initial_reg / scale;
            }
        }
        log::debug!(
            "epoch {}: lr -> {:.3e}, reg -> {:.3e}",
            hp.epoch,
            hp.lr,
            hp.reg_strength
        );
        true
    }

    /// Ramp momentum if the current epoch is a positive multiple of `momentum_every`.
    pub(crate) fn bump_momentum(&self, hp: &mut Hyperparams) -> bool {
        let Some(every) = self.momentum_every else {
            return false;
        };
        if hp.epoch == 0 || hp.epoch % every as u64 != 0 {
            return false;
        }

        hp.momentum = (hp.momentum + self.momentum_increment).min(self.max_momentum);
        log::debug!("epoch {}: momentum -> {}", hp.epoch, hp.momentum);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Regularization;

    fn hp(lr: f64, reg: f64) -> Hyperparams {
        Hyperparams {
            lr,
            momentum: 0.5,
            second_moment_decay: 0.999,
            reg_strength: reg,
            regularization: Regularization::L2,
            initial_lr: lr,
            initial_reg: reg,
            epoch: 0,
        }
    }

    #[test]
    fn sgd_halves_on_cadence_down_to_floor() {
        let s = Schedule {
            lr_decay_every: Some(2),
            min_lr: 0.2,
            ..Schedule::default()
        };
        let mut h = hp(1.0, 0.0);

        assert!(!s.advance_epoch(Optimizer::NesterovSgd, &mut h));
        assert_eq!(h.lr, 1.0);
        assert!(s.advance_epoch(Optimizer::NesterovSgd, &mut h));
        assert_eq!(h.lr, 0.5);
        s.advance_epoch(Optimizer::NesterovSgd, &mut h);
        assert!(s.advance_epoch(Optimizer::NesterovSgd, &mut h));
        assert_eq!(h.lr, 0.25);
        s.advance_epoch(Optimizer::NesterovSgd, &mut h);
        s.advance_epoch(Optimizer::NesterovSgd, &mut h);
        assert_eq!(h.lr, 0.2);
        assert_eq!(h.epoch, 6);
    }

    #[test]
    fn adam_rescales_from_initial_values() {
        let s = Schedule {
            lr_decay_every: Some(1),
            ..Schedule::default()
        };
        let mut h = hp(0.1, 0.01);
        for _ in 0..4 {
            s.advance_epoch(Optimizer::Adam, &mut h);
        }
        assert!((h.lr - 0.05).abs() < 1e-15);
        assert!((h.reg_strength - 0.005).abs() < 1e-15);
    }

    #[test]
    fn momentum_ramp_is_capped() {
        let s = Schedule {
            momentum_every: Some(1),
            momentum_increment: 0.3,
            max_momentum: 0.9,
            ..Schedule::default()
        };
        let mut h = hp(0.1, 0.0);
        assert!(!s.bump_momentum(&mut h), "epoch 0 never ramps");

        h.epoch = 1;
        assert!(s.bump_momentum(&mut h));
        assert!((h.momentum - 0.8).abs() < 1e-15);
        assert!(s.bump_momentum(&mut h));
        assert_eq!(h.momentum, 0.9);
    }

    #[test]
    fn zero_cadence_is_rejected() {
        let s = Schedule {
            lr_decay_every: Some(0),
            ..Schedule::default()
        };
        assert!(s.validate().is_err());
    }
}
