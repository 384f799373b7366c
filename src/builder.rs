//! Network builder.
//!
//! `NetworkBuilder` is a fluent front end over [`NetworkConfig`]: layers are
//! added one at a time with their activation and input keep-probability, and
//! hyperparameters default to those of `NetworkConfig::new`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{
    Activation, Error, Network, NetworkConfig, Optimizer, Regularization, Result, Schedule,
};

#[derive(Debug, Clone)]
/// Builder for a `Network`.
///
/// Example:
///
/// ```rust
/// use rust_fcnet::{Activation, NetworkBuilder, Optimizer};
///
/// # fn main() -> rust_fcnet::Result<()> {
/// let net = NetworkBuilder::new(4)?
///     .add_layer(16, Activation::ReLU, 0.8)?
///     .add_layer(3, Activation::Softmax, 1.0)?
///     .optimizer(Optimizer::Adam)
///     .lr(1e-3)
///     .momentum(0.9)
///     .build_with_seed(0)?;
/// assert_eq!(net.output_dim(), 3);
/// # Ok(())
/// # }
/// ```
pub struct NetworkBuilder {
    config: NetworkConfig,
}

impl NetworkBuilder {
    /// Start building a network that accepts `input_dim` features per example.
    pub fn new(input_dim: usize) -> Result<Self> {
        if input_dim == 0 {
            return Err(Error::Config("input_dim must be > 0".to_owned()));
        }
        Ok(Self {
            config: NetworkConfig::new(vec![input_dim], Vec::new(), Vec::new()),
        })
    }

    /// Add a fully-connected layer of `width` units.
    ///
    /// `keep_prob` is the dropout keep-probability applied to this layer's input.
    pub fn add_layer(mut self, width: usize, activation: Activation, keep_prob: f64) -> Result<Self> {
        if width == 0 {
            return Err(Error::Config("layer width must be > 0".to_owned()));
        }
        if !(keep_prob > 0.0 && keep_prob <= 1.0) {
            return Err(Error::Config(format!(
                "keep probability must be in (0, 1], got {keep_prob}"
            )));
        }

        self.config.widths.push(width);
        self.config.activations.push(activation);
        self.config.keep_probs.push(keep_prob);
        Ok(self)
    }

    pub fn optimizer(mut self, optimizer: Optimizer) -> Self {
        self.config.optimizer = optimizer;
        self
    }

    pub fn lr(mut self, lr: f64) -> Self {
        self.config.lr = lr;
        self
    }

    pub fn momentum(mut self, momentum: f64) -> Self {
        self.config.momentum = momentum;
        self
    }

    pub fn second_moment_decay(mut self, decay: f64) -> Self {
        self.config.second_moment_decay = decay;
        self
    }

    pub fn regularization(mut self, kind: Regularization, strength: f64) -> Self {
        self.config.regularization = kind;
        self.config.reg_strength = strength;
        self
    }

    pub fn schedule(mut self, schedule: Schedule) -> Self {
        self.config.schedule = schedule;
        self
    }

    pub fn init_std(mut self, std: f64) -> Self {
        self.config.init_std = std;
        self
    }

    /// Validated configuration record.
    pub fn config(&self) -> Result<NetworkConfig> {
        if self.config.num_layers() == 0 {
            return Err(Error::Config(
                "network must have at least one layer".to_owned(),
            ));
        }
        self.config.validate()?;
        Ok(self.config.clone())
    }

    /// Build using a deterministic seed.
    pub fn build_with_seed(self, seed: u64) -> Result<Network> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.build_with_rng(&mut rng)
    }

    /// Build using the provided RNG.
    pub fn build_with_rng<R: Rng + ?Sized>(self, rng: &mut R) -> Result<Network> {
        let config = self.config()?;
        Network::new_with_rng(config, rng)
    }
}
