//! A fully-connected network training engine.
//!
//! `rust-fcnet` trains multi-layer perceptrons with a softmax/cross-entropy head.
//! It owns the numeric core of training: bias-augmented weights, dropout on each
//! layer's input, backpropagation, L1/L2 regularization, Nesterov SGD and Adam
//! with decoupled weight decay, learning-rate and momentum schedules, and
//! weight diagnostics. Data loading and the outer epoch loop belong to the caller.
//!
//! # Data layout and shapes
//!
//! - Scalars are `f64`.
//! - Batches are `features × batch` [`Matrix`] values: one example per column.
//! - Layer `i` has weights of shape `(widths[i] + 1) × widths[i + 1]`. Row 0
//!   multiplies the constant-1 bias feature.
//! - Labels are one-hot `classes × batch` matrices (see [`Matrix::one_hot`]).
//!
//! # Errors
//!
//! Every public operation validates its inputs and returns [`Result`]:
//!
//! - [`Error::Shape`]: a matrix does not match the architecture or the cached batch.
//! - [`Error::State`]: operations called out of order (e.g. `backward` before `forward`).
//! - [`Error::Config`]: an invalid architecture or hyperparameter.
//! - [`Error::InvalidData`]: malformed serialized snapshots (feature `serde`).
//!
//! # Quick start
//!
//! ```rust
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//! use rust_fcnet::{Activation, Matrix, NetworkBuilder, Optimizer};
//!
//! # fn main() -> rust_fcnet::Result<()> {
//! let mut net = NetworkBuilder::new(2)?
//!     .add_layer(8, Activation::ReLU, 1.0)?
//!     .add_layer(2, Activation::Softmax, 1.0)?
//!     .optimizer(Optimizer::NesterovSgd)
//!     .lr(0.1)
//!     .momentum(0.5)
//!     .init_std(0.1)
//!     .build_with_seed(0)?;
//!
//! let x = Matrix::from_columns(&[vec![0.0, 1.0], vec![1.0, 0.0]])?;
//! let y = Matrix::one_hot(&[1, 0], 2)?;
//! let mut rng = StdRng::seed_from_u64(0);
//!
//! for _epoch in 0..10 {
//!     let out = net.forward(&x, &mut rng)?;
//!     let _loss = net.loss(&y)?;
//!     net.backward(&out, &y)?;
//!     net.step()?;
//!     net.reset_step_caches(true);
//!     net.decay_schedule();
//!     net.bump_momentum();
//! }
//!
//! let probs = net.predict(&x)?;
//! assert_eq!(probs.shape(), (2, 2));
//! # Ok(())
//! # }
//! ```
//!
//! # MSRV
//!
//! This crate's minimum supported Rust version (MSRV) is specified in `Cargo.toml`.

pub mod activation;
pub mod builder;
pub mod config;
pub mod diagnostics;
pub mod dropout;
pub mod error;
pub mod loss;
pub(crate) mod matmul;
pub mod matrix;
pub mod network;
pub mod optim;
pub mod params;
pub mod schedule;

#[cfg(feature = "serde")]
pub mod serde_model;

pub use activation::Activation;
pub use builder::NetworkBuilder;
pub use config::{DEFAULT_INIT_STD, NetworkConfig};
pub use diagnostics::LayerDiagnostics;
pub use dropout::Mode;
pub use error::{Error, Result};
pub use loss::{Regularization, softmax_cross_entropy};
pub use matrix::Matrix;
pub use network::Network;
pub use optim::{ADAM_EPS, Hyperparams, Optimizer, OptimizerState};
pub use params::{ModelSnapshot, ParamStore};
pub use schedule::Schedule;
