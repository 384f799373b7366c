//! Inverted dropout and the train/evaluate mode flag.
//!
//! Dropout acts on each layer's *input*. A surviving element is scaled by
//! `1 / keep_prob`, so the expected value of a masked input equals the
//! unmasked one and evaluate mode needs no rescaling.

use rand::Rng;
use rand::distributions::{Bernoulli, Distribution};

use crate::{Error, Matrix, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Whether the forward pass draws dropout masks.
pub enum Mode {
    #[default]
    Train,
    Evaluate,
}

/// Draw a `rows × cols` mask whose entries are `1 / keep_prob` with
/// probability `keep_prob` and `0` otherwise.
pub fn draw_mask<R: Rng + ?Sized>(
    rows: usize,
    cols: usize,
    keep_prob: f64,
    rng: &mut R,
) -> Result<Matrix> {
    let trial = Bernoulli::new(keep_prob).map_err(|e| {
        Error::Config(format!("invalid keep probability {keep_prob}: {e}"))
    })?;
    let scale = 1.0 / keep_prob;

    let mut mask = Matrix::zeros(rows, cols);
    for v in mask.as_mut_slice() {
        if trial.sample(rng) {
            *v = scale;
        }
    }
    Ok(mask)
}
