//! Snapshot serialization/deserialization (feature: `serde`).
//!
//! This module defines a versioned, stable on-disk format for [`ModelSnapshot`].
//!
//! Design notes:
//! - We do NOT directly serialize `Matrix`, so the file format stays stable
//!   even if the in-memory layout changes.
//! - All deserialization validates shapes, buffer lengths, and that every
//!   value is finite. Matching the snapshot to a network's architecture is
//!   left to `Network::load_weights`.

use serde::{Deserialize, Serialize};

use crate::{Error, Matrix, ModelSnapshot, Result};

use std::path::Path;

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedSnapshot {
    pub format_version: u32,
    pub step: u64,
    pub layers: Vec<SerializedLayer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedLayer {
    /// `fan_in + 1` (bias row included).
    pub rows: usize,
    pub cols: usize,
    /// Row-major (rows, cols).
    pub weights: Vec<f64>,
    pub first_moment: Vec<f64>,
    pub second_moment: Vec<f64>,
}

impl SerializedSnapshot {
    pub fn validate(&self) -> Result<()> {
        if self.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(Error::InvalidData(format!(
                "unsupported snapshot format_version {}; expected {}",
                self.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }
        if self.layers.is_empty() {
            return Err(Error::InvalidData(
                "snapshot must have at least one layer".to_owned(),
            ));
        }

        for (i, layer) in self.layers.iter().enumerate() {
            layer
                .validate()
                .map_err(|e| Error::InvalidData(format!("layer {i}: {e}")))?;

            if i > 0 {
                // Layer i consumes layer i-1's outputs plus the bias feature.
                let prev_out = self.layers[i - 1].cols;
                if layer.rows != prev_out + 1 {
                    return Err(Error::InvalidData(format!(
                        "layer {i} has {} rows but previous layer has {prev_out} outputs",
                        layer.rows
                    )));
                }
            }
        }

        Ok(())
    }
}

impl SerializedLayer {
    fn validate(&self) -> Result<()> {
        if self.rows < 2 || self.cols == 0 {
            return Err(Error::InvalidData(format!(
                "layer shape must be at least 2x1, got {}x{}",
                self.rows, self.cols
            )));
        }

        let expected = self
            .rows
            .checked_mul(self.cols)
            .ok_or_else(|| Error::InvalidData("layer shape overflow".to_owned()))?;
        for (name, buf) in [
            ("weights", &self.weights),
            ("first_moment", &self.first_moment),
            ("second_moment", &self.second_moment),
        ] {
            if buf.len() != expected {
                return Err(Error::InvalidData(format!(
                    "{name} length {} does not match rows * cols ({} * {})",
                    buf.len(),
                    self.rows,
                    self.cols
                )));
            }
            if buf.iter().any(|v| !v.is_finite()) {
                return Err(Error::InvalidData(format!(
                    "{name} must contain only finite values"
                )));
            }
        }

        Ok(())
    }
}

impl From<&ModelSnapshot> for SerializedSnapshot {
    fn from(snapshot: &ModelSnapshot) -> Self {
        let layers = snapshot
            .weights
            .iter()
            .zip(&snapshot.first_moment)
            .zip(&snapshot.second_moment)
            .map(|((w, m), v)| SerializedLayer {
                rows: w.rows(),
                cols: w.cols(),
                weights: w.as_slice().to_vec(),
                first_moment: m.as_slice().to_vec(),
                second_moment: v.as_slice().to_vec(),
            })
            .collect();
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            step: snapshot.step,
            layers,
        }
    }
}

impl TryFrom<SerializedSnapshot> for ModelSnapshot {
    type Error = Error;

    fn try_from(value: SerializedSnapshot) -> std::result::Result<Self, Self::Error> {
        value.validate()?;

        let n = value.layers.len();
        let mut weights = Vec::with_capacity(n);
        let mut first_moment = Vec::with_capacity(n);
        let mut second_moment = Vec::with_capacity(n);
        for layer in value.layers {
            let (rows, cols) = (layer.rows, layer.cols);
            weights.push(Matrix::from_vec(rows, cols, layer.weights)?);
            first_moment.push(Matrix::from_vec(rows, cols, layer.first_moment)?);
            second_moment.push(Matrix::from_vec(rows, cols, layer.second_moment)?);
        }

        Ok(ModelSnapshot {
            weights,
            first_moment,
            second_moment,
            step: value.step,
        })
    }
}

impl ModelSnapshot {
    /// Serialize the snapshot to a pretty-printed JSON string.
    pub fn to_json_string_pretty(&self) -> Result<String> {
        let ser = SerializedSnapshot::from(self);
        serde_json::to_string_pretty(&ser)
            .map_err(|e| Error::InvalidData(format!("failed to serialize snapshot: {e}")))
    }

    /// Serialize the snapshot to a compact JSON string.
    pub fn to_json_string(&self) -> Result<String> {
        let ser = SerializedSnapshot::from(self);
        serde_json::to_string(&ser)
            .map_err(|e| Error::InvalidData(format!("failed to serialize snapshot: {e}")))
    }

    /// Parse a snapshot from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let ser: SerializedSnapshot = serde_json::from_str(s)
            .map_err(|e| Error::InvalidData(format!("failed to parse snapshot json: {e}")))?;
        ser.try_into()
    }

    /// Save the snapshot to a JSON file (pretty-printed).
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let s = self.to_json_string_pretty()?;
        let p = path.as_ref();
        std::fs::write(p, s)
            .map_err(|e| Error::InvalidData(format!("failed to write {}: {e}", p.display())))?;
        Ok(())
    }

    /// Load a snapshot from a JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        let s = std::fs::read_to_string(p)
            .map_err(|e| Error::InvalidData(format!("failed to read {}: {e}", p.display())))?;
        Self::from_json_str(&s)
    }
}
