use thiserror::Error;

/// Errors surfaced by the training core.
///
/// Every variant is fatal to the call that produced it; nothing is retried or
/// substituted internally.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Matrix dimensions disagree with the architecture, the cached batch, or each other.
    #[error("shape error: {0}")]
    Shape(String),
    /// An operation was called out of order (e.g. `backward` before `forward`).
    #[error("state error: {0}")]
    State(String),
    /// The architecture or hyperparameters are inconsistent.
    #[error("config error: {0}")]
    Config(String),
    /// A persisted snapshot could not be decoded or failed validation.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, Error>;
