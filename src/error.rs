//! The error type shared by every fallible operation in the crate.

use crate::graph::Direction;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("vertex {vertex} is out of bounds for a connectome of {size} neurons")]
    VertexOutOfBounds { vertex: usize, size: usize },
    #[error("invalid connection weight: {0}")]
    InvalidWeight(f64),
    #[error("direction {0:?} is not supported by this operation")]
    UnsupportedDirection(Direction),
    #[error("operation requires a binary connectome")]
    NotBinary,
    #[error("connectome has no connections")]
    EmptyConnectome,
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("neuron {0} has no depth")]
    MissingDepth(usize),
    #[error("vertex {vertex} requires {required} candidates but only {available} are eligible")]
    InsufficientCandidates {
        vertex: usize,
        required: usize,
        available: usize,
    },
    #[error("at least {required} data points are needed for the fit, found {found}")]
    InsufficientData { required: usize, found: usize },
    #[error("fit did not converge after {0} iterations")]
    FitDidNotConverge(usize),
    #[error("a worker thread panicked")]
    WorkerPanicked,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
