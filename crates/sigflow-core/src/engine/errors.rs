//! Error types for signal flow computation.

use thiserror::Error;

/// Errors that can occur while configuring or running a signal flow algorithm.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in the future without breaking changes.
///
/// Configuration errors (bad parameters, non-square matrices, unknown nodes,
/// unsupported perturbation types) are raised before any computation starts.
/// Numerical errors are never retried by the engine; callers running large
/// randomized sweeps decide whether to discard the sample.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SignalFlowError {
    /// Generic configuration problem (missing data, inconsistent dataset, ...).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A parameter value was rejected by its setter.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Matrix or vector dimensions do not agree.
    #[error("dimension mismatch in {what}: expected {expected}, found {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: String,
        found: String,
    },

    /// A node name is not part of the network.
    #[error("unknown node '{0}'")]
    UnknownNode(String),

    /// A perturbation type other than `node`, `link` or `isolation`.
    #[error("undefined perturbation type: {0}")]
    UnsupportedPerturbation(String),

    /// Two result tables that should be compared have different shapes.
    #[error("shape mismatch: {left:?} vs {right:?}")]
    ShapeMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },

    /// The exact solution was explicitly requested but is not available.
    #[error(transparent)]
    Singular(#[from] SingularSystem),

    /// Non-finite values produced while solving.
    #[error("numerical error: {0}")]
    Numerical(String),

    /// An operation was called before the state it depends on was built.
    #[error("{0} is not initialized")]
    NotInitialized(&'static str),

    /// Failure while reading a data file.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed line in a data file.
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Outcome of exact-operator preparation when `(I - αW)` (or the diffusion
/// variant of it) cannot be inverted.
///
/// This is a plain value, not a failure of the run: the solver branches on it
/// and switches to the iterative path until the weight matrix changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("singular system: the exact solution operator is not invertible")]
pub struct SingularSystem;

impl SignalFlowError {
    pub(crate) fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        SignalFlowError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn dimension_mismatch(
        what: &'static str,
        expected: impl ToString,
        found: impl ToString,
    ) -> Self {
        SignalFlowError::DimensionMismatch {
            what,
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// True for errors caused by the numeric state of a sample rather than
    /// by the configuration. Randomized harnesses resample on these.
    pub fn is_numerical(&self) -> bool {
        matches!(
            self,
            SignalFlowError::Numerical(_) | SignalFlowError::Singular(_)
        )
    }
}
