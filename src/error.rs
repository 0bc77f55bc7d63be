use thiserror::Error;

/// Error types for the eisfit-rs library.
///
/// Only configuration-level problems surface here. Numeric trouble during a
/// search (non-positive candidates, NaN/Inf predictions) is absorbed by the
/// cost builder as a penalty, and solver non-convergence is reported through
/// `FitResult::success`.
#[derive(Error, Debug)]
pub enum EisFitError {
    /// A model or free-parameter list referenced a name absent from the set.
    #[error("Parameter not found: {0}")]
    MissingParameter(String),

    /// The same parameter name appears twice in a free-parameter list.
    #[error("Duplicate parameter: {0}")]
    DuplicateParameter(String),

    /// No circuit model is registered under the requested name.
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// No optimization backend is registered under the requested name.
    #[error("Unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    /// Error indicating a mismatch in vector or matrix dimensions.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Not enough data points to estimate the free parameters.
    #[error("Degenerate degrees of freedom: {n_free} free parameters for {n_points} data points")]
    DegenerateDof { n_points: usize, n_free: usize },

    /// Invalid input data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error indicating a singular matrix was encountered.
    #[error("Singular matrix encountered")]
    SingularMatrix,

    /// Linear algebra error.
    #[error("Linear algebra error: {0}")]
    LinearAlgebraError(String),

    /// A backend could not be set up or aborted abnormally.
    #[error("Optimization failed: {0}")]
    OptimizationFailure(String),

    /// Malformed parameter interchange data.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The run observed a cancellation request.
    #[error("Run cancelled")]
    Cancelled,

    /// The background worker went away without delivering a completion.
    #[error("Worker disconnected before completion")]
    WorkerDisconnected,

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Generic error for cases that don't fit the other categories.
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for eisfit-rs operations.
pub type Result<T> = std::result::Result<T, EisFitError>;

impl From<String> for EisFitError {
    fn from(s: String) -> Self {
        EisFitError::Other(s)
    }
}

impl From<&str> for EisFitError {
    fn from(s: &str) -> Self {
        EisFitError::Other(s.to_string())
    }
}
