use std::io;

/// Represents the different types of errors that can occur while fitting or querying the estimator.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    /// An operation other than `fit` was called before the estimator was fitted
    #[error("Model is not fitted yet: call fit() before using it")]
    NotFittedError,
    /// Error occurred due to invalid input parameters or mismatched shapes
    #[error("Validation error: {0}")]
    ValidationError(String),
    /// The external fastText component failed; carries its original message
    #[error("Backend error: {0}")]
    BackendError(String),
    /// Output produced by the external component could not be parsed
    #[error("Parse error: {0}")]
    ParseError(String),
    /// Error occurred while creating, writing or reading a temporary artifact
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}
