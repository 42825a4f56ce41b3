//! Error types for the Parley library.
//!
//! Every fallible operation in the crate returns [`Result`], whose error type
//! is [`ParleyError`]. Expected validation failures (a rejected learning
//! example, unsafe user input) are *not* errors; they are reported through
//! value types such as [`Validation`](crate::safety::Validation) and
//! [`LearningOutcome`](crate::classifier::LearningOutcome).
//!
//! # Examples
//!
//! ```
//! use parley::error::{ParleyError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(ParleyError::configuration("no training data"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Parley operations.
#[derive(Error, Debug)]
pub enum ParleyError {
    /// I/O errors (file storage, dataset files).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary (model weight) serialization errors.
    #[error("Binary serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Invalid configuration or training data.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Storage backend failures.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Model lifecycle errors.
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Failures inside a training run.
    #[error("Training error: {0}")]
    Training(String),

    /// Generic error for other cases.
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for operations that may fail with [`ParleyError`].
pub type Result<T> = std::result::Result<T, ParleyError>;

impl ParleyError {
    /// Create a new configuration error.
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        ParleyError::Configuration(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        ParleyError::Storage(msg.into())
    }

    /// Create a new training error.
    pub fn training<S: Into<String>>(msg: S) -> Self {
        ParleyError::Training(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        ParleyError::Other(msg.into())
    }

    /// Whether this error means the classifier has no model yet.
    pub fn is_not_trained(&self) -> bool {
        matches!(self, ParleyError::Model(ModelError::ModelNotTrained { .. }))
    }
}

/// Model lifecycle error types.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model not trained: {message}")]
    ModelNotTrained { message: String },

    #[error("Training data insufficient: need at least {min_samples} samples, got {actual}")]
    InsufficientTrainingData { min_samples: usize, actual: usize },

    #[error("Shape mismatch: expected {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Model saving failed: {reason}")]
    SaveFailed { reason: String },
}
