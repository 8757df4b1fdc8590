use thiserror::Error;

/// Errors that can occur in transx-kge.
#[derive(Error, Debug)]
pub enum Error {
    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Array reshape failed.
    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
    /// Training data required to define parameters is not available.
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),
    /// Operation invoked before parameters were defined.
    #[error("{model}: parameters are not defined yet")]
    NotInitialized {
        /// Model name.
        model: &'static str,
    },
    /// Parameters were already defined; a fresh model is required.
    #[error("{model}: parameters are already defined")]
    AlreadyInitialized {
        /// Model name.
        model: &'static str,
    },
    /// Batch or operand shapes disagree.
    #[error("Shape mismatch in {context}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        /// Where the mismatch was detected.
        context: &'static str,
        /// Expected shape.
        expected: Vec<usize>,
        /// Actual shape.
        found: Vec<usize>,
    },
    /// Entity or relation id outside its table.
    #[error("{kind} id {index} out of bounds (table has {bound} rows)")]
    IndexOutOfBounds {
        /// "entity" or "relation".
        kind: &'static str,
        /// Offending id.
        index: usize,
        /// Number of rows in the table.
        bound: usize,
    },
    /// Attempted to mutate a non-trainable parameter.
    #[error("Parameter is frozen: {0}")]
    FrozenParameter(String),
    /// Parameter name not known to the model.
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),
    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for transx-kge.
pub type Result<T> = std::result::Result<T, Error>;
