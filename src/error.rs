//! Error types for u-bayesflow.
//!
//! Only out-of-domain inputs are errors. Sampler pathologies (divergences,
//! poor mixing, high R-hat) are reported as [`crate::diagnostics::Signal`]s
//! and never raised here.

use thiserror::Error;

/// Top-level error type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A parameter is outside its domain.
    #[error("invalid parameter: {param} = {value}, expected {constraint}")]
    InvalidParameter {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// A summary was requested for a zero-length sequence.
    #[error("cannot summarize an empty sequence")]
    EmptyInput,

    /// The input contains NaN or an infinity.
    #[error("non-finite value {value} at index {index}")]
    NonFiniteInput { index: usize, value: f64 },

    /// Not enough observations for the requested statistic.
    #[error("need at least {required} observations, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// The model specification is malformed.
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// A draw set does not contain a variable the caller needs.
    #[error("variable not found in draws: {0}")]
    MissingVariable(String),

    /// Draw values do not match the declared chain/draw layout.
    #[error("shape mismatch for {variable}: expected {expected} values, got {actual}")]
    ShapeMismatch {
        variable: String,
        expected: usize,
        actual: usize,
    },

    /// Posterior sampling was requested for a model without observed data.
    #[error("model has no observed variable to condition on")]
    MissingObservation,

    /// The inference backend reported a failure.
    #[error("inference backend failed: {0}")]
    Backend(String),
}

/// Structural problems in a [`crate::model::ModelSpec`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("model declares no variables")]
    Empty,

    #[error("variable declared twice: {0}")]
    DuplicateVariable(String),

    #[error("{variable} references undeclared variable {reference}")]
    UnknownReference { variable: String, reference: String },

    #[error("dependency cycle through: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("observed variable is not declared: {0}")]
    UnknownObserved(String),

    #[error("observed variable {observed} is referenced by {by}")]
    ObservedReferenced { observed: String, by: String },
}

impl Error {
    /// Builds an [`Error::InvalidParameter`].
    pub fn invalid(
        param: impl Into<String>,
        value: impl ToString,
        constraint: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            param: param.into(),
            value: value.to_string(),
            constraint: constraint.into(),
        }
    }
}

/// Result type alias for u-bayesflow.
pub type Result<T> = std::result::Result<T, Error>;
