//! Error types for deep_prob.

use thiserror::Error;

/// Errors raised by distributions, transformations and samplers.
#[derive(Error, Debug)]
pub enum Error {
    /// An argument had a valid type but an unusable value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation exists on the interface but is not supported here.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Shapes could not be broadcast or did not match.
    #[error("shape error: {0}")]
    Shape(String),

    /// A distribution parameter or sample violated its constraint.
    #[error("parameter `{param}` violates constraint `{constraint}`")]
    Constraint {
        param: String,
        constraint: &'static str,
    },

    /// Error reported by libtorch.
    #[error(transparent)]
    Torch(#[from] tch::TchError),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
