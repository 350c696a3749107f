use cadre_core::SequenceError;
use cadre_surrogate::{ConfigError, EvalError, FitError};
use thiserror::Error;

use crate::{ConfigLoadError, TableError};

/// Errors raised by the exposed-area discipline.
///
/// Table, config, and fit errors occur at construction and are fatal.
/// Sequence, input, and shape errors are caller logic errors that must abort
/// the enclosing optimization step.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Config(#[from] ConfigLoadError),

    #[error(transparent)]
    FitOptions(#[from] ConfigError),

    #[error(transparent)]
    Fit(#[from] FitError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Sequence(#[from] SequenceError),

    /// The angle normalizer failed.
    #[error("angle normalizer failed: {0}")]
    Normalizer(Box<dyn std::error::Error + Send + Sync>),

    /// `linearize` was called at a different input than the last nonlinear solve.
    #[error("linearize called at an input that differs from the last nonlinear solve")]
    InputChanged,

    /// An input, seed, or surrogate has the wrong shape.
    #[error("`{name}` has shape {actual:?}, expected {expected:?}")]
    ShapeMismatch {
        name: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
}

impl Error {
    pub(crate) fn shape(name: &'static str, expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            name,
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}
