use thiserror::Error;

/// Errors that can occur while fitting a surrogate.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FitError {
    /// The site matrix has a different number of columns than there are axes.
    #[error("sites have {actual} columns, expected one per axis ({expected})")]
    SiteDimension { expected: usize, actual: usize },

    /// Sites and outputs disagree on the number of training points.
    #[error("{sites} training sites but {outputs} output rows")]
    RowMismatch { sites: usize, outputs: usize },

    #[error("no training points")]
    Empty,

    #[error("no output columns")]
    NoOutputs,

    /// A site or output value is NaN or infinite.
    #[error("non-finite training value at row {row}")]
    NonFinite { row: usize },

    /// The regularized normal equations are not positive definite.
    ///
    /// No surrogate can be built from this data and these options.
    #[error("fit system of size {size} is not positive definite")]
    NotPositiveDefinite { size: usize },
}

/// Errors that can occur while evaluating a surrogate.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EvalError {
    /// The query matrix has a different number of columns than there are axes.
    #[error("query has {actual} columns, expected {expected}")]
    QueryDimension { expected: usize, actual: usize },

    /// A gradient was requested along an axis the surrogate does not have.
    #[error("axis {axis} is out of range for a {dim}-dimensional surrogate")]
    AxisOutOfRange { axis: usize, dim: usize },
}
