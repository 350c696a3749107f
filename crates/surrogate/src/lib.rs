//! Regularized tensor-product spline surrogates with analytic gradients.
//!
//! A [`Surrogate`] is fit once from scattered training sites and a matrix of
//! training outputs, then evaluated at arbitrary query points. Each output
//! column is an independent cubic B-spline over the same tensor-product basis,
//! so one fit serves many outputs.
//!
//! # Fit
//!
//! The control-point coefficients `c` minimize
//!
//! ```text
//! ½ cᵀ (E + ridge·I) c + ½ fit_weight ‖B c − y‖²
//! ```
//!
//! where `B` is the basis evaluated at the training sites and
//! `E = Σₖ ∫ (∂²f/∂xₖ²)²` is the curvature energy. A large `fit_weight` tracks
//! the data closely; a small one favors smoothness. The surrogate is piecewise
//! cubic and C² everywhere, so [`Surrogate::evaluate_gradient`] is exact and
//! consistent with [`Surrogate::evaluate`].
//!
//! # Extrapolation
//!
//! Queries outside the fitted limits are evaluated by continuing the boundary
//! polynomial pieces. They are counted and logged, never rejected.

mod bspline;
mod energy;
mod error;
mod options;
mod surrogate;

pub use bspline::BSplineBasis;
pub use error::{EvalError, FitError};
pub use options::{AxisOptions, ConfigError, FitOptions};
pub use surrogate::{FitReport, Surrogate};
