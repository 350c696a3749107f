use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::BSplineBasis;

/// Limits and resolution of one input axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisOptions {
    pub lower: f64,
    pub upper: f64,
    pub num_elements: usize,
}

impl AxisOptions {
    #[must_use]
    pub fn new(lower: f64, upper: f64, num_elements: usize) -> Self {
        Self {
            lower,
            upper,
            num_elements,
        }
    }

    pub(crate) fn basis(&self) -> BSplineBasis {
        BSplineBasis::new(self.lower, self.upper, self.num_elements)
    }
}

/// Options controlling a surrogate fit.
///
/// Deserializing goes through [`FitOptions::new`], so a deserialized value is
/// always valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFitOptions")]
pub struct FitOptions {
    axes: Vec<AxisOptions>,
    fit_weight: f64,
    ridge: f64,
    degeneracy_tol: f64,
}

/// Errors that can occur when validating fit options.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("at least one axis is required")]
    NoAxes,

    #[error("axis {axis} must have finite limits with lower < upper")]
    Limits { axis: usize },

    #[error("axis {axis} must have at least one element")]
    Elements { axis: usize },

    #[error("fit_weight must be finite and positive")]
    FitWeight,

    #[error("ridge must be finite and non-negative")]
    Ridge,

    #[error("degeneracy_tol must be finite and non-negative")]
    DegeneracyTol,
}

impl FitOptions {
    pub const DEFAULT_RIDGE: f64 = 1e-8;
    pub const DEFAULT_DEGENERACY_TOL: f64 = 1e-14;

    /// Creates validated fit options with default ridge and degeneracy tolerance.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no axes, an axis has an empty or
    /// non-finite interval or zero elements, or `fit_weight` is not positive.
    pub fn new(axes: Vec<AxisOptions>, fit_weight: f64) -> Result<Self, ConfigError> {
        Self::with_regularization(
            axes,
            fit_weight,
            Self::DEFAULT_RIDGE,
            Self::DEFAULT_DEGENERACY_TOL,
        )
    }

    /// Creates validated fit options with explicit regularization settings.
    ///
    /// `ridge` adds a small multiple of the identity to the system matrix.
    /// `degeneracy_tol` is the smallest acceptable ratio between the smallest
    /// and largest squared Cholesky pivots before a fit is flagged degenerate.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as [`FitOptions::new`], or if
    /// `ridge` or `degeneracy_tol` is negative or non-finite.
    pub fn with_regularization(
        axes: Vec<AxisOptions>,
        fit_weight: f64,
        ridge: f64,
        degeneracy_tol: f64,
    ) -> Result<Self, ConfigError> {
        if axes.is_empty() {
            return Err(ConfigError::NoAxes);
        }
        for (axis, options) in axes.iter().enumerate() {
            let finite = options.lower.is_finite() && options.upper.is_finite();
            if !finite || options.lower >= options.upper {
                return Err(ConfigError::Limits { axis });
            }
            if options.num_elements == 0 {
                return Err(ConfigError::Elements { axis });
            }
        }
        if !fit_weight.is_finite() || fit_weight <= 0.0 {
            return Err(ConfigError::FitWeight);
        }
        if !ridge.is_finite() || ridge < 0.0 {
            return Err(ConfigError::Ridge);
        }
        if !degeneracy_tol.is_finite() || degeneracy_tol < 0.0 {
            return Err(ConfigError::DegeneracyTol);
        }

        Ok(Self {
            axes,
            fit_weight,
            ridge,
            degeneracy_tol,
        })
    }

    #[must_use]
    pub fn axes(&self) -> &[AxisOptions] {
        &self.axes
    }

    /// Returns the number of input dimensions.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.axes.len()
    }

    #[must_use]
    pub fn fit_weight(&self) -> f64 {
        self.fit_weight
    }

    #[must_use]
    pub fn ridge(&self) -> f64 {
        self.ridge
    }

    #[must_use]
    pub fn degeneracy_tol(&self) -> f64 {
        self.degeneracy_tol
    }
}

#[derive(Deserialize)]
struct RawFitOptions {
    axes: Vec<AxisOptions>,
    fit_weight: f64,
    #[serde(default = "default_ridge")]
    ridge: f64,
    #[serde(default = "default_degeneracy_tol")]
    degeneracy_tol: f64,
}

fn default_ridge() -> f64 {
    FitOptions::DEFAULT_RIDGE
}

fn default_degeneracy_tol() -> f64 {
    FitOptions::DEFAULT_DEGENERACY_TOL
}

impl TryFrom<RawFitOptions> for FitOptions {
    type Error = ConfigError;

    fn try_from(raw: RawFitOptions) -> Result<Self, Self::Error> {
        Self::with_regularization(raw.axes, raw.fit_weight, raw.ridge, raw.degeneracy_tol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_axis() -> AxisOptions {
        AxisOptions::new(0.0, 1.0, 2)
    }

    #[test]
    fn accepts_valid_options() {
        let options = FitOptions::new(vec![unit_axis(), unit_axis()], 1e5).unwrap();

        assert_eq!(options.dim(), 2);
        assert_eq!(options.ridge(), FitOptions::DEFAULT_RIDGE);
    }

    #[test]
    fn rejects_invalid_options() {
        assert_eq!(FitOptions::new(vec![], 1.0), Err(ConfigError::NoAxes));
        assert_eq!(
            FitOptions::new(vec![unit_axis(), AxisOptions::new(1.0, 1.0, 2)], 1.0),
            Err(ConfigError::Limits { axis: 1 })
        );
        assert_eq!(
            FitOptions::new(vec![AxisOptions::new(0.0, f64::INFINITY, 2)], 1.0),
            Err(ConfigError::Limits { axis: 0 })
        );
        assert_eq!(
            FitOptions::new(vec![AxisOptions::new(0.0, 1.0, 0)], 1.0),
            Err(ConfigError::Elements { axis: 0 })
        );
        assert_eq!(
            FitOptions::new(vec![unit_axis()], 0.0),
            Err(ConfigError::FitWeight)
        );
        assert_eq!(
            FitOptions::with_regularization(vec![unit_axis()], 1.0, -1.0, 0.0),
            Err(ConfigError::Ridge)
        );
        assert_eq!(
            FitOptions::with_regularization(vec![unit_axis()], 1.0, 0.0, f64::NAN),
            Err(ConfigError::DegeneracyTol)
        );
    }
}
