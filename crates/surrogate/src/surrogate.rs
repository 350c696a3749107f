use log::{debug, info, warn};
use nalgebra::{Cholesky, DMatrix};
use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewMut1};

use crate::{
    BSplineBasis, EvalError, FitError, FitOptions,
    bspline::ORDER,
    energy::curvature_energy,
};

/// Diagnostics recorded when a surrogate is fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitReport {
    /// Number of control points per output.
    pub num_coefficients: usize,

    /// Root-mean-square residual over all training sites and outputs.
    pub rms_residual: f64,

    /// Ratio of the smallest to largest squared Cholesky pivot.
    ///
    /// Small values indicate a nearly singular fit system.
    pub pivot_ratio: f64,

    /// Whether `pivot_ratio` fell below the configured tolerance.
    pub degenerate: bool,
}

/// A fitted tensor-product cubic spline surrogate.
///
/// Immutable once fit. See the [crate docs](crate) for the fit formulation.
#[derive(Debug, Clone)]
pub struct Surrogate {
    bases: Vec<BSplineBasis>,
    /// Control points, one row per tensor-product basis function
    /// (row-major over axes) and one column per output.
    coefficients: Array2<f64>,
    report: FitReport,
}

impl Surrogate {
    /// Fits a surrogate to training data.
    ///
    /// `sites` has one row per training point and one column per axis;
    /// `outputs` has one row per training point and one column per output.
    /// Rows correspond positionally.
    ///
    /// A nearly singular fit is logged and flagged in [`Surrogate::report`]
    /// but still returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the shapes disagree, any value is non-finite, or the
    /// regularized system is not positive definite.
    pub fn fit(
        sites: ArrayView2<f64>,
        outputs: ArrayView2<f64>,
        options: &FitOptions,
    ) -> Result<Self, FitError> {
        validate_training(sites, outputs, options.dim())?;

        let bases: Vec<BSplineBasis> = options.axes().iter().map(|a| a.basis()).collect();
        let size: usize = bases.iter().map(BSplineBasis::num_basis).product();
        let num_outputs = outputs.ncols();
        debug!(
            "fitting {num_outputs} outputs over {} sites with {size} coefficients",
            sites.nrows()
        );

        // Unweighted normal equations BᵀB and Bᵀy.
        let mut btb = DMatrix::<f64>::zeros(size, size);
        let mut bty = DMatrix::<f64>::zeros(size, num_outputs);
        let mut terms = Vec::with_capacity(ORDER.pow(bases.len() as u32));
        for (site, y) in sites.rows().into_iter().zip(outputs.rows()) {
            tensor_terms(&bases, site, None, &mut terms);
            for &(i, wi) in &terms {
                for &(j, wj) in &terms {
                    btb[(i, j)] += wi * wj;
                }
                for (k, yk) in y.iter().enumerate() {
                    bty[(i, k)] += wi * yk;
                }
            }
        }

        let weight = options.fit_weight();
        let mut system = curvature_energy(&bases);
        system += &btb * weight;
        for i in 0..size {
            system[(i, i)] += options.ridge();
        }

        let cholesky = Cholesky::new(system).ok_or(FitError::NotPositiveDefinite { size })?;
        let pivot_ratio = pivot_ratio(&cholesky);
        let solution = cholesky.solve(&(&bty * weight));

        let coefficients = Array2::from_shape_fn((size, num_outputs), |(i, k)| solution[(i, k)]);

        let rms_residual = rms_residual(&btb, &bty, &solution, outputs);
        let degenerate = pivot_ratio < options.degeneracy_tol();
        if degenerate {
            warn!(
                "surrogate fit is nearly singular: pivot ratio {pivot_ratio:e} below {:e}",
                options.degeneracy_tol()
            );
        }
        let report = FitReport {
            num_coefficients: size,
            rms_residual,
            pivot_ratio,
            degenerate,
        };
        info!("surrogate fit complete: {report:?}");

        Ok(Self {
            bases,
            coefficients,
            report,
        })
    }

    /// Returns the number of input dimensions.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.bases.len()
    }

    /// Returns the number of outputs predicted at each query point.
    #[must_use]
    pub fn num_outputs(&self) -> usize {
        self.coefficients.ncols()
    }

    #[must_use]
    pub fn bases(&self) -> &[BSplineBasis] {
        &self.bases
    }

    #[must_use]
    pub fn report(&self) -> &FitReport {
        &self.report
    }

    /// Evaluates every output at each query point.
    ///
    /// Returns one row per query row, in the same order.
    ///
    /// # Errors
    ///
    /// Returns an error if `query` does not have one column per axis.
    pub fn evaluate(&self, query: ArrayView2<f64>) -> Result<Array2<f64>, EvalError> {
        Ok(self.evaluate_with(query, None, "evaluate")?.0)
    }

    /// Like [`Surrogate::evaluate`], also returning how many query rows were
    /// extrapolated.
    ///
    /// # Errors
    ///
    /// Returns an error if `query` does not have one column per axis.
    pub fn evaluate_counted(
        &self,
        query: ArrayView2<f64>,
    ) -> Result<(Array2<f64>, usize), EvalError> {
        self.evaluate_with(query, None, "evaluate")
    }

    /// Evaluates the partial derivative of every output with respect to
    /// `axis` at each query point.
    ///
    /// # Errors
    ///
    /// Returns an error if `query` does not have one column per axis or `axis`
    /// is out of range.
    pub fn evaluate_gradient(
        &self,
        query: ArrayView2<f64>,
        axis: usize,
    ) -> Result<Array2<f64>, EvalError> {
        if axis >= self.dim() {
            return Err(EvalError::AxisOutOfRange {
                axis,
                dim: self.dim(),
            });
        }
        Ok(self.evaluate_with(query, Some(axis), "evaluate_gradient")?.0)
    }

    /// Counts query rows with at least one coordinate outside the fitted limits.
    #[must_use]
    pub fn count_out_of_domain(&self, query: ArrayView2<f64>) -> usize {
        query
            .rows()
            .into_iter()
            .filter(|row| {
                row.iter()
                    .zip(&self.bases)
                    .any(|(&x, basis)| !basis.contains(x))
            })
            .count()
    }

    fn evaluate_with(
        &self,
        query: ArrayView2<f64>,
        derivative: Option<usize>,
        operation: &str,
    ) -> Result<(Array2<f64>, usize), EvalError> {
        if query.ncols() != self.dim() {
            return Err(EvalError::QueryDimension {
                expected: self.dim(),
                actual: query.ncols(),
            });
        }

        let outside = self.count_out_of_domain(query);
        if outside > 0 {
            warn!(
                "{operation}: {outside} of {} query points lie outside the fitted domain and are extrapolated",
                query.nrows()
            );
        }

        let mut result = Array2::zeros((query.nrows(), self.num_outputs()));
        let mut terms = Vec::with_capacity(ORDER.pow(self.dim() as u32));
        for (point, out) in query.rows().into_iter().zip(result.rows_mut()) {
            tensor_terms(&self.bases, point, derivative, &mut terms);
            accumulate(&self.coefficients, &terms, out);
        }
        Ok((result, outside))
    }
}

/// Collects the nonzero tensor-product basis terms at `point` into `terms`
/// as `(coefficient row, weight)` pairs.
///
/// With `derivative = Some(axis)`, that axis uses first-derivative basis
/// values so the weights give the partial derivative along it.
fn tensor_terms(
    bases: &[BSplineBasis],
    point: ArrayView1<f64>,
    derivative: Option<usize>,
    terms: &mut Vec<(usize, f64)>,
) {
    terms.clear();
    terms.push((0, 1.0));

    for (axis, (basis, &x)) in bases.iter().zip(point.iter()).enumerate() {
        let order = usize::from(derivative == Some(axis));
        let (first, values) = basis.eval(x, order);
        let stride = basis.num_basis();

        let previous = std::mem::take(terms);
        for (index, weight) in previous {
            for (offset, value) in values.iter().enumerate() {
                terms.push((index * stride + first + offset, weight * value));
            }
        }
    }
}

fn accumulate(coefficients: &Array2<f64>, terms: &[(usize, f64)], mut out: ArrayViewMut1<f64>) {
    for &(index, weight) in terms {
        if weight != 0.0 {
            out.scaled_add(weight, &coefficients.row(index));
        }
    }
}

fn validate_training(
    sites: ArrayView2<f64>,
    outputs: ArrayView2<f64>,
    dim: usize,
) -> Result<(), FitError> {
    if sites.ncols() != dim {
        return Err(FitError::SiteDimension {
            expected: dim,
            actual: sites.ncols(),
        });
    }
    if sites.nrows() != outputs.nrows() {
        return Err(FitError::RowMismatch {
            sites: sites.nrows(),
            outputs: outputs.nrows(),
        });
    }
    if sites.nrows() == 0 {
        return Err(FitError::Empty);
    }
    if outputs.ncols() == 0 {
        return Err(FitError::NoOutputs);
    }
    for (row, (site, y)) in sites.rows().into_iter().zip(outputs.rows()).enumerate() {
        if !site.iter().chain(y.iter()).all(|v| v.is_finite()) {
            return Err(FitError::NonFinite { row });
        }
    }
    Ok(())
}

fn pivot_ratio(cholesky: &Cholesky<f64, nalgebra::Dyn>) -> f64 {
    let (min, max) = cholesky
        .l_dirty()
        .diagonal()
        .iter()
        .map(|d| d * d)
        .fold((f64::INFINITY, 0.0_f64), |(lo, hi), d| (lo.min(d), hi.max(d)));
    if max > 0.0 { min / max } else { 0.0 }
}

/// `‖B c − y‖` from the normal equations, as an RMS over all entries.
fn rms_residual(
    btb: &DMatrix<f64>,
    bty: &DMatrix<f64>,
    c: &DMatrix<f64>,
    outputs: ArrayView2<f64>,
) -> f64 {
    let fitted = (c.transpose() * btb * c).trace();
    let cross = c.dot(bty);
    let data: f64 = outputs.iter().map(|y| y * y).sum();

    let sum_sq = (fitted - 2.0 * cross + data).max(0.0);
    (sum_sq / outputs.len() as f64).sqrt()
}
