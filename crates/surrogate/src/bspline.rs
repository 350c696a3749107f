/// Polynomial degree of every basis function.
pub const DEGREE: usize = 3;

/// Number of basis functions that are nonzero on any one element.
pub const ORDER: usize = DEGREE + 1;

/// A clamped, uniform cubic B-spline basis on one axis.
///
/// The interval `[lower, upper]` is split into `num_elements` equal elements.
/// End knots are repeated so the spline interpolates its first and last
/// control points, giving `num_elements + 3` basis functions.
///
/// Points outside the interval are evaluated on the nearest boundary element,
/// which continues that element's cubic polynomial.
#[derive(Debug, Clone, PartialEq)]
pub struct BSplineBasis {
    lower: f64,
    upper: f64,
    num_elements: usize,
    knots: Vec<f64>,
}

impl BSplineBasis {
    /// Creates a basis over `[lower, upper]` with `num_elements` elements.
    ///
    /// Callers are expected to pass a finite, non-empty interval and at least
    /// one element; [`AxisOptions`](crate::AxisOptions) validates both.
    #[must_use]
    pub fn new(lower: f64, upper: f64, num_elements: usize) -> Self {
        let h = (upper - lower) / num_elements as f64;

        let mut knots = Vec::with_capacity(num_elements + 2 * ORDER - 1);
        knots.extend([lower; DEGREE]);
        knots.extend((0..num_elements).map(|i| lower + h * i as f64));
        knots.extend([upper; ORDER]);

        Self {
            lower,
            upper,
            num_elements,
            knots,
        }
    }

    #[must_use]
    pub fn lower(&self) -> f64 {
        self.lower
    }

    #[must_use]
    pub fn upper(&self) -> f64 {
        self.upper
    }

    #[must_use]
    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    /// Returns the number of basis functions (control points) on this axis.
    #[must_use]
    pub fn num_basis(&self) -> usize {
        self.num_elements + DEGREE
    }

    /// Returns the element containing `x`, clamped to the boundary elements.
    #[must_use]
    pub fn element(&self, x: f64) -> usize {
        let h = (self.upper - self.lower) / self.num_elements as f64;
        let e = ((x - self.lower) / h).floor();
        if e.is_nan() || e < 0.0 {
            0
        } else {
            (e as usize).min(self.num_elements - 1)
        }
    }

    /// Returns `true` if `x` lies within the interval, up to round-off.
    #[must_use]
    pub fn contains(&self, x: f64) -> bool {
        let tol = 1e-12 * (self.upper - self.lower);
        x >= self.lower - tol && x <= self.upper + tol
    }

    /// Evaluates the `order`-th derivative of the nonzero basis functions at `x`.
    ///
    /// Returns the index of the first nonzero basis function and the values of
    /// the `ORDER` consecutive functions starting there. Derivatives above the
    /// cubic's third are identically zero.
    #[must_use]
    pub fn eval(&self, x: f64, order: usize) -> (usize, [f64; ORDER]) {
        let element = self.element(x);
        if order > DEGREE {
            return (element, [0.0; ORDER]);
        }
        (element, self.derivatives(element, x)[order])
    }

    /// All derivatives of the nonzero basis functions on `element`, evaluated
    /// at `x`; `ders[k][j]` is the `k`-th derivative of function `element + j`.
    ///
    /// This is the triangular-table recurrence for B-spline derivatives.
    /// Every divisor is a knot difference, so the result is the element's
    /// polynomial even when `x` lies outside the element.
    pub(crate) fn derivatives(&self, element: usize, x: f64) -> [[f64; ORDER]; ORDER] {
        let p = DEGREE;
        let span = element + p;
        let u = &self.knots;

        // Upper triangle holds basis values, lower triangle knot differences.
        let mut ndu = [[0.0; ORDER]; ORDER];
        let mut left = [0.0; ORDER];
        let mut right = [0.0; ORDER];
        ndu[0][0] = 1.0;
        for j in 1..=p {
            left[j] = x - u[span + 1 - j];
            right[j] = u[span + j] - x;
            let mut saved = 0.0;
            for r in 0..j {
                ndu[j][r] = right[r + 1] + left[j - r];
                let temp = ndu[r][j - 1] / ndu[j][r];
                ndu[r][j] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }
            ndu[j][j] = saved;
        }

        let mut ders = [[0.0; ORDER]; ORDER];
        for j in 0..=p {
            ders[0][j] = ndu[j][p];
        }

        let mut a = [[0.0; ORDER]; 2];
        for r in 0..=p {
            let (mut s1, mut s2) = (0, 1);
            a[0][0] = 1.0;
            for k in 1..=p {
                let pk = p - k;
                let mut d = 0.0;
                if r >= k {
                    a[s2][0] = a[s1][0] / ndu[pk + 1][r - k];
                    d = a[s2][0] * ndu[r - k][pk];
                }
                let j1 = if r + 1 >= k { 1 } else { k - r };
                let j2 = if r <= pk + 1 { k - 1 } else { p - r };
                for j in j1..=j2 {
                    let idx = r + j - k;
                    a[s2][j] = (a[s1][j] - a[s1][j - 1]) / ndu[pk + 1][idx];
                    d += a[s2][j] * ndu[idx][pk];
                }
                if r <= pk {
                    a[s2][k] = -a[s1][k - 1] / ndu[pk + 1][r];
                    d += a[s2][k] * ndu[r][pk];
                }
                ders[k][r] = d;
                std::mem::swap(&mut s1, &mut s2);
            }
        }

        let mut factor = p as f64;
        for k in 1..=p {
            for value in &mut ders[k] {
                *value *= factor;
            }
            factor *= (p - k) as f64;
        }

        ders
    }
}
