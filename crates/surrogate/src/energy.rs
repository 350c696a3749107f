//! Gram matrices and the curvature-energy penalty.

use nalgebra::DMatrix;

use crate::BSplineBasis;
use crate::bspline::ORDER;

/// Four-point Gauss–Legendre rule on `[-1, 1]`, exact through degree 7.
const GAUSS_NODES: [f64; 4] = [
    -0.861_136_311_594_052_6,
    -0.339_981_043_584_856_3,
    0.339_981_043_584_856_3,
    0.861_136_311_594_052_6,
];
const GAUSS_WEIGHTS: [f64; 4] = [
    0.347_854_845_137_453_8,
    0.652_145_154_862_546_1,
    0.652_145_154_862_546_1,
    0.347_854_845_137_453_8,
];

/// Returns `G[i][j] = ∫ Bᵢ⁽ᵏ⁾ Bⱼ⁽ᵏ⁾ dx` over the basis interval, with `k = order`.
pub(crate) fn gram(basis: &BSplineBasis, order: usize) -> DMatrix<f64> {
    let n = basis.num_basis();
    let h = (basis.upper() - basis.lower()) / basis.num_elements() as f64;
    let half = 0.5 * h;

    let mut g = DMatrix::zeros(n, n);
    for e in 0..basis.num_elements() {
        let mid = basis.lower() + (e as f64 + 0.5) * h;
        for (node, weight) in GAUSS_NODES.iter().zip(GAUSS_WEIGHTS) {
            let ders = basis.derivatives(e, mid + half * node);
            let d = ders[order];
            for a in 0..ORDER {
                for b in 0..ORDER {
                    g[(e + a, e + b)] += half * weight * d[a] * d[b];
                }
            }
        }
    }
    g
}

/// Returns the matrix `E` with `cᵀ E c = Σₖ ∫ (∂²f/∂xₖ²)² dx` for the
/// tensor-product spline with coefficients `c`.
///
/// Coefficients are ordered row-major over the axes, first axis slowest,
/// which is the order produced by nested Kronecker products.
pub(crate) fn curvature_energy(bases: &[BSplineBasis]) -> DMatrix<f64> {
    let mass: Vec<_> = bases.iter().map(|b| gram(b, 0)).collect();
    let curvature: Vec<_> = bases.iter().map(|b| gram(b, 2)).collect();
    let size: usize = bases.iter().map(BSplineBasis::num_basis).product();

    let mut energy = DMatrix::zeros(size, size);
    for k in 0..bases.len() {
        let term = (0..bases.len()).fold(DMatrix::from_element(1, 1, 1.0), |acc, j| {
            let factor = if j == k { &curvature[j] } else { &mass[j] };
            acc.kronecker(factor)
        });
        energy += term;
    }
    energy
}
