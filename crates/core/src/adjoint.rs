use ndarray::{ArrayBase, Data, Dimension};

use crate::Discipline;

/// Euclidean inner product between two seeds of the same shape.
pub trait InnerProduct {
    fn inner(&self, other: &Self) -> f64;
}

impl InnerProduct for f64 {
    fn inner(&self, other: &Self) -> f64 {
        self * other
    }
}

/// An absent channel contributes nothing.
impl<T: InnerProduct> InnerProduct for Option<T> {
    fn inner(&self, other: &Self) -> f64 {
        match (self, other) {
            (Some(a), Some(b)) => a.inner(b),
            _ => 0.0,
        }
    }
}

impl<S, D> InnerProduct for ArrayBase<S, D>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    fn inner(&self, other: &Self) -> f64 {
        debug_assert_eq!(self.shape(), other.shape());
        self.iter().zip(other.iter()).map(|(a, b)| a * b).sum()
    }
}

/// Result of a dot-product test, see [`dot_product_test`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DotProductTest {
    /// `⟨J u, v⟩`
    pub forward: f64,
    /// `⟨u, Jᵀ v⟩`
    pub reverse: f64,
}

impl DotProductTest {
    /// Returns `|forward - reverse|` scaled by the larger magnitude.
    ///
    /// Returns the absolute difference when both products are zero.
    #[must_use]
    pub fn relative_error(&self) -> f64 {
        let diff = (self.forward - self.reverse).abs();
        let scale = self.forward.abs().max(self.reverse.abs());
        if scale > 0.0 { diff / scale } else { diff }
    }
}

/// Compares `⟨J u, v⟩` with `⟨u, Jᵀ v⟩` for a linearized discipline.
///
/// `forward_buf` and `reverse_buf` must be zeroed seeds of the output and input
/// shape. The channels present in `reverse_buf` select which input channels
/// take part in the reverse product, so they should match those in `u`.
///
/// # Errors
///
/// Returns the discipline's error if either linear operator fails.
pub fn dot_product_test<D>(
    discipline: &D,
    u: &D::InputSeed,
    v: &D::OutputSeed,
    mut forward_buf: D::OutputSeed,
    mut reverse_buf: D::InputSeed,
) -> Result<DotProductTest, D::Error>
where
    D: Discipline,
    D::InputSeed: InnerProduct,
    D::OutputSeed: InnerProduct,
{
    discipline.apply_linear_forward(u, &mut forward_buf)?;
    discipline.apply_linear_reverse(v, &mut reverse_buf)?;

    Ok(DotProductTest {
        forward: forward_buf.inner(v),
        reverse: u.inner(&reverse_buf),
    })
}
