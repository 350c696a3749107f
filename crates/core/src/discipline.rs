use crate::Phase;

/// A discipline model that can take part in a coupled derivative solve.
///
/// A coupled solver (Gauss–Seidel or Krylov) composes disciplines only through
/// this trait. It treats each discipline as a linear-operator black box: the
/// solver never sees a Jacobian matrix, only its products with seed vectors.
///
/// ## Call sequence
///
/// 1. [`solve_nonlinear`](Discipline::solve_nonlinear) evaluates outputs and
///    invalidates any cached Jacobian.
/// 2. [`linearize`](Discipline::linearize) computes and caches the Jacobian
///    at the given input.
/// 3. [`apply_linear_forward`](Discipline::apply_linear_forward) and
///    [`apply_linear_reverse`](Discipline::apply_linear_reverse) may then be
///    called any number of times until the next nonlinear solve.
///
/// Calling a linear operator out of sequence is an error, never a silent use
/// of stale data.
///
/// ## Seeds
///
/// Both linear operators accumulate into their output argument rather than
/// overwriting it, matching how coupled solvers sum contributions from many
/// disciplines. The two must be exact transposes:
/// `⟨J u, v⟩ = ⟨u, Jᵀ v⟩` for every `u` and `v`.
pub trait Discipline {
    type Input;
    type Output;

    /// Perturbation (forward) or sensitivity (reverse) of the input.
    type InputSeed;

    /// Perturbation (forward) or sensitivity (reverse) of the output.
    type OutputSeed;

    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the current lifecycle phase.
    fn phase(&self) -> Phase;

    /// Evaluates the discipline's outputs at `input`.
    ///
    /// # Errors
    ///
    /// Returns an error if `input` is malformed or the evaluation fails.
    fn solve_nonlinear(&mut self, input: &Self::Input) -> Result<&Self::Output, Self::Error>;

    /// Computes and caches the Jacobian at `input`.
    ///
    /// # Errors
    ///
    /// Returns an error if called before any nonlinear solve, if `input` is
    /// malformed, or if the derivative evaluation fails.
    fn linearize(&mut self, input: &Self::Input) -> Result<(), Self::Error>;

    /// Accumulates `J · d_input` into `d_output`.
    ///
    /// Channels absent from `d_input` contribute nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the discipline is not linearized or a seed has the
    /// wrong shape.
    fn apply_linear_forward(
        &self,
        d_input: &Self::InputSeed,
        d_output: &mut Self::OutputSeed,
    ) -> Result<(), Self::Error>;

    /// Accumulates `Jᵀ · d_output` into `d_input`.
    ///
    /// Only channels present in `d_input` receive a contribution.
    ///
    /// # Errors
    ///
    /// Returns an error if the discipline is not linearized or a seed has the
    /// wrong shape.
    fn apply_linear_reverse(
        &self,
        d_output: &Self::OutputSeed,
        d_input: &mut Self::InputSeed,
    ) -> Result<(), Self::Error>;
}
