use std::fmt;

use thiserror::Error;

/// Lifecycle phase of a [`Discipline`](crate::Discipline).
///
/// Phases are ordered: a discipline is `Fitted` once it is constructed,
/// `Evaluated` after a nonlinear solve, and `Linearized` after its Jacobian
/// has been computed at the current input. A new nonlinear solve always drops
/// back to `Evaluated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Fitted,
    Evaluated,
    Linearized,
}

impl Phase {
    /// Checks that this phase has reached `required`.
    ///
    /// # Errors
    ///
    /// Returns a [`SequenceError`] naming `operation` if the discipline has not
    /// yet reached the required phase.
    pub fn ensure(self, operation: &'static str, required: Phase) -> Result<(), SequenceError> {
        if self >= required {
            Ok(())
        } else {
            Err(SequenceError {
                operation,
                required,
                actual: self,
            })
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Fitted => "fitted",
            Phase::Evaluated => "evaluated",
            Phase::Linearized => "linearized",
        };
        f.write_str(name)
    }
}

/// An operation was invoked before the discipline reached the phase it needs.
///
/// This is a logic error in the caller. It is never recovered locally, since
/// continuing would silently use stale or missing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("`{operation}` requires a {required} discipline, but it is only {actual}")]
pub struct SequenceError {
    pub operation: &'static str,
    pub required: Phase,
    pub actual: Phase,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_phases_satisfy_earlier_requirements() {
        assert!(Phase::Linearized.ensure("op", Phase::Evaluated).is_ok());
        assert!(Phase::Evaluated.ensure("op", Phase::Evaluated).is_ok());
    }

    #[test]
    fn earlier_phase_is_rejected() {
        let error = Phase::Evaluated
            .ensure("apply_linear_forward", Phase::Linearized)
            .unwrap_err();

        assert_eq!(error.actual, Phase::Evaluated);
        assert_eq!(
            error.to_string(),
            "`apply_linear_forward` requires a linearized discipline, but it is only evaluated"
        );
    }
}
