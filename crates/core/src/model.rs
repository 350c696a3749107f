/// A callable model that maps an input to an output.
///
/// Models are pure: calling one twice with the same input must produce the
/// same output, and no call may mutate shared state.
pub trait Model {
    type Input;
    type Output;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Calls the model with the given input.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    fn call(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use super::*;

    struct Square;

    impl Model for Square {
        type Input = f64;
        type Output = f64;
        type Error = Infallible;

        fn call(&self, x: &f64) -> Result<f64, Self::Error> {
            Ok(x * x)
        }
    }

    #[test]
    fn repeated_calls_agree() {
        assert_eq!(Square.call(&3.0).unwrap(), 9.0);
        assert_eq!(Square.call(&3.0).unwrap(), Square.call(&3.0).unwrap());
    }
}
