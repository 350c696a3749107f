//! Core traits and types for differentiable discipline models.
//!
//! This crate defines the shared abstractions that discipline components and
//! the coupled solvers driving them build on:
//!
//! - [`Model`] — a callable that maps a typed input to a typed output
//! - [`Discipline`] — a model with exact forward and reverse Jacobian-vector
//!   products, driven through the [`Phase`] state machine
//! - [`dot_product_test`] — checks that a discipline's reverse operator is the
//!   transpose of its forward operator

mod adjoint;
mod discipline;
mod model;
mod phase;

pub use adjoint::{DotProductTest, InnerProduct, dot_product_test};
pub use discipline::Discipline;
pub use phase::{Phase, SequenceError};
pub use model::Model;
