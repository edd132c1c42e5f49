//! # Automatic differentiation (`autograd`)
//!
//! - [`function`]: the [`Function`] trait every operation implements, and the
//!   [`FunctionRecord`] kept for each application.
//! - [`graph`]: the [`Graph`] arena, the application protocol and the
//!   generation-ordered backward traversal.
//! - [`grad_check`]: finite-difference gradient checking.

pub mod function;
pub mod grad_check;
pub mod graph;

pub use function::{expect_arity, Function, FunctionId, FunctionRecord};
pub use grad_check::{check_grad, numerical_diff, GradCheckError, GradCheckOptions};
pub use graph::Graph;
