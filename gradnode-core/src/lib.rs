//! # gradnode-core
//!
//! A reverse-mode automatic differentiation engine over dynamic computation
//! graphs.
//!
//! Evaluating an expression with the `*_op` functions records every operation
//! application in a [`Graph`]. [`Graph::backward`] then walks those records
//! from an output back to the leaves, highest generation first, and
//! accumulates `d(output)/d(node)` into each node's gradient.
//!
//! ```
//! use gradnode_core::{exp_op, square_op, value, Graph};
//!
//! # fn main() -> Result<(), gradnode_core::GradNodeError> {
//! let mut graph = Graph::new();
//! let x = graph.variable(value::scalar(0.5))?;
//! let a = exp_op(&mut graph, x)?;
//! let y = square_op(&mut graph, a)?;
//! graph.backward(y)?;
//!
//! let expected = 2.0 * (2.0 * 0.5f64).exp();
//! let grad = value::item(graph.grad(x)?.unwrap()).unwrap();
//! assert!((grad - expected).abs() < 1e-12);
//! # Ok(())
//! # }
//! ```

pub mod autograd;
pub mod creation;
pub mod error;
pub mod ops;
pub mod utils;
pub mod value;
pub mod variable;

pub use autograd::{check_grad, numerical_diff, Function, FunctionId, Graph};
pub use error::{GradNodeError, Pass};
pub use ops::{add_op, exp_op, mul_op, neg_op, sin_cos_op, square_op, sub_op};
pub use value::{Array, Payload};
pub use variable::VariableId;
// Re-export the payload crate so callers build arrays with the same version
pub use ndarray;
