//! # Operations Module (`ops`)
//!
//! Concrete differentiable kernels built on the [`Function`] trait.
//!
//! ## Structure:
//!
//! - **Submodules:** kernels are grouped by kind (`arithmetic`, `math_elem`).
//! - **Function structs:** each kernel is a unit struct (`Add`, `Square`, ...)
//!   implementing [`Function`]; the graph keeps the instance in the record of
//!   every application.
//! - **`_op` Functions:** each kernel has a `xxx_op(graph, ...)` helper that
//!   applies it and returns the output id(s).
//!
//! All kernels are elementwise and require same-shaped operands; there is no
//! broadcasting.

use crate::autograd::{expect_arity, Function};
use crate::error::{GradNodeError, Pass};
use crate::value::Array;

pub mod arithmetic;
pub mod math_elem;

pub use arithmetic::{add_op, mul_op, neg_op, sub_op, Add, Mul, Neg, Sub};
pub use math_elem::{exp_op, sin_cos_op, square_op, Exp, SinCos, Square};

/// Forward helper for unary elementwise kernels: checks there is exactly one
/// input and maps `op` over it.
pub(crate) fn map_unary<F>(function: &dyn Function, xs: &[&Array], op: F) -> Result<Vec<Array>, GradNodeError>
where
    F: Fn(f64) -> f64,
{
    expect_arity(function.name(), Pass::Forward, 1, xs.len())?;
    Ok(vec![xs[0].mapv(op)])
}

/// Returns the upstream gradient of a single-output kernel.
pub(crate) fn single_grad<'a>(function: &dyn Function, gys: &'a [Array]) -> Result<&'a Array, GradNodeError> {
    expect_arity(function.name(), Pass::Backward, function.num_outputs(), gys.len())?;
    Ok(&gys[0])
}
