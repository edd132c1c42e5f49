use crate::autograd::{expect_arity, Function, Graph};
use crate::error::{GradNodeError, Pass};
use crate::ops::single_grad;
use crate::value::{self, Array};
use crate::variable::VariableId;

/// Element-wise addition \( y = a + b \).
///
/// The local derivative is 1 for both operands, so the upstream gradient is
/// passed through unchanged to each input. Applying `Add` to the same node
/// twice (`a + a`) therefore yields two contributions that the backward pass
/// sums into `2 * gy`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Add;

impl Function for Add {
    fn name(&self) -> &'static str {
        "add"
    }

    fn forward(&self, xs: &[&Array]) -> Result<Vec<Array>, GradNodeError> {
        expect_arity(self.name(), Pass::Forward, 2, xs.len())?;
        let y = value::zip_with(xs[0], xs[1], "add_op", |a, b| a + b)?;
        Ok(vec![y])
    }

    fn backward(
        &self,
        _xs: &[&Array],
        _ys: &[&Array],
        gys: &[Array],
    ) -> Result<Vec<Array>, GradNodeError> {
        let gy = single_grad(self, gys)?;
        Ok(vec![gy.clone(), gy.clone()])
    }
}

/// Adds two nodes element-wise.
///
/// # Errors
/// `GradNodeError::ShapeMismatch` if the operands have different shapes.
pub fn add_op(graph: &mut Graph, a: VariableId, b: VariableId) -> Result<VariableId, GradNodeError> {
    graph.apply_single(Add, &[a, b])
}

#[cfg(test)]
#[path = "add_test.rs"]
mod tests;
