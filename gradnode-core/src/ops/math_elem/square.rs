// gradnode-core/src/ops/math_elem/square.rs

use crate::autograd::{expect_arity, Function, Graph};
use crate::error::{GradNodeError, Pass};
use crate::ops::{map_unary, single_grad};
use crate::value::{self, Array};
use crate::variable::VariableId;

/// Element-wise square \( y = x^2 \).
#[derive(Debug, Clone, Copy, Default)]
pub struct Square;

impl Function for Square {
    fn name(&self) -> &'static str {
        "square"
    }

    fn forward(&self, xs: &[&Array]) -> Result<Vec<Array>, GradNodeError> {
        map_unary(self, xs, |x| x * x)
    }

    /// Computes \( \frac{dL}{dx} = gy \cdot 2x \), reading the recorded input.
    fn backward(
        &self,
        xs: &[&Array],
        _ys: &[&Array],
        gys: &[Array],
    ) -> Result<Vec<Array>, GradNodeError> {
        expect_arity(self.name(), Pass::Backward, 1, xs.len())?;
        let gy = single_grad(self, gys)?;
        let gx = value::zip_with(xs[0], gy, "square_backward", |x, g| 2.0 * x * g)?;
        Ok(vec![gx])
    }
}

/// Squares a node element-wise.
pub fn square_op(graph: &mut Graph, x: VariableId) -> Result<VariableId, GradNodeError> {
    graph.apply_single(Square, &[x])
}

#[cfg(test)]
#[path = "square_test.rs"]
mod tests;
