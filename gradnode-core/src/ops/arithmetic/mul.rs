use crate::autograd::{expect_arity, Function, Graph};
use crate::error::{GradNodeError, Pass};
use crate::ops::single_grad;
use crate::value::{self, Array};
use crate::variable::VariableId;

/// Element-wise multiplication \( y = a \cdot b \).
#[derive(Debug, Clone, Copy, Default)]
pub struct Mul;

impl Function for Mul {
    fn name(&self) -> &'static str {
        "mul"
    }

    fn forward(&self, xs: &[&Array]) -> Result<Vec<Array>, GradNodeError> {
        expect_arity(self.name(), Pass::Forward, 2, xs.len())?;
        let y = value::zip_with(xs[0], xs[1], "mul_op", |a, b| a * b)?;
        Ok(vec![y])
    }

    /// Each operand's gradient is the upstream gradient times the other operand:
    /// \( \frac{dL}{da} = gy \cdot b \), \( \frac{dL}{db} = gy \cdot a \).
    fn backward(
        &self,
        xs: &[&Array],
        _ys: &[&Array],
        gys: &[Array],
    ) -> Result<Vec<Array>, GradNodeError> {
        expect_arity(self.name(), Pass::Backward, 2, xs.len())?;
        let gy = single_grad(self, gys)?;
        let grad_a = value::zip_with(gy, xs[1], "mul_backward", |g, b| g * b)?;
        let grad_b = value::zip_with(gy, xs[0], "mul_backward", |g, a| g * a)?;
        Ok(vec![grad_a, grad_b])
    }
}

pub fn mul_op(graph: &mut Graph, a: VariableId, b: VariableId) -> Result<VariableId, GradNodeError> {
    graph.apply_single(Mul, &[a, b])
}

#[cfg(test)]
#[path = "mul_test.rs"]
mod tests;
