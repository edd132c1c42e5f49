use crate::autograd::{expect_arity, Function, Graph};
use crate::error::{GradNodeError, Pass};
use crate::ops::single_grad;
use crate::value::{self, Array};
use crate::variable::VariableId;

/// Element-wise subtraction \( y = a - b \).
#[derive(Debug, Clone, Copy, Default)]
pub struct Sub;

impl Function for Sub {
    fn name(&self) -> &'static str {
        "sub"
    }

    fn forward(&self, xs: &[&Array]) -> Result<Vec<Array>, GradNodeError> {
        expect_arity(self.name(), Pass::Forward, 2, xs.len())?;
        let y = value::zip_with(xs[0], xs[1], "sub_op", |a, b| a - b)?;
        Ok(vec![y])
    }

    /// \( \frac{dL}{da} = gy \), \( \frac{dL}{db} = -gy \).
    fn backward(
        &self,
        _xs: &[&Array],
        _ys: &[&Array],
        gys: &[Array],
    ) -> Result<Vec<Array>, GradNodeError> {
        let gy = single_grad(self, gys)?;
        Ok(vec![gy.clone(), gy.mapv(|g| -g)])
    }
}

pub fn sub_op(graph: &mut Graph, a: VariableId, b: VariableId) -> Result<VariableId, GradNodeError> {
    graph.apply_single(Sub, &[a, b])
}

#[cfg(test)]
#[path = "sub_test.rs"]
mod tests;
