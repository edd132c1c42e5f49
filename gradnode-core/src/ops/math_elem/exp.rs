// gradnode-core/src/ops/math_elem/exp.rs

use crate::autograd::{expect_arity, Function, Graph};
use crate::error::{GradNodeError, Pass};
use crate::ops::{map_unary, single_grad};
use crate::value::{self, Array};
use crate::variable::VariableId;

/// Element-wise natural exponential \( y = e^x \).
#[derive(Debug, Clone, Copy, Default)]
pub struct Exp;

impl Function for Exp {
    fn name(&self) -> &'static str {
        "exp"
    }

    fn forward(&self, xs: &[&Array]) -> Result<Vec<Array>, GradNodeError> {
        map_unary(self, xs, f64::exp)
    }

    /// \( \frac{d}{dx} e^x = e^x \), which is the recorded output, so
    /// \( \frac{dL}{dx} = gy \cdot y \).
    fn backward(
        &self,
        _xs: &[&Array],
        ys: &[&Array],
        gys: &[Array],
    ) -> Result<Vec<Array>, GradNodeError> {
        expect_arity(self.name(), Pass::Backward, 1, ys.len())?;
        let gy = single_grad(self, gys)?;
        let gx = value::zip_with(ys[0], gy, "exp_backward", |y, g| y * g)?;
        Ok(vec![gx])
    }
}

pub fn exp_op(graph: &mut Graph, x: VariableId) -> Result<VariableId, GradNodeError> {
    graph.apply_single(Exp, &[x])
}

#[cfg(test)]
#[path = "exp_test.rs"]
mod tests;
