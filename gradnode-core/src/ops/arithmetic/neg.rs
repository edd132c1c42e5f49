use crate::autograd::{Function, Graph};
use crate::error::GradNodeError;
use crate::ops::{map_unary, single_grad};
use crate::value::Array;
use crate::variable::VariableId;

/// Element-wise negation \( y = -a \).
#[derive(Debug, Clone, Copy, Default)]
pub struct Neg;

impl Function for Neg {
    fn name(&self) -> &'static str {
        "neg"
    }

    fn forward(&self, xs: &[&Array]) -> Result<Vec<Array>, GradNodeError> {
        map_unary(self, xs, |a| -a)
    }

    fn backward(
        &self,
        _xs: &[&Array],
        _ys: &[&Array],
        gys: &[Array],
    ) -> Result<Vec<Array>, GradNodeError> {
        let gy = single_grad(self, gys)?;
        Ok(vec![gy.mapv(|g| -g)])
    }
}

pub fn neg_op(graph: &mut Graph, a: VariableId) -> Result<VariableId, GradNodeError> {
    graph.apply_single(Neg, &[a])
}

#[cfg(test)]
#[path = "neg_test.rs"]
mod tests;
