// gradnode-core/src/ops/math_elem/sin_cos.rs

use crate::autograd::{expect_arity, Function, Graph};
use crate::error::{GradNodeError, Pass};
use crate::value::{self, Array};
use crate::variable::VariableId;

/// Two-output kernel computing \( (\sin x, \cos x) \) in a single application.
///
/// If only one of the outputs feeds the differentiated quantity, the backward
/// pass hands a zero gradient for the other one.
#[derive(Debug, Clone, Copy, Default)]
pub struct SinCos;

impl Function for SinCos {
    fn name(&self) -> &'static str {
        "sin_cos"
    }

    fn num_outputs(&self) -> usize {
        2
    }

    fn forward(&self, xs: &[&Array]) -> Result<Vec<Array>, GradNodeError> {
        expect_arity(self.name(), Pass::Forward, 1, xs.len())?;
        Ok(vec![xs[0].mapv(f64::sin), xs[0].mapv(f64::cos)])
    }

    /// \( \frac{dL}{dx} = g_{\sin} \cos x - g_{\cos} \sin x \).
    fn backward(
        &self,
        xs: &[&Array],
        ys: &[&Array],
        gys: &[Array],
    ) -> Result<Vec<Array>, GradNodeError> {
        expect_arity(self.name(), Pass::Backward, 2, gys.len())?;
        expect_arity(self.name(), Pass::Backward, 2, ys.len())?;
        expect_arity(self.name(), Pass::Backward, 1, xs.len())?;
        let (sin, cos) = (ys[0], ys[1]);
        let from_sin = value::zip_with(&gys[0], cos, "sin_cos_backward", |g, c| g * c)?;
        let from_cos = value::zip_with(&gys[1], sin, "sin_cos_backward", |g, s| g * s)?;
        let gx = value::zip_with(&from_sin, &from_cos, "sin_cos_backward", |a, b| a - b)?;
        Ok(vec![gx])
    }
}

/// Returns `(sin x, cos x)` as two nodes produced by one application.
pub fn sin_cos_op(graph: &mut Graph, x: VariableId) -> Result<(VariableId, VariableId), GradNodeError> {
    match graph.apply(SinCos, &[x])?.as_slice() {
        &[sin, cos] => Ok((sin, cos)),
        other => Err(GradNodeError::ArityMismatch {
            function: "sin_cos",
            pass: Pass::Forward,
            expected: 2,
            actual: other.len(),
        }),
    }
}

#[cfg(test)]
#[path = "sin_cos_test.rs"]
mod tests;
