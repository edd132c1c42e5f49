use crate::autograd::graph::Graph;
use crate::error::GradNodeError;
use crate::value::{self, Array};
use crate::variable::VariableId;
use log::warn;
use thiserror::Error;

/// Default step for central differences.
pub const DEFAULT_EPSILON: f64 = 1e-4;
/// Default relative tolerance when comparing analytical and numerical gradients.
pub const DEFAULT_RTOL: f64 = 1e-4;
/// Default absolute tolerance when comparing analytical and numerical gradients.
pub const DEFAULT_ATOL: f64 = 1e-8;

/// Error type specifically for gradient checking failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradCheckError {
    #[error("Gradient check failed at element {element_index}: analytical grad {analytical} != numerical grad {numerical}. Difference: {difference}")]
    GradientMismatch {
        element_index: usize,
        analytical: f64,
        numerical: f64,
        difference: f64,
    },
    #[error("Input has no gradient after the backward pass.")]
    MissingAnalyticalGrad,
    #[error("Gradient is NaN or infinite at element {element_index}: analytical {analytical}, numerical {numerical}")]
    NonFinite {
        element_index: usize,
        analytical: f64,
        numerical: f64,
    },
    #[error("Engine error during gradient check: {0}")]
    Engine(GradNodeError),
}

impl From<GradNodeError> for GradCheckError {
    fn from(err: GradNodeError) -> Self {
        GradCheckError::Engine(err)
    }
}

/// Tolerances used by [`check_grad`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradCheckOptions {
    pub epsilon: f64,
    pub rtol: f64,
    pub atol: f64,
}

impl Default for GradCheckOptions {
    fn default() -> Self {
        GradCheckOptions {
            epsilon: DEFAULT_EPSILON,
            rtol: DEFAULT_RTOL,
            atol: DEFAULT_ATOL,
        }
    }
}

/// Approximates the gradient of `f` at `x` with central differences.
///
/// Each element of `x` is perturbed by `±eps` in turn and the outputs are
/// summed, which matches what [`Graph::backward`] computes with its default
/// ones seed. For a single-element `x` this is exactly
/// `(f(x + eps) - f(x - eps)) / (2 * eps)`.
///
/// The perturbed inputs are new leaves of `graph`, so `f` may refer to other
/// nodes of the same graph. `x`'s own node is left as it is.
pub fn numerical_diff<F>(
    graph: &mut Graph,
    f: F,
    x: VariableId,
    eps: f64,
) -> Result<Array, GradNodeError>
where
    F: Fn(&mut Graph, VariableId) -> Result<VariableId, GradNodeError>,
{
    let base = graph.value(x)?.clone();
    let mut grad = value::zeros_like(&base);
    for (index, g) in grad.iter_mut().enumerate() {
        let loss_plus = perturbed_output_sum(graph, &f, &base, index, eps)?;
        let loss_minus = perturbed_output_sum(graph, &f, &base, index, -eps)?;
        *g = (loss_plus - loss_minus) / (2.0 * eps);
    }
    Ok(grad)
}

fn perturbed_output_sum<F>(
    graph: &mut Graph,
    f: &F,
    base: &Array,
    index: usize,
    delta: f64,
) -> Result<f64, GradNodeError>
where
    F: Fn(&mut Graph, VariableId) -> Result<VariableId, GradNodeError>,
{
    let mut data = base.clone();
    if let Some(v) = data.iter_mut().nth(index) {
        *v += delta;
    }
    let x = graph.variable(data)?;
    let y = f(&mut *graph, x)?;
    Ok(graph.value(y)?.sum())
}

/// Compares the gradient computed by the backward pass against
/// [`numerical_diff`].
///
/// Builds `f(x)` in `graph`, runs `backward` on it and compares `x`'s gradient
/// elementwise with `|analytical - numerical| <= atol + rtol * |numerical|`.
/// Any gradient already stored on `x` is cleared first.
pub fn check_grad<F>(
    graph: &mut Graph,
    f: F,
    x: VariableId,
    options: &GradCheckOptions,
) -> Result<(), GradCheckError>
where
    F: Fn(&mut Graph, VariableId) -> Result<VariableId, GradNodeError>,
{
    graph.clear_grad(x)?;
    let y = f(&mut *graph, x)?;
    graph.backward(y)?;
    let analytical = graph
        .grad(x)?
        .cloned()
        .ok_or(GradCheckError::MissingAnalyticalGrad)?;
    let numerical = numerical_diff(&mut *graph, &f, x, options.epsilon)?;

    for (element_index, (&a, &n)) in analytical.iter().zip(numerical.iter()).enumerate() {
        if !a.is_finite() || !n.is_finite() {
            return Err(GradCheckError::NonFinite {
                element_index,
                analytical: a,
                numerical: n,
            });
        }
        let difference = (a - n).abs();
        if difference > options.atol + options.rtol * n.abs() {
            warn!(
                "gradient mismatch at element {}: analytical {} vs numerical {}",
                element_index, a, n
            );
            return Err(GradCheckError::GradientMismatch {
                element_index,
                analytical: a,
                numerical: n,
                difference,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "grad_check_test.rs"]
mod tests;
