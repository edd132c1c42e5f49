use crate::error::{GradNodeError, Pass};
use crate::value::Array;
use crate::variable::VariableId;
use std::fmt::{self, Debug};

/// Handle to an operation application stored in a [`Graph`](crate::Graph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub(crate) usize);

impl FunctionId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// Defines a differentiable operation: a forward rule and its backward rule.
///
/// Implementations are usually stateless unit structs (`Square`, `Exp`, ...).
/// The graph takes ownership of the instance when it is applied and keeps it
/// in the resulting [`FunctionRecord`], next to the exact input and output
/// nodes of that application.
///
/// Both rules work on plain arrays and never see the graph. Everything the
/// backward rule needs from the forward pass is handed back to it: the input
/// values `xs` and output values `ys` recorded for the application.
pub trait Function: Debug {
    /// Short name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Number of arrays `forward` returns.
    fn num_outputs(&self) -> usize {
        1
    }

    /// Computes the outputs from the input values.
    ///
    /// Must be deterministic and free of side effects.
    fn forward(&self, xs: &[&Array]) -> Result<Vec<Array>, GradNodeError>;

    /// Computes the gradient with respect to each input, given the gradient
    /// with respect to each output (`gys`).
    ///
    /// The returned `Vec` must have one entry per input, in input order, each
    /// shaped like the corresponding input.
    ///
    /// The default implementation reports the operation as forward-only.
    fn backward(
        &self,
        xs: &[&Array],
        ys: &[&Array],
        gys: &[Array],
    ) -> Result<Vec<Array>, GradNodeError> {
        let _ = (xs, ys, gys);
        Err(GradNodeError::NotImplemented {
            function: self.name(),
            pass: Pass::Backward,
        })
    }
}

/// One application of a [`Function`] to specific input nodes.
///
/// Acts as a (hyper)edge of the graph. Outputs are stored as plain ids, so
/// there is no ownership cycle between a node's `creator` and the record.
#[derive(Debug)]
pub struct FunctionRecord {
    pub(crate) function: Box<dyn Function>,
    pub(crate) inputs: Vec<VariableId>,
    pub(crate) outputs: Vec<VariableId>,
    pub(crate) generation: usize,
}

impl FunctionRecord {
    pub fn name(&self) -> &'static str {
        self.function.name()
    }

    pub fn inputs(&self) -> &[VariableId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[VariableId] {
        &self.outputs
    }

    /// Largest generation among the inputs.
    pub fn generation(&self) -> usize {
        self.generation
    }
}

/// Checks the number of arrays handed to a rule.
///
/// Kernels call this at the top of `forward`/`backward`.
pub fn expect_arity(
    function: &'static str,
    pass: Pass,
    expected: usize,
    actual: usize,
) -> Result<(), GradNodeError> {
    if expected != actual {
        return Err(GradNodeError::ArityMismatch {
            function,
            pass,
            expected,
            actual,
        });
    }
    Ok(())
}
