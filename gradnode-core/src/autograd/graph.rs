use crate::autograd::function::{Function, FunctionId, FunctionRecord};
use crate::error::{GradNodeError, Pass};
use crate::value::{self, Array, Payload};
use crate::variable::{VariableData, VariableId};
use log::{debug, trace};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

/// Arena holding every node and every operation application of a computation.
///
/// The graph is built implicitly while evaluating an expression: each call to
/// [`Graph::apply`] appends the new output nodes and one [`FunctionRecord`].
/// Nothing is ever removed, so ids stay valid for the lifetime of the graph and
/// the topology is immutable once built. Only gradients change afterwards.
#[derive(Debug, Default)]
pub struct Graph {
    variables: Vec<VariableData>,
    functions: Vec<FunctionRecord>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Leaves ---

    /// Creates a leaf node.
    ///
    /// # Errors
    /// `GradNodeError::TypeKind` if `value` is not an array (plain numbers and
    /// sequences are rejected rather than coerced).
    pub fn variable(&mut self, value: impl Into<Payload>) -> Result<VariableId, GradNodeError> {
        let value = value.into().into_array()?;
        Ok(self.push_variable(VariableData::new(value)))
    }

    /// Creates a leaf node carrying a debugging label.
    pub fn named_variable(
        &mut self,
        value: impl Into<Payload>,
        name: impl Into<String>,
    ) -> Result<VariableId, GradNodeError> {
        let id = self.variable(value)?;
        self.variables[id.0].name = Some(name.into());
        Ok(id)
    }

    fn push_variable(&mut self, data: VariableData) -> VariableId {
        self.variables.push(data);
        VariableId(self.variables.len() - 1)
    }

    // --- Accessors ---

    pub fn data(&self, id: VariableId) -> Result<&VariableData, GradNodeError> {
        self.variables
            .get(id.0)
            .ok_or(GradNodeError::UnknownVariable(id.0))
    }

    fn data_mut(&mut self, id: VariableId) -> Result<&mut VariableData, GradNodeError> {
        self.variables
            .get_mut(id.0)
            .ok_or(GradNodeError::UnknownVariable(id.0))
    }

    pub fn value(&self, id: VariableId) -> Result<&Array, GradNodeError> {
        Ok(&self.data(id)?.value)
    }

    pub fn grad(&self, id: VariableId) -> Result<Option<&Array>, GradNodeError> {
        Ok(self.data(id)?.grad.as_ref())
    }

    pub fn creator(&self, id: VariableId) -> Result<Option<FunctionId>, GradNodeError> {
        Ok(self.data(id)?.creator)
    }

    pub fn generation(&self, id: VariableId) -> Result<usize, GradNodeError> {
        Ok(self.data(id)?.generation)
    }

    pub fn is_leaf(&self, id: VariableId) -> Result<bool, GradNodeError> {
        Ok(self.data(id)?.is_leaf())
    }

    pub fn name(&self, id: VariableId) -> Result<Option<&str>, GradNodeError> {
        Ok(self.data(id)?.name())
    }

    pub fn set_name(&mut self, id: VariableId, name: impl Into<String>) -> Result<(), GradNodeError> {
        self.data_mut(id)?.name = Some(name.into());
        Ok(())
    }

    pub fn shape(&self, id: VariableId) -> Result<&[usize], GradNodeError> {
        Ok(self.data(id)?.value.shape())
    }

    pub fn ndim(&self, id: VariableId) -> Result<usize, GradNodeError> {
        Ok(self.data(id)?.value.ndim())
    }

    /// Number of elements in the node's value.
    pub fn size(&self, id: VariableId) -> Result<usize, GradNodeError> {
        Ok(self.data(id)?.value.len())
    }

    pub fn function(&self, id: FunctionId) -> Result<&FunctionRecord, GradNodeError> {
        self.functions
            .get(id.0)
            .ok_or(GradNodeError::UnknownFunction(id.0))
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_functions(&self) -> usize {
        self.functions.len()
    }

    pub fn function_ids(&self) -> impl Iterator<Item = FunctionId> {
        (0..self.functions.len()).map(FunctionId)
    }

    // --- Gradient reset ---

    pub fn clear_grad(&mut self, id: VariableId) -> Result<(), GradNodeError> {
        self.data_mut(id)?.grad = None;
        Ok(())
    }

    /// Resets the gradient of every node, so the graph can be differentiated
    /// again from scratch.
    pub fn clear_grads(&mut self) {
        for data in self.variables.iter_mut() {
            data.grad = None;
        }
    }

    // --- Forward: applying functions ---

    /// Applies `function` to `inputs`, records the application and returns the
    /// ids of the new output nodes.
    ///
    /// The outputs get `generation = max(input generations) + 1`. Input nodes
    /// are not modified.
    ///
    /// # Errors
    /// * `UnknownVariable` if an input id does not belong to this graph.
    /// * Any error raised by `function.forward`, unchanged.
    /// * `ArityMismatch` if `forward` returned a different number of arrays
    ///   than `function.num_outputs()`.
    pub fn apply<F: Function + 'static>(
        &mut self,
        function: F,
        inputs: &[VariableId],
    ) -> Result<Vec<VariableId>, GradNodeError> {
        self.apply_boxed(Box::new(function), inputs)
    }

    pub fn apply_boxed(
        &mut self,
        function: Box<dyn Function>,
        inputs: &[VariableId],
    ) -> Result<Vec<VariableId>, GradNodeError> {
        let ys = {
            let xs = inputs
                .iter()
                .map(|&id| self.value(id))
                .collect::<Result<Vec<_>, _>>()?;
            function.forward(&xs)?
        };
        if ys.len() != function.num_outputs() {
            return Err(GradNodeError::ArityMismatch {
                function: function.name(),
                pass: Pass::Forward,
                expected: function.num_outputs(),
                actual: ys.len(),
            });
        }

        let generation = inputs
            .iter()
            .map(|id| self.variables[id.0].generation)
            .max()
            .unwrap_or(0);
        let fid = FunctionId(self.functions.len());
        let outputs: Vec<VariableId> = ys
            .into_iter()
            .map(|y| {
                let mut data = VariableData::new(y);
                data.set_creator(fid, generation);
                self.push_variable(data)
            })
            .collect();

        trace!(
            "apply {} ({}): inputs {:?} -> outputs {:?}, generation {}",
            fid,
            function.name(),
            inputs,
            outputs,
            generation
        );
        self.functions.push(FunctionRecord {
            function,
            inputs: inputs.to_vec(),
            outputs: outputs.clone(),
            generation,
        });
        Ok(outputs)
    }

    /// Like [`Graph::apply`], for functions with exactly one output.
    pub fn apply_single<F: Function + 'static>(
        &mut self,
        function: F,
        inputs: &[VariableId],
    ) -> Result<VariableId, GradNodeError> {
        let name = function.name();
        let outputs = self.apply(function, inputs)?;
        match outputs.as_slice() {
            [y] => Ok(*y),
            _ => Err(GradNodeError::ArityMismatch {
                function: name,
                pass: Pass::Forward,
                expected: 1,
                actual: outputs.len(),
            }),
        }
    }

    // --- Backward ---

    /// Differentiates `output` with respect to every ancestor node.
    ///
    /// If `output` has no gradient yet it is seeded with ones shaped like its
    /// value. Afterwards every reachable ancestor holds
    /// `d(output)/d(node)` in its gradient, accumulated over all paths.
    ///
    /// Each call is a fresh pass for non-leaf nodes: gradients left on the
    /// intermediate nodes of this graph by earlier passes are dropped first.
    /// Leaf gradients are accumulated into, so calling `backward` twice leaves
    /// twice the gradient on each leaf. Call [`Graph::clear_grads`] between
    /// independent backward passes.
    /// On error, nodes processed before the failure keep their gradients.
    pub fn backward(&mut self, output: VariableId) -> Result<(), GradNodeError> {
        self.data(output)?;
        self.reset_intermediate_grads(output);
        let data = self.data_mut(output)?;
        if data.grad.is_none() {
            data.grad = Some(value::ones_like(&data.value));
        }
        self.propagate(output)
    }

    /// Like [`Graph::backward`], seeding `output` with an explicit upstream
    /// gradient instead of ones.
    pub fn backward_with_grad(
        &mut self,
        output: VariableId,
        grad: Array,
    ) -> Result<(), GradNodeError> {
        value::check_same_shape(self.value(output)?, &grad, "backward_with_grad")?;
        self.reset_intermediate_grads(output);
        self.data_mut(output)?.grad = Some(grad);
        self.propagate(output)
    }

    /// Drops the gradients of every non-leaf node the pass from `start` reads
    /// or writes: the inputs and outputs of each application reachable from it.
    fn reset_intermediate_grads(&mut self, start: VariableId) {
        let mut pending: Vec<FunctionId> = self.variables[start.0].creator.into_iter().collect();
        let mut seen = HashSet::new();
        while let Some(fid) = pending.pop() {
            if !seen.insert(fid) {
                continue;
            }
            let record = &self.functions[fid.0];
            for id in &record.outputs {
                self.variables[id.0].grad = None;
            }
            for id in &record.inputs {
                let data = &mut self.variables[id.0];
                if let Some(next) = data.creator {
                    data.grad = None;
                    pending.push(next);
                }
            }
        }
    }

    /// Walks the applications reachable from `start`, highest generation first.
    fn propagate(&mut self, start: VariableId) -> Result<(), GradNodeError> {
        let Some(creator) = self.variables[start.0].creator else {
            debug!("backward from leaf {}: nothing to propagate", start);
            return Ok(());
        };

        let mut worklist = Worklist::default();
        worklist.push(creator, self.functions[creator.0].generation);
        let mut processed = 0usize;

        while let Some(fid) = worklist.pop() {
            let gxs = self.backward_step(fid)?;
            let record = &self.functions[fid.0];
            let operation = record.name();
            let inputs = record.inputs.clone();

            for (input, gx) in inputs.into_iter().zip(gxs) {
                let data = &mut self.variables[input.0];
                value::check_same_shape(&data.value, &gx, operation)?;
                match data.grad.as_mut() {
                    Some(existing) => value::add_assign(existing, &gx, operation)?,
                    None => data.grad = Some(gx),
                }
                if let Some(next) = data.creator {
                    worklist.push(next, self.functions[next.0].generation);
                }
            }
            processed += 1;
        }

        debug!("backward from {}: processed {} applications", start, processed);
        Ok(())
    }

    /// Runs the backward rule of one application and checks its arity.
    ///
    /// Outputs that received no gradient (e.g. an unused output of a
    /// multi-output function) contribute zeros.
    fn backward_step(&self, fid: FunctionId) -> Result<Vec<Array>, GradNodeError> {
        let record = &self.functions[fid.0];
        let xs: Vec<&Array> = record
            .inputs
            .iter()
            .map(|id| &self.variables[id.0].value)
            .collect();
        let ys: Vec<&Array> = record
            .outputs
            .iter()
            .map(|id| &self.variables[id.0].value)
            .collect();
        let gys: Vec<Array> = record
            .outputs
            .iter()
            .map(|id| {
                let data = &self.variables[id.0];
                data.grad
                    .clone()
                    .unwrap_or_else(|| value::zeros_like(&data.value))
            })
            .collect();

        trace!(
            "backward {} ({}), generation {}",
            fid,
            record.name(),
            record.generation
        );
        let gxs = record.function.backward(&xs, &ys, &gys)?;
        if gxs.len() != record.inputs.len() {
            return Err(GradNodeError::ArityMismatch {
                function: record.name(),
                pass: Pass::Backward,
                expected: record.inputs.len(),
                actual: gxs.len(),
            });
        }
        Ok(gxs)
    }
}

/// Pending applications, popped highest generation first.
///
/// Ties are broken by insertion order. Each application enters at most once.
#[derive(Default)]
struct Worklist {
    heap: BinaryHeap<(usize, Reverse<usize>, FunctionId)>,
    seen: HashSet<FunctionId>,
    sequence: usize,
}

impl Worklist {
    fn push(&mut self, fid: FunctionId, generation: usize) {
        if self.seen.insert(fid) {
            self.heap.push((generation, Reverse(self.sequence), fid));
            self.sequence += 1;
        }
    }

    fn pop(&mut self) -> Option<FunctionId> {
        self.heap.pop().map(|(_, _, fid)| fid)
    }
}

#[cfg(test)]
#[path = "graph_test.rs"]
mod tests;
