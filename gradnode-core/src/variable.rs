// src/variable.rs
use crate::autograd::FunctionId;
use crate::value::Array;
use std::fmt;

/// Handle to a node stored in a [`Graph`](crate::Graph).
///
/// Handles are plain indices: copying one never copies the node, and a handle is
/// only meaningful for the graph that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId(pub(crate) usize);

impl VariableId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Internal storage for a node of the computation graph.
///
/// Holds the value, the gradient accumulated by backward passes, and the link
/// to the application (`creator`) that produced it. Leaves supplied by the
/// caller have `creator = None` and `generation = 0`.
#[derive(Debug, Clone)]
pub struct VariableData {
    /// The value computed in the forward pass.
    pub(crate) value: Array,
    /// Gradient of the differentiated output with respect to this node.
    /// Same shape as `value`; `None` until a backward pass reaches the node.
    pub(crate) grad: Option<Array>,
    /// The application that produced this node.
    /// Set once, at creation, and never changed afterwards.
    pub(crate) creator: Option<FunctionId>,
    /// Depth used to order the backward traversal.
    pub(crate) generation: usize,
    /// Optional label, only used for debugging output.
    pub(crate) name: Option<String>,
}

impl VariableData {
    pub(crate) fn new(value: Array) -> Self {
        VariableData {
            value,
            grad: None,
            creator: None,
            generation: 0,
            name: None,
        }
    }

    /// Links this node to the application that produced it.
    pub(crate) fn set_creator(&mut self, creator: FunctionId, function_generation: usize) {
        debug_assert!(self.creator.is_none(), "creator is set exactly once");
        self.creator = Some(creator);
        self.generation = function_generation + 1;
    }

    pub fn value(&self) -> &Array {
        &self.value
    }

    pub fn grad(&self) -> Option<&Array> {
        self.grad.as_ref()
    }

    pub fn creator(&self) -> Option<FunctionId> {
        self.creator
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_leaf(&self) -> bool {
        self.creator.is_none()
    }
}

impl fmt::Display for VariableData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "variable({}, {})", name, self.value),
            None => write!(f, "variable({})", self.value),
        }
    }
}
