use thiserror::Error;

/// Which half of a `Function` was being evaluated when an error was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Forward,
    Backward,
}

impl std::fmt::Display for Pass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pass::Forward => write!(f, "forward"),
            Pass::Backward => write!(f, "backward"),
        }
    }
}

/// Custom error type for the gradnode engine.
#[derive(Error, Debug, PartialEq, Clone)] // PartialEq for easier testing
pub enum GradNodeError {
    /// A leaf was built from a payload that is not an array.
    #[error("{found} is not supported as a variable payload (expected an array)")]
    TypeKind { found: &'static str },

    #[error("Arity mismatch in {pass} of '{function}': expected {expected} arrays, got {actual}")]
    ArityMismatch {
        function: &'static str,
        pass: Pass,
        expected: usize,
        actual: usize,
    },

    #[error("'{function}' does not implement {pass}")]
    NotImplemented { function: &'static str, pass: Pass },

    #[error("Shape mismatch: expected {expected:?}, got {actual:?} during operation {operation}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
        operation: String,
    },

    #[error("Variable id {0} does not belong to this graph")]
    UnknownVariable(usize),

    #[error("Function id {0} does not belong to this graph")]
    UnknownFunction(usize),

    #[error("Internal error: {0}")]
    InternalError(String),
}
