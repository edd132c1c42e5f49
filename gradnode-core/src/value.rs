//! # Payload adapter (`value`)
//!
//! Nodes carry an opaque numeric array. The engine fixes this to a dynamic-rank
//! `ndarray` array of `f64`; everything the core needs from it (shape checks,
//! elementwise sums, `ones_like`/`zeros_like`) lives here so the rest of the
//! crate never touches `ndarray` directly beyond the [`Array`] alias.

use crate::error::GradNodeError;
use ndarray::{ArrayD, Dimension, IxDyn};
use num_traits::Float;

/// The numeric payload stored in every node.
pub type Array = ArrayD<f64>;

/// Anything a caller may hand to [`Graph::variable`](crate::Graph::variable).
///
/// Only [`Payload::Array`] is accepted as a leaf value. The other variants exist
/// so that plain numbers and sequences are rejected with a
/// [`GradNodeError::TypeKind`] instead of being silently coerced.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Array(Array),
    Scalar(f64),
    Sequence(Vec<f64>),
}

impl Payload {
    /// Human readable name of the payload kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Array(_) => "array",
            Payload::Scalar(_) => "scalar",
            Payload::Sequence(_) => "sequence",
        }
    }

    /// Returns the array payload, or `TypeKind` for anything else.
    pub fn into_array(self) -> Result<Array, GradNodeError> {
        match self {
            Payload::Array(a) => Ok(a),
            other => Err(GradNodeError::TypeKind { found: other.kind() }),
        }
    }
}

impl<D: Dimension> From<ndarray::Array<f64, D>> for Payload {
    fn from(a: ndarray::Array<f64, D>) -> Self {
        Payload::Array(a.into_dyn())
    }
}

impl From<f64> for Payload {
    fn from(x: f64) -> Self {
        Payload::Scalar(x)
    }
}

impl From<f32> for Payload {
    fn from(x: f32) -> Self {
        Payload::Scalar(x as f64)
    }
}

impl From<i32> for Payload {
    fn from(x: i32) -> Self {
        Payload::Scalar(x as f64)
    }
}

impl From<Vec<f64>> for Payload {
    fn from(v: Vec<f64>) -> Self {
        Payload::Sequence(v)
    }
}

/// Coerces any payload to an array: scalars become 0-dimensional arrays and
/// sequences become 1-dimensional arrays.
pub fn as_array(x: impl Into<Payload>) -> Array {
    match x.into() {
        Payload::Array(a) => a,
        Payload::Scalar(s) => ndarray::arr0(s).into_dyn(),
        Payload::Sequence(v) => ndarray::Array1::from(v).into_dyn(),
    }
}

/// Builds a 0-dimensional array holding `x`.
pub fn scalar(x: f64) -> Array {
    as_array(x)
}

/// Builds an array from flat row-major data and a shape.
pub fn from_shape_vec(shape: &[usize], data: Vec<f64>) -> Result<Array, GradNodeError> {
    let len = data.len();
    ArrayD::from_shape_vec(IxDyn(shape), data).map_err(|_| GradNodeError::ShapeMismatch {
        expected: shape.to_vec(),
        actual: vec![len],
        operation: "from_shape_vec".to_string(),
    })
}

/// The single element of a one-element array (0-d or otherwise).
pub fn item(a: &Array) -> Option<f64> {
    if a.len() == 1 {
        a.iter().next().copied()
    } else {
        None
    }
}

pub fn ones_like(a: &Array) -> Array {
    Array::ones(a.raw_dim())
}

pub fn zeros_like(a: &Array) -> Array {
    Array::zeros(a.raw_dim())
}

/// Fails with `ShapeMismatch` unless `a` and `b` have identical shapes.
pub fn check_same_shape(a: &Array, b: &Array, operation: &str) -> Result<(), GradNodeError> {
    if a.shape() != b.shape() {
        return Err(GradNodeError::ShapeMismatch {
            expected: a.shape().to_vec(),
            actual: b.shape().to_vec(),
            operation: operation.to_string(),
        });
    }
    Ok(())
}

/// Elementwise combination of two same-shaped arrays.
///
/// No broadcasting: mismatched shapes are a `ShapeMismatch` error rather than a
/// panic inside `ndarray`.
pub fn zip_with<F>(a: &Array, b: &Array, operation: &str, f: F) -> Result<Array, GradNodeError>
where
    F: Fn(f64, f64) -> f64,
{
    check_same_shape(a, b, operation)?;
    let mut out = a.clone();
    out.zip_mut_with(b, |x, &y| *x = f(*x, y));
    Ok(out)
}

/// `dst += src`, shape-checked.
pub fn add_assign(dst: &mut Array, src: &Array, operation: &str) -> Result<(), GradNodeError> {
    check_same_shape(dst, src, operation)?;
    *dst += src;
    Ok(())
}

/// `|a - b| <= atol + rtol * |b|` for every element (numpy `allclose`).
///
/// Arrays of different shapes are never close. NaNs never compare close.
pub fn allclose<A: Float>(a: &ArrayD<A>, b: &ArrayD<A>, rtol: A, atol: A) -> bool {
    if a.shape() != b.shape() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .all(|(&x, &y)| (x - y).abs() <= atol + rtol * y.abs())
}

#[cfg(test)]
#[path = "value_test.rs"]
mod tests;
