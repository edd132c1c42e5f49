use super::*;
use crate::ops::{add_op, exp_op, mul_op, sin_cos_op, square_op};
use crate::utils::testing::check_array_near;
use crate::value::{item, scalar};
use approx::assert_relative_eq;
use ndarray::array;
use std::cell::Cell;
use std::rc::Rc;

fn scalar_grad(graph: &Graph, id: VariableId) -> f64 {
    let grad = graph.grad(id).unwrap().expect("gradient should be set");
    item(grad).unwrap()
}

/// Identity kernel counting how many times its backward rule runs.
#[derive(Debug)]
struct CountingIdentity {
    calls: Rc<Cell<usize>>,
}

impl Function for CountingIdentity {
    fn name(&self) -> &'static str {
        "counting_identity"
    }

    fn forward(&self, xs: &[&Array]) -> Result<Vec<Array>, GradNodeError> {
        Ok(vec![xs[0].clone()])
    }

    fn backward(
        &self,
        _xs: &[&Array],
        _ys: &[&Array],
        gys: &[Array],
    ) -> Result<Vec<Array>, GradNodeError> {
        self.calls.set(self.calls.get() + 1);
        Ok(vec![gys[0].clone()])
    }
}

/// Forward-only kernel: relies on the default backward.
#[derive(Debug)]
struct ForwardOnly;

impl Function for ForwardOnly {
    fn name(&self) -> &'static str {
        "forward_only"
    }

    fn forward(&self, xs: &[&Array]) -> Result<Vec<Array>, GradNodeError> {
        Ok(vec![xs[0].clone()])
    }
}

/// Two-input kernel whose backward returns a single gradient.
#[derive(Debug)]
struct BrokenBackward;

impl Function for BrokenBackward {
    fn name(&self) -> &'static str {
        "broken_backward"
    }

    fn forward(&self, xs: &[&Array]) -> Result<Vec<Array>, GradNodeError> {
        Ok(vec![xs[0].clone()])
    }

    fn backward(
        &self,
        _xs: &[&Array],
        _ys: &[&Array],
        gys: &[Array],
    ) -> Result<Vec<Array>, GradNodeError> {
        Ok(vec![gys[0].clone()])
    }
}

/// Declares two outputs but produces one.
#[derive(Debug)]
struct BrokenForward;

impl Function for BrokenForward {
    fn name(&self) -> &'static str {
        "broken_forward"
    }

    fn num_outputs(&self) -> usize {
        2
    }

    fn forward(&self, xs: &[&Array]) -> Result<Vec<Array>, GradNodeError> {
        Ok(vec![xs[0].clone()])
    }
}

#[test]
fn test_variable_rejects_non_array_payloads() {
    let mut graph = Graph::new();
    assert_eq!(
        graph.variable(1.0_f64),
        Err(GradNodeError::TypeKind { found: "scalar" })
    );
    assert_eq!(
        graph.variable(vec![1.0, 2.0]),
        Err(GradNodeError::TypeKind { found: "sequence" })
    );
    assert_eq!(graph.num_variables(), 0);
}

#[test]
fn test_variable_round_trips_value() -> Result<(), GradNodeError> {
    let mut graph = Graph::new();
    let value = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]].into_dyn();
    let x = graph.variable(value.clone())?;
    assert_eq!(graph.value(x)?, &value);
    assert_eq!(graph.grad(x)?, None);
    assert_eq!(graph.creator(x)?, None);
    assert_eq!(graph.generation(x)?, 0);
    assert!(graph.is_leaf(x)?);
    assert_eq!(graph.shape(x)?, &[2, 3]);
    assert_eq!(graph.ndim(x)?, 2);
    assert_eq!(graph.size(x)?, 6);
    Ok(())
}

#[test]
fn test_named_variable() -> Result<(), GradNodeError> {
    let mut graph = Graph::new();
    let x = graph.named_variable(scalar(1.0), "x")?;
    assert_eq!(graph.name(x)?, Some("x"));
    let y = square_op(&mut graph, x)?;
    assert_eq!(graph.name(y)?, None);
    graph.set_name(y, "y")?;
    assert_eq!(graph.name(y)?, Some("y"));
    assert!(graph.data(x)?.to_string().starts_with("variable(x, "));
    let z = graph.variable(scalar(2.0))?;
    assert!(graph.data(z)?.to_string().starts_with("variable(2"));
    Ok(())
}

#[test]
fn test_unknown_ids_are_rejected() {
    let mut other = Graph::new();
    let _ = other.variable(scalar(1.0)).unwrap();
    let _ = other.variable(scalar(2.0)).unwrap();
    let late = other.variable(scalar(3.0)).unwrap();

    let mut graph = Graph::new();
    let _ = graph.variable(scalar(1.0)).unwrap();
    assert_eq!(graph.value(late), Err(GradNodeError::UnknownVariable(2)));
    assert_eq!(graph.backward(late), Err(GradNodeError::UnknownVariable(2)));
    assert!(matches!(
        square_op(&mut graph, late),
        Err(GradNodeError::UnknownVariable(2))
    ));
    assert!(matches!(
        graph.function(FunctionId(0)),
        Err(GradNodeError::UnknownFunction(0))
    ));
}

#[test]
fn test_apply_records_inputs_outputs_and_generation() -> Result<(), GradNodeError> {
    let mut graph = Graph::new();
    let x = graph.variable(scalar(0.5))?;
    let a = exp_op(&mut graph, x)?;
    let y = square_op(&mut graph, a)?;

    let exp_id = graph.creator(a)?.expect("a is derived");
    let square_id = graph.creator(y)?.expect("y is derived");
    let exp_record = graph.function(exp_id)?;
    let square_record = graph.function(square_id)?;

    assert_eq!(exp_record.name(), "exp");
    assert_eq!(exp_record.inputs(), &[x]);
    assert_eq!(exp_record.outputs(), &[a]);
    assert_eq!(exp_record.generation(), 0);
    assert_eq!(square_record.inputs(), &[a]);
    assert_eq!(square_record.outputs(), &[y]);
    assert_eq!(square_record.generation(), 1);

    assert_eq!(graph.generation(x)?, 0);
    assert_eq!(graph.generation(a)?, 1);
    assert_eq!(graph.generation(y)?, 2);
    // Inputs are left untouched by apply
    assert_eq!(graph.grad(x)?, None);
    assert!(graph.is_leaf(x)?);
    Ok(())
}

#[test]
fn test_generation_is_max_of_inputs() -> Result<(), GradNodeError> {
    let mut graph = Graph::new();
    let x = graph.variable(scalar(1.0))?;
    let deep = square_op(&mut graph, x)?;
    let deep = square_op(&mut graph, deep)?;
    let deep = square_op(&mut graph, deep)?;
    let shallow = graph.variable(scalar(2.0))?;
    let y = add_op(&mut graph, shallow, deep)?;

    assert_eq!(graph.generation(deep)?, 3);
    assert_eq!(graph.generation(y)?, 4);

    for fid in graph.function_ids() {
        let record = graph.function(fid)?;
        for &input in record.inputs() {
            for &output in record.outputs() {
                assert!(graph.generation(input)? < graph.generation(output)?);
            }
        }
    }
    Ok(())
}

#[test]
fn test_backward_on_leaf_seeds_ones() -> Result<(), GradNodeError> {
    let mut graph = Graph::new();
    let x = graph.variable(array![1.0, 2.0, 3.0])?;
    graph.backward(x)?;
    check_array_near(graph.grad(x)?.unwrap(), &[3], &[1.0, 1.0, 1.0], 0.0);
    assert_eq!(graph.num_functions(), 0);
    Ok(())
}

#[test]
fn test_backward_chain_rule() -> Result<(), GradNodeError> {
    let mut graph = Graph::new();
    let x = graph.variable(scalar(0.5))?;
    let a = exp_op(&mut graph, x)?;
    let y = square_op(&mut graph, a)?;
    graph.backward(y)?;

    let expected = 2.0 * 0.5f64.exp() * 0.5f64.exp();
    assert_relative_eq!(scalar_grad(&graph, x), expected, epsilon = 1e-12);
    // The output is seeded with ones, intermediates keep their gradients
    assert_relative_eq!(scalar_grad(&graph, y), 1.0);
    assert_relative_eq!(scalar_grad(&graph, a), 2.0 * 0.5f64.exp(), epsilon = 1e-12);
    Ok(())
}

#[test]
fn test_fan_out_accumulates() -> Result<(), GradNodeError> {
    let mut graph = Graph::new();
    let x = graph.variable(scalar(3.0))?;
    let y = add_op(&mut graph, x, x)?;
    graph.backward(y)?;
    assert_relative_eq!(scalar_grad(&graph, x), 2.0);
    Ok(())
}

#[test]
fn test_fan_out_across_generations() -> Result<(), GradNodeError> {
    // y = (x^2)^2 + (x^2)^2 = 2x^4, dy/dx = 8x^3
    let mut graph = Graph::new();
    let x = graph.variable(scalar(2.0))?;
    let a = square_op(&mut graph, x)?;
    let b = square_op(&mut graph, a)?;
    let c = square_op(&mut graph, a)?;
    let y = add_op(&mut graph, b, c)?;
    graph.backward(y)?;

    assert_relative_eq!(item(graph.value(y)?).unwrap(), 32.0);
    assert_relative_eq!(scalar_grad(&graph, x), 64.0);
    Ok(())
}

#[test]
fn test_diamond_processes_each_application_once() -> Result<(), GradNodeError> {
    let calls = Rc::new(Cell::new(0));
    let mut graph = Graph::new();
    let x = graph.variable(scalar(1.5))?;
    let shared = graph.apply_single(CountingIdentity { calls: Rc::clone(&calls) }, &[x])?;
    let left = square_op(&mut graph, shared)?;
    let right = exp_op(&mut graph, shared)?;
    let y = mul_op(&mut graph, left, right)?;
    graph.backward(y)?;

    assert_eq!(calls.get(), 1);
    // d/dx (x^2 * e^x) = (2x + x^2) e^x
    let expected = (2.0 * 1.5 + 1.5 * 1.5) * 1.5f64.exp();
    assert_relative_eq!(scalar_grad(&graph, x), expected, epsilon = 1e-12);
    Ok(())
}

#[test]
fn test_dead_branches_keep_no_gradient() -> Result<(), GradNodeError> {
    let mut graph = Graph::new();
    let x = graph.variable(scalar(1.0))?;
    let unused_leaf = graph.variable(scalar(4.0))?;
    let dead = square_op(&mut graph, unused_leaf)?;
    let y = exp_op(&mut graph, x)?;
    graph.backward(y)?;

    assert!(graph.grad(x)?.is_some());
    assert_eq!(graph.grad(unused_leaf)?, None);
    assert_eq!(graph.grad(dead)?, None);
    Ok(())
}

#[test]
fn test_backward_accumulates_across_calls_until_cleared() -> Result<(), GradNodeError> {
    let mut graph = Graph::new();
    let x = graph.variable(scalar(3.0))?;
    let y = square_op(&mut graph, x)?;

    graph.backward(y)?;
    assert_relative_eq!(scalar_grad(&graph, x), 6.0);

    graph.backward(y)?;
    assert_relative_eq!(scalar_grad(&graph, x), 12.0);

    graph.clear_grads();
    assert_eq!(graph.grad(y)?, None);
    graph.backward(y)?;
    assert_relative_eq!(scalar_grad(&graph, x), 6.0);

    graph.clear_grad(x)?;
    assert_eq!(graph.grad(x)?, None);
    Ok(())
}

#[test]
fn test_repeated_backward_on_deep_graph_adds_one_pass_per_call() -> Result<(), GradNodeError> {
    let mut graph = Graph::new();
    let x = graph.variable(scalar(0.5))?;
    let a = exp_op(&mut graph, x)?;
    let y = square_op(&mut graph, a)?;
    let single = 2.0 * 0.5f64.exp() * 0.5f64.exp();

    graph.backward(y)?;
    assert_relative_eq!(scalar_grad(&graph, x), single, max_relative = 1e-12);

    graph.backward(y)?;
    assert_relative_eq!(scalar_grad(&graph, x), 2.0 * single, max_relative = 1e-12);
    // Intermediate nodes only hold the latest pass
    assert_relative_eq!(scalar_grad(&graph, a), 2.0 * 0.5f64.exp(), max_relative = 1e-12);
    assert_relative_eq!(scalar_grad(&graph, y), 1.0);
    Ok(())
}

#[test]
fn test_backward_from_each_output_of_multi_output_function() -> Result<(), GradNodeError> {
    let mut graph = Graph::new();
    let x = graph.variable(scalar(0.3))?;
    let (s, c) = sin_cos_op(&mut graph, x)?;

    graph.backward(s)?;
    assert_relative_eq!(scalar_grad(&graph, x), 0.3f64.cos(), epsilon = 1e-12);

    // The gradient left on `s` must not flow through the second pass
    graph.backward(c)?;
    assert_relative_eq!(scalar_grad(&graph, x), 0.3f64.cos() - 0.3f64.sin(), epsilon = 1e-12);
    assert_eq!(graph.grad(s)?, None);
    Ok(())
}

#[test]
fn test_backward_with_grad() -> Result<(), GradNodeError> {
    let mut graph = Graph::new();
    let x = graph.variable(array![1.0, 2.0])?;
    let y = square_op(&mut graph, x)?;
    graph.backward_with_grad(y, array![10.0, 0.5].into_dyn())?;
    check_array_near(graph.grad(x)?.unwrap(), &[2], &[20.0, 2.0], 1e-12);

    let err = graph.backward_with_grad(y, array![1.0].into_dyn());
    assert!(matches!(err, Err(GradNodeError::ShapeMismatch { .. })));
    Ok(())
}

#[test]
fn test_missing_backward_is_not_implemented() -> Result<(), GradNodeError> {
    let mut graph = Graph::new();
    let x = graph.variable(scalar(1.0))?;
    let y = graph.apply_single(ForwardOnly, &[x])?;
    assert_eq!(
        graph.backward(y),
        Err(GradNodeError::NotImplemented {
            function: "forward_only",
            pass: Pass::Backward,
        })
    );
    assert_eq!(graph.grad(x)?, None);
    Ok(())
}

#[test]
fn test_backward_arity_mismatch() -> Result<(), GradNodeError> {
    let mut graph = Graph::new();
    let a = graph.variable(scalar(1.0))?;
    let b = graph.variable(scalar(2.0))?;
    let y = graph.apply_single(BrokenBackward, &[a, b])?;
    assert_eq!(
        graph.backward(y),
        Err(GradNodeError::ArityMismatch {
            function: "broken_backward",
            pass: Pass::Backward,
            expected: 2,
            actual: 1,
        })
    );
    Ok(())
}

#[test]
fn test_forward_arity_mismatch() -> Result<(), GradNodeError> {
    let mut graph = Graph::new();
    let x = graph.variable(scalar(1.0))?;
    assert_eq!(
        graph.apply(BrokenForward, &[x]),
        Err(GradNodeError::ArityMismatch {
            function: "broken_forward",
            pass: Pass::Forward,
            expected: 2,
            actual: 1,
        })
    );
    assert_eq!(graph.num_functions(), 0);
    Ok(())
}

#[test]
fn test_failed_backward_keeps_partial_gradients() -> Result<(), GradNodeError> {
    // y = square(forward_only(x)): square's backward runs before the failure
    let mut graph = Graph::new();
    let x = graph.variable(scalar(2.0))?;
    let a = graph.apply_single(ForwardOnly, &[x])?;
    let y = square_op(&mut graph, a)?;

    assert!(graph.backward(y).is_err());
    assert_relative_eq!(scalar_grad(&graph, a), 4.0);
    assert_eq!(graph.grad(x)?, None);
    Ok(())
}
