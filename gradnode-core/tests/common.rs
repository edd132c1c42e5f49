use gradnode_core::value::{self, Array};
use gradnode_core::{Graph, VariableId};

// Helpers shared by the integration tests. Not every test file uses all of
// them.

#[allow(dead_code)]
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Gradient of a node that must have one, as a single `f64`.
#[allow(dead_code)]
pub fn scalar_grad(graph: &Graph, id: VariableId) -> f64 {
    let grad = graph
        .grad(id)
        .expect("id belongs to the graph")
        .expect("gradient should be set");
    value::item(grad).expect("gradient should hold one element")
}

#[allow(dead_code)]
pub fn scalar_value(graph: &Graph, id: VariableId) -> f64 {
    value::item(graph.value(id).expect("id belongs to the graph"))
        .expect("value should hold one element")
}

#[allow(dead_code)]
pub fn grad_of(graph: &Graph, id: VariableId) -> Array {
    graph
        .grad(id)
        .expect("id belongs to the graph")
        .expect("gradient should be set")
        .clone()
}
