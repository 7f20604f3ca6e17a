//! The reverse-mode backward driver.
//!
//! This is the "surrounding engine" the checkpointing core treats as an
//! external collaborator in its own design: it owns topological ordering,
//! vector-Jacobian products, and gradient accumulation, and calls exactly
//! the two hooks the core exposes (`ensure_live`, `ensure_inputs_live`)
//! before touching a node's value. Grounded on the teacher's per-node
//! `Operation::backward(inputs, grad_output)` shape, generalized from a
//! sequential layer stack to a full graph walk in reverse topological
//! (i.e. descending `NodeId`) order.

use ndarray::ArrayD;
use tracing::trace;

use crate::checkpoint::{self, CheckpointManager};
use crate::error::CheckpointResult;
use crate::graph::{ops, Graph};
use crate::tensor::Tensor;
use crate::types::NodeId;

/// Runs the backward pass from `root`, seeding its gradient with an
/// all-ones tensor of `root`'s shape (the usual scalar-loss convention
/// when `root` is already a reduction like `Sum`).
///
/// Consults `manager` only to invoke the two C6 hooks and to record how
/// many recomputations happened; placement and deletion must already have
/// run (`manager.analyze_and_mark` / `manager.delete_unmarked`) before
/// this is called — `backward` never marks or deletes anything itself.
pub fn backward(graph: &mut Graph, manager: &mut CheckpointManager, root: NodeId) -> CheckpointResult<()> {
    let seed = Tensor::from_array(ArrayD::ones(ndarray::IxDyn(graph.shape_of(root))));
    graph.node_mut(root).grad = Some(seed);
    backward_from(graph, manager, root)
}

/// Like [`backward`], but assumes `root.grad` has already been seeded
/// (useful when chaining backward passes or seeding a non-uniform
/// upstream gradient).
pub fn backward_from(graph: &mut Graph, manager: &mut CheckpointManager, root: NodeId) -> CheckpointResult<()> {
    for i in (0..=root.index()).rev() {
        let id = NodeId(i);
        if graph.node(id).grad.is_none() || graph.node(id).is_leaf() {
            continue;
        }
        visit(graph, manager, id)?;
    }
    Ok(())
}

fn visit(graph: &mut Graph, manager: &mut CheckpointManager, id: NodeId) -> CheckpointResult<()> {
    let was_deleted = graph.node(id).value_deleted;
    checkpoint::ensure_live(graph, id)?;
    if was_deleted {
        manager.record_recompute();
    }

    let inputs_were_deleted: Vec<bool> = graph.node(id).inputs.iter().map(|i| graph.node(*i).value_deleted).collect();
    checkpoint::ensure_inputs_live(graph, id)?;
    for was_deleted in inputs_were_deleted {
        if was_deleted {
            manager.record_recompute();
        }
    }

    let node = graph.node(id);
    let op = node.op.clone();
    let input_ids = node.inputs.clone();
    let grad_output = node.grad.clone().expect("checked by caller");
    let output = node
        .value
        .clone()
        .expect("ensure_live guarantees a materialized value");

    let input_tensors: Vec<&Tensor> = input_ids
        .iter()
        .map(|i| graph.node(*i).value.as_ref().expect("ensure_inputs_live guarantees materialized inputs"))
        .collect();

    trace!(node = %id, op = %op.name(), "computing vjp");
    let input_grads = ops::vjp(&op, &input_tensors, &output, &grad_output)?;
    drop(input_tensors);

    for (input_id, grad) in input_ids.into_iter().zip(input_grads) {
        accumulate_grad(graph, input_id, grad);
    }

    Ok(())
}

fn accumulate_grad(graph: &mut Graph, id: NodeId, grad: Tensor) {
    let node = graph.node_mut(id);
    match node.grad.take() {
        Some(existing) => {
            let summed = existing
                .view()
                .expect("accumulated grads are never deleted")
                + grad.view().expect("freshly computed grad is always live");
            node.grad = Some(Tensor::from_array(summed));
        }
        None => node.grad = Some(grad),
    }
}
