//! C6 — the backward integration facade: the two hooks the reverse engine
//! calls, plus a deletion-tolerant `zero_grad`.

use std::collections::HashSet;

use crate::error::CheckpointResult;
use crate::graph::Graph;
use crate::tensor::Tensor;
use crate::types::NodeId;

use super::recompute::recompute;

/// Call before the engine reads `node`'s own value or saved tensors to
/// compute its VJP. Triggers [`recompute`] if the value has been deleted;
/// a no-op otherwise.
pub fn ensure_live(graph: &mut Graph, node: NodeId) -> CheckpointResult<()> {
    if graph.node(node).value_deleted {
        recompute(graph, node)?;
    }
    Ok(())
}

/// Call before the engine enumerates `node`'s inputs to propagate
/// gradients. Ensures each input is live, triggering [`recompute`] for any
/// that were deleted.
pub fn ensure_inputs_live(graph: &mut Graph, node: NodeId) -> CheckpointResult<()> {
    let inputs = graph.node(node).inputs.clone();
    for input in inputs {
        ensure_live(graph, input)?;
    }
    Ok(())
}

/// Zeros gradient buffers on every `requires_grad` node reachable from
/// `root`. Tolerates deletion: a deleted node's buffer is sized from
/// `cached_shape` (I3) rather than forcing a recompute just to read a
/// shape. Nodes that neither require grad nor are otherwise touched are
/// skipped entirely. Idempotent: calling this twice in a row produces the
/// same zeroed state both times.
pub fn zero_grad(graph: &mut Graph, root: NodeId) {
    let mut visited = HashSet::new();
    let mut stack = vec![root];
    visited.insert(root);

    while let Some(id) = stack.pop() {
        for &input in &graph.node(id).inputs {
            if visited.insert(input) {
                stack.push(input);
            }
        }
    }

    for id in visited {
        let node = graph.node_mut(id);
        if !node.requires_grad {
            continue;
        }
        node.grad = Some(Tensor::zeros(&node.cached_shape));
    }
}
