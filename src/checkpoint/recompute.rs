//! C5 — the recomputation engine.
//!
//! The anchor search and replay-path construction below are grounded on
//! the same shape as burn-autodiff's checkpoint retrieval: a backward walk
//! from the target over its input edges, stopping at the first already
//! materialized ancestor, followed by a forward replay over exactly the
//! nodes that walk crossed.

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use crate::error::{CheckpointError, CheckpointResult};
use crate::graph::{ops, Graph};
use crate::tensor::Tensor;
use crate::types::NodeId;

/// Ensures `target.value_deleted == false`, re-materializing it (and every
/// deleted node between it and the nearest live checkpoint) if necessary.
///
/// A no-op if `target` is already live, per the idempotence property in
/// the testable-properties list.
pub fn recompute(graph: &mut Graph, target: NodeId) -> CheckpointResult<()> {
    if !graph.node(target).value_deleted {
        return Ok(());
    }

    find_anchor(graph, target)?;
    let path = replay_path(graph, target);

    for id in path {
        replay_one(graph, id)?;
    }

    debug_assert!(!graph.node(target).value_deleted);
    Ok(())
}

/// BFS backward from `target`'s inputs. The first node found with
/// `is_checkpoint = true` and a live value is the anchor — an ancestor
/// that merely happens to still be live (e.g. a leaf nobody marked) does
/// not qualify; I4 is phrased in terms of "ancestor checkpoint", not
/// "ancestor with a value".
fn find_anchor(graph: &Graph, target: NodeId) -> CheckpointResult<NodeId> {
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut queue: VecDeque<NodeId> = graph.node(target).inputs.iter().copied().collect();
    visited.insert(target);
    let mut nearest_leaf: Option<NodeId> = None;

    while let Some(id) = queue.pop_front() {
        if !visited.insert(id) {
            continue;
        }
        let node = graph.node(id);
        if node.is_checkpoint && !node.value_deleted {
            return Ok(id);
        }
        if node.is_leaf() && nearest_leaf.is_none() {
            nearest_leaf = Some(id);
        }
        for &input in &node.inputs {
            queue.push_back(input);
        }
    }

    Err(CheckpointError::NoCheckpointReachable {
        target,
        nearest_leaf: nearest_leaf.unwrap_or(target),
    })
}

/// The deleted nodes between the anchor (exclusive) and `target` (inclusive),
/// in topological order.
///
/// Traversal stops expanding at any node whose value is already live,
/// rather than at a specific anchor id: a deleted node can have a second
/// input chain that was never deleted at all (most commonly a live leaf
/// weight, since I2 keeps leaves live regardless of marking), and that
/// sibling must not be swept into the replay set or `replay_one` will try
/// to forward-evaluate a node that was never deleted in the first place.
/// Every branch of the walk independently bottoms out at its own nearest
/// live node, which need not be the single anchor `find_anchor` reports.
///
/// Global `NodeId` order is already a valid topological order for this
/// subset (see [`super::placement::mark`]'s doc comment for why), so a
/// plain sort by id suffices in place of a dedicated toposort.
fn replay_path(graph: &Graph, target: NodeId) -> Vec<NodeId> {
    let mut visited = HashSet::new();
    let mut stack = vec![target];
    let mut collected = HashSet::new();
    visited.insert(target);

    while let Some(id) = stack.pop() {
        if !graph.node(id).value_deleted {
            continue;
        }
        collected.insert(id);
        for &input in &graph.node(id).inputs {
            if visited.insert(input) {
                stack.push(input);
            }
        }
    }

    let mut order: Vec<NodeId> = collected.into_iter().collect();
    order.sort();
    order
}

fn replay_one(graph: &mut Graph, id: NodeId) -> CheckpointResult<()> {
    let node = graph.node(id);
    let op = node.op.clone();
    let input_ids = node.inputs.clone();
    let expected_shape = node.cached_shape.clone();

    let input_tensors: Vec<&Tensor> = input_ids
        .iter()
        .map(|input_id| {
            graph
                .node(*input_id)
                .value
                .as_ref()
                .expect("replay path is topologically ordered; inputs are live before their consumer runs")
        })
        .collect();

    let new_value = ops::forward_eval(&op, &input_tensors).map_err(|e| retag(e, id))?;

    if new_value.shape() != expected_shape.as_slice() {
        return Err(CheckpointError::ShapeMismatch {
            node: id,
            expected: expected_shape,
            actual: new_value.shape().to_vec(),
        });
    }

    let node = graph.node_mut(id);
    node.value = Some(new_value);
    node.value_deleted = false;
    debug!(node = %id, op = %op.name(), "recomputed node value");
    Ok(())
}

fn retag(err: CheckpointError, id: NodeId) -> CheckpointError {
    match err {
        CheckpointError::UnsupportedOpDuringRecompute { op, .. } => {
            CheckpointError::UnsupportedOpDuringRecompute { node: id, op }
        }
        other => other,
    }
}
