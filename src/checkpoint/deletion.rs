//! C4 — the deletion pass: frees value storage on unmarked interior nodes
//! after the forward pass completes.

use std::collections::HashSet;

use tracing::debug;

use crate::error::{CheckpointError, CheckpointResult};
use crate::graph::Graph;
use crate::types::NodeId;

use super::footprint;
use super::oracle;

/// Ancestors of `root`, post-order (children before parents). Post-order
/// gives better cache behavior than arbitrary order, per the design notes,
/// though correctness does not depend on it — each node's deletion is
/// independent.
fn post_order(graph: &Graph, root: NodeId) -> Vec<NodeId> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();

    fn visit(graph: &Graph, id: NodeId, visited: &mut HashSet<NodeId>, order: &mut Vec<NodeId>) {
        if !visited.insert(id) {
            return;
        }
        for &input in &graph.node(id).inputs {
            visit(graph, input, visited, order);
        }
        order.push(id);
    }

    visit(graph, root, &mut visited, &mut order);
    order
}

/// Releases the value of every unmarked, non-leaf, non-checkpoint node
/// reachable from `root`, returning the total bytes freed.
///
/// Refuses (with [`CheckpointError::StochasticOpOnDeletedPath`]) to delete
/// a node whose op the cost oracle classifies as stochastic, since this
/// crate never captures the RNG state `save_rng` would require to
/// reproduce it — see `SPEC_FULL.md` Open Questions. The whole node set is
/// scanned for such a node before any storage is released, so a refusal
/// leaves the graph completely untouched rather than leaving only the
/// nodes visited before the offending one deleted.
pub fn delete_unmarked(graph: &mut Graph, root: NodeId) -> CheckpointResult<u64> {
    let order = post_order(graph, root);

    for &id in &order {
        let node = graph.node(id);
        if node.is_leaf() || node.is_checkpoint || node.value_deleted {
            continue;
        }
        if oracle::is_stochastic(&node.op) {
            return Err(CheckpointError::StochasticOpOnDeletedPath {
                node: id,
                op: node.op.name(),
            });
        }
    }

    let mut bytes_freed = 0u64;

    for id in order {
        let node = graph.node(id);
        if node.is_leaf() || node.is_checkpoint || node.value_deleted {
            continue;
        }

        let freed = if node.memory_footprint > 0 {
            node.memory_footprint
        } else {
            footprint::footprint(node)?
        };

        let node = graph.node_mut(id);
        node.cached_shape = node.value.as_ref().map(|t| t.shape().to_vec()).unwrap_or_default();
        if let Some(value) = node.value.as_mut() {
            value.take();
        }
        node.value_deleted = true;
        bytes_freed += freed;
        debug!(node = %id, bytes = freed, "deleted node value");
    }

    Ok(bytes_freed)
}
