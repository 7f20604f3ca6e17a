//! C3 — placement policy: decides which nodes become checkpoints.

use std::collections::HashSet;

use crate::error::{CheckpointError, CheckpointResult};
use crate::graph::Graph;
use crate::types::NodeId;

use super::oracle;

/// Which strategy [`mark`] should use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Policy {
    /// The user marks nodes individually via `checkpoint()`; `mark` is a
    /// no-op other than ensuring the root is marked.
    Manual,
    /// Mark every `k`-th node (plus the root) in topological order.
    Uniform { interval: usize },
    /// Mark `ceil(sqrt(N))` nodes, ranked by cost then footprint.
    Adaptive,
    /// Mark whenever the running footprint since the last checkpoint would
    /// exceed `max_bytes`.
    Budget { max_bytes: u64 },
}

impl Policy {
    pub fn validate(&self) -> CheckpointResult<()> {
        match self {
            Policy::Uniform { interval } if *interval == 0 => {
                Err(CheckpointError::ConfigInvalid("interval must be > 0".into()))
            }
            Policy::Budget { max_bytes } if *max_bytes == 0 => {
                Err(CheckpointError::ConfigInvalid("budget_bytes must be > 0".into()))
            }
            _ => Ok(()),
        }
    }
}

/// All nodes reachable from `root` by following `inputs` edges, i.e. the
/// ancestor set including `root` itself. Because the graph's `NodeId`
/// order is already a valid global topological order (arena is
/// append-only, inputs always precede their consumer), sorting this set by
/// id yields a valid topological order for the subgraph too — no separate
/// toposort pass is needed.
fn ancestors_topological(graph: &Graph, root: NodeId) -> Vec<NodeId> {
    let mut seen = HashSet::new();
    let mut stack = vec![root];
    seen.insert(root);
    while let Some(id) = stack.pop() {
        for &input in &graph.node(id).inputs {
            if seen.insert(input) {
                stack.push(input);
            }
        }
    }
    let mut order: Vec<NodeId> = seen.into_iter().collect();
    order.sort();
    order
}

/// Walks the DAG rooted at `root`, sets `is_checkpoint = true` on the
/// nodes the given `policy` selects, and returns how many were marked.
/// The root is always marked (unless it is a leaf, per I2's "leaves are
/// never marked" guidance — marking it would be harmless but pointless).
pub fn mark(graph: &mut Graph, root: NodeId, policy: Policy) -> CheckpointResult<usize> {
    policy.validate()?;
    let order = ancestors_topological(graph, root);
    let mut marked = 0;

    let mut set_checkpoint = |graph: &mut Graph, id: NodeId| {
        if graph.node(id).is_leaf() {
            return;
        }
        if !graph.node(id).is_checkpoint {
            graph.node_mut(id).is_checkpoint = true;
        }
    };

    match policy {
        Policy::Manual => {
            set_checkpoint(graph, root);
        }

        Policy::Uniform { interval } => {
            let non_leaf: Vec<NodeId> = order.iter().copied().filter(|id| !graph.node(*id).is_leaf()).collect();
            let n = non_leaf.len();
            for (i, id) in non_leaf.iter().enumerate() {
                if i % interval == 0 || i == n.saturating_sub(1) {
                    set_checkpoint(graph, *id);
                }
            }
            set_checkpoint(graph, root);
        }

        Policy::Adaptive => {
            let mut candidates: Vec<NodeId> = order.iter().copied().filter(|id| !graph.node(*id).is_leaf()).collect();
            let n = candidates.len();
            let target = (n as f64).sqrt().ceil() as usize;
            candidates.sort_by(|a, b| {
                let na = graph.node(*a);
                let nb = graph.node(*b);
                let cost_a = oracle::should_checkpoint(&na.op);
                let cost_b = oracle::should_checkpoint(&nb.op);
                cost_b
                    .cmp(&cost_a)
                    .then(nb.memory_footprint.cmp(&na.memory_footprint))
            });
            for id in candidates.into_iter().take(target) {
                set_checkpoint(graph, id);
            }
            set_checkpoint(graph, root);
        }

        Policy::Budget { max_bytes } => {
            let mut running: u64 = 0;
            for id in order.iter().rev() {
                if graph.node(*id).is_leaf() {
                    continue;
                }
                running += graph.node(*id).memory_footprint;
                if running > max_bytes {
                    set_checkpoint(graph, *id);
                    running = 0;
                }
            }
            set_checkpoint(graph, root);
        }
    }

    for id in &order {
        if graph.node(*id).is_checkpoint {
            marked += 1;
        }
    }
    Ok(marked)
}
