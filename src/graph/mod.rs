pub mod dsl;
pub mod node;
pub mod ops;

use crate::error::{CheckpointError, CheckpointResult};
use crate::tensor::Tensor;
use crate::types::NodeId;

pub use node::Node;
pub use ops::Op;

/// An append-only arena of [`Node`]s.
///
/// Nodes are never removed or reordered, so `NodeId(i)` is always the
/// node's position in a valid topological order: every entry in
/// `inputs` for node `i` is strictly less than `i`. The checkpointing
/// core (`crate::checkpoint`) relies on this — it is the reason a plain
/// BFS over `inputs` edges in [`Graph`] is enough to find recomputation
/// anchors without a separate topo-sort pass.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Adds a leaf (input or parameter). `is_checkpoint` defaults to
    /// `false` like any other node — I2 protects leaves from deletion via
    /// `Node::is_leaf()` checks in `deletion::delete_unmarked`, not via
    /// this flag, since there is nothing to recompute them from.
    pub fn leaf(&mut self, value: Tensor, requires_grad: bool) -> NodeId {
        self.push(Node::new_leaf(value, requires_grad))
    }

    /// Adds a node whose op has a recompute-dispatch entry: the forward
    /// value is computed here via [`ops::forward_eval`], and the same
    /// dispatch will be used again if this node is ever recomputed.
    pub fn op(&mut self, op: Op, inputs: Vec<NodeId>, requires_grad: bool) -> CheckpointResult<NodeId> {
        let input_tensors: Vec<&Tensor> = inputs
            .iter()
            .map(|id| self.node(*id).value.as_ref().expect("node value slot is always Some"))
            .collect();
        let value = ops::forward_eval(&op, &input_tensors).map_err(|e| tag_node(e, inputs.first().copied()))?;
        Ok(self.push(Node::new_op(op, inputs, value, requires_grad)))
    }

    /// Adds a node whose value was computed externally (by a host op
    /// library this core has no dispatch entry for — e.g. Attention or
    /// Convolution). The op tag is kept for bookkeeping and cost
    /// classification, but [`ops::forward_eval`]/[`ops::vjp`] will refuse
    /// to recompute it: if this node is ever deleted, recomputation fails
    /// with [`CheckpointError::UnsupportedOpDuringRecompute`].
    pub fn op_opaque(&mut self, op: Op, inputs: Vec<NodeId>, value: Tensor, requires_grad: bool) -> NodeId {
        self.push(Node::new_op(op, inputs, value, requires_grad))
    }

    /// Shape of `id`, read from the cached shape per invariant I3 — never
    /// forces a recompute, even if the node's value has been deleted.
    pub fn shape_of(&self, id: NodeId) -> &[usize] {
        self.node(id).shape()
    }
}

fn tag_node(err: CheckpointError, node: Option<NodeId>) -> CheckpointError {
    match (err, node) {
        (CheckpointError::UnsupportedOpDuringRecompute { op, .. }, Some(node)) => {
            CheckpointError::UnsupportedOpDuringRecompute { node, op }
        }
        (other, _) => other,
    }
}
