use crate::tensor::Tensor;
use crate::types::NodeId;

use super::ops::Op;

/// One node in a [`super::Graph`]'s arena.
///
/// `value` and `value_deleted` are the fields the checkpointing core reads
/// and mutates: everything else (`op`, `inputs`, `requires_grad`, `grad`)
/// belongs to the graph/autodiff scaffolding this core sits on top of.
/// `is_checkpoint`, `cached_shape`, `memory_footprint`, and
/// `recompute_priority` are the core's own annotations, set by
/// [`crate::checkpoint::placement`] and [`crate::checkpoint::footprint`].
#[derive(Debug, Clone)]
pub struct Node {
    pub op: Op,
    pub inputs: Vec<NodeId>,
    pub requires_grad: bool,

    /// Forward value. Always `Some` once constructed; the checkpointing
    /// core never removes the slot, only empties the `Tensor` inside it via
    /// [`Tensor::take`] (see invariant I2 — leaves are the one exception,
    /// enforced by [`crate::checkpoint::deletion`] refusing to touch them).
    pub value: Option<Tensor>,

    /// Accumulated gradient, populated during the backward pass.
    pub grad: Option<Tensor>,

    /// Whether the scheduler has marked this node as a checkpoint: its
    /// value is never deleted and it is a valid recomputation anchor.
    pub is_checkpoint: bool,

    /// True once [`crate::checkpoint::deletion`] has released this node's
    /// forward value. `value` is `Some(Tensor::empty(..))` in that state,
    /// never `None` — see [`Node::value`].
    pub value_deleted: bool,

    /// Shape captured at construction time, before any deletion can occur.
    /// [`Node::shape`] always returns this, never the live tensor's shape,
    /// which enforces invariant I3 (`shape()` must not force recompute).
    pub cached_shape: Vec<usize>,

    /// Footprint in bytes, as priced by [`crate::checkpoint::footprint`].
    pub memory_footprint: u64,

    /// Priority score assigned by a placement policy; higher means more
    /// preferred as a checkpoint. Only meaningful after `mark()` has run.
    pub recompute_priority: f64,
}

impl Node {
    pub fn new_leaf(value: Tensor, requires_grad: bool) -> Self {
        let cached_shape = value.shape().to_vec();
        Self {
            op: Op::Leaf,
            inputs: Vec::new(),
            requires_grad,
            value: Some(value),
            grad: None,
            // Defaults to false, matching every other node's annotation
            // defaults: leaves are protected from deletion by `is_leaf()`
            // checks (I2), not by this flag. A leaf only counts as a valid
            // recompute anchor once something has actually marked it.
            is_checkpoint: false,
            value_deleted: false,
            cached_shape,
            memory_footprint: 0,
            recompute_priority: 0.0,
        }
    }

    pub fn new_op(op: Op, inputs: Vec<NodeId>, value: Tensor, requires_grad: bool) -> Self {
        let cached_shape = value.shape().to_vec();
        Self {
            op,
            inputs,
            requires_grad,
            value: Some(value),
            grad: None,
            is_checkpoint: false,
            value_deleted: false,
            cached_shape,
            memory_footprint: 0,
            recompute_priority: 0.0,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.op.is_leaf()
    }

    /// The shape this node produces, per invariant I3. Always available,
    /// even after the value has been deleted.
    pub fn shape(&self) -> &[usize] {
        &self.cached_shape
    }

    pub fn is_live(&self) -> bool {
        !self.value_deleted
    }
}
