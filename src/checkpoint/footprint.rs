//! C1 — the footprint accountant.

use crate::error::CheckpointResult;
use crate::graph::{Graph, Node};
use crate::types::NodeId;

/// Byte cost reclaimable by deleting `node`'s value (and, once the
/// scaffolding grows saved-tensor support, its saved tensors).
///
/// Leaves and already-deleted nodes cost 0: there is nothing to reclaim
/// from a leaf (I2 forbids deleting it anyway) and a deleted node already
/// holds empty storage. An unrecognized dtype fails the whole pass rather
/// than silently guessing a size — see [`crate::types::DType::bytes_per_element`].
pub fn footprint(node: &Node) -> CheckpointResult<u64> {
    if node.is_leaf() || node.value_deleted {
        return Ok(0);
    }
    match &node.value {
        Some(tensor) => tensor.byte_size(),
        None => Ok(0),
    }
}

/// Computes and caches `memory_footprint` for every node in the graph, in
/// arena order. Cheap enough to run once per pass; C3's Budget and
/// Adaptive policies both read the cached value afterward.
pub fn price_all(graph: &mut Graph) -> CheckpointResult<()> {
    for i in 0..graph.len() {
        let id = NodeId(i);
        let bytes = footprint(graph.node(id))?;
        graph.node_mut(id).memory_footprint = bytes;
    }
    Ok(())
}
