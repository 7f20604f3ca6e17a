use thiserror::Error;

use crate::types::NodeId;

/// Errors raised by the graph scaffolding and the checkpointing core.
///
/// The five recomputation/config kinds correspond one-to-one with the
/// error kinds required of the core (`NoCheckpointReachable`,
/// `UnsupportedOpDuringRecompute`, `ShapeMismatch`,
/// `StochasticOpOnDeletedPath`, `ConfigInvalid`); `UnknownDType` and
/// `Tensor` belong to the tensor/graph scaffolding this core is built on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CheckpointError {
    #[error("no checkpoint reachable from node {target}; BFS reached leaf {nearest_leaf} without finding a live ancestor")]
    NoCheckpointReachable { target: NodeId, nearest_leaf: NodeId },

    #[error("node {node} has op `{op}`, which has no recompute dispatch entry")]
    UnsupportedOpDuringRecompute { node: NodeId, op: String },

    #[error("node {node}: recomputed shape {actual:?} does not match cached shape {expected:?}")]
    ShapeMismatch {
        node: NodeId,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("node {node} runs stochastic op `{op}` on a path that would be deleted, but save_rng is false")]
    StochasticOpOnDeletedPath { node: NodeId, op: String },

    #[error("invalid checkpoint manager configuration: {0}")]
    ConfigInvalid(String),

    #[error("cannot price memory footprint: unknown dtype `{0}`")]
    UnknownDType(String),

    #[error("tensor error: {0}")]
    Tensor(String),
}

pub type CheckpointResult<T> = Result<T, CheckpointError>;
