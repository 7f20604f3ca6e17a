use crate::error::{CheckpointError, CheckpointResult};

/// Identifies a node in a [`crate::graph::Graph`]'s node arena.
///
/// Nodes are only ever appended, so a node's `NodeId` also doubles as its
/// position in a valid topological order: every input of node `i` has an
/// id strictly less than `i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Element type tag carried by a [`crate::tensor::Tensor`].
///
/// Storage in this crate is always `f32`-backed internally (see
/// `tensor::Storage`); `DType` is metadata consulted by the footprint
/// accountant, not a second representation. `Other` stands in for a dtype
/// this crate's byte-accounting doesn't recognize, which is what lets the
/// "unknown dtype must fail the pass" edge case in the footprint accountant
/// be exercised without a fully dtype-generic tensor library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DType {
    F32,
    F64,
    I32,
    I64,
    Bool,
    Other(String),
}

impl DType {
    pub fn bytes_per_element(&self) -> CheckpointResult<u64> {
        match self {
            DType::F32 | DType::I32 => Ok(4),
            DType::F64 | DType::I64 => Ok(8),
            DType::Bool => Ok(1),
            DType::Other(tag) => Err(CheckpointError::UnknownDType(tag.clone())),
        }
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DType::F32 => write!(f, "f32"),
            DType::F64 => write!(f, "f64"),
            DType::I32 => write!(f, "i32"),
            DType::I64 => write!(f, "i64"),
            DType::Bool => write!(f, "bool"),
            DType::Other(tag) => write!(f, "other({tag})"),
        }
    }
}
