//! Ergonomic node-construction helpers, adapted from the teacher's `dsl`
//! module: thin wrappers over [`super::Graph::op`] so tests and demos read
//! as expression trees instead of raw `Op` + `Vec<NodeId>` plumbing.

use crate::error::CheckpointResult;
use crate::tensor::Tensor;
use crate::types::NodeId;

use super::ops::Op;
use super::Graph;

/// Wraps a [`Graph`] with builder methods for the core-native op set.
/// Holds the graph by unique reference rather than owning it, so callers
/// retain their own handle for inspection between builder calls.
pub struct GraphBuilder<'g> {
    graph: &'g mut Graph,
}

impl<'g> GraphBuilder<'g> {
    pub fn new(graph: &'g mut Graph) -> Self {
        Self { graph }
    }

    pub fn input(&mut self, value: Tensor) -> NodeId {
        self.graph.leaf(value, false)
    }

    pub fn param(&mut self, value: Tensor) -> NodeId {
        self.graph.leaf(value, true)
    }

    pub fn add(&mut self, a: NodeId, b: NodeId) -> CheckpointResult<NodeId> {
        self.binary(Op::Add, a, b)
    }

    pub fn sub(&mut self, a: NodeId, b: NodeId) -> CheckpointResult<NodeId> {
        self.binary(Op::Sub, a, b)
    }

    pub fn mul(&mut self, a: NodeId, b: NodeId) -> CheckpointResult<NodeId> {
        self.binary(Op::Mul, a, b)
    }

    pub fn div(&mut self, a: NodeId, b: NodeId) -> CheckpointResult<NodeId> {
        self.binary(Op::Div, a, b)
    }

    pub fn matmul(&mut self, a: NodeId, b: NodeId) -> CheckpointResult<NodeId> {
        self.binary(Op::MatMul, a, b)
    }

    pub fn neg(&mut self, a: NodeId) -> CheckpointResult<NodeId> {
        self.unary(Op::Neg, a)
    }

    pub fn relu(&mut self, a: NodeId) -> CheckpointResult<NodeId> {
        self.unary(Op::ReLU, a)
    }

    pub fn tanh(&mut self, a: NodeId) -> CheckpointResult<NodeId> {
        self.unary(Op::Tanh, a)
    }

    pub fn sigmoid(&mut self, a: NodeId) -> CheckpointResult<NodeId> {
        self.unary(Op::Sigmoid, a)
    }

    pub fn leaky_relu(&mut self, a: NodeId, alpha: f32) -> CheckpointResult<NodeId> {
        self.unary(Op::LeakyReLU { alpha }, a)
    }

    pub fn exp(&mut self, a: NodeId) -> CheckpointResult<NodeId> {
        self.unary(Op::Exp, a)
    }

    pub fn log(&mut self, a: NodeId) -> CheckpointResult<NodeId> {
        self.unary(Op::Log, a)
    }

    pub fn transpose(&mut self, a: NodeId) -> CheckpointResult<NodeId> {
        self.unary(Op::Transpose, a)
    }

    pub fn reshape(&mut self, a: NodeId, target_shape: Vec<usize>) -> CheckpointResult<NodeId> {
        self.unary(Op::Reshape { target_shape }, a)
    }

    pub fn sum(&mut self, a: NodeId) -> CheckpointResult<NodeId> {
        self.unary(Op::Sum, a)
    }

    fn binary(&mut self, op: Op, a: NodeId, b: NodeId) -> CheckpointResult<NodeId> {
        let requires_grad = self.graph.node(a).requires_grad || self.graph.node(b).requires_grad;
        self.graph.op(op, vec![a, b], requires_grad)
    }

    fn unary(&mut self, op: Op, a: NodeId) -> CheckpointResult<NodeId> {
        let requires_grad = self.graph.node(a).requires_grad;
        self.graph.op(op, vec![a], requires_grad)
    }
}
