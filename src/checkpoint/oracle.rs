//! C2 — the operator cost oracle: a pure classifier consulted by C3, never
//! authoritative on its own (placement may override it by footprint or
//! policy).

use crate::graph::Op;

/// True if `op` is worth preferring as a checkpoint candidate: its
/// recomputation cost is high relative to simply keeping its value around.
///
/// Cheap ops (elementwise arithmetic, simple activations, shape ops) are
/// fast to replay, so there is little to gain from protecting them.
/// Expensive ops (matrix/attention/normalization/transcendental kernels)
/// are worth paying storage for rather than paying to redo.
pub fn should_checkpoint(op: &Op) -> bool {
    match op {
        Op::Leaf
        | Op::Add
        | Op::Sub
        | Op::Mul
        | Op::Div
        | Op::Neg
        | Op::ReLU
        | Op::Tanh
        | Op::Sigmoid
        | Op::LeakyReLU { .. }
        | Op::Transpose
        | Op::Reshape { .. }
        | Op::Sum => false,

        Op::MatMul
        | Op::Attention
        | Op::LayerNorm
        | Op::RMSNorm
        | Op::Softmax
        | Op::Exp
        | Op::Log
        | Op::Convolution => true,

        // Unknown to the oracle; treated as cheap rather than silently
        // recommending it for checkpointing, since a custom op's cost is
        // unknowable here.
        Op::Custom(_) => false,

        // Never eligible for checkpoint-by-classification: stochastic ops
        // are excluded from deletion entirely by `save_rng` enforcement,
        // not routed through the oracle's cheap/expensive split.
        Op::Dropout { .. } => false,
    }
}

/// True if `op` is stochastic, i.e. its forward re-execution would draw
/// fresh randomness and therefore produce a different value unless RNG
/// state is captured and restored. This crate never captures RNG state
/// (see `SPEC_FULL.md` Open Questions), so any stochastic op reachable
/// from a deletion candidate must block that deletion.
pub fn is_stochastic(op: &Op) -> bool {
    matches!(op, Op::Dropout { .. })
}
