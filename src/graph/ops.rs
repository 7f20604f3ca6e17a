//! The tagged operator catalogue and its CPU kernel dispatch tables.
//!
//! Per the core's design notes, ops are a tagged enum rather than a
//! `dyn Operation` trait object: this keeps the recompute dispatch in
//! [`crate::checkpoint::recompute`] closed over a finite set, so an
//! unsupported op is a single explicit `_ =>` match arm instead of a
//! missing trait impl discovered at link time.
//!
//! Kernels themselves (`matmul`, `relu`, `sigmoid`, ...) are free functions
//! ported from the teacher's `backend::cpu` module, grouped by op family
//! rather than behind a `Backend` trait, since there is only ever one
//! backend in this crate.

use ndarray::{Array2, Zip};

use crate::error::{CheckpointError, CheckpointResult};
use crate::tensor::Tensor;
use crate::types::NodeId;

/// A forward operator tag.
///
/// `Leaf` marks a user-supplied input or trainable parameter (no inputs).
/// The first block of variants has a real CPU kernel and a recompute
/// dispatch entry; the second block is classification-only (see
/// [`crate::checkpoint::oracle`]) — a host with a richer op library can
/// still construct nodes tagged with them via [`super::Graph::op_opaque`],
/// but this crate's recompute dispatch has no kernel for them.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Leaf,

    Add,
    Sub,
    Mul,
    Div,
    Neg,
    MatMul,
    ReLU,
    Tanh,
    Sigmoid,
    LeakyReLU { alpha: f32 },
    Transpose,
    Reshape { target_shape: Vec<usize> },
    Sum,
    Exp,
    Log,

    Attention,
    LayerNorm,
    RMSNorm,
    Softmax,
    Convolution,
    /// Classified as stochastic by the cost oracle; never eligible for
    /// deletion unless `save_rng` is set (which this crate never honors —
    /// see `SPEC_FULL.md` Open Questions).
    Dropout { p: f32 },
    Custom(String),
}

impl Op {
    pub fn name(&self) -> String {
        match self {
            Op::Leaf => "Leaf".into(),
            Op::Add => "Add".into(),
            Op::Sub => "Sub".into(),
            Op::Mul => "Mul".into(),
            Op::Div => "Div".into(),
            Op::Neg => "Neg".into(),
            Op::MatMul => "MatMul".into(),
            Op::ReLU => "ReLU".into(),
            Op::Tanh => "Tanh".into(),
            Op::Sigmoid => "Sigmoid".into(),
            Op::LeakyReLU { .. } => "LeakyReLU".into(),
            Op::Transpose => "Transpose".into(),
            Op::Reshape { .. } => "Reshape".into(),
            Op::Sum => "Sum".into(),
            Op::Exp => "Exp".into(),
            Op::Log => "Log".into(),
            Op::Attention => "Attention".into(),
            Op::LayerNorm => "LayerNorm".into(),
            Op::RMSNorm => "RMSNorm".into(),
            Op::Softmax => "Softmax".into(),
            Op::Convolution => "Convolution".into(),
            Op::Dropout { .. } => "Dropout".into(),
            Op::Custom(tag) => tag.clone(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Op::Leaf)
    }
}

/// ReLU over the whole tensor, parallelized across elements on multi-core
/// hosts. Mirrors the teacher's `backend::cpu::relu` kernel shape; falls
/// back to a sequential `Zip` when the `rayon` feature is off.
#[cfg(feature = "rayon")]
fn elementwise_relu(x: ndarray::ArrayViewD<'_, f32>) -> Tensor {
    let mut res = x.to_owned();
    Zip::from(&mut res).par_for_each(|v| {
        if *v < 0.0 {
            *v = 0.0;
        }
    });
    res.into()
}

#[cfg(not(feature = "rayon"))]
fn elementwise_relu(x: ndarray::ArrayViewD<'_, f32>) -> Tensor {
    x.mapv(|v| v.max(0.0)).into()
}

#[cfg(feature = "rayon")]
fn elementwise_sigmoid(x: ndarray::ArrayViewD<'_, f32>) -> Tensor {
    let mut res = x.to_owned();
    Zip::from(&mut res).par_for_each(|v| {
        *v = 1.0 / (1.0 + (-*v).exp());
    });
    res.into()
}

#[cfg(not(feature = "rayon"))]
fn elementwise_sigmoid(x: ndarray::ArrayViewD<'_, f32>) -> Tensor {
    x.mapv(|v| 1.0 / (1.0 + (-v).exp())).into()
}

fn as_2d(t: &Tensor) -> CheckpointResult<ndarray::ArrayView2<'_, f32>> {
    t.view()?
        .view()
        .into_dimensionality::<ndarray::Ix2>()
        .map_err(|e| CheckpointError::Tensor(format!("expected a 2D tensor: {e}")))
}

/// Re-executes one forward op given already-materialized inputs.
///
/// Used identically by [`super::Graph::op`] (initial construction) and by
/// the recomputation engine (replay). Returns
/// [`CheckpointError::UnsupportedOpDuringRecompute`] for any tag with no
/// kernel entry; the caller fills in which node raised it.
pub fn forward_eval(op: &Op, inputs: &[&Tensor]) -> CheckpointResult<Tensor> {
    let unsupported = || CheckpointError::UnsupportedOpDuringRecompute {
        node: NodeId(usize::MAX),
        op: op.name(),
    };

    match op {
        Op::Leaf => Err(CheckpointError::Tensor("Leaf has no forward op".into())),

        Op::Add => Ok((inputs[0].view()? + inputs[1].view()?).into()),
        Op::Sub => Ok((inputs[0].view()? - inputs[1].view()?).into()),
        Op::Mul => Ok((inputs[0].view()? * inputs[1].view()?).into()),
        Op::Div => Ok((inputs[0].view()? / inputs[1].view()?).into()),
        Op::Neg => Ok((-inputs[0].view()?).into()),

        Op::MatMul => {
            let a = as_2d(inputs[0])?;
            let b = as_2d(inputs[1])?;
            Ok(a.dot(&b).into_dyn().into())
        }

        Op::ReLU => Ok(elementwise_relu(inputs[0].view()?.into())),
        Op::Tanh => Ok(inputs[0].view()?.mapv(f32::tanh).into()),
        Op::Sigmoid => Ok(elementwise_sigmoid(inputs[0].view()?.into())),
        Op::LeakyReLU { alpha } => {
            Ok(inputs[0].view()?.mapv(|x| if x > 0.0 { x } else { alpha * x }).into())
        }
        Op::Exp => Ok(inputs[0].view()?.mapv(f32::exp).into()),
        Op::Log => Ok(inputs[0].view()?.mapv(f32::ln).into()),

        Op::Transpose => {
            let a = as_2d(inputs[0])?;
            Ok(a.t().to_owned().into_dyn().into())
        }

        Op::Reshape { target_shape } => inputs[0].reshaped(target_shape),

        Op::Sum => {
            let total: f32 = inputs[0].view()?.sum();
            Ok(ndarray::arr0(total).into_dyn().into())
        }

        Op::Attention
        | Op::LayerNorm
        | Op::RMSNorm
        | Op::Softmax
        | Op::Convolution
        | Op::Dropout { .. }
        | Op::Custom(_) => Err(unsupported()),
    }
}

/// Reverse-mode adjoint for one op: given the op's inputs, its own live
/// output, and the incoming gradient, returns the gradient for each input
/// in the same order as `inputs`.
pub fn vjp(op: &Op, inputs: &[&Tensor], output: &Tensor, grad_output: &Tensor) -> CheckpointResult<Vec<Tensor>> {
    let g = grad_output.view()?;

    match op {
        Op::Leaf => Ok(vec![]),

        Op::Add => Ok(vec![
            reduce_to_shape(g.into(), inputs[0].shape())?,
            reduce_to_shape(g.into(), inputs[1].shape())?,
        ]),
        Op::Sub => Ok(vec![
            reduce_to_shape(g.into(), inputs[0].shape())?,
            reduce_to_shape((-g.to_owned()).view(), inputs[1].shape())?,
        ]),
        Op::Mul => {
            let a = inputs[0].view()?;
            let b = inputs[1].view()?;
            Ok(vec![(g.to_owned() * b).into(), (g.to_owned() * a).into()])
        }
        Op::Div => {
            let a = inputs[0].view()?;
            let b = inputs[1].view()?;
            let grad_a = (g.to_owned() / b).into();
            let grad_b: Tensor = (-(g.to_owned() * a) / (b * b)).into();
            Ok(vec![grad_a, grad_b])
        }
        Op::Neg => Ok(vec![(-g.to_owned()).into()]),

        Op::MatMul => {
            let a = as_2d(inputs[0])?;
            let b = as_2d(inputs[1])?;
            let g2 = g
                .view()
                .into_dimensionality::<ndarray::Ix2>()
                .map_err(|e| CheckpointError::Tensor(format!("expected 2D grad: {e}")))?;
            let grad_a: Tensor = g2.dot(&b.t()).into_dyn().into();
            let grad_b: Tensor = a.t().dot(&g2).into_dyn().into();
            Ok(vec![grad_a, grad_b])
        }

        Op::ReLU => {
            let x = inputs[0].view()?;
            Ok(vec![Zip::from(g).and(x).map_collect(|&gi, &xi| if xi > 0.0 { gi } else { 0.0 }).into()])
        }
        Op::Tanh => {
            let y = output.view()?;
            Ok(vec![Zip::from(g).and(y).map_collect(|&gi, &yi| gi * (1.0 - yi * yi)).into()])
        }
        Op::Sigmoid => {
            let y = output.view()?;
            Ok(vec![Zip::from(g).and(y).map_collect(|&gi, &yi| gi * yi * (1.0 - yi)).into()])
        }
        Op::LeakyReLU { alpha } => {
            let x = inputs[0].view()?;
            let alpha = *alpha;
            Ok(vec![Zip::from(g).and(x).map_collect(|&gi, &xi| if xi > 0.0 { gi } else { alpha * gi }).into()])
        }
        Op::Exp => {
            let y = output.view()?;
            Ok(vec![(g.to_owned() * y).into()])
        }
        Op::Log => {
            let x = inputs[0].view()?;
            Ok(vec![(g.to_owned() / x).into()])
        }

        Op::Transpose => {
            let g2 = g
                .view()
                .into_dimensionality::<ndarray::Ix2>()
                .map_err(|e| CheckpointError::Tensor(format!("expected 2D grad: {e}")))?;
            Ok(vec![g2.t().to_owned().into_dyn().into()])
        }

        Op::Reshape { .. } => Ok(vec![Tensor::from_array(g.to_owned()).reshaped(inputs[0].shape())?]),

        Op::Sum => {
            let scalar = g.iter().next().copied().unwrap_or(0.0);
            Ok(vec![Tensor::from_array(ndarray::ArrayD::from_elem(
                ndarray::IxDyn(inputs[0].shape()),
                scalar,
            ))])
        }

        Op::Attention
        | Op::LayerNorm
        | Op::RMSNorm
        | Op::Softmax
        | Op::Convolution
        | Op::Dropout { .. }
        | Op::Custom(_) => Err(CheckpointError::UnsupportedOpDuringRecompute {
            node: NodeId(usize::MAX),
            op: op.name(),
        }),
    }
}

/// Reduces a broadcast gradient back down to `target_shape` by summing over
/// the axes that were broadcast, matching numpy/ndarray broadcasting rules.
fn reduce_to_shape(grad: ndarray::ArrayViewD<'_, f32>, target_shape: &[usize]) -> CheckpointResult<Tensor> {
    if grad.shape() == target_shape {
        return Ok(Tensor::from_array(grad.to_owned()));
    }
    let grad_dims = grad.ndim();
    let target_dims = target_shape.len();
    let mut reduced = grad.to_owned();

    for _ in 0..(grad_dims - target_dims.min(grad_dims)) {
        reduced = reduced.sum_axis(ndarray::Axis(0));
    }
    for (i, &dim) in target_shape.iter().enumerate() {
        if dim == 1 && reduced.shape()[i] != 1 {
            reduced = reduced.sum_axis(ndarray::Axis(i)).insert_axis(ndarray::Axis(i));
        }
    }
    reduced
        .into_shape(target_shape)
        .map(Tensor::from_array)
        .map_err(|e| CheckpointError::Tensor(format!("broadcast-reduce failed: {e}")))
}

/// Matrix multiply kept as a standalone kernel (mirrors the teacher's
/// `backend::cpu::matmul_t`) for use outside the `Op` dispatch — e.g. by
/// demos that want a raw 2D matmul without building a graph node.
pub fn matmul(a: &Array2<f32>, b: &Array2<f32>) -> Array2<f32> {
    a.dot(b)
}
