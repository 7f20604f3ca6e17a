pub mod storage;

use ndarray::{ArrayD, IxDyn};
use storage::Storage;

use crate::error::{CheckpointError, CheckpointResult};
use crate::types::DType;

/// A dense, `f32`-backed N-dimensional tensor value.
///
/// Stands in for "the tensor library" that the checkpointing core treats as
/// an external collaborator (see `SPEC_FULL.md` §1/§6): the core only ever
/// needs `shape()`, `dtype()`, a byte-size query, `is_empty()`, and a
/// destructive [`Tensor::take`].
#[derive(Clone, Debug)]
pub struct Tensor {
    storage: Storage,
    shape: Vec<usize>,
    dtype: DType,
}

impl Tensor {
    pub fn from_array(data: ArrayD<f32>) -> Self {
        let shape = data.shape().to_vec();
        Self {
            storage: Storage::Dense(data),
            shape,
            dtype: DType::F32,
        }
    }

    pub fn with_dtype(mut self, dtype: DType) -> Self {
        self.dtype = dtype;
        self
    }

    pub fn zeros(shape: &[usize]) -> Self {
        Self::from_array(ArrayD::zeros(IxDyn(shape)))
    }

    pub fn random(shape: &[usize]) -> Self {
        use ndarray_rand::rand_distr::Uniform;
        use ndarray_rand::RandomExt;
        Self::from_array(ArrayD::random(IxDyn(shape), Uniform::new(-1.0, 1.0)))
    }

    /// An empty tensor of the given (logical) shape and dtype: what a node
    /// looks like right after the deletion pass releases its value.
    pub fn empty(shape: Vec<usize>, dtype: DType) -> Self {
        Self {
            storage: Storage::Empty,
            shape,
            dtype,
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn dtype(&self) -> &DType {
        &self.dtype
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    /// Number of bytes this tensor's live storage occupies, or an error if
    /// its dtype is unrecognized. Empty tensors cost 0 regardless of dtype.
    pub fn byte_size(&self) -> CheckpointResult<u64> {
        if self.is_empty() {
            return Ok(0);
        }
        let elems = self.len() as u64;
        Ok(elems * self.dtype.bytes_per_element()?)
    }

    /// Takes ownership of this tensor's storage, leaving an empty tensor of
    /// the same shape/dtype behind. This is the core's only way to release
    /// a node's value; the taken `Tensor` is simply dropped by the caller.
    pub fn take(&mut self) -> Tensor {
        let taken = Tensor {
            storage: std::mem::replace(&mut self.storage, Storage::Empty),
            shape: self.shape.clone(),
            dtype: self.dtype.clone(),
        };
        taken
    }

    pub fn view(&self) -> CheckpointResult<&ArrayD<f32>> {
        match &self.storage {
            Storage::Dense(a) => Ok(a),
            Storage::Empty => Err(CheckpointError::Tensor(format!(
                "attempted to read value of an empty (deleted) tensor with shape {:?}",
                self.shape
            ))),
        }
    }

    pub fn into_array(self) -> CheckpointResult<ArrayD<f32>> {
        match self.storage {
            Storage::Dense(a) => Ok(a),
            Storage::Empty => Err(CheckpointError::Tensor(
                "attempted to consume an empty (deleted) tensor".into(),
            )),
        }
    }

    pub fn reshaped(&self, shape: &[usize]) -> CheckpointResult<Tensor> {
        let data = self
            .view()?
            .clone()
            .into_shape(IxDyn(shape))
            .map_err(|e| CheckpointError::Tensor(format!("reshape failed: {e}")))?;
        Ok(Tensor::from_array(data).with_dtype(self.dtype.clone()))
    }
}

impl PartialEq for Tensor {
    fn eq(&self, other: &Self) -> bool {
        match (&self.storage, &other.storage) {
            (Storage::Dense(a), Storage::Dense(b)) => a == b,
            (Storage::Empty, Storage::Empty) => self.shape == other.shape,
            _ => false,
        }
    }
}

impl From<ArrayD<f32>> for Tensor {
    fn from(data: ArrayD<f32>) -> Self {
        Self::from_array(data)
    }
}
