use ndarray::ArrayD;

/// Backing storage for a [`super::Tensor`].
///
/// This crate only ever stores `f32` elements; the `DType` tag carried
/// alongside `Storage` in `Tensor` is metadata for byte accounting, not a
/// second representation (see [`crate::types::DType`]).
#[derive(Clone, Debug)]
pub enum Storage {
    Dense(ArrayD<f32>),
    /// Released storage left behind by [`super::Tensor::take`]; holds no
    /// elements. `Tensor::is_empty` is true exactly when storage is `Empty`.
    Empty,
}

impl Storage {
    pub fn is_empty(&self) -> bool {
        matches!(self, Storage::Empty)
    }
}
