//! Gradient checkpointing core for a reverse-mode automatic
//! differentiation engine over dense numeric tensors.
//!
//! A forward pass builds a [`graph::Graph`] of [`graph::Node`]s. Before
//! running the backward pass, a [`checkpoint::CheckpointManager`] marks a
//! subset of nodes as checkpoints ([`checkpoint::Policy`]) and deletes the
//! rest's materialized values. During backward, [`engine::backward`] calls
//! the two checkpoint hooks before touching any node's value; deleted
//! values are transparently re-materialized on demand by
//! [`checkpoint::recompute`].
//!
//! ```
//! use gradcheck::checkpoint::{CheckpointConfig, CheckpointManager, Policy};
//! use gradcheck::graph::Graph;
//! use gradcheck::tensor::Tensor;
//!
//! # fn main() -> Result<(), gradcheck::error::CheckpointError> {
//! let mut graph = Graph::new();
//! let x = graph.leaf(Tensor::zeros(&[4]), true);
//! let mut builder = gradcheck::graph::dsl::GraphBuilder::new(&mut graph);
//! let root = builder.sum(x)?;
//!
//! let mut manager = CheckpointManager::new(CheckpointConfig {
//!     policy: Policy::Uniform { interval: 2 },
//!     ..Default::default()
//! })?;
//! manager.analyze_and_mark(&mut graph, root)?;
//! manager.delete_unmarked(&mut graph, root)?;
//! gradcheck::engine::backward(&mut graph, &mut manager, root)?;
//! # Ok(())
//! # }
//! ```

pub mod checkpoint;
pub mod engine;
pub mod error;
pub mod graph;
pub mod tensor;
pub mod types;

pub use error::{CheckpointError, CheckpointResult};
pub use tensor::Tensor;
pub use types::{DType, NodeId};
