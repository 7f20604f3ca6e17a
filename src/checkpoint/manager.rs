//! C7 — the checkpoint manager: the user-facing orchestration facade.
//!
//! Shaped after the config/stats split other training-loop checkpoint
//! managers in the retrieval pack use (a small `Config` struct the user
//! builds once, a `Stats` snapshot read after each step) rather than a
//! single struct mixing both concerns.

use tracing::info;

use crate::error::{CheckpointError, CheckpointResult};
use crate::graph::Graph;
use crate::types::NodeId;

use super::deletion;
use super::placement::{self, Policy};

/// User-tunable configuration. `policy` selects the C3 strategy;
/// `interval`/`budget_bytes` are only consulted by the policy variant that
/// needs them. `save_rng` is carried for interface completeness but this
/// crate never honors it as `true` — see `SPEC_FULL.md` Open Questions;
/// attempting to set it fails validation.
#[derive(Debug, Clone)]
pub struct CheckpointConfig {
    pub policy: Policy,
    pub verbose: bool,
    pub save_rng: bool,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            policy: Policy::Uniform { interval: 2 },
            verbose: false,
            save_rng: false,
        }
    }
}

impl CheckpointConfig {
    fn validate(&self) -> CheckpointResult<()> {
        check_save_rng(self.save_rng)?;
        self.policy.validate()
    }
}

fn check_save_rng(save_rng: bool) -> CheckpointResult<()> {
    if save_rng {
        return Err(CheckpointError::ConfigInvalid(
            "save_rng is reserved for future stochastic-op support and must be false".into(),
        ));
    }
    Ok(())
}

/// Counters accumulated across calls to [`CheckpointManager::analyze_and_mark`],
/// [`CheckpointManager::delete_unmarked`], and [`CheckpointManager::recompute`].
/// Reset with [`CheckpointManager::reset_stats`] between training steps, or
/// left to accumulate across a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckpointStats {
    pub marked_count: usize,
    pub deleted_count: u64,
    pub bytes_freed: u64,
    pub recompute_count: u64,
}

/// Owned, single-step orchestration object. Not a singleton: one instance
/// per graph/training step, per the design notes' rejection of
/// process-wide mutable state.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    config: CheckpointConfig,
    stats: CheckpointStats,
}

impl CheckpointManager {
    pub fn new(config: CheckpointConfig) -> CheckpointResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            stats: CheckpointStats::default(),
        })
    }

    pub fn set_policy(&mut self, policy: Policy) -> CheckpointResult<()> {
        policy.validate()?;
        self.config.policy = policy;
        Ok(())
    }

    pub fn set_interval(&mut self, interval: usize) -> CheckpointResult<()> {
        self.set_policy(Policy::Uniform { interval })
    }

    pub fn set_budget(&mut self, max_bytes: u64) -> CheckpointResult<()> {
        self.set_policy(Policy::Budget { max_bytes })
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.config.verbose = verbose;
    }

    pub fn set_save_rng(&mut self, save_rng: bool) -> CheckpointResult<()> {
        check_save_rng(save_rng)?;
        self.config.save_rng = save_rng;
        Ok(())
    }

    /// Marks `checkpoint = true` on `node` directly and returns it
    /// unchanged — the manual-mode marking primitive from the external
    /// interface. Works under any policy, not just `Policy::Manual`.
    pub fn checkpoint(&mut self, graph: &mut Graph, node: NodeId) -> NodeId {
        if !graph.node(node).is_leaf() {
            graph.node_mut(node).is_checkpoint = true;
        }
        node
    }

    /// Dispatches to the configured C3 strategy. Under `Policy::Manual`
    /// this only ensures the root is marked; the rest of the marking is
    /// expected to have happened via [`CheckpointManager::checkpoint`]
    /// calls during graph construction.
    pub fn analyze_and_mark(&mut self, graph: &mut Graph, root: NodeId) -> CheckpointResult<usize> {
        super::footprint::price_all(graph)?;
        let marked = placement::mark(graph, root, self.config.policy)?;
        self.stats.marked_count = marked;
        if self.config.verbose {
            info!(marked, policy = ?self.config.policy, "checkpoints marked");
        }
        Ok(marked)
    }

    pub fn delete_unmarked(&mut self, graph: &mut Graph, root: NodeId) -> CheckpointResult<u64> {
        let freed = deletion::delete_unmarked(graph, root)?;
        self.stats.bytes_freed += freed;
        self.stats.deleted_count = graph.nodes().iter().filter(|n| n.value_deleted).count() as u64;
        if self.config.verbose {
            info!(freed, "unmarked node values deleted");
        }
        Ok(freed)
    }

    /// Records one [`super::recompute::recompute`] invocation against the
    /// running stats; call this from the backward driver alongside the
    /// actual recompute call, since the manager does not itself own the
    /// engine loop.
    pub fn record_recompute(&mut self) {
        self.stats.recompute_count += 1;
        if self.config.verbose {
            info!(total = self.stats.recompute_count, "node recomputed");
        }
    }

    pub fn stats(&self) -> CheckpointStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = CheckpointStats::default();
    }

    pub fn config(&self) -> &CheckpointConfig {
        &self.config
    }
}
