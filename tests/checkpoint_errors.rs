use gradcheck::checkpoint::{CheckpointConfig, CheckpointManager, Policy};
use gradcheck::error::CheckpointError;
use gradcheck::graph::dsl::GraphBuilder;
use gradcheck::graph::{Graph, Op};
use gradcheck::tensor::Tensor;

#[test]
fn no_checkpoint_reachable_when_only_an_unmarked_leaf_precedes_target() {
    // a = leaf; b = exp(a); c = sum(b). Nothing is ever marked as a
    // checkpoint, so forcing b's value away leaves no live ancestor
    // checkpoint for recompute to anchor on — a live-but-unmarked leaf
    // does not count (see the anchor-search rationale in recompute.rs).
    let mut graph = Graph::new();
    let a = graph.leaf(Tensor::random(&[4]), true);
    let (b, _c) = {
        let mut builder = GraphBuilder::new(&mut graph);
        let b = builder.exp(a).unwrap();
        let c = builder.sum(b).unwrap();
        (b, c)
    };

    graph.node_mut(b).value.as_mut().unwrap().take();
    graph.node_mut(b).value_deleted = true;

    let err = gradcheck::checkpoint::recompute(&mut graph, b).unwrap_err();
    match err {
        CheckpointError::NoCheckpointReachable { target, nearest_leaf } => {
            assert_eq!(target, b);
            assert_eq!(nearest_leaf, a);
        }
        other => panic!("expected NoCheckpointReachable, got {other:?}"),
    }
}

#[test]
fn unsupported_op_during_recompute_names_the_offending_op() -> Result<(), CheckpointError> {
    // checkpoint -> custom (host-computed, no dispatch entry) -> checkpoint
    let mut graph = Graph::new();
    let root_input = graph.leaf(Tensor::zeros(&[4]), true);
    graph.node_mut(root_input).is_checkpoint = true;

    let custom_value = Tensor::zeros(&[4]);
    let custom = graph.op_opaque(Op::Custom("FusedKernel".into()), vec![root_input], custom_value, true);

    let consumer = {
        let mut builder = GraphBuilder::new(&mut graph);
        builder.relu(custom)?
    };
    graph.node_mut(consumer).is_checkpoint = true;

    let mut manager = CheckpointManager::new(CheckpointConfig::default())?;
    manager.delete_unmarked(&mut graph, consumer)?;
    assert!(graph.node(custom).value_deleted);

    let err = gradcheck::checkpoint::recompute(&mut graph, custom).unwrap_err();
    match err {
        CheckpointError::UnsupportedOpDuringRecompute { node, op } => {
            assert_eq!(node, custom);
            assert_eq!(op, "FusedKernel");
        }
        other => panic!("expected UnsupportedOpDuringRecompute, got {other:?}"),
    }
    Ok(())
}

#[test]
fn deletion_refuses_to_drop_a_stochastic_op_node() -> Result<(), CheckpointError> {
    let mut graph = Graph::new();
    let x = graph.leaf(Tensor::zeros(&[4]), true);
    graph.node_mut(x).is_checkpoint = true;
    let dropout_value = Tensor::zeros(&[4]);
    let dropped = graph.op_opaque(Op::Dropout { p: 0.5 }, vec![x], dropout_value, true);
    let root = {
        let mut builder = GraphBuilder::new(&mut graph);
        builder.sum(dropped)?
    };
    graph.node_mut(root).is_checkpoint = true;

    let mut manager = CheckpointManager::new(CheckpointConfig::default())?;
    let err = manager.delete_unmarked(&mut graph, root).unwrap_err();
    assert!(matches!(err, CheckpointError::StochasticOpOnDeletedPath { .. }));
    Ok(())
}

#[test]
fn manager_rejects_zero_interval_and_save_rng() {
    assert!(matches!(
        CheckpointManager::new(CheckpointConfig {
            policy: Policy::Uniform { interval: 0 },
            ..Default::default()
        })
        .unwrap_err(),
        CheckpointError::ConfigInvalid(_)
    ));

    assert!(matches!(
        CheckpointManager::new(CheckpointConfig {
            save_rng: true,
            ..Default::default()
        })
        .unwrap_err(),
        CheckpointError::ConfigInvalid(_)
    ));
}
