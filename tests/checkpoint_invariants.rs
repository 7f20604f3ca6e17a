use gradcheck::checkpoint::{CheckpointConfig, CheckpointManager, Policy};
use gradcheck::graph::dsl::GraphBuilder;
use gradcheck::graph::Graph;
use gradcheck::tensor::Tensor;

fn three_layer_mlp() -> (Graph, gradcheck::types::NodeId, gradcheck::types::NodeId) {
    let mut graph = Graph::new();
    let x = graph.leaf(Tensor::random(&[4, 4]), false);
    let w1 = graph.leaf(Tensor::random(&[4, 4]), true);
    let w2 = graph.leaf(Tensor::random(&[4, 4]), true);
    let w3 = graph.leaf(Tensor::random(&[4, 4]), true);
    let root = {
        let mut b = GraphBuilder::new(&mut graph);
        let h1 = b.matmul(x, w1).unwrap();
        let a1 = b.relu(h1).unwrap();
        let h2 = b.matmul(a1, w2).unwrap();
        let a2 = b.relu(h2).unwrap();
        let h3 = b.matmul(a2, w3).unwrap();
        b.sum(h3).unwrap()
    };
    (graph, x, root)
}

#[test]
fn checkpoints_and_leaves_are_never_deleted() -> Result<(), gradcheck::error::CheckpointError> {
    let (mut graph, _x, root) = three_layer_mlp();
    let mut manager = CheckpointManager::new(CheckpointConfig {
        policy: Policy::Uniform { interval: 2 },
        ..Default::default()
    })?;
    manager.analyze_and_mark(&mut graph, root)?;
    manager.delete_unmarked(&mut graph, root)?;

    for node in graph.nodes() {
        if node.is_leaf() || node.is_checkpoint {
            assert!(!node.value_deleted);
        }
    }
    Ok(())
}

#[test]
fn shape_is_stable_across_deletion_and_recompute() -> Result<(), gradcheck::error::CheckpointError> {
    let (mut graph, _x, root) = three_layer_mlp();
    let shapes_before: Vec<Vec<usize>> = graph.nodes().iter().map(|n| n.shape().to_vec()).collect();

    let mut manager = CheckpointManager::new(CheckpointConfig {
        policy: Policy::Uniform { interval: 2 },
        ..Default::default()
    })?;
    manager.analyze_and_mark(&mut graph, root)?;
    manager.delete_unmarked(&mut graph, root)?;

    for (id, expected) in shapes_before.iter().enumerate() {
        assert_eq!(graph.shape_of(gradcheck::types::NodeId(id)), expected.as_slice());
    }

    for i in 0..graph.len() {
        let id = gradcheck::types::NodeId(i);
        if graph.node(id).value_deleted {
            gradcheck::checkpoint::recompute(&mut graph, id)?;
        }
        assert_eq!(graph.shape_of(id), shapes_before[i].as_slice());
    }
    Ok(())
}

#[test]
fn deletion_is_idempotent() -> Result<(), gradcheck::error::CheckpointError> {
    let (mut graph, _x, root) = three_layer_mlp();
    let mut manager = CheckpointManager::new(CheckpointConfig {
        policy: Policy::Uniform { interval: 2 },
        ..Default::default()
    })?;
    manager.analyze_and_mark(&mut graph, root)?;
    let first = manager.delete_unmarked(&mut graph, root)?;
    assert!(first > 0);
    let second = manager.delete_unmarked(&mut graph, root)?;
    assert_eq!(second, 0);
    Ok(())
}

#[test]
fn recompute_on_a_live_node_is_a_no_op() -> Result<(), gradcheck::error::CheckpointError> {
    let (mut graph, _x, root) = three_layer_mlp();
    let before = graph.node(root).value.clone();
    gradcheck::checkpoint::recompute(&mut graph, root)?;
    assert_eq!(graph.node(root).value, before);
    Ok(())
}

#[test]
fn single_leaf_graph_marks_nothing_and_frees_nothing() -> Result<(), gradcheck::error::CheckpointError> {
    let mut graph = Graph::new();
    let root = graph.leaf(Tensor::zeros(&[3]), true);
    let mut manager = CheckpointManager::new(CheckpointConfig::default())?;
    let marked = manager.analyze_and_mark(&mut graph, root)?;
    assert_eq!(marked, 0);
    let freed = manager.delete_unmarked(&mut graph, root)?;
    assert_eq!(freed, 0);
    Ok(())
}

#[test]
fn root_only_expensive_op_frees_nothing() -> Result<(), gradcheck::error::CheckpointError> {
    let mut graph = Graph::new();
    let a = graph.leaf(Tensor::random(&[3, 3]), true);
    let b = graph.leaf(Tensor::random(&[3, 3]), true);
    let root = {
        let mut builder = GraphBuilder::new(&mut graph);
        builder.matmul(a, b)?
    };
    let mut manager = CheckpointManager::new(CheckpointConfig {
        policy: Policy::Uniform { interval: 2 },
        ..Default::default()
    })?;
    manager.analyze_and_mark(&mut graph, root)?;
    assert!(graph.node(root).is_checkpoint);
    let freed = manager.delete_unmarked(&mut graph, root)?;
    assert_eq!(freed, 0);
    Ok(())
}

#[test]
fn diamond_graph_recomputes_both_branches_from_shared_anchor() -> Result<(), gradcheck::error::CheckpointError> {
    let mut graph = Graph::new();
    let a = graph.leaf(Tensor::random(&[4]), true);
    let (b, c, d) = {
        let mut builder = GraphBuilder::new(&mut graph);
        let b = builder.relu(a)?;
        let c = builder.exp(a)?;
        let d = builder.add(b, c)?;
        (b, c, d)
    };

    // A and D are checkpoints; B and C are deleted interior nodes.
    graph.node_mut(a).is_checkpoint = true;
    graph.node_mut(d).is_checkpoint = true;
    CheckpointManager::new(CheckpointConfig::default())?.delete_unmarked(&mut graph, d)?;

    assert!(graph.node(b).value_deleted);
    assert!(graph.node(c).value_deleted);

    gradcheck::checkpoint::recompute(&mut graph, b)?;
    gradcheck::checkpoint::recompute(&mut graph, c)?;
    assert!(!graph.node(b).value_deleted);
    assert!(!graph.node(c).value_deleted);
    Ok(())
}
