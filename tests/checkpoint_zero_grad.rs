use gradcheck::checkpoint::{zero_grad, CheckpointConfig, CheckpointManager, Policy};
use gradcheck::graph::dsl::GraphBuilder;
use gradcheck::graph::Graph;
use gradcheck::tensor::Tensor;

#[test]
fn zero_grad_sizes_from_cached_shape_and_is_idempotent() -> Result<(), gradcheck::error::CheckpointError> {
    let mut graph = Graph::new();
    let x = graph.leaf(Tensor::random(&[4, 4]), false);
    let w1 = graph.leaf(Tensor::random(&[4, 4]), true);
    let w2 = graph.leaf(Tensor::random(&[4, 4]), true);
    let w3 = graph.leaf(Tensor::random(&[4, 4]), true);
    let root = {
        let mut b = GraphBuilder::new(&mut graph);
        let h1 = b.matmul(x, w1)?;
        let a1 = b.relu(h1)?;
        let h2 = b.matmul(a1, w2)?;
        let a2 = b.relu(h2)?;
        let h3 = b.matmul(a2, w3)?;
        b.sum(h3)?
    };

    let mut manager = CheckpointManager::new(CheckpointConfig {
        policy: Policy::Uniform { interval: 2 },
        ..Default::default()
    })?;
    manager.analyze_and_mark(&mut graph, root)?;
    manager.delete_unmarked(&mut graph, root)?;

    zero_grad(&mut graph, root);
    for id in [w1, w2, w3] {
        let node = graph.node(id);
        let grad = node.grad.as_ref().expect("requires_grad leaf must get a zeroed grad");
        assert_eq!(grad.shape(), node.cached_shape.as_slice());
        assert!(grad.view()?.iter().all(|&v| v == 0.0));
    }
    assert!(graph.node(x).grad.is_none(), "x does not require grad, so it is skipped");

    let snapshot: Vec<Option<Tensor>> = graph.nodes().iter().map(|n| n.grad.clone()).collect();
    zero_grad(&mut graph, root);
    let snapshot2: Vec<Option<Tensor>> = graph.nodes().iter().map(|n| n.grad.clone()).collect();
    assert_eq!(snapshot, snapshot2);
    Ok(())
}
