use gradcheck::graph::dsl::GraphBuilder;
use gradcheck::graph::Graph;
use gradcheck::tensor::Tensor;
use ndarray::ArrayD;

fn scalar_tensor(shape: &[usize], value: f32) -> Tensor {
    Tensor::from_array(ArrayD::from_elem(ndarray::IxDyn(shape), value))
}

#[test]
fn node_ids_are_a_valid_topological_order() -> Result<(), gradcheck::error::CheckpointError> {
    let mut graph = Graph::new();
    let x = graph.leaf(scalar_tensor(&[2], 1.0), true);
    let one = graph.leaf(scalar_tensor(&[2], 1.0), false);
    let mut b = GraphBuilder::new(&mut graph);
    let n1 = b.add(x, one)?;
    let n2 = b.relu(n1)?;

    for &id in &[n1, n2] {
        for &input in &graph.node(id).inputs {
            assert!(input.index() < id.index(), "input must precede its consumer");
        }
    }
    Ok(())
}

#[test]
fn shape_survives_construction() -> Result<(), gradcheck::error::CheckpointError> {
    let mut graph = Graph::new();
    let x = graph.leaf(Tensor::zeros(&[3, 4]), true);
    let mut b = GraphBuilder::new(&mut graph);
    let root = b.sum(x)?;
    assert_eq!(graph.shape_of(x), &[3, 4]);
    assert_eq!(graph.shape_of(root), &[] as &[usize]);
    Ok(())
}

#[test]
fn matmul_and_relu_compute_expected_values() -> Result<(), gradcheck::error::CheckpointError> {
    let mut graph = Graph::new();
    let a = graph.leaf(
        Tensor::from_array(ArrayD::from_shape_vec(ndarray::IxDyn(&[2, 2]), vec![1.0, -2.0, 3.0, 4.0]).unwrap()),
        true,
    );
    let w = graph.leaf(
        Tensor::from_array(ArrayD::from_shape_vec(ndarray::IxDyn(&[2, 2]), vec![1.0, 0.0, 0.0, 1.0]).unwrap()),
        true,
    );
    let mut b = GraphBuilder::new(&mut graph);
    let h = b.matmul(a, w)?;
    let y = b.relu(h)?;

    let y_values = graph.node(y).value.as_ref().unwrap().view()?.clone();
    assert_eq!(y_values.as_slice().unwrap(), &[1.0, 0.0, 3.0, 4.0]);
    Ok(())
}

#[test]
fn opaque_node_carries_externally_computed_value() {
    let mut graph = Graph::new();
    let x = graph.leaf(Tensor::zeros(&[4]), false);
    let attention_out = Tensor::zeros(&[4]);
    let y = graph.op_opaque(gradcheck::graph::Op::Attention, vec![x], attention_out, false);
    assert!(!graph.node(y).is_leaf());
    assert_eq!(graph.node(y).op, gradcheck::graph::Op::Attention);
}
