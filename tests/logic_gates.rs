use ndarray::{Array2, array};

use nn_classifier::{NetworkConfig, NeuralNetwork};

fn assert_close(a: f64, b: f64, tol: f64) {
    assert!((a - b).abs() <= tol, "a={a} b={b} tol={tol}");
}

fn gate(layer_sizes: Vec<usize>, thetas: Vec<Array2<f64>>) -> NeuralNetwork {
    let config = NetworkConfig {
        thetas: Some(thetas),
        ..NetworkConfig::new(layer_sizes)
    };
    NeuralNetwork::new_with_seed(config, 0).unwrap()
}

fn check_two_input(nn: &mut NeuralNetwork, truth: impl Fn(bool, bool) -> bool) {
    for a in [false, true] {
        for b in [false, true] {
            let input = array![[f64::from(u8::from(a)), f64::from(u8::from(b))]];
            let out = nn.predict(&input).unwrap();
            let want = if truth(a, b) { 1.0 } else { 0.0 };
            assert_close(out[[0, 0]], want, 1e-4);
        }
    }
}

#[test]
fn and_gate() {
    let mut nn = gate(vec![2, 1], vec![array![[-300.0, 200.0, 200.0]]]);
    check_two_input(&mut nn, |a, b| a && b);
}

#[test]
fn or_gate() {
    let mut nn = gate(vec![2, 1], vec![array![[-100.0, 200.0, 200.0]]]);
    check_two_input(&mut nn, |a, b| a || b);
}

#[test]
fn not_gate() {
    let mut nn = gate(vec![1, 1], vec![array![[100.0, -200.0]]]);
    assert_close(nn.predict(&array![[0.0]]).unwrap()[[0, 0]], 1.0, 1e-4);
    assert_close(nn.predict(&array![[1.0]]).unwrap()[[0, 0]], 0.0, 1e-4);
}

#[test]
fn xor_gate_needs_a_hidden_layer() {
    let mut nn = gate(
        vec![2, 2, 1],
        vec![
            array![[-100.0, 200.0, 200.0], [200.0, -150.0, -150.0]],
            array![[-300.0, 200.0, 200.0]],
        ],
    );
    check_two_input(&mut nn, |a, b| a != b);
}

#[test]
fn xnor_gate_needs_a_hidden_layer() {
    let mut nn = gate(
        vec![2, 2, 1],
        vec![
            array![[-300.0, 200.0, 200.0], [100.0, -200.0, -200.0]],
            array![[-100.0, 200.0, 200.0]],
        ],
    );
    check_two_input(&mut nn, |a, b| a == b);
}

#[test]
fn batch_prediction_matches_row_by_row() {
    let mut nn = gate(
        vec![2, 2, 1],
        vec![
            array![[-100.0, 200.0, 200.0], [200.0, -150.0, -150.0]],
            array![[-300.0, 200.0, 200.0]],
        ],
    );
    let batch = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
    let out = nn.predict(&batch).unwrap();
    assert_eq!(out.dim(), (4, 1));
    for (row, want) in out.column(0).iter().zip([0.0, 1.0, 1.0, 0.0]) {
        assert_close(*row, want, 1e-4);
    }
}
