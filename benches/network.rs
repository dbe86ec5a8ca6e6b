use criterion::{Criterion, black_box, criterion_group, criterion_main};
use ndarray::Array2;

use nn_classifier::{NetworkConfig, NeuralNetwork, TrainConfig, Trainer};

const SIZES: [usize; 4] = [100, 64, 32, 1];
const BATCH: usize = 256;

fn batch() -> (Array2<f64>, Array2<f64>) {
    let inputs = Array2::from_shape_fn((BATCH, SIZES[0]), |(r, c)| ((r * 31 + c * 7) % 97) as f64 / 97.0);
    let expected = Array2::from_shape_fn((BATCH, 1), |(r, _)| (r % 2) as f64);
    (inputs, expected)
}

fn network_forward_bench(c: &mut Criterion) {
    let mut nn = NeuralNetwork::new_with_seed(NetworkConfig::new(SIZES.to_vec()), 0).unwrap();
    let (inputs, _) = batch();

    c.bench_function("forward_100_64_32_1_batch256", |b| {
        b.iter(|| {
            let out = nn.predict(black_box(&inputs)).unwrap();
            black_box(out);
        })
    });
}

fn network_backward_bench(c: &mut Criterion) {
    let config = NetworkConfig {
        lambda: 1.0,
        ..NetworkConfig::new(SIZES.to_vec())
    };
    let mut nn = NeuralNetwork::new_with_seed(config, 0).unwrap();
    let (inputs, expected) = batch();
    nn.set_expected(expected).unwrap();
    nn.set_inputs(&inputs).unwrap();
    nn.forward_propagation().unwrap();

    c.bench_function("backward_100_64_32_1_batch256", |b| {
        b.iter(|| {
            nn.back_propagation().unwrap();
            for i in 0..nn.num_thetas() {
                black_box(nn.theta_gradient(i).unwrap());
            }
        })
    });
}

fn trainer_iterations_bench(c: &mut Criterion) {
    let (inputs, expected) = batch();
    let config = TrainConfig {
        max_iterations: 10,
        heartbeat: 0,
        ..TrainConfig::new(SIZES.to_vec())
    };

    c.bench_function("train_10_iterations_batch256", |b| {
        b.iter(|| {
            let mut trainer =
                Trainer::new_with_seed(config.clone(), inputs.clone(), expected.clone(), 0).unwrap();
            trainer.train().unwrap();
            black_box(trainer.into_network());
        })
    });
}

criterion_group!(
    benches,
    network_forward_bench,
    network_backward_bench,
    trainer_iterations_bench
);
criterion_main!(benches);
