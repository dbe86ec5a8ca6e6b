use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::{Activation, DataSet, Error, NetworkConfig, NeuralNetwork, Result, UpdateRule};

#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub layer_sizes: Vec<usize>,
    pub learning_rate: f64,
    /// Training always runs exactly this many iterations.
    pub max_iterations: usize,
    /// Log the cost every `heartbeat` iterations. `0` disables the heartbeat.
    pub heartbeat: usize,
    pub lambda: f64,
    pub activation: Activation,
    /// Keep the cost of every iteration, see [`Trainer::costs`].
    pub record_costs: bool,
    pub update_rule: UpdateRule,
}

impl TrainConfig {
    pub fn new(layer_sizes: Vec<usize>) -> Self {
        Self {
            layer_sizes,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.update_rule.validate_lr(self.learning_rate)?;
        if !(self.lambda.is_finite() && self.lambda >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "lambda must be finite and >= 0, got {}",
                self.lambda
            )));
        }
        Ok(())
    }

    fn network_config(&self) -> NetworkConfig {
        NetworkConfig {
            layer_sizes: self.layer_sizes.clone(),
            thetas: None,
            lambda: self.lambda,
            activation: self.activation,
        }
    }
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            layer_sizes: Vec::new(),
            learning_rate: 0.01,
            max_iterations: 500,
            heartbeat: 100,
            lambda: 0.0,
            activation: Activation::Sigmoid,
            record_costs: false,
            update_rule: UpdateRule::Sign,
        }
    }
}

/// Owns a network and its training batch for the duration of training.
#[derive(Debug, Clone)]
pub struct Trainer {
    config: TrainConfig,
    network: NeuralNetwork,
    inputs: Array2<f64>,
    expected: Array2<f64>,
    costs: Vec<f64>,
}

impl Trainer {
    pub fn new(config: TrainConfig, inputs: Array2<f64>, expected: Array2<f64>) -> Result<Self> {
        let mut rng = rand::rng();
        Self::new_with_rng(config, inputs, expected, &mut rng)
    }

    pub fn new_with_seed(
        config: TrainConfig,
        inputs: Array2<f64>,
        expected: Array2<f64>,
        seed: u64,
    ) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::new_with_rng(config, inputs, expected, &mut rng)
    }

    /// Validate the configuration and randomly initialize a fresh network.
    pub fn new_with_rng<R: Rng + ?Sized>(
        config: TrainConfig,
        inputs: Array2<f64>,
        expected: Array2<f64>,
        rng: &mut R,
    ) -> Result<Self> {
        config.validate()?;
        if inputs.nrows() == 0 {
            return Err(Error::InvalidConfig(
                "cannot train without training examples".to_owned(),
            ));
        }
        if expected.nrows() != inputs.nrows() {
            return Err(Error::InvalidShape(format!(
                "{} input rows but {} expected rows",
                inputs.nrows(),
                expected.nrows()
            )));
        }

        let network = NeuralNetwork::new_with_rng(config.network_config(), rng)?;
        if inputs.ncols() != network.input_dim() {
            return Err(Error::InvalidShape(format!(
                "inputs have {} columns, input layer has {}",
                inputs.ncols(),
                network.input_dim()
            )));
        }
        if expected.ncols() != network.output_dim() {
            return Err(Error::InvalidShape(format!(
                "expected outputs have {} columns, output layer has {}",
                expected.ncols(),
                network.output_dim()
            )));
        }

        Ok(Self {
            config,
            network,
            inputs,
            expected,
            costs: Vec::new(),
        })
    }

    /// Shuffle `data` and train on all of its rows.
    ///
    /// The data set must carry truth; its random source also seeds the network.
    pub fn from_data_set(config: TrainConfig, mut data: DataSet) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::InvalidConfig(
                "cannot train without training examples".to_owned(),
            ));
        }
        data.randomize();
        let (samples, truth, mut rng) = data.into_parts();
        let truth = truth.ok_or_else(|| {
            Error::InvalidData("training data set has no truth column".to_owned())
        })?;
        Self::new_with_rng(config, samples, truth, &mut rng)
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Run `max_iterations` rounds of forward pass, back propagation and weight update.
    ///
    /// Recorded costs from an earlier call are discarded.
    pub fn train(&mut self) -> Result<()> {
        let TrainConfig {
            learning_rate,
            max_iterations,
            heartbeat,
            record_costs,
            update_rule,
            ..
        } = self.config;

        debug!(
            layers = ?self.config.layer_sizes,
            samples = self.inputs.nrows(),
            max_iterations,
            learning_rate,
            ?update_rule,
            "training"
        );

        self.network.set_inputs(&self.inputs)?;
        self.network.set_expected(self.expected.clone())?;
        self.costs.clear();

        let num_thetas = self.network.num_thetas();
        for iteration in 1..=max_iterations {
            self.network.forward_propagation()?;
            self.network.back_propagation()?;

            let beat = heartbeat != 0 && iteration % heartbeat == 0;
            if record_costs || beat {
                let cost = self.network.cost()?;
                if record_costs {
                    self.costs.push(cost);
                }
                if beat {
                    info!("Iteration: {iteration}, Cost: {cost}");
                }
            }

            let gradients = (0..num_thetas)
                .map(|i| self.network.theta_gradient(i))
                .collect::<Result<Vec<_>>>()?;
            update_rule.step(&mut self.network, &gradients, learning_rate)?;
        }

        Ok(())
    }

    /// Cost after each iteration of the last [`Self::train`] call, if recording was enabled.
    pub fn costs(&self) -> &[f64] {
        &self.costs
    }

    pub fn network(&self) -> &NeuralNetwork {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut NeuralNetwork {
        &mut self.network
    }

    pub fn into_network(self) -> NeuralNetwork {
        self.network
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ndarray::array;

    fn or_batch() -> (Array2<f64>, Array2<f64>) {
        (
            array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]],
            array![[0.0], [1.0], [1.0], [1.0]],
        )
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = TrainConfig::default();
        assert_eq!(cfg.learning_rate, 0.01);
        assert_eq!(cfg.max_iterations, 500);
        assert_eq!(cfg.heartbeat, 100);
        assert_eq!(cfg.lambda, 0.0);
        assert!(!cfg.record_costs);
        assert_eq!(cfg.update_rule, UpdateRule::Sign);
    }

    #[test]
    fn empty_inputs_fail_before_training() {
        let err = Trainer::new_with_seed(
            TrainConfig::new(vec![2, 1]),
            Array2::zeros((0, 2)),
            Array2::zeros((0, 1)),
            0,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn invalid_hyperparameters_are_rejected() {
        let (x, y) = or_batch();
        let cfg = TrainConfig {
            learning_rate: 0.0,
            ..TrainConfig::new(vec![2, 1])
        };
        assert!(Trainer::new_with_seed(cfg, x.clone(), y.clone(), 0).is_err());

        let cfg = TrainConfig {
            lambda: -1.0,
            ..TrainConfig::new(vec![2, 1])
        };
        assert!(Trainer::new_with_seed(cfg, x.clone(), y.clone(), 0).is_err());

        assert!(Trainer::new_with_seed(TrainConfig::new(vec![2]), x, y, 0).is_err());
    }

    #[test]
    fn mismatched_batch_widths_are_rejected() {
        let (x, y) = or_batch();
        let err = Trainer::new_with_seed(TrainConfig::new(vec![3, 1]), x, y, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidShape(_)));
    }

    #[test]
    fn records_one_cost_per_iteration() {
        let (x, y) = or_batch();
        let cfg = TrainConfig {
            max_iterations: 37,
            heartbeat: 10,
            record_costs: true,
            ..TrainConfig::new(vec![2, 1])
        };
        let mut trainer = Trainer::new_with_seed(cfg, x, y, 1).unwrap();
        trainer.train().unwrap();
        assert_eq!(trainer.costs().len(), 37);
        assert!(trainer.costs().iter().all(|&c| c > 0.0));
    }

    #[test]
    fn costs_are_not_recorded_by_default() {
        let (x, y) = or_batch();
        let cfg = TrainConfig {
            max_iterations: 5,
            ..TrainConfig::new(vec![2, 1])
        };
        let mut trainer = Trainer::new_with_seed(cfg, x, y, 1).unwrap();
        trainer.train().unwrap();
        assert!(trainer.costs().is_empty());
    }

    #[test]
    fn sign_rule_moves_every_weight_by_learning_rate() {
        let (x, y) = or_batch();
        let cfg = TrainConfig {
            max_iterations: 1,
            heartbeat: 0,
            learning_rate: 0.125,
            ..TrainConfig::new(vec![2, 3, 1])
        };
        let mut trainer = Trainer::new_with_seed(cfg, x, y, 9).unwrap();
        let before = trainer.network().thetas().to_vec();
        trainer.train().unwrap();

        for (old, new) in before.iter().zip(trainer.network().thetas()) {
            for (&o, &n) in old.iter().zip(new.iter()) {
                assert!(((o - n).abs() - 0.125).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn gradient_rule_moves_by_scaled_gradient() {
        let (x, y) = or_batch();
        let cfg = TrainConfig {
            max_iterations: 1,
            heartbeat: 0,
            learning_rate: 0.5,
            update_rule: UpdateRule::Gradient,
            ..TrainConfig::new(vec![2, 1])
        };
        let mut trainer = Trainer::new_with_seed(cfg, x.clone(), y.clone(), 4).unwrap();

        let mut reference = trainer.network().clone();
        reference.set_expected(y).unwrap();
        reference.predict(&x).unwrap();
        reference.back_propagation().unwrap();
        let gradient = reference.theta_gradient(0).unwrap();
        let expected = reference.theta(0).unwrap() - &(gradient * 0.5);

        trainer.train().unwrap();
        let actual = trainer.network().theta(0).unwrap();
        for (a, e) in actual.iter().zip(expected.iter()) {
            assert!((a - e).abs() < 1e-12);
        }
    }

    #[test]
    fn zero_iterations_leaves_weights_untouched() {
        let (x, y) = or_batch();
        let cfg = TrainConfig {
            max_iterations: 0,
            ..TrainConfig::new(vec![2, 1])
        };
        let mut trainer = Trainer::new_with_seed(cfg, x, y, 2).unwrap();
        let before = trainer.network().thetas().to_vec();
        trainer.train().unwrap();
        assert_eq!(before, trainer.network().thetas());
    }

    #[test]
    fn seeded_trainers_are_reproducible() {
        let (x, y) = or_batch();
        let cfg = TrainConfig {
            max_iterations: 50,
            heartbeat: 0,
            ..TrainConfig::new(vec![2, 2, 1])
        };
        let mut a = Trainer::new_with_seed(cfg.clone(), x.clone(), y.clone(), 11).unwrap();
        let mut b = Trainer::new_with_seed(cfg, x, y, 11).unwrap();
        a.train().unwrap();
        b.train().unwrap();
        assert_eq!(a.into_network().thetas(), b.into_network().thetas());
    }
}
