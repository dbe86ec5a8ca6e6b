//! The layered network: weights, forward/backward passes, cost and gradients.
//!
//! Layer `i → i+1` is connected by a weight matrix `θ[i]` with shape
//! `(width[i+1], width[i] + 1)`. Column 0 of every `θ` holds the bias weights,
//! and column 0 of every non-output activation is the constant-1 bias unit.
//!
//! Batches are row-major: one sample per row.

use ndarray::{Array2, Zip, s};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Activation, Error, Result};

/// Construction parameters for a [`NeuralNetwork`].
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Input width, hidden widths, output width.
    pub layer_sizes: Vec<usize>,
    /// Pre-trained weights, one per layer transition. Randomly initialized when `None`.
    pub thetas: Option<Vec<Array2<f64>>>,
    /// L2 regularization coefficient. Zero disables regularization.
    pub lambda: f64,
    pub activation: Activation,
}

impl NetworkConfig {
    pub fn new(layer_sizes: Vec<usize>) -> Self {
        Self {
            layer_sizes,
            thetas: None,
            lambda: 0.0,
            activation: Activation::Sigmoid,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.layer_sizes.len() < 2 {
            return Err(Error::InvalidConfig(format!(
                "must have at least 2 layers, got {}",
                self.layer_sizes.len()
            )));
        }
        if self.layer_sizes.contains(&0) {
            return Err(Error::InvalidConfig(
                "all layer sizes must be > 0".to_owned(),
            ));
        }
        if !(self.lambda.is_finite() && self.lambda >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "lambda must be finite and >= 0, got {}",
                self.lambda
            )));
        }

        if let Some(thetas) = &self.thetas {
            let expected = self.layer_sizes.len() - 1;
            if thetas.len() != expected {
                return Err(Error::InvalidShape(format!(
                    "got {} theta matrices, {} layers need {expected}",
                    thetas.len(),
                    self.layer_sizes.len()
                )));
            }
            for (idx, (theta, w)) in thetas.iter().zip(self.layer_sizes.windows(2)).enumerate() {
                let want = (w[1], w[0] + 1);
                if theta.dim() != want {
                    return Err(Error::InvalidShape(format!(
                        "theta {idx} has shape {:?}, expected {want:?}",
                        theta.dim()
                    )));
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct NeuralNetwork {
    layer_sizes: Vec<usize>,
    thetas: Vec<Array2<f64>>,
    activation: Activation,
    lambda: f64,

    // Per-layer caches, replaced on every new input batch.
    activations: Vec<Option<Array2<f64>>>,
    deltas: Vec<Option<Array2<f64>>>,

    expected: Option<Array2<f64>>,
}

impl NeuralNetwork {
    /// Build a network, drawing any missing weights from the thread-local RNG.
    pub fn new(config: NetworkConfig) -> Result<Self> {
        let mut rng = rand::rng();
        Self::new_with_rng(config, &mut rng)
    }

    pub fn new_with_seed(config: NetworkConfig, seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::new_with_rng(config, &mut rng)
    }

    pub fn new_with_rng<R: Rng + ?Sized>(config: NetworkConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;

        let NetworkConfig {
            layer_sizes,
            thetas,
            lambda,
            activation,
        } = config;

        let thetas = match thetas {
            Some(thetas) => thetas,
            None => layer_sizes
                .windows(2)
                .map(|w| random_theta(w[0], w[1], rng))
                .collect(),
        };

        let layers = layer_sizes.len();
        Ok(Self {
            layer_sizes,
            thetas,
            activation,
            lambda,
            activations: vec![None; layers],
            deltas: vec![None; layers],
            expected: None,
        })
    }

    #[inline]
    pub fn layer_sizes(&self) -> &[usize] {
        &self.layer_sizes
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.layer_sizes[0]
    }

    #[inline]
    pub fn output_dim(&self) -> usize {
        self.layer_sizes[self.layer_sizes.len() - 1]
    }

    #[inline]
    pub fn num_thetas(&self) -> usize {
        self.thetas.len()
    }

    #[inline]
    pub fn activation_function(&self) -> Activation {
        self.activation
    }

    #[inline]
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn thetas(&self) -> &[Array2<f64>] {
        &self.thetas
    }

    pub(crate) fn thetas_mut(&mut self) -> &mut [Array2<f64>] {
        &mut self.thetas
    }

    /// Weight matrix for the transition `index → index + 1`.
    pub fn theta(&self, index: usize) -> Result<&Array2<f64>> {
        self.thetas.get(index).ok_or(Error::IndexOutOfRange {
            what: "theta",
            index,
            count: self.thetas.len(),
        })
    }

    /// Store the batch (with a prepended bias column) as activation 0.
    ///
    /// Every cached activation and delta from a previous batch is dropped.
    pub fn set_inputs(&mut self, batch: &Array2<f64>) -> Result<()> {
        if batch.ncols() != self.input_dim() {
            return Err(Error::InvalidShape(format!(
                "input batch has {} columns, network input width is {}",
                batch.ncols(),
                self.input_dim()
            )));
        }
        if batch.nrows() == 0 {
            return Err(Error::InvalidData(
                "input batch must not be empty".to_owned(),
            ));
        }

        self.activations.iter_mut().for_each(|a| *a = None);
        self.deltas.iter_mut().for_each(|d| *d = None);
        self.activations[0] = Some(add_bias(batch));
        Ok(())
    }

    /// Set the expected outputs used by back propagation and the cost.
    pub fn set_expected(&mut self, expected: Array2<f64>) -> Result<()> {
        if expected.ncols() != self.output_dim() {
            return Err(Error::InvalidShape(format!(
                "expected outputs have {} columns, network output width is {}",
                expected.ncols(),
                self.output_dim()
            )));
        }
        self.expected = Some(expected);
        Ok(())
    }

    pub fn expected(&self) -> Option<&Array2<f64>> {
        self.expected.as_ref()
    }

    /// Number of samples in the current input batch.
    pub fn batch_size(&self) -> Result<usize> {
        Ok(self.activation_at(0)?.nrows())
    }

    /// Propagate activation 0 through every layer.
    ///
    /// All activations except the output layer are bias-augmented.
    pub fn forward_propagation(&mut self) -> Result<()> {
        let last = self.layer_sizes.len() - 1;
        for index in 0..last {
            let z = {
                let input = self.activation_at(index)?;
                input.dot(&self.thetas[index].t())
            };
            let mut a = self.activation.apply(&z);
            if index + 1 != last {
                a = add_bias(&a);
            }
            self.activations[index + 1] = Some(a);
        }
        Ok(())
    }

    /// Run a forward pass on `batch` and return the output layer (one row per sample).
    pub fn predict(&mut self, batch: &Array2<f64>) -> Result<Array2<f64>> {
        self.set_inputs(batch)?;
        self.forward_propagation()?;
        Ok(self.output()?.clone())
    }

    /// The output-layer activation of the most recent forward pass.
    pub fn output(&self) -> Result<&Array2<f64>> {
        self.activation_at(self.layer_sizes.len() - 1)
    }

    pub fn activation_at(&self, index: usize) -> Result<&Array2<f64>> {
        self.activations
            .get(index)
            .ok_or(Error::IndexOutOfRange {
                what: "activation",
                index,
                count: self.activations.len(),
            })?
            .as_ref()
            .ok_or(Error::NotComputed {
                what: "activation",
                index,
            })
    }

    /// Compute the error term of every layer from the output error backwards.
    ///
    /// Requires a prior forward pass and expected outputs of the same shape as
    /// the output layer. Delta 0 (the input layer) is never populated.
    pub fn back_propagation(&mut self) -> Result<()> {
        let last = self.layer_sizes.len() - 1;
        let output = self.output()?;
        let expected = self.expected.as_ref().ok_or_else(|| {
            Error::InvalidConfig("expected outputs must be set before back propagation".to_owned())
        })?;
        if expected.dim() != output.dim() {
            return Err(Error::InvalidShape(format!(
                "expected outputs have shape {:?}, output layer has shape {:?}",
                expected.dim(),
                output.dim()
            )));
        }

        let mut deltas: Vec<Option<Array2<f64>>> = vec![None; self.layer_sizes.len()];
        let mut delta = output - expected;

        for index in (1..last).rev() {
            let propagated = delta.dot(&self.thetas[index]);
            let propagated = without_bias(&propagated);

            let prev = self.activation_at(index - 1)?;
            let z = self.thetas[index - 1].dot(&prev.t());
            let hidden = propagated * &self.activation.gradient(&z).t();

            deltas[index + 1] = Some(std::mem::replace(&mut delta, hidden));
        }
        deltas[1] = Some(delta);

        self.deltas = deltas;
        Ok(())
    }

    /// Error term for layer `index`, available after [`Self::back_propagation`].
    pub fn delta(&self, index: usize) -> Result<&Array2<f64>> {
        self.deltas
            .get(index)
            .ok_or(Error::IndexOutOfRange {
                what: "delta",
                index,
                count: self.deltas.len(),
            })?
            .as_ref()
            .ok_or(Error::NotComputed {
                what: "delta",
                index,
            })
    }

    /// L2 penalty `(λ / 2n) · Σ θ²` over every non-bias weight.
    pub fn theta_regularization(&self, num_inputs: usize) -> f64 {
        let sum: f64 = self
            .thetas
            .iter()
            .map(|theta| theta.slice(s![.., 1..]).iter().map(|w| w * w).sum::<f64>())
            .sum();
        (self.lambda / (2.0 * num_inputs as f64)) * sum
    }

    /// Binary cross-entropy of the output layer against the expected outputs,
    /// normalized by `num_inputs`.
    pub fn cost_no_regularization(&self, num_inputs: usize) -> Result<f64> {
        let output = self.output()?;
        let expected = self.expected.as_ref().ok_or_else(|| {
            Error::InvalidConfig("expected outputs must be set before computing cost".to_owned())
        })?;
        if expected.dim() != output.dim() {
            return Err(Error::InvalidShape(format!(
                "expected outputs have shape {:?}, output layer has shape {:?}",
                expected.dim(),
                output.dim()
            )));
        }

        let total = Zip::from(output)
            .and(expected)
            .fold(0.0, |acc, &h, &y| acc - y * h.ln() - (1.0 - y) * (1.0 - h).ln());
        Ok(total / num_inputs as f64)
    }

    /// Regularized cost over the current batch.
    pub fn cost(&self) -> Result<f64> {
        let n = self.batch_size()?;
        Ok(self.cost_no_regularization(n)? + self.theta_regularization(n))
    }

    /// `∂cost/∂θ[index]`, including the regularization term on non-bias columns.
    pub fn theta_gradient(&self, index: usize) -> Result<Array2<f64>> {
        let theta = self.theta(index)?;
        let n = self.batch_size()? as f64;
        let activation = self.activation_at(index)?;
        let delta = self.delta(index + 1)?;

        let mut gradient = activation.t().dot(delta).reversed_axes() / n;
        gradient
            .slice_mut(s![.., 1..])
            .scaled_add(self.lambda / n, &theta.slice(s![.., 1..]));
        Ok(gradient)
    }
}

/// Symmetry-breaking init: each weight uniform in `(-r, r)`, `r = √6 / √(in + out)`.
fn random_theta<R: Rng + ?Sized>(in_dim: usize, out_dim: usize, rng: &mut R) -> Array2<f64> {
    let range = 6.0_f64.sqrt() / ((in_dim + out_dim) as f64).sqrt();
    Array2::from_shape_fn((out_dim, in_dim + 1), |_| rng.random_range(-range..range))
}

/// Prepend a column of ones.
fn add_bias(input: &Array2<f64>) -> Array2<f64> {
    let mut out = Array2::ones((input.nrows(), input.ncols() + 1));
    out.slice_mut(s![.., 1..]).assign(input);
    out
}

/// Drop column 0.
pub(crate) fn without_bias(matrix: &Array2<f64>) -> Array2<f64> {
    matrix.slice(s![.., 1..]).to_owned()
}
