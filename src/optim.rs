//! Weight update rules.
//!
//! The trainer computes one gradient matrix per `θ` and hands them to an
//! [`UpdateRule`], which mutates the network weights in place.

use ndarray::{Array2, Zip};

use crate::{Error, NeuralNetwork, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// How a gradient turns into a weight change.
pub enum UpdateRule {
    /// Move every weight by exactly `lr` against the sign of its gradient.
    ///
    /// A zero gradient counts as non-positive and moves the weight up by `lr`.
    #[default]
    Sign,
    /// Plain gradient descent: `w -= lr * g`.
    Gradient,
}

impl UpdateRule {
    /// Validate a learning rate for use with this rule.
    pub fn validate_lr(self, lr: f64) -> Result<()> {
        if !(lr.is_finite() && lr > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "learning rate must be finite and > 0, got {lr}"
            )));
        }
        Ok(())
    }

    /// Update a single weight matrix in place.
    pub fn apply(self, theta: &mut Array2<f64>, gradient: &Array2<f64>, lr: f64) -> Result<()> {
        if theta.dim() != gradient.dim() {
            return Err(Error::InvalidShape(format!(
                "gradient shape {:?} does not match theta shape {:?}",
                gradient.dim(),
                theta.dim()
            )));
        }

        match self {
            UpdateRule::Sign => {
                Zip::from(theta).and(gradient).for_each(|w, &g| {
                    if g > 0.0 {
                        *w -= lr;
                    } else {
                        *w += lr;
                    }
                });
            }
            UpdateRule::Gradient => theta.scaled_add(-lr, gradient),
        }
        Ok(())
    }

    /// Apply one step to every `θ` of `network`.
    pub fn step(
        self,
        network: &mut NeuralNetwork,
        gradients: &[Array2<f64>],
        lr: f64,
    ) -> Result<()> {
        let thetas = network.thetas_mut();
        if thetas.len() != gradients.len() {
            return Err(Error::InvalidShape(format!(
                "got {} gradients for {} theta matrices",
                gradients.len(),
                thetas.len()
            )));
        }
        for (theta, gradient) in thetas.iter_mut().zip(gradients) {
            self.apply(theta, gradient, lr)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for UpdateRule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sign" => Ok(UpdateRule::Sign),
            "gradient" | "sgd" => Ok(UpdateRule::Gradient),
            other => Err(Error::InvalidConfig(format!(
                "unknown update rule {other:?}, expected \"sign\" or \"gradient\""
            ))),
        }
    }
}
