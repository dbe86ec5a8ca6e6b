//! Activation functions.
//!
//! Each layer transition computes a pre-activation matrix `z = a · θᵗ` and then
//! applies an activation function element-wise: `a' = activation(z)`.
//!
//! Unlike the output-based derivative trick, [`Activation::gradient`] takes the
//! pre-activation `z` itself. Back propagation recomputes `θ · aᵗ` for the hidden
//! layers, so the gradient is always evaluated on `z`.

use ndarray::Array2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Element-wise activation function.
pub enum Activation {
    /// Logistic sigmoid, `1 / (1 + e^-t)`.
    #[default]
    Sigmoid,
    /// Hyperbolic tangent, `(1 - e^-2t) / (1 + e^-2t)`.
    Tanh,
}

impl Activation {
    /// Apply the activation to every element of `z`.
    pub fn apply(self, z: &Array2<f64>) -> Array2<f64> {
        z.mapv(|v| self.apply_scalar(v))
    }

    #[inline]
    pub fn apply_scalar(self, x: f64) -> f64 {
        match self {
            Activation::Sigmoid => sigmoid(x),
            Activation::Tanh => x.tanh(),
        }
    }

    /// Derivative of the activation, evaluated element-wise at the pre-activation `z`.
    pub fn gradient(self, z: &Array2<f64>) -> Array2<f64> {
        z.mapv(|v| match self {
            Activation::Sigmoid => {
                let s = sigmoid(v);
                s * (1.0 - s)
            }
            Activation::Tanh => {
                let t = v.tanh();
                1.0 - t * t
            }
        })
    }
}

#[inline]
fn sigmoid(x: f64) -> f64 {
    // Numerically stable sigmoid.
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}
