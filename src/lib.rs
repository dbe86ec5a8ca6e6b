//! A from-scratch feed-forward neural network classifier.
//!
//! `nn-classifier` trains a fully connected network on labeled feature vectors
//! and scores it against held-out data. The whole engine is written against
//! dense `ndarray` matrices: forward propagation, L2-regularized cross-entropy
//! cost, back propagation, a fixed-iteration trainer, class-balanced data set
//! splitting and confusion-matrix scoring.
//!
//! # Data layout and shapes
//!
//! - Scalars are `f64`.
//! - Batches are row-major: `(num_samples, num_features)`.
//! - `θ[i]` connects layer `i` to layer `i + 1` and has shape
//!   `(width[i + 1], width[i] + 1)`. Column 0 holds the bias weights.
//! - Every activation except the output layer carries a leading bias column of ones.
//!
//! # Errors
//!
//! Every fallible operation returns [`Result`]. Shape contracts are checked at
//! the API boundary; index and usage-order mistakes (reading a delta before
//! back propagation) are reported as distinct [`Error`] variants.
//!
//! # Quick start
//!
//! ```rust
//! use ndarray::array;
//! use nn_classifier::{TrainConfig, Trainer, UpdateRule};
//!
//! # fn main() -> nn_classifier::Result<()> {
//! let inputs = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
//! let expected = array![[0.0], [1.0], [1.0], [1.0]];
//!
//! let config = TrainConfig {
//!     max_iterations: 200,
//!     learning_rate: 0.5,
//!     heartbeat: 0,
//!     update_rule: UpdateRule::Gradient,
//!     ..TrainConfig::new(vec![2, 1])
//! };
//! let mut trainer = Trainer::new_with_seed(config, inputs.clone(), expected, 0)?;
//! trainer.train()?;
//!
//! let scores = trainer.network_mut().predict(&inputs)?;
//! assert_eq!(scores.dim(), (4, 1));
//! # Ok(())
//! # }
//! ```
//!
//! # Cross-validation
//!
//! ```rust
//! use nn_classifier::{CrossValidationConfig, DataSet, TrainConfig, cross_validate};
//!
//! # fn main() -> nn_classifier::Result<()> {
//! let mut data = DataSet::with_seed(true, 7);
//! let rows: Vec<Vec<f64>> = (0..40)
//!     .map(|i| {
//!         let x = (i % 2) as f64;
//!         vec![x, 1.0 - x]
//!     })
//!     .collect();
//! data.add_samples(&rows)?;
//!
//! let config = CrossValidationConfig {
//!     folds: 2,
//!     train: TrainConfig {
//!         heartbeat: 0,
//!         max_iterations: 50,
//!         ..TrainConfig::new(vec![1, 1])
//!     },
//!     ..CrossValidationConfig::default()
//! };
//! let report = cross_validate(&mut data, &config)?;
//! assert_eq!(report.folds.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod activation;
pub mod cli;
pub mod command;
pub mod data;
pub mod error;
pub mod imaging;
pub mod network;
pub mod optim;
pub mod prediction;
pub mod reader;
pub mod train;
pub mod validation;

pub use activation::Activation;
pub use data::DataSet;
pub use error::{Error, Result};
pub use imaging::ImageSpec;
pub use network::{NetworkConfig, NeuralNetwork};
pub use optim::UpdateRule;
pub use prediction::{ConfusionCounts, Prediction, f1_score};
pub use train::{TrainConfig, Trainer};
pub use validation::{
    BestFold, CrossValidationConfig, CrossValidationReport, FoldReport, Statistic, Summary,
    cross_validate,
};
