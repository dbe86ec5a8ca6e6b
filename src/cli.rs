//! Command-line configuration.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{Activation, CrossValidationConfig, ImageSpec, TrainConfig, UpdateRule};

#[derive(Debug, Parser)]
#[command(name = "nn-classifier")]
#[command(about = "Train and cross-validate a feed-forward neural network classifier")]
#[command(version)]
pub struct Cli {
    /// Log filter used when RUST_LOG is not set (e.g. "info", "nn_classifier=debug")
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Train a network with cross-validation and report its scores
    Train(TrainArgs),
}

#[derive(Debug, Clone, Args)]
pub struct TrainArgs {
    /// Log the cost every N iterations (0 disables)
    #[arg(short = 'b', long, default_value_t = 100)]
    pub heartbeat: usize,

    /// Learning rate
    #[arg(short = 'l', long, default_value_t = 0.01)]
    pub learn_rate: f64,

    /// CSV file of samples, one row per sample with the label last
    #[arg(short, long, conflicts_with_all = ["positive_dir", "negative_dir"])]
    pub csv: Option<PathBuf>,

    /// Encode images in color instead of grayscale
    #[arg(long)]
    pub color: bool,

    /// Directory of positive example images
    #[arg(short, long, requires = "negative_dir")]
    pub positive_dir: Option<PathBuf>,

    /// Directory of negative example images
    #[arg(short, long, requires = "positive_dir")]
    pub negative_dir: Option<PathBuf>,

    /// Required image width in pixels
    #[arg(long, default_value_t = 10)]
    pub width: u32,

    /// Required image height in pixels
    #[arg(long, default_value_t = 10)]
    pub height: u32,

    /// Directory for the best fold's false positive/negative images
    #[arg(long)]
    pub save_dir: Option<PathBuf>,

    /// Percentage of samples used for training
    #[arg(short, long, default_value_t = 80, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub split: u32,

    /// Classification threshold
    #[arg(short, long, default_value_t = 0.5)]
    pub threshold: f64,

    /// Number of cross-validation folds
    #[arg(short, long, default_value_t = 1)]
    pub folds: usize,

    /// Width of the first hidden layer (0 omits it)
    #[arg(long, default_value_t = 10)]
    pub layer1: usize,

    /// Width of the second hidden layer (0 omits it)
    #[arg(long, default_value_t = 0)]
    pub layer2: usize,

    /// Width of the output layer
    #[arg(short, long, default_value_t = 1)]
    pub output: usize,

    /// Regularization coefficient
    #[arg(long, default_value_t = 1.0)]
    pub lambda: f64,

    /// Training iterations per fold
    #[arg(short, long, default_value_t = 500)]
    pub iterations: usize,

    /// Weight update rule: "sign" or "gradient"
    #[arg(long, default_value = "sign")]
    pub update_rule: UpdateRule,

    /// Seed for shuffling, splitting and weight initialization
    #[arg(long)]
    pub seed: Option<u64>,
}

impl TrainArgs {
    pub fn image_spec(&self) -> ImageSpec {
        ImageSpec {
            width: self.width,
            height: self.height,
            color: self.color,
        }
    }

    /// `[input, layer1?, layer2?, output]`; zero-width hidden layers are left out.
    pub fn layer_sizes(&self, input_width: usize) -> Vec<usize> {
        std::iter::once(input_width)
            .chain([self.layer1, self.layer2].into_iter().filter(|&w| w != 0))
            .chain(std::iter::once(self.output))
            .collect()
    }

    pub fn cross_validation_config(&self, input_width: usize) -> CrossValidationConfig {
        CrossValidationConfig {
            folds: self.folds,
            split_percent: self.split,
            threshold: self.threshold,
            train: TrainConfig {
                layer_sizes: self.layer_sizes(input_width),
                learning_rate: self.learn_rate,
                max_iterations: self.iterations,
                heartbeat: self.heartbeat,
                lambda: self.lambda,
                activation: Activation::Sigmoid,
                record_costs: false,
                update_rule: self.update_rule,
            },
        }
    }
}
