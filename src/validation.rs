//! Repeated shuffle/split/train/score folds over one data set.

use ndarray::Array2;
use tracing::info;

use crate::{ConfusionCounts, DataSet, Error, NeuralNetwork, Prediction, Result, TrainConfig, Trainer};

#[derive(Debug, Clone)]
pub struct CrossValidationConfig {
    pub folds: usize,
    /// Percentage of rows used for training in every fold, `1..=100`.
    pub split_percent: u32,
    /// Classification threshold for scores and labels.
    pub threshold: f64,
    pub train: TrainConfig,
}

impl Default for CrossValidationConfig {
    fn default() -> Self {
        Self {
            folds: 1,
            split_percent: 80,
            threshold: 0.5,
            train: TrainConfig::default(),
        }
    }
}

impl CrossValidationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.folds == 0 {
            return Err(Error::InvalidConfig("folds must be > 0".to_owned()));
        }
        if !(1..=100).contains(&self.split_percent) {
            return Err(Error::InvalidConfig(format!(
                "split percentage must be in 1..=100, got {}",
                self.split_percent
            )));
        }
        if !self.threshold.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "threshold must be finite, got {}",
                self.threshold
            )));
        }
        self.train.validate()
    }
}

/// Outcome of one fold.
#[derive(Debug, Clone, PartialEq)]
pub struct FoldReport {
    /// 1-based fold number.
    pub fold: usize,
    pub training_samples: usize,
    pub testing_samples: usize,
    pub counts: ConfusionCounts,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// The fold whose model scored the highest F1.
#[derive(Debug, Clone)]
pub struct BestFold {
    pub fold: usize,
    pub f1: f64,
    pub network: NeuralNetwork,
    pub testing: DataSet,
    pub false_positives: Array2<f64>,
    pub false_negatives: Array2<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistic {
    pub mean: f64,
    /// Sample variance (`n - 1` denominator). Zero for a single value.
    pub variance: f64,
}

impl Statistic {
    pub fn from_values(values: &[f64]) -> Self {
        let n = values.len();
        if n == 0 {
            return Self {
                mean: f64::NAN,
                variance: f64::NAN,
            };
        }
        let mean = values.iter().sum::<f64>() / n as f64;
        let variance = if n == 1 {
            0.0
        } else {
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        };
        Self { mean, variance }
    }
}

impl std::fmt::Display for Statistic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.mean, self.variance)
    }
}

/// Mean and variance of every fold metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub true_positives: Statistic,
    pub false_positives: Statistic,
    pub true_negatives: Statistic,
    pub false_negatives: Statistic,
    pub precision: Statistic,
    pub recall: Statistic,
    pub f1: Statistic,
}

#[derive(Debug, Clone)]
pub struct CrossValidationReport {
    pub folds: Vec<FoldReport>,
    /// `None` when no fold reached an F1 above zero.
    pub best: Option<BestFold>,
}

impl CrossValidationReport {
    pub fn summary(&self) -> Summary {
        let stat = |f: fn(&FoldReport) -> f64| {
            let values: Vec<f64> = self.folds.iter().map(f).collect();
            Statistic::from_values(&values)
        };
        Summary {
            true_positives: stat(|r| r.counts.true_positives as f64),
            false_positives: stat(|r| r.counts.false_positives as f64),
            true_negatives: stat(|r| r.counts.true_negatives as f64),
            false_negatives: stat(|r| r.counts.false_negatives as f64),
            precision: stat(|r| r.precision),
            recall: stat(|r| r.recall),
            f1: stat(|r| r.f1),
        }
    }
}

/// Run `config.folds` folds: shuffle `data`, split it class-balanced, train a
/// fresh network on the training part and score it on the rest.
pub fn cross_validate(
    data: &mut DataSet,
    config: &CrossValidationConfig,
) -> Result<CrossValidationReport> {
    config.validate()?;
    if data.is_empty() {
        return Err(Error::InvalidConfig(
            "cannot train without training examples".to_owned(),
        ));
    }
    if !data.has_truth() {
        return Err(Error::InvalidData(
            "cross validation needs a truth column".to_owned(),
        ));
    }

    let mut folds = Vec::with_capacity(config.folds);
    let mut best: Option<BestFold> = None;
    let mut best_f1 = 0.0;

    for fold in 1..=config.folds {
        info!(fold, folds = config.folds, "processing fold");
        data.randomize();
        let (training, testing) = data.split_equally(config.split_percent)?;
        let training_samples = training.num_samples();

        info!(training_samples, testing_samples = testing.num_samples(), "training neural network");
        let mut trainer = Trainer::from_data_set(config.train.clone(), training)?;
        trainer.train()?;
        let mut network = trainer.into_network();

        let mut prediction = Prediction::new(&mut network, config.threshold);
        prediction.predict(&testing)?;
        let report = FoldReport {
            fold,
            training_samples,
            testing_samples: testing.num_samples(),
            counts: prediction.counts(),
            precision: prediction.precision(),
            recall: prediction.recall(),
            f1: prediction.f1(),
        };
        let false_positives = prediction.false_positive_samples().clone();
        let false_negatives = prediction.false_negative_samples().clone();

        info!(
            fold,
            tp = report.counts.true_positives,
            fp = report.counts.false_positives,
            tn = report.counts.true_negatives,
            fn_ = report.counts.false_negatives,
            precision = report.precision,
            recall = report.recall,
            f1 = report.f1,
            "fold complete"
        );

        // NaN compares false, so an undefined F1 never becomes the best.
        if report.f1 > best_f1 {
            best_f1 = report.f1;
            best = Some(BestFold {
                fold,
                f1: report.f1,
                network,
                testing,
                false_positives,
                false_negatives,
            });
        }
        folds.push(report);
    }

    Ok(CrossValidationReport { folds, best })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() <= tol, "a={a} b={b} tol={tol}");
    }

    fn report(fold: usize, tp: usize, f1: f64) -> FoldReport {
        FoldReport {
            fold,
            training_samples: 8,
            testing_samples: 2,
            counts: ConfusionCounts {
                true_positives: tp,
                ..ConfusionCounts::default()
            },
            precision: f1,
            recall: f1,
            f1,
        }
    }

    #[test]
    fn statistic_uses_sample_variance() {
        let s = Statistic::from_values(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_close(s.mean, 5.0, 1e-12);
        assert_close(s.variance, 32.0 / 7.0, 1e-12);

        let single = Statistic::from_values(&[3.5]);
        assert_eq!(single, Statistic { mean: 3.5, variance: 0.0 });
        assert_eq!(single.to_string(), "3.5 (0)");
    }

    #[test]
    fn summary_aggregates_every_fold() {
        let report = CrossValidationReport {
            folds: vec![report(1, 2, 0.5), report(2, 4, 0.7)],
            best: None,
        };
        let summary = report.summary();
        assert_close(summary.true_positives.mean, 3.0, 1e-12);
        assert_close(summary.true_positives.variance, 2.0, 1e-12);
        assert_close(summary.f1.mean, 0.6, 1e-12);
        assert_close(summary.f1.variance, 0.02, 1e-12);
    }

    #[test]
    fn nan_metrics_propagate_into_summary() {
        let report = CrossValidationReport {
            folds: vec![report(1, 0, f64::NAN), report(2, 1, 1.0)],
            best: None,
        };
        assert!(report.summary().f1.mean.is_nan());
    }

    #[test]
    fn config_validation() {
        assert!(CrossValidationConfig::default().validate().is_ok());
        let bad = CrossValidationConfig {
            folds: 0,
            ..CrossValidationConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = CrossValidationConfig {
            split_percent: 120,
            ..CrossValidationConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = CrossValidationConfig {
            split_percent: 0,
            ..CrossValidationConfig::default()
        };
        assert!(matches!(bad.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn empty_data_set_is_rejected() {
        let mut data = DataSet::with_seed(true, 0);
        let err = cross_validate(&mut data, &CrossValidationConfig::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
