//! Scoring a trained network against labeled data.

use ndarray::{Array2, Axis};

use crate::{DataSet, Error, NeuralNetwork, Result};

/// Confusion-matrix counters for a binary classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfusionCounts {
    pub true_positives: usize,
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl ConfusionCounts {
    pub fn total(&self) -> usize {
        self.true_positives + self.true_negatives + self.false_positives + self.false_negatives
    }

    /// `TP / (TP + FP)`. NaN when nothing was predicted positive.
    pub fn precision(&self) -> f64 {
        self.true_positives as f64 / (self.true_positives + self.false_positives) as f64
    }

    /// `TP / (TP + FN)`. NaN when there are no positive samples.
    pub fn recall(&self) -> f64 {
        self.true_positives as f64 / (self.true_positives + self.false_negatives) as f64
    }
}

/// Harmonic mean of precision and recall; NaN propagates.
pub fn f1_score(precision: f64, recall: f64) -> f64 {
    2.0 * precision * recall / (precision + recall)
}

/// Classifies the rows of a data set with a borrowed network and buckets them
/// into true/false positives/negatives.
///
/// Scores and labels strictly greater than the threshold count as class 1.
#[derive(Debug)]
pub struct Prediction<'a> {
    network: &'a mut NeuralNetwork,
    threshold: f64,
    counts: ConfusionCounts,
    true_positive_samples: Array2<f64>,
    true_negative_samples: Array2<f64>,
    false_positive_samples: Array2<f64>,
    false_negative_samples: Array2<f64>,
    precision: f64,
    recall: f64,
    f1: f64,
}

impl<'a> Prediction<'a> {
    pub fn new(network: &'a mut NeuralNetwork, threshold: f64) -> Self {
        Self {
            network,
            threshold,
            counts: ConfusionCounts::default(),
            true_positive_samples: Array2::zeros((0, 0)),
            true_negative_samples: Array2::zeros((0, 0)),
            false_positive_samples: Array2::zeros((0, 0)),
            false_negative_samples: Array2::zeros((0, 0)),
            precision: f64::NAN,
            recall: f64::NAN,
            f1: f64::NAN,
        }
    }

    /// Run the network over every row of `data` and score the results.
    pub fn predict(&mut self, data: &DataSet) -> Result<()> {
        let truth = data.truth().ok_or_else(|| {
            Error::InvalidData("cannot score a data set without truth".to_owned())
        })?;

        // An empty batch never reaches the network; every metric ends up NaN.
        let scores = if data.is_empty() {
            Array2::zeros((0, self.network.output_dim()))
        } else {
            self.network.predict(data.samples())?
        };
        self.tally(data.samples(), &scores, truth)
    }

    /// Bucket each row given precomputed scores. Column 0 of `scores` and
    /// `truth` is compared against the threshold.
    ///
    /// Results of any previous call are discarded.
    pub fn tally(
        &mut self,
        samples: &Array2<f64>,
        scores: &Array2<f64>,
        truth: &Array2<f64>,
    ) -> Result<()> {
        let rows = samples.nrows();
        if scores.nrows() != rows || truth.nrows() != rows {
            return Err(Error::InvalidShape(format!(
                "{rows} samples, {} scores and {} truth rows",
                scores.nrows(),
                truth.nrows()
            )));
        }
        if rows > 0 && (scores.ncols() == 0 || truth.ncols() == 0) {
            return Err(Error::InvalidShape(
                "scores and truth need at least one column".to_owned(),
            ));
        }

        let (mut tp, mut tn, mut fp, mut fn_) = (Vec::new(), Vec::new(), Vec::new(), Vec::new());
        for row in 0..rows {
            let predicted = scores[[row, 0]] > self.threshold;
            let actual = truth[[row, 0]] > self.threshold;
            match (predicted, actual) {
                (true, true) => tp.push(row),
                (false, false) => tn.push(row),
                (true, false) => fp.push(row),
                (false, true) => fn_.push(row),
            }
        }

        self.counts = ConfusionCounts {
            true_positives: tp.len(),
            true_negatives: tn.len(),
            false_positives: fp.len(),
            false_negatives: fn_.len(),
        };
        self.true_positive_samples = samples.select(Axis(0), &tp);
        self.true_negative_samples = samples.select(Axis(0), &tn);
        self.false_positive_samples = samples.select(Axis(0), &fp);
        self.false_negative_samples = samples.select(Axis(0), &fn_);

        self.precision = self.counts.precision();
        self.recall = self.counts.recall();
        self.f1 = f1_score(self.precision, self.recall);
        Ok(())
    }

    #[inline]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    #[inline]
    pub fn counts(&self) -> ConfusionCounts {
        self.counts
    }

    pub fn true_positives(&self) -> usize {
        self.counts.true_positives
    }

    pub fn true_negatives(&self) -> usize {
        self.counts.true_negatives
    }

    pub fn false_positives(&self) -> usize {
        self.counts.false_positives
    }

    pub fn false_negatives(&self) -> usize {
        self.counts.false_negatives
    }

    pub fn true_positive_samples(&self) -> &Array2<f64> {
        &self.true_positive_samples
    }

    pub fn true_negative_samples(&self) -> &Array2<f64> {
        &self.true_negative_samples
    }

    pub fn false_positive_samples(&self) -> &Array2<f64> {
        &self.false_positive_samples
    }

    pub fn false_negative_samples(&self) -> &Array2<f64> {
        &self.false_negative_samples
    }

    pub fn precision(&self) -> f64 {
        self.precision
    }

    pub fn recall(&self) -> f64 {
        self.recall
    }

    pub fn f1(&self) -> f64 {
        self.f1
    }
}
