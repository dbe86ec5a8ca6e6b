//! Labeled sample storage and train/test partitioning.
//!
//! A [`DataSet`] holds a sample matrix (one sample per row) and, when it is
//! truth-bearing, a parallel truth matrix with one label per row. Every split
//! produces two independent data sets; nothing is shared with the parent.

use std::path::Path;

use ndarray::{Array2, ArrayView1, Axis, s};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::{Error, Result, reader};

#[derive(Debug, Clone)]
pub struct DataSet {
    samples: Array2<f64>,
    truth: Option<Array2<f64>>,
    rng: StdRng,
}

impl DataSet {
    /// An empty data set. When `has_truth` is set, the last element of every
    /// added row is taken as its label.
    pub fn new(has_truth: bool) -> Self {
        Self::with_rng(has_truth, StdRng::from_rng(&mut rand::rng()))
    }

    pub fn with_seed(has_truth: bool, seed: u64) -> Self {
        Self::with_rng(has_truth, StdRng::seed_from_u64(seed))
    }

    fn with_rng(has_truth: bool, rng: StdRng) -> Self {
        Self {
            samples: Array2::zeros((0, 0)),
            truth: has_truth.then(|| Array2::zeros((0, 1))),
            rng,
        }
    }

    /// Wrap existing matrices. Row counts must agree when `truth` is present.
    pub fn from_matrices(samples: Array2<f64>, truth: Option<Array2<f64>>) -> Result<Self> {
        if let Some(truth) = &truth {
            if truth.nrows() != samples.nrows() {
                return Err(Error::InvalidShape(format!(
                    "{} sample rows but {} truth rows",
                    samples.nrows(),
                    truth.nrows()
                )));
            }
            if truth.ncols() != 1 {
                return Err(Error::InvalidShape(format!(
                    "truth matrix must have exactly one column, got {}",
                    truth.ncols()
                )));
            }
        }

        Ok(Self {
            samples,
            truth,
            rng: StdRng::from_rng(&mut rand::rng()),
        })
    }

    /// Replace the random source, e.g. for reproducible shuffles and splits.
    pub fn seeded(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    #[inline]
    pub fn samples(&self) -> &Array2<f64> {
        &self.samples
    }

    #[inline]
    pub fn truth(&self) -> Option<&Array2<f64>> {
        self.truth.as_ref()
    }

    #[inline]
    pub fn has_truth(&self) -> bool {
        self.truth.is_some()
    }

    #[inline]
    pub fn num_samples(&self) -> usize {
        self.samples.nrows()
    }

    #[inline]
    pub fn num_cols_samples(&self) -> usize {
        self.samples.ncols()
    }

    #[inline]
    pub fn num_cols_truth(&self) -> usize {
        self.truth.as_ref().map_or(0, |t| t.ncols())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_samples() == 0
    }

    pub(crate) fn into_parts(self) -> (Array2<f64>, Option<Array2<f64>>, StdRng) {
        (self.samples, self.truth, self.rng)
    }

    /// Append rows. For a truth-bearing set the trailing element of each row
    /// becomes its label.
    ///
    /// All rows are checked before any is added, so a failed call leaves the
    /// data set unchanged.
    pub fn add_samples<R: AsRef<[f64]>>(&mut self, rows: &[R]) -> Result<()> {
        let Some(first) = rows.first() else {
            return Ok(());
        };

        let row_width = first.as_ref().len();
        let sample_width = if self.has_truth() {
            if row_width < 2 {
                return Err(Error::InvalidData(format!(
                    "a labeled row needs at least one feature and a label, got {row_width} values"
                )));
            }
            row_width - 1
        } else {
            if row_width == 0 {
                return Err(Error::InvalidData("sample rows must not be empty".to_owned()));
            }
            row_width
        };

        if !self.is_empty() && sample_width != self.num_cols_samples() {
            return Err(Error::InvalidData(format!(
                "rows carry {sample_width} features, data set has {}",
                self.num_cols_samples()
            )));
        }
        if let Some(idx) = rows.iter().position(|r| r.as_ref().len() != row_width) {
            return Err(Error::InvalidData(format!(
                "row {idx} has {} values, expected {row_width}",
                rows[idx].as_ref().len()
            )));
        }

        if self.num_cols_truth() > 1 {
            return Err(Error::InvalidShape(format!(
                "truth matrix has {} columns, labeled rows carry one",
                self.num_cols_truth()
            )));
        }

        if self.is_empty() {
            self.samples = Array2::zeros((0, sample_width));
            if let Some(truth) = &mut self.truth {
                *truth = Array2::zeros((0, 1));
            }
        }
        for row in rows {
            let row = row.as_ref();
            self.samples.push_row(ArrayView1::from(&row[..sample_width]))?;
            if let Some(truth) = &mut self.truth {
                truth.push_row(ArrayView1::from(&row[sample_width..]))?;
            }
        }
        Ok(())
    }

    pub fn add_sample(&mut self, row: &[f64]) -> Result<()> {
        self.add_samples(&[row])
    }

    /// Read a header-less numeric CSV file and append its rows.
    ///
    /// Returns the number of rows added.
    pub fn add_from_csv_file(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let rows = reader::read_csv_file(path)?;
        self.add_samples(&rows)?;
        info!(rows = rows.len(), path = %path.display(), "loaded csv data");
        Ok(rows.len())
    }

    /// Approximate shuffle: `rows × 5` random swaps of row pairs.
    ///
    /// Truth rows are swapped together with their samples.
    pub fn randomize(&mut self) {
        let rows = self.num_samples();
        if rows < 2 {
            return;
        }
        for _ in 0..rows * 5 {
            let a = self.rng.random_range(0..rows);
            let b = self.rng.random_range(0..rows);
            swap_rows(&mut self.samples, a, b);
            if let Some(truth) = &mut self.truth {
                swap_rows(truth, a, b);
            }
        }
    }

    /// Training set = the first `ceil(percent / 100 × rows)` rows in current order,
    /// testing set = the rest.
    pub fn split_sequentially(&mut self, percent: u32) -> Result<(DataSet, DataSet)> {
        validate_percent(percent)?;
        let rows = self.num_samples();
        let cut = ceil_div(percent as usize * rows, 100);

        let training = self.child(
            self.samples.slice(s![..cut, ..]).to_owned(),
            self.truth.as_ref().map(|t| t.slice(s![..cut, ..]).to_owned()),
        );
        let testing = self.child(
            self.samples.slice(s![cut.., ..]).to_owned(),
            self.truth.as_ref().map(|t| t.slice(s![cut.., ..]).to_owned()),
        );
        Ok((training, testing))
    }

    /// Class-balanced split: `ceil(percent / 100 × rows / 2)` randomly chosen
    /// positive rows and as many negative rows form the training set. Every
    /// row not chosen goes to the testing set, in its current order.
    ///
    /// Falls back to [`Self::split_sequentially`] when either class is too small.
    pub fn split_equally(&mut self, percent: u32) -> Result<(DataSet, DataSet)> {
        validate_percent(percent)?;
        let Some(truth) = &self.truth else {
            return Err(Error::InvalidData(
                "cannot split equally without a truth column".to_owned(),
            ));
        };

        let rows = self.num_samples();
        let half = ceil_div(percent as usize * rows, 200);
        let positive: Vec<bool> = truth.column(0).iter().map(|&t| is_positive(t)).collect();
        let num_pos = positive.iter().filter(|&&p| p).count();
        let num_neg = rows - num_pos;

        if num_pos < half || num_neg < half {
            warn!(
                "cannot split DataSet equally ({num_pos} pos, {num_neg} neg, want {half} each), \
                 falling back to sequential split"
            );
            return self.split_sequentially(percent);
        }

        let mut selected = vec![false; rows];
        let mut order = Vec::with_capacity(2 * half);
        let (mut pos_taken, mut neg_taken) = (0, 0);
        while pos_taken < half || neg_taken < half {
            let idx = self.rng.random_range(0..rows);
            if selected[idx] {
                continue;
            }
            let counter = if positive[idx] {
                &mut pos_taken
            } else {
                &mut neg_taken
            };
            if *counter < half {
                *counter += 1;
                selected[idx] = true;
                order.push(idx);
            }
        }
        let rest: Vec<usize> = (0..rows).filter(|&i| !selected[i]).collect();
        debug!(training = order.len(), testing = rest.len(), "split equally");

        let (train_truth, test_truth) = (truth.select(Axis(0), &order), truth.select(Axis(0), &rest));
        let (train_samples, test_samples) = (
            self.samples.select(Axis(0), &order),
            self.samples.select(Axis(0), &rest),
        );
        let training = self.child(train_samples, Some(train_truth));
        let testing = self.child(test_samples, Some(test_truth));
        Ok((training, testing))
    }

    /// A deep, independent copy (the random source state is copied too).
    pub fn dup(&self) -> DataSet {
        self.clone()
    }

    fn child(&mut self, samples: Array2<f64>, truth: Option<Array2<f64>>) -> DataSet {
        DataSet {
            samples,
            truth,
            rng: StdRng::from_rng(&mut self.rng),
        }
    }
}

/// Label value of the positive class.
#[inline]
pub(crate) fn is_positive(truth: f64) -> bool {
    truth == 1.0
}

fn validate_percent(percent: u32) -> Result<()> {
    if percent > 100 {
        return Err(Error::InvalidConfig(format!(
            "split percentage must be in 0..=100, got {percent}"
        )));
    }
    Ok(())
}

#[inline]
fn ceil_div(numerator: usize, denominator: usize) -> usize {
    numerator.div_ceil(denominator)
}

fn swap_rows(m: &mut Array2<f64>, a: usize, b: usize) {
    if a == b {
        return;
    }
    for col in 0..m.ncols() {
        m.swap([a, col], [b, col]);
    }
}
