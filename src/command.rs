//! The `train` command: load data, cross-validate, report, dump misclassified images.

use std::io::Write;
use std::path::Path;

use tracing::{error, info, warn};

use crate::cli::TrainArgs;
use crate::imaging::{self, ImageSpec};
use crate::validation::{BestFold, CrossValidationReport, FoldReport, Summary, cross_validate};
use crate::{DataSet, Result};

/// Run the train command, printing results to stdout.
pub fn train(args: &TrainArgs) -> Result<Option<CrossValidationReport>> {
    let stdout = std::io::stdout();
    train_with_output(args, &mut stdout.lock())
}

/// Run the train command, printing results to `out`.
///
/// Returns `Ok(None)` when no data set could be built or the configuration is
/// invalid; the cause is logged.
pub fn train_with_output<W: Write>(
    args: &TrainArgs,
    out: &mut W,
) -> Result<Option<CrossValidationReport>> {
    let Some(mut data) = load_data(args) else {
        error!("no data set could be built, exiting");
        return Ok(None);
    };
    if data.is_empty() {
        error!("data set is empty, exiting");
        return Ok(None);
    }

    let config = args.cross_validation_config(data.num_cols_samples());
    if let Err(err) = config.validate() {
        error!(%err, "invalid training configuration, exiting");
        return Ok(None);
    }
    info!(layers = ?config.train.layer_sizes, folds = config.folds, "layer sizes");
    let report = cross_validate(&mut data, &config)?;

    for fold in &report.folds {
        print_fold(out, fold)?;
    }

    if let Some(dir) = &args.save_dir {
        if args.csv.is_some() {
            warn!("--save-dir only applies to image input, nothing saved");
        } else {
            match &report.best {
                Some(best) => save_results(best, &args.image_spec(), dir),
                None => warn!("no fold scored an F1 above zero, nothing saved"),
            }
        }
    }

    print_summary(out, &report.summary())?;
    Ok(Some(report))
}

fn load_data(args: &TrainArgs) -> Option<DataSet> {
    let mut data = match args.seed {
        Some(seed) => DataSet::with_seed(true, seed),
        None => DataSet::new(true),
    };

    if let Some(csv) = &args.csv {
        if let Err(err) = data.add_from_csv_file(csv) {
            error!(path = %csv.display(), %err, "cannot load csv file");
            return None;
        }
    } else if let (Some(positive), Some(negative)) = (&args.positive_dir, &args.negative_dir) {
        let spec = args.image_spec();
        if let Err(err) = spec.validate() {
            error!(%err, "invalid image size");
            return None;
        }
        for (dir, truth, kind) in [(positive, 1.0, "positives"), (negative, 0.0, "negatives")] {
            if !dir.is_dir() {
                error!("{kind} directory [{}] is not a directory", dir.display());
                return None;
            }
            if let Err(err) = imaging::load_directory(dir, truth, &spec, &mut data) {
                error!(dir = %dir.display(), %err, "cannot load {kind}");
                return None;
            }
        }
    } else {
        error!("either --csv or both --positive-dir and --negative-dir are required");
        return None;
    }

    info!("loaded {} sample(s)", data.num_samples());
    Some(data)
}

fn save_results(best: &BestFold, spec: &ImageSpec, dir: &Path) {
    if !dir.is_dir() {
        error!("save directory [{}] is not a directory", dir.display());
        return;
    }

    for (prefix, samples) in [("fp", &best.false_positives), ("fn", &best.false_negatives)] {
        for (i, row) in samples.rows().into_iter().enumerate() {
            let name = format!("{prefix}{}.png", i + 1);
            let saved = imaging::row_to_image(row, spec.width, spec.height, spec.color)
                .and_then(|image| imaging::save_png(&image, dir, &name));
            if let Err(err) = saved {
                error!(file = %dir.join(&name).display(), %err, "could not save file");
            }
        }
    }
    info!(
        fold = best.fold,
        false_positives = best.false_positives.nrows(),
        false_negatives = best.false_negatives.nrows(),
        dir = %dir.display(),
        "saved misclassified samples"
    );
}

fn print_fold<W: Write>(out: &mut W, fold: &FoldReport) -> Result<()> {
    writeln!(out, "Fold {}", fold.fold)?;
    writeln!(out, "True Positives {}", fold.counts.true_positives)?;
    writeln!(out, "False Positives {}", fold.counts.false_positives)?;
    writeln!(out, "True Negatives {}", fold.counts.true_negatives)?;
    writeln!(out, "False Negatives {}", fold.counts.false_negatives)?;
    writeln!(out, "Precision {}", fold.precision)?;
    writeln!(out, "Recall {}", fold.recall)?;
    writeln!(out, "F1 {}", fold.f1)?;
    Ok(())
}

fn print_summary<W: Write>(out: &mut W, summary: &Summary) -> Result<()> {
    writeln!(out, "Overall Statistics")?;
    writeln!(out, "True Positives {}", summary.true_positives)?;
    writeln!(out, "False Positives {}", summary.false_positives)?;
    writeln!(out, "True Negatives {}", summary.true_negatives)?;
    writeln!(out, "False Negatives {}", summary.false_negatives)?;
    writeln!(out, "Precision {}", summary.precision)?;
    writeln!(out, "Recall {}", summary.recall)?;
    writeln!(out, "F1 {}", summary.f1)?;
    Ok(())
}
