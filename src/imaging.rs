//! Converting images to feature rows and back.
//!
//! Pixels are visited row-major. A grayscale row holds one value per pixel
//! (integer mean of R, G and B); a color row holds interleaved R, G, B values.
//! Every value is scaled from `0..=255` to `[0, 1]`.

use std::fs;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use ndarray::ArrayView1;
use tracing::{info, warn};

use crate::{DataSet, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSpec {
    pub width: u32,
    pub height: u32,
    pub color: bool,
}

impl Default for ImageSpec {
    fn default() -> Self {
        Self {
            width: 10,
            height: 10,
            color: false,
        }
    }
}

impl ImageSpec {
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidConfig(format!(
                "image size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }

    /// Number of feature values per image.
    pub fn row_len(&self) -> usize {
        self.width as usize * self.height as usize * channels(self.color)
    }
}

#[inline]
fn channels(color: bool) -> usize {
    if color { 3 } else { 1 }
}

pub fn image_to_row(image: &DynamicImage, color: bool) -> Vec<f64> {
    let rgb = image.to_rgb8();
    let mut row = Vec::with_capacity(rgb.width() as usize * rgb.height() as usize * channels(color));
    for Rgb([r, g, b]) in rgb.pixels() {
        if color {
            row.extend([*r, *g, *b].map(|c| f64::from(c) / 255.0));
        } else {
            let mean = (u16::from(*r) + u16::from(*g) + u16::from(*b)) / 3;
            row.push(f64::from(mean) / 255.0);
        }
    }
    row
}

/// Feature row with the truth label appended.
pub fn encode_sample(image: &DynamicImage, color: bool, truth: f64) -> Vec<f64> {
    let mut row = image_to_row(image, color);
    row.push(truth);
    row
}

/// Rebuild an image from a feature row (without its label).
pub fn row_to_image(row: ArrayView1<'_, f64>, width: u32, height: u32, color: bool) -> Result<RgbImage> {
    let want = width as usize * height as usize * channels(color);
    if row.len() != want {
        return Err(Error::InvalidShape(format!(
            "row has {} values, a {width}x{height} {} image needs {want}",
            row.len(),
            if color { "color" } else { "grayscale" }
        )));
    }

    let to_u8 = |v: f64| (v * 255.0).round().clamp(0.0, 255.0) as u8;
    Ok(RgbImage::from_fn(width, height, |x, y| {
        let pixel = y as usize * width as usize + x as usize;
        if color {
            let base = pixel * 3;
            Rgb([to_u8(row[base]), to_u8(row[base + 1]), to_u8(row[base + 2])])
        } else {
            let v = to_u8(row[pixel]);
            Rgb([v, v, v])
        }
    }))
}

/// Add every image in `dir` with the given truth label.
///
/// Files that cannot be decoded or do not match the required size are logged
/// and skipped. Returns the number of samples added.
pub fn load_directory(dir: &Path, truth: f64, spec: &ImageSpec, data: &mut DataSet) -> Result<usize> {
    if !dir.is_dir() {
        return Err(Error::InvalidConfig(format!(
            "[{}] is not a directory",
            dir.display()
        )));
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    paths.retain(|p| p.is_file());
    paths.sort();

    let mut added = 0;
    for path in paths {
        let image = match image::open(&path) {
            Ok(image) => image,
            Err(err) => {
                warn!(path = %path.display(), %err, "cannot decode image, skipping");
                continue;
            }
        };
        if image.width() != spec.width || image.height() != spec.height {
            warn!(
                "file {} not correct size, skipping (want {}x{}, got {}x{})",
                path.display(),
                spec.width,
                spec.height,
                image.width(),
                image.height()
            );
            continue;
        }
        data.add_sample(&encode_sample(&image, spec.color, truth))?;
        added += 1;
    }

    info!(dir = %dir.display(), added, "loaded images");
    Ok(added)
}

/// Write `image` as `dir/name` in PNG format.
pub fn save_png(image: &RgbImage, dir: &Path, name: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    image.save_with_format(&path, ImageFormat::Png)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    use ndarray::Array1;

    fn gradient_image(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let v = (x * 40 + y * 7) as u8;
            Rgb([v, v.wrapping_add(3), v.wrapping_add(6)])
        })
    }

    #[test]
    fn grayscale_uses_integer_channel_mean() {
        let img = RgbImage::from_fn(2, 1, |x, _| if x == 0 { Rgb([10, 20, 31]) } else { Rgb([255, 255, 255]) });
        let row = image_to_row(&DynamicImage::ImageRgb8(img), false);
        assert_eq!(row, vec![20.0 / 255.0, 1.0]);
    }

    #[test]
    fn color_rows_interleave_channels() {
        let img = RgbImage::from_fn(1, 2, |_, y| if y == 0 { Rgb([255, 0, 51]) } else { Rgb([0, 102, 0]) });
        let row = encode_sample(&DynamicImage::ImageRgb8(img), true, 1.0);
        assert_eq!(row, vec![1.0, 0.0, 0.2, 0.0, 0.4, 0.0, 1.0]);
    }

    #[test]
    fn grayscale_round_trip_is_exact() {
        let gray = RgbImage::from_fn(5, 4, |x, y| {
            let v = (x * 50 + y * 13) as u8;
            Rgb([v, v, v])
        });
        let row = Array1::from(image_to_row(&DynamicImage::ImageRgb8(gray.clone()), false));
        let back = row_to_image(row.view(), 5, 4, false).unwrap();
        assert_eq!(back, gray);
    }

    #[test]
    fn color_round_trip_is_exact() {
        let img = gradient_image(3, 3);
        let row = Array1::from(image_to_row(&DynamicImage::ImageRgb8(img.clone()), true));
        assert_eq!(row_to_image(row.view(), 3, 3, true).unwrap(), img);
    }

    #[test]
    fn decoding_checks_row_length() {
        let row = Array1::<f64>::zeros(5);
        assert!(matches!(
            row_to_image(row.view(), 2, 2, false),
            Err(Error::InvalidShape(_))
        ));
    }

    #[test]
    fn load_directory_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        save_png(&gradient_image(4, 3), dir.path(), "a.png").unwrap();
        save_png(&gradient_image(4, 3), dir.path(), "b.png").unwrap();
        save_png(&gradient_image(5, 5), dir.path(), "wrong_size.png").unwrap();
        fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

        let spec = ImageSpec {
            width: 4,
            height: 3,
            color: false,
        };
        let mut data = DataSet::with_seed(true, 0);
        let added = load_directory(dir.path(), 1.0, &spec, &mut data).unwrap();

        assert_eq!(added, 2);
        assert_eq!(data.num_samples(), 2);
        assert_eq!(data.num_cols_samples(), spec.row_len());
        assert!(data.truth().unwrap().iter().all(|&t| t == 1.0));
    }

    #[test]
    fn load_directory_requires_a_directory() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut data = DataSet::new(true);
        let err = load_directory(file.path(), 0.0, &ImageSpec::default(), &mut data).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn spec_validation_and_row_len() {
        assert!(ImageSpec { width: 0, height: 3, color: false }.validate().is_err());
        let spec = ImageSpec { width: 4, height: 3, color: true };
        assert!(spec.validate().is_ok());
        assert_eq!(spec.row_len(), 36);
    }
}
