use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("invalid shape: {0}")]
    InvalidShape(String),

    #[error("{what} index {index} is out of range (count {count})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        count: usize,
    },

    #[error("{what} {index} has not been computed yet")]
    NotComputed { what: &'static str, index: usize },

    #[error("shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, Error>;
