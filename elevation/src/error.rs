use geometa::{Lod, MetaError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ElevationError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("malformed npy array: {0}")]
    Npy(String),

    #[error("sparse archive has no {0:?} array")]
    MissingArray(String),

    #[error("unsupported sparse format {0:?}")]
    SparseFormat(String),

    #[error("invalid sparse matrix: {0}")]
    Shape(String),

    #[error("elevation grid has no valid samples")]
    NoData,

    #[error("grid file {path:?} is {actual} bytes, expected {expected}")]
    GridLen {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("{lod} grid sample {value} outside recorded elevation range")]
    OutOfRange { lod: Lod, value: f32 },

    #[error("{0}")]
    Meta(#[from] MetaError),
}
