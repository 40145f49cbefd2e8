use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetaError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("metadata {0:?} not found, run the elevation stage first")]
    Missing(PathBuf),

    #[error("malformed metadata: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid bounds: {0}")]
    Bounds(String),

    #[error("invalid config: {0}")]
    Config(String),
}
