//! Sparse elevation matrices to dense, multi-resolution grids.
//!
//! The pipeline in [`prepare`] densifies a sparse matrix, fills NaN
//! holes with the global mean, resamples a capped `high` grid and a
//! coarser `low` grid, and records both in a [`geometa::Metadata`].
//!
//! # References
//!
//! 1. [scipy.sparse.save_npz](https://docs.scipy.org/doc/scipy/reference/generated/scipy.sparse.save_npz.html)
//! 1. [scipy.ndimage.zoom](https://docs.scipy.org/doc/scipy/reference/generated/scipy.ndimage.zoom.html)

mod error;
mod grid;
mod npy;
mod pipeline;
mod resample;
mod sparse;

pub use crate::{
    error::ElevationError,
    grid::Grid,
    pipeline::{prepare, verify},
    resample::{high_scale, output_len, zoom, ElevationGrids},
    sparse::{SparseMatrix, Triplet},
};
