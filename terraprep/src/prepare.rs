use crate::options::Elevation;
use anyhow::{Context, Result};
use elevation::SparseMatrix;
use geometa::{Config, FALLBACK_BOUNDS};
use log::{info, warn};
use std::path::Path;

impl Elevation {
    pub fn run(&self, out_dir: &Path, config: &Config) -> Result<()> {
        let bounds = self.bounds.unwrap_or_else(|| {
            warn!("no --bounds given, assuming {FALLBACK_BOUNDS}");
            FALLBACK_BOUNDS
        });
        let matrix = SparseMatrix::load_npz(&self.input)
            .with_context(|| format!("reading sparse matrix {:?}", self.input))?;
        let meta = elevation::prepare(&matrix, bounds, config, out_dir)?;
        info!(
            "high {}x{}, low {}x{}, elevation {} .. {}",
            meta.high.width,
            meta.high.height,
            meta.low.width,
            meta.low.height,
            meta.min_elev,
            meta.max_elev
        );
        Ok(())
    }
}
