use crate::MetaError;
use serde::{Deserialize, Serialize};

/// Highest zoom level accepted. Keeps tile indices and canvas sizes
/// comfortably inside `u32`.
pub const MAX_ZOOM: u8 = 24;

/// Knobs shared by both pipelines.
///
/// Passed explicitly into every entry point; nothing reads process-wide
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Slippy-map zoom level used for the base map.
    pub zoom: u8,

    /// Edge length, in pixels, of one map tile.
    pub tile_size: u32,

    /// Cap on either dimension of the high resolution grid.
    pub max_high_res: usize,

    /// Coarsening ratio between the high and low resolution grids.
    pub low_factor: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            zoom: 10,
            tile_size: 256,
            max_high_res: 1024,
            low_factor: 4,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), MetaError> {
        if self.zoom > MAX_ZOOM {
            return Err(MetaError::Config(format!(
                "zoom {} exceeds {MAX_ZOOM}",
                self.zoom
            )));
        }
        if self.tile_size == 0 {
            return Err(MetaError::Config("tile_size must be positive".into()));
        }
        if self.max_high_res == 0 {
            return Err(MetaError::Config("max_high_res must be positive".into()));
        }
        if self.low_factor == 0 {
            return Err(MetaError::Config("low_factor must be positive".into()));
        }
        Ok(())
    }
}
