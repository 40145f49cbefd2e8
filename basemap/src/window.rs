//! The integer tiles covering a bounding box, and where the box falls
//! on the stitched canvas.

use crate::{
    projection::{lonlat_to_tile, tiles_per_axis},
    BasemapError,
};
use geometa::GeoBounds;
use std::fmt;

/// Fractional tile coordinates this close to an integer are treated as
/// lying exactly on the tile edge.
const EDGE_EPSILON: f64 = 1e-9;

/// One slippy-map tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// A pixel rectangle on the stitched canvas, `right`/`bottom`
/// exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl CropRect {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }
}

/// The fractional tile-space rectangle of a bounding box and the
/// inclusive range of whole tiles covering it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileWindow {
    zoom: u8,

    x_min_f: f64,
    x_max_f: f64,

    /// North edge (smaller `y`).
    y_min_f: f64,

    /// South edge (larger `y`).
    y_max_f: f64,

    x_min: u32,
    x_max: u32,
    y_min: u32,
    y_max: u32,
}

impl TileWindow {
    /// Returns the window covering `bounds` at `zoom`.
    ///
    /// The southwest corner yields the minimum `x` and maximum `y`, the
    /// northeast corner the maximum `x` and minimum `y`.
    pub fn covering(bounds: &GeoBounds, zoom: u8) -> Result<Self, BasemapError> {
        bounds.validate()?;
        let sw = lonlat_to_tile(bounds.sw(), zoom)?;
        let ne = lonlat_to_tile(bounds.ne(), zoom)?;
        let (x_min_f, y_max_f) = (snap(sw.x), snap(sw.y));
        let (x_max_f, y_min_f) = (snap(ne.x), snap(ne.y));

        if y_min_f < 0.0 || y_max_f > tiles_per_axis(zoom) {
            return Err(BasemapError::OutsideTileGrid(*bounds));
        }

        let (x_min, x_max) = tile_range(x_min_f, x_max_f);
        let (y_min, y_max) = tile_range(y_min_f, y_max_f);
        Ok(Self {
            zoom,
            x_min_f,
            x_max_f,
            y_min_f,
            y_max_f,
            x_min,
            x_max,
            y_min,
            y_max,
        })
    }

    /// Returns the tile with the smallest `x` and `y`.
    pub fn origin(&self) -> TileId {
        TileId {
            z: self.zoom,
            x: self.x_min,
            y: self.y_min,
        }
    }

    pub fn tiles_x(&self) -> u32 {
        self.x_max - self.x_min + 1
    }

    pub fn tiles_y(&self) -> u32 {
        self.y_max - self.y_min + 1
    }

    pub fn tile_count(&self) -> u64 {
        u64::from(self.tiles_x()) * u64::from(self.tiles_y())
    }

    /// Returns every covering tile, column by column.
    pub fn tiles(&self) -> impl Iterator<Item = TileId> + '_ {
        (self.x_min..=self.x_max).flat_map(move |x| {
            (self.y_min..=self.y_max).map(move |y| TileId {
                z: self.zoom,
                x,
                y,
            })
        })
    }

    /// Returns (width, height) in pixels of the stitched canvas.
    pub fn canvas_size(&self, tile_size: u32) -> Result<(u32, u32), BasemapError> {
        let err = || BasemapError::CanvasSize {
            tiles_x: self.tiles_x(),
            tiles_y: self.tiles_y(),
            tile_size,
        };
        let width = self.tiles_x().checked_mul(tile_size).ok_or_else(err)?;
        let height = self.tiles_y().checked_mul(tile_size).ok_or_else(err)?;
        Ok((width, height))
    }

    /// Returns where the top-left pixel of `tile` lands on the canvas.
    pub fn offset(&self, tile: TileId, tile_size: u32) -> (u32, u32) {
        (
            (tile.x - self.x_min) * tile_size,
            (tile.y - self.y_min) * tile_size,
        )
    }

    /// Returns the canvas pixels covered by the bounding box.
    ///
    /// The result is never empty and never extends past the canvas,
    /// however small the box.
    pub fn crop_rect(&self, tile_size: u32) -> Result<CropRect, BasemapError> {
        let (width, height) = self.canvas_size(tile_size)?;
        let (width, height) = (i64::from(width), i64::from(height));
        let px = |frac: f64, origin: u32| -> i64 {
            #[allow(clippy::cast_possible_truncation)]
            let px = ((frac - f64::from(origin)) * f64::from(tile_size)).round() as i64;
            px
        };

        let left = px(self.x_min_f, self.x_min).clamp(0, width - 1);
        let right = px(self.x_max_f, self.x_min).clamp(left + 1, width);
        let top = px(self.y_min_f, self.y_min).clamp(0, height - 1);
        let bottom = px(self.y_max_f, self.y_min).clamp(top + 1, height);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(CropRect {
            left: left as u32,
            top: top as u32,
            right: right as u32,
            bottom: bottom as u32,
        })
    }
}

/// Rounds `v` onto a tile edge when it is within float noise of one.
fn snap(v: f64) -> f64 {
    let edge = v.round();
    if (v - edge).abs() < EDGE_EPSILON {
        edge
    } else {
        v
    }
}

/// Returns the inclusive tile range covering `[min, max]`.
///
/// Normally `floor(min)..=floor(max)`; a `max` exactly on a tile edge
/// does not pull in the tile beyond it.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn tile_range(min: f64, max: f64) -> (u32, u32) {
    let lo = min.floor() as u32;
    let hi = (max.ceil() as u32).saturating_sub(1).max(lo);
    (lo, hi)
}
