//! Slippy-map base images cropped exactly to a lat/lon bounding box.
//!
//! [`render`] reads the bounds recorded by the elevation pipeline,
//! fetches every covering tile from a [`TileSource`], stitches them
//! and crops the result so its edges line up with the bounds.

mod compositor;
mod error;
mod projection;
mod tile_source;
mod window;

pub use crate::{
    compositor::{composite, render, stitch},
    error::BasemapError,
    projection::{lonlat_to_tile, tile_to_lonlat, tiles_per_axis},
    tile_source::{DirTileSource, HttpTileSource, TileSource},
    window::{CropRect, TileId, TileWindow},
};
