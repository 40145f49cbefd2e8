use crate::TileId;
use geometa::{GeoBounds, MetaError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BasemapError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("latitude {0} outside (-90, 90)")]
    Latitude(f64),

    #[error("longitude {0} outside [-180, 180]")]
    Longitude(f64),

    #[error("{0} extends beyond the Web Mercator tile grid")]
    OutsideTileGrid(GeoBounds),

    #[error("{tiles_x}x{tiles_y} tiles of {tile_size}px do not fit in one image")]
    CanvasSize {
        tiles_x: u32,
        tiles_y: u32,
        tile_size: u32,
    },

    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("tile {tile} request failed with status {status}")]
    Status { tile: TileId, status: u16 },

    #[error("tile {0} not found at {1:?}")]
    MissingTile(TileId, PathBuf),

    #[error("tile directory {0:?} does not exist")]
    TileDir(PathBuf),

    #[error("tile url template {0:?} needs {{z}}, {{x}} and {{y}}")]
    UrlTemplate(String),

    #[error("{0}")]
    Image(#[from] image::ImageError),

    #[error("tile {tile} is {width}x{height}, expected {tile_size}x{tile_size}")]
    TileSize {
        tile: TileId,
        width: u32,
        height: u32,
        tile_size: u32,
    },

    #[error("{0}")]
    Meta(#[from] MetaError),
}
