//! Web Mercator lon/lat to slippy-map tile space.
//!
//! # References
//!
//! 1. [Slippy map tilenames](https://wiki.openstreetmap.org/wiki/Slippy_map_tilenames)

use crate::BasemapError;
use geo::geometry::Coord;
use std::f64::consts::PI;

/// Returns the number of tiles along either axis at `zoom`.
pub fn tiles_per_axis(zoom: u8) -> f64 {
    2.0_f64.powi(i32::from(zoom))
}

/// Projects `coord` (`x` = lon, `y` = lat, degrees) to fractional tile
/// coordinates at `zoom`.
///
/// `x` grows eastward and `y` grows southward, with `(0, 0)` at the
/// northwest corner of the world. Latitude must be strictly inside
/// (-90, 90): the projection diverges at the poles.
pub fn lonlat_to_tile(coord: Coord<f64>, zoom: u8) -> Result<Coord<f64>, BasemapError> {
    let Coord { x: lon, y: lat } = coord;
    if !(lat > -90.0 && lat < 90.0) {
        return Err(BasemapError::Latitude(lat));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(BasemapError::Longitude(lon));
    }
    let n = tiles_per_axis(zoom);
    let lat_rad = lat.to_radians();
    Ok(Coord {
        x: (lon + 180.0) / 360.0 * n,
        y: (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n,
    })
}

/// Inverse of [`lonlat_to_tile`].
///
/// For integer input this is the northwest corner of that tile.
pub fn tile_to_lonlat(tile: Coord<f64>, zoom: u8) -> Coord<f64> {
    let n = tiles_per_axis(zoom);
    Coord {
        x: tile.x / n * 360.0 - 180.0,
        y: (PI * (1.0 - 2.0 * tile.y / n)).sinh().atan().to_degrees(),
    }
}
