use crate::{BasemapError, CropRect, TileSource, TileWindow};
use geometa::{tmp_path, Config, GeoBounds, Metadata};
use image::{imageops, ImageFormat, RgbImage};
use log::{debug, info};
use std::{fs, path::Path};

/// Fetches every tile in `window` and pastes it onto one canvas.
///
/// Tiles are fetched one at a time; the first failure aborts the
/// whole canvas.
pub fn stitch<S: TileSource + ?Sized>(
    window: &TileWindow,
    tile_size: u32,
    source: &S,
) -> Result<RgbImage, BasemapError> {
    let (width, height) = window.canvas_size(tile_size)?;
    let mut canvas = RgbImage::new(width, height);
    for tile in window.tiles() {
        let raster = source.fetch(tile)?;
        if raster.dimensions() != (tile_size, tile_size) {
            return Err(BasemapError::TileSize {
                tile,
                width: raster.width(),
                height: raster.height(),
                tile_size,
            });
        }
        let (px, py) = window.offset(tile, tile_size);
        debug!("pasting {tile} at ({px}, {py})");
        imageops::replace(&mut canvas, &raster, i64::from(px), i64::from(py));
    }
    Ok(canvas)
}

/// Returns the map raster whose edges are exactly `bounds`, and the
/// canvas rectangle it was cut from.
pub fn composite<S: TileSource + ?Sized>(
    bounds: &GeoBounds,
    config: &Config,
    source: &S,
) -> Result<(RgbImage, CropRect), BasemapError> {
    config.validate()?;
    let window = TileWindow::covering(bounds, config.zoom)?;
    let origin = window.origin();
    info!(
        "zoom {}: {}x{} tiles from {origin}",
        config.zoom,
        window.tiles_x(),
        window.tiles_y()
    );

    let canvas = stitch(&window, config.tile_size, source)?;
    let rect = window.crop_rect(config.tile_size)?;
    info!(
        "cropping to left={}, top={}, right={}, bottom={}",
        rect.left, rect.top, rect.right, rect.bottom
    );
    let cropped =
        imageops::crop_imm(&canvas, rect.left, rect.top, rect.width(), rect.height()).to_image();
    Ok((cropped, rect))
}

/// Runs the map pipeline: reads the bounds from `meta_path`, composites
/// them and writes the raster to `out`.
///
/// The encoding follows `out`'s extension. Nothing is written unless
/// every tile was fetched.
pub fn render<S: TileSource + ?Sized>(
    meta_path: &Path,
    source: &S,
    config: &Config,
    out: &Path,
) -> Result<CropRect, BasemapError> {
    let meta = Metadata::read(meta_path)?;
    info!("bounds from {meta_path:?}: {}", meta.bounds);
    let format = ImageFormat::from_path(out)?;

    let (raster, rect) = composite(&meta.bounds, config, source)?;

    if let Some(dir) = out.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let tmp = tmp_path(out);
    if let Err(e) = raster.save_with_format(&tmp, format) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    fs::rename(&tmp, out)?;
    info!("wrote {}x{} map to {out:?}", raster.width(), raster.height());
    Ok(rect)
}
