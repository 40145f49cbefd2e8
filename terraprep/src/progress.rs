use basemap::{BasemapError, TileId, TileSource};
use image::RgbImage;
use indicatif::{ProgressBar, ProgressStyle};

pub fn bar(header: String, length: u64) -> ProgressBar {
    let pb = ProgressBar::new(length);
    pb.set_prefix(header);
    pb.set_style(
        ProgressStyle::with_template("{prefix}...\n[{wide_bar:.cyan/blue}] {pos}/{len}")
            .expect("incorrect progress bar format string")
            .progress_chars("#>-"),
    );
    pb
}

/// Ticks a progress bar for every tile fetched through `S`.
pub struct ProgressTiles<S> {
    inner: S,
    pb: ProgressBar,
}

impl<S> ProgressTiles<S> {
    pub fn new(inner: S, pb: ProgressBar) -> Self {
        Self { inner, pb }
    }

    pub fn finish(&self) {
        self.pb.finish();
    }
}

impl<S: TileSource> TileSource for ProgressTiles<S> {
    fn fetch(&self, tile: TileId) -> Result<RgbImage, BasemapError> {
        let raster = self.inner.fetch(tile)?;
        self.pb.inc(1);
        Ok(raster)
    }
}
