use crate::{
    options::Map,
    progress::{self, ProgressTiles},
};
use anyhow::{Context, Result};
use basemap::{DirTileSource, HttpTileSource, TileSource, TileWindow};
use geometa::{Config, Metadata, META_FILE};
use log::info;
use std::path::Path;

impl Map {
    pub fn run(&self, out_dir: &Path, config: &Config) -> Result<()> {
        let meta_path = out_dir.join(META_FILE);
        let out = self
            .out
            .clone()
            .unwrap_or_else(|| out_dir.join("map.png"));
        match &self.tile_dir {
            Some(dir) => {
                info!("reading tiles from {dir:?}");
                let source = DirTileSource::new(dir.clone())?;
                Self::render(&meta_path, source, config, &out)
            }
            None => {
                info!("fetching tiles from {}", self.tile_url());
                let source = HttpTileSource::new(self.tile_url(), &self.user_agent)?;
                Self::render(&meta_path, source, config, &out)
            }
        }
    }

    fn render<S: TileSource>(
        meta_path: &Path,
        source: S,
        config: &Config,
        out: &Path,
    ) -> Result<()> {
        // Size the bar up front; `render` repeats this check before
        // fetching anything.
        let meta = Metadata::read(meta_path)
            .with_context(|| format!("run the elevation step first to create {meta_path:?}"))?;
        let window = TileWindow::covering(&meta.bounds, config.zoom)?;
        let source = ProgressTiles::new(
            source,
            progress::bar(format!("Fetch z{} tiles", config.zoom), window.tile_count()),
        );
        let rect = basemap::render(meta_path, &source, config, out)?;
        source.finish();
        info!(
            "map {}x{} px written to {out:?}",
            rect.width(),
            rect.height()
        );
        Ok(())
    }
}
