use anyhow::Result;
use geometa::{Lod, META_FILE};
use log::info;
use std::path::Path;

pub fn run(out_dir: &Path) -> Result<()> {
    let meta = elevation::verify(out_dir.join(META_FILE))?;
    for lod in [Lod::High, Lod::Low] {
        let grid = meta.grid(lod);
        info!("{lod}: {}x{} in {}", grid.width, grid.height, grid.file);
    }
    info!("{} ok, elevation {} .. {}", meta.bounds, meta.min_elev, meta.max_elev);
    Ok(())
}
