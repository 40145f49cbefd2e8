use crate::{ElevationError, ElevationGrids, Grid, SparseMatrix};
use geometa::{tmp_path, Config, GeoBounds, GridInfo, Lod, Metadata, META_FILE};
use log::{debug, info, warn};
use std::{fs, io::ErrorKind, path::Path};

/// Runs the elevation pipeline and returns the metadata it wrote.
///
/// Writes `heights_high.bin`, `heights_low.bin` and finally
/// `meta.json` into `out_dir`. Every file is staged under a temporary
/// name first, so a failure while writing leaves the previous run's
/// artifacts untouched and the metadata never describes grids that are
/// not on disk.
pub fn prepare(
    matrix: &SparseMatrix,
    bounds: GeoBounds,
    config: &Config,
    out_dir: &Path,
) -> Result<Metadata, ElevationError> {
    config.validate()?;
    bounds.validate()?;

    let (height, width) = matrix.shape();
    info!("densifying {height}x{width} matrix with {} entries", matrix.nnz());
    let mut dense = matrix.densify();

    let filled = dense.fill_nan_with_mean()?;
    if filled > 0 {
        warn!("filled {filled} NaN samples with the grid mean");
    }

    let grids = ElevationGrids::build(&dense, config)?;
    info!(
        "high {}x{}, low {}x{}, elevation {} .. {}",
        grids.high.height(),
        grids.high.width(),
        grids.low.height(),
        grids.low.width(),
        grids.min_elev,
        grids.max_elev
    );

    let grid_info = |grid: &Grid, lod: Lod| GridInfo {
        width: grid.width(),
        height: grid.height(),
        file: lod.file_name().to_string(),
    };
    let meta = Metadata {
        bounds,
        min_elev: grids.min_elev,
        max_elev: grids.max_elev,
        high: grid_info(&grids.high, Lod::High),
        low: grid_info(&grids.low, Lod::Low),
    };

    fs::create_dir_all(out_dir)?;
    let levels = [(Lod::High, &grids.high), (Lod::Low, &grids.low)];
    let meta_path = out_dir.join(META_FILE);
    if let Err(e) = stage(&levels, &meta, &meta_path).and_then(|()| publish(&meta_path)) {
        for lod in [Lod::High, Lod::Low] {
            remove_if_present(&tmp_path(&out_dir.join(lod.file_name())));
        }
        remove_if_present(&tmp_path(&meta_path));
        return Err(e);
    }
    info!("wrote {meta_path:?}");
    Ok(meta)
}

/// Writes every artifact under its temporary name.
fn stage(
    levels: &[(Lod, &Grid)],
    meta: &Metadata,
    meta_path: &Path,
) -> Result<(), ElevationError> {
    let out_dir = meta_path.parent().unwrap_or_else(|| Path::new("."));
    for (lod, grid) in levels {
        grid.write_raw(tmp_path(&out_dir.join(lod.file_name())))?;
    }
    meta.stage(meta_path)?;
    Ok(())
}

/// Moves staged artifacts into place.
///
/// The previous record goes first and the new one is renamed last, so
/// at no point does a `meta.json` sit next to grids it does not
/// describe. An interrupted publish leaves no record at all.
fn publish(meta_path: &Path) -> Result<(), ElevationError> {
    let out_dir = meta_path.parent().unwrap_or_else(|| Path::new("."));
    match fs::remove_file(meta_path) {
        Ok(()) => debug!("removed previous {meta_path:?}"),
        Err(e) if e.kind() == ErrorKind::NotFound => (),
        Err(e) => return Err(e.into()),
    }
    for lod in [Lod::High, Lod::Low] {
        let path = out_dir.join(lod.file_name());
        fs::rename(tmp_path(&path), &path)?;
        info!("wrote {path:?}");
    }
    fs::rename(tmp_path(meta_path), meta_path)?;
    Ok(())
}

fn remove_if_present(path: &Path) {
    if path.is_file() {
        let _ = fs::remove_file(path);
    }
}

/// Checks that the grid files next to `meta_path` agree with it.
///
/// Each file must hold exactly `width × height` samples and every
/// sample must lie within the recorded elevation range.
pub fn verify<P: AsRef<Path>>(meta_path: P) -> Result<Metadata, ElevationError> {
    let meta_path = meta_path.as_ref();
    let meta = Metadata::read(meta_path)?;
    let meta_dir = meta_path.parent().unwrap_or_else(|| Path::new("."));
    for lod in [Lod::High, Lod::Low] {
        let info = meta.grid(lod);
        let grid = Grid::read_raw(meta.grid_path(meta_dir, lod), info.height, info.width)?;
        if let Some(&value) = grid
            .samples()
            .iter()
            .find(|&&v| !(meta.min_elev <= v && v <= meta.max_elev))
        {
            return Err(ElevationError::OutOfRange { lod, value });
        }
        info!(
            "{lod} grid {}x{} ({} samples) ok",
            info.width,
            info.height,
            info.len()
        );
    }
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::{prepare, verify};
    use crate::{ElevationError, SparseMatrix, Triplet};
    use geometa::{Config, Lod, Metadata, FALLBACK_BOUNDS, META_FILE};
    use std::path::PathBuf;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("elevation-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[allow(clippy::cast_precision_loss)]
    fn sparse_terrain(height: usize, width: usize) -> SparseMatrix {
        let mut entries: Vec<Triplet> = (0..height)
            .step_by(7)
            .flat_map(|row| {
                (0..width).step_by(11).map(move |col| Triplet {
                    row,
                    col,
                    value: ((row * 31 + col * 17) % 2500) as f32,
                })
            })
            .collect();
        entries.push(Triplet {
            row: 1,
            col: 1,
            value: f32::NAN,
        });
        SparseMatrix::new((height, width), entries).unwrap()
    }

    #[test]
    fn test_end_to_end() {
        let dir = scratch_dir("e2e");
        let matrix = sparse_terrain(2000, 3000);
        let meta = prepare(&matrix, FALLBACK_BOUNDS, &Config::default(), &dir).unwrap();

        assert_eq!((meta.high.width, meta.high.height), (1024, 683));
        assert_eq!((meta.low.width, meta.low.height), (256, 171));
        assert!(meta.min_elev >= 0.0 && meta.max_elev < 2500.0);

        for lod in [Lod::High, Lod::Low] {
            let info = meta.grid(lod);
            let len = std::fs::metadata(dir.join(&info.file)).unwrap().len();
            assert_eq!(len as usize / 4 / info.height, info.width);
            assert_eq!(len as usize, info.width * info.height * 4);
            assert!(!dir.join(format!("{}.tmp", info.file)).exists());
        }

        assert_eq!(Metadata::read(dir.join(META_FILE)).unwrap(), meta);
        assert_eq!(verify(dir.join(META_FILE)).unwrap(), meta);
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_all_nan_writes_nothing() {
        let dir = scratch_dir("nodata");
        let matrix = SparseMatrix::new(
            (1, 2),
            vec![
                Triplet { row: 0, col: 0, value: f32::NAN },
                Triplet { row: 0, col: 1, value: f32::NAN },
            ],
        )
        .unwrap();
        assert!(matches!(
            prepare(&matrix, FALLBACK_BOUNDS, &Config::default(), &dir),
            Err(ElevationError::NoData)
        ));
        assert!(!dir.join(META_FILE).exists());
    }

    #[test]
    fn test_failed_rerun_keeps_previous_run() {
        let dir = scratch_dir("rerun");
        let config = Config::default();
        let first = prepare(&sparse_terrain(40, 60), FALLBACK_BOUNDS, &config, &dir).unwrap();

        // The metadata can't be staged, so the second run fails after
        // its grids were written.
        let meta_tmp = dir.join(format!("{META_FILE}.tmp"));
        std::fs::create_dir(&meta_tmp).unwrap();
        assert!(prepare(&sparse_terrain(80, 20), FALLBACK_BOUNDS, &config, &dir).is_err());
        for lod in [Lod::High, Lod::Low] {
            assert!(!dir.join(format!("{}.tmp", lod.file_name())).exists());
        }
        assert_eq!(verify(dir.join(META_FILE)).unwrap(), first);

        std::fs::remove_dir(&meta_tmp).unwrap();
        let second = prepare(&sparse_terrain(80, 20), FALLBACK_BOUNDS, &config, &dir).unwrap();
        assert_eq!((second.high.width, second.high.height), (20, 80));
        assert_eq!(verify(dir.join(META_FILE)).unwrap(), second);
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_verify_detects_drift() {
        let dir = scratch_dir("drift");
        let matrix = sparse_terrain(40, 60);
        let mut meta = prepare(&matrix, FALLBACK_BOUNDS, &Config::default(), &dir).unwrap();

        meta.low.width += 1;
        meta.write(dir.join(META_FILE)).unwrap();
        assert!(matches!(
            verify(dir.join(META_FILE)),
            Err(ElevationError::GridLen { .. })
        ));

        meta.low.width -= 1;
        meta.max_elev = meta.min_elev;
        meta.write(dir.join(META_FILE)).unwrap();
        assert!(matches!(
            verify(dir.join(META_FILE)),
            Err(ElevationError::OutOfRange { lod: Lod::High, .. })
        ));
        std::fs::remove_dir_all(dir).unwrap();
    }
}
