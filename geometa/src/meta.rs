use crate::{tmp_path, GeoBounds, MetaError};
use log::debug;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    fs::{self, File},
    io::{BufReader, BufWriter, ErrorKind, Write},
    path::{Path, PathBuf},
};

/// Default file name of the metadata record.
pub const META_FILE: &str = "meta.json";

/// Level of detail of an elevation grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lod {
    High,
    Low,
}

impl Lod {
    /// File name the elevation pipeline writes this level to.
    pub fn file_name(self) -> &'static str {
        match self {
            Lod::High => "heights_high.bin",
            Lod::Low => "heights_low.bin",
        }
    }
}

impl fmt::Display for Lod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lod::High => f.write_str("high"),
            Lod::Low => f.write_str("low"),
        }
    }
}

/// Dimensions and location of one raw elevation grid file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridInfo {
    pub width: usize,
    pub height: usize,

    /// File name, relative to the directory holding the metadata.
    pub file: String,
}

impl GridInfo {
    /// Returns the number of samples in the grid.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.width * self.height
    }
}

/// The record both pipelines agree on.
///
/// Serialized as a flat JSON object:
///
/// ```json
/// {
///   "lat_min": 5.0, "lat_max": 9.0, "lon_min": 78.0, "lon_max": 82.0,
///   "min_elev": -3.0, "max_elev": 2510.0,
///   "high": { "width": 1024, "height": 683, "file": "heights_high.bin" },
///   "low": { "width": 256, "height": 171, "file": "heights_low.bin" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(flatten)]
    pub bounds: GeoBounds,
    pub min_elev: f32,
    pub max_elev: f32,
    pub high: GridInfo,
    pub low: GridInfo,
}

impl Metadata {
    /// Reads and validates the record at `path`.
    ///
    /// A missing file is reported as [`MetaError::Missing`]; there are
    /// no default bounds to fall back on.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, MetaError> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(MetaError::Missing(path.to_owned()))
            }
            Err(e) => return Err(e.into()),
        };
        let meta: Self = serde_json::from_reader(BufReader::new(file))?;
        meta.bounds.validate()?;
        debug!("read {path:?}");
        Ok(meta)
    }

    /// Writes the record to `path`.
    ///
    /// The file only appears under its final name once fully written.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), MetaError> {
        let path = path.as_ref();
        let tmp = self.stage(path)?;
        fs::rename(&tmp, path)?;
        debug!("wrote {path:?}");
        Ok(())
    }

    /// Writes the record next to `path` under its temporary name and
    /// returns that name.
    ///
    /// Callers that must publish other files together with the record
    /// rename it into place themselves. A partially written temporary
    /// file is removed before returning an error.
    pub fn stage<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf, MetaError> {
        let tmp = tmp_path(path.as_ref());
        let written = File::create(&tmp)
            .map_err(MetaError::from)
            .and_then(|file| {
                let mut wtr = BufWriter::new(file);
                serde_json::to_writer_pretty(&mut wtr, self)?;
                wtr.write_all(b"\n")?;
                wtr.flush()?;
                Ok(())
            });
        if let Err(e) = written {
            if tmp.is_file() {
                let _ = fs::remove_file(&tmp);
            }
            return Err(e);
        }
        Ok(tmp)
    }

    pub fn grid(&self, lod: Lod) -> &GridInfo {
        match lod {
            Lod::High => &self.high,
            Lod::Low => &self.low,
        }
    }

    /// Resolves the grid file for `lod` against the metadata's
    /// directory.
    pub fn grid_path(&self, meta_dir: &Path, lod: Lod) -> PathBuf {
        meta_dir.join(&self.grid(lod).file)
    }
}

#[cfg(test)]
mod tests {
    use super::{GridInfo, Lod, MetaError, Metadata};
    use crate::FALLBACK_BOUNDS;
    use std::path::PathBuf;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("geometa-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn sample() -> Metadata {
        Metadata {
            bounds: FALLBACK_BOUNDS,
            min_elev: -3.5,
            max_elev: 2510.25,
            high: GridInfo {
                width: 1024,
                height: 683,
                file: Lod::High.file_name().into(),
            },
            low: GridInfo {
                width: 256,
                height: 171,
                file: Lod::Low.file_name().into(),
            },
        }
    }

    #[test]
    fn test_field_names() {
        let value = serde_json::to_value(sample()).unwrap();
        for key in [
            "lat_min", "lat_max", "lon_min", "lon_max", "min_elev", "max_elev", "high", "low",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["high"]["width"], 1024);
        assert_eq!(value["high"]["height"], 683);
        assert_eq!(value["low"]["file"], "heights_low.bin");
        assert_eq!(value["lat_min"], 5.0);
    }

    #[test]
    fn test_write_then_read() {
        let dir = scratch_dir("rw");
        let path = dir.join("meta.json");
        let meta = sample();
        meta.write(&path).unwrap();
        assert!(!dir.join("meta.json.tmp").exists());
        assert_eq!(Metadata::read(&path).unwrap(), meta);
        assert_eq!(
            meta.grid_path(&dir, Lod::Low),
            dir.join("heights_low.bin")
        );
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_missing_is_precondition_error() {
        let path = scratch_dir("missing").join("nope.json");
        assert!(matches!(Metadata::read(&path), Err(MetaError::Missing(p)) if p == path));
    }

    #[test]
    fn test_rejects_invalid_bounds() {
        let dir = scratch_dir("invalid");
        let path = dir.join("meta.json");
        let mut value = serde_json::to_value(sample()).unwrap();
        value["lat_min"] = 10.0.into();
        std::fs::write(&path, value.to_string()).unwrap();
        assert!(matches!(Metadata::read(&path), Err(MetaError::Bounds(_))));
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_accepts_integer_bounds() {
        let dir = scratch_dir("ints");
        let path = dir.join("meta.json");
        std::fs::write(
            &path,
            r#"{"lat_min": 5, "lat_max": 9, "lon_min": 78, "lon_max": 82,
                "min_elev": 0.0, "max_elev": 1.0,
                "high": {"width": 2, "height": 3, "file": "heights_high.bin"},
                "low": {"width": 1, "height": 1, "file": "heights_low.bin"}}"#,
        )
        .unwrap();
        let meta = Metadata::read(&path).unwrap();
        assert_eq!(meta.bounds, crate::FALLBACK_BOUNDS);
        assert_eq!(meta.high.len(), 6);
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_stage_leaves_final_name_alone() {
        let dir = scratch_dir("stage");
        let path = dir.join("meta.json");
        let tmp = sample().stage(&path).unwrap();
        assert_eq!(tmp, dir.join("meta.json.tmp"));
        assert!(!path.exists());
        std::fs::rename(&tmp, &path).unwrap();
        assert_eq!(Metadata::read(&path).unwrap(), sample());

        // An unwritable staging name fails without touching the record.
        std::fs::create_dir(&tmp).unwrap();
        assert!(matches!(sample().stage(&path), Err(MetaError::Io(_))));
        assert!(tmp.is_dir());
        assert_eq!(Metadata::read(&path).unwrap(), sample());
        std::fs::remove_dir_all(dir).unwrap();
    }
}
