//! The contract shared by the elevation and base-map pipelines.
//!
//! The elevation pipeline writes a [`Metadata`] record once; the map
//! pipeline only ever reads it. Nothing else passes between them.

mod bounds;
mod config;
mod error;
mod meta;

pub use crate::{
    bounds::{GeoBounds, FALLBACK_BOUNDS},
    config::{Config, MAX_ZOOM},
    error::MetaError,
    meta::{GridInfo, Lod, Metadata, META_FILE},
};
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

/// Returns the sibling path artifacts are staged at before being
/// renamed into place.
pub fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(OsString::new, std::ffi::OsStr::to_os_string);
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::tmp_path;
    use std::path::Path;

    #[test]
    fn test_tmp_path() {
        assert_eq!(
            tmp_path(Path::new("data/map.png")),
            Path::new("data/map.png.tmp")
        );
    }
}
