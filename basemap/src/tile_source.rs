//! Where map tiles come from.

use crate::{BasemapError, TileId};
use image::RgbImage;
use log::debug;
use reqwest::blocking::Client;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

/// Fetches the raster for one slippy-map tile.
///
/// Any error is fatal to the compositing run that requested the tile.
pub trait TileSource {
    fn fetch(&self, tile: TileId) -> Result<RgbImage, BasemapError>;
}

impl<T: TileSource + ?Sized> TileSource for &T {
    fn fetch(&self, tile: TileId) -> Result<RgbImage, BasemapError> {
        (**self).fetch(tile)
    }
}

/// Tiles served over HTTP(S) from a `{z}/{x}/{y}` URL template.
pub struct HttpTileSource {
    client: Client,
    url_template: String,
}

impl HttpTileSource {
    /// Standard OpenStreetMap tile server.
    pub const OSM_URL: &'static str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

    const TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(url_template: impl Into<String>, user_agent: &str) -> Result<Self, BasemapError> {
        let url_template = url_template.into();
        if !["{z}", "{x}", "{y}"]
            .iter()
            .all(|key| url_template.contains(key))
        {
            return Err(BasemapError::UrlTemplate(url_template));
        }
        let client = Client::builder()
            .timeout(Self::TIMEOUT)
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            url_template,
        })
    }

    fn url(&self, TileId { z, x, y }: TileId) -> String {
        self.url_template
            .replace("{z}", &z.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
    }
}

impl TileSource for HttpTileSource {
    fn fetch(&self, tile: TileId) -> Result<RgbImage, BasemapError> {
        let url = self.url(tile);
        debug!("fetching {url}");
        let response = self.client.get(&url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(BasemapError::Status {
                tile,
                status: status.as_u16(),
            });
        }
        decode(&response.bytes()?)
    }
}

/// Tiles already on disk, laid out as `{dir}/{z}/{x}/{y}.png`.
#[derive(Debug, Clone)]
pub struct DirTileSource {
    /// Root of the tile tree.
    tile_dir: PathBuf,
}

impl DirTileSource {
    pub fn new(tile_dir: PathBuf) -> Result<Self, BasemapError> {
        // Fail early rather than on the first tile.
        if tile_dir.is_dir() {
            Ok(Self { tile_dir })
        } else {
            Err(BasemapError::TileDir(tile_dir))
        }
    }

    fn tile_path(&self, TileId { z, x, y }: TileId) -> PathBuf {
        [
            self.tile_dir.as_path(),
            Path::new(&z.to_string()),
            Path::new(&x.to_string()),
            Path::new(&format!("{y}.png")),
        ]
        .iter()
        .collect()
    }
}

impl TileSource for DirTileSource {
    fn fetch(&self, tile: TileId) -> Result<RgbImage, BasemapError> {
        let path = self.tile_path(tile);
        debug!("loading {path:?}");
        match std::fs::read(&path) {
            Ok(bytes) => decode(&bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(BasemapError::MissingTile(tile, path)),
            Err(e) => Err(e.into()),
        }
    }
}

fn decode(bytes: &[u8]) -> Result<RgbImage, BasemapError> {
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}
