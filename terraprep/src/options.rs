use basemap::HttpTileSource;
use clap::{Args, Parser, Subcommand};
use geometa::{Config, GeoBounds};
use std::path::PathBuf;

/// Prepare aligned elevation grids and a base map for a terrain
/// renderer.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the height grids and their metadata.
    #[arg(short, long, global = true, default_value = "data")]
    pub out_dir: PathBuf,

    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// Slippy-map zoom level of the base map.
    #[arg(short, long, global = true, default_value_t = Config::default().zoom)]
    pub zoom: u8,

    /// Edge length of one map tile in pixels.
    #[arg(long, global = true, default_value_t = Config::default().tile_size)]
    pub tile_size: u32,

    /// Cap on either dimension of the high resolution grid.
    #[arg(long, global = true, default_value_t = Config::default().max_high_res)]
    pub max_high_res: usize,

    /// Coarsening ratio between the high and low resolution grids.
    #[arg(long, global = true, default_value_t = Config::default().low_factor)]
    pub low_factor: usize,
}

impl From<&ConfigArgs> for Config {
    fn from(args: &ConfigArgs) -> Self {
        Self {
            zoom: args.zoom,
            tile_size: args.tile_size,
            max_high_res: args.max_high_res,
            low_factor: args.low_factor,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Convert a sparse elevation matrix into high and low resolution
    /// height grids.
    Elevation(Elevation),

    /// Stitch and crop a base map covering the prepared grids.
    Map(Map),

    /// Check the prepared grids against their metadata.
    Verify,
}

#[derive(Debug, Clone, Args)]
pub struct Elevation {
    /// Sparse matrix written by scipy.sparse.save_npz, in csr, csc,
    /// coo, bsr or dia format.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Geographic extent of the matrix, "lat_min,lat_max,lon_min,lon_max".
    #[arg(short, long)]
    pub bounds: Option<GeoBounds>,
}

#[derive(Debug, Clone, Args)]
pub struct Map {
    /// Tile URL template containing {z}, {x} and {y} [default:
    /// OpenStreetMap].
    #[arg(long, conflicts_with = "tile_dir")]
    pub tile_url: Option<String>,

    /// Read tiles from a local {z}/{x}/{y}.png tree instead of HTTP.
    #[arg(long)]
    pub tile_dir: Option<PathBuf>,

    /// User agent sent with tile requests.
    #[arg(long, default_value = concat!("terraprep/", env!("CARGO_PKG_VERSION")))]
    pub user_agent: String,

    /// Output image, `<out-dir>/map.png` if omitted. The encoding
    /// follows the extension.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

impl Map {
    pub fn tile_url(&self) -> &str {
        self.tile_url.as_deref().unwrap_or(HttpTileSource::OSM_URL)
    }
}
