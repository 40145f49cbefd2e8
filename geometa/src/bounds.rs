use crate::MetaError;
use geo::geometry::Coord;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Region assumed when the elevation source carries no coordinates.
///
/// Roughly Sri Lanka. Only ever used as an explicit, logged fallback.
pub const FALLBACK_BOUNDS: GeoBounds = GeoBounds {
    lat_min: 5.0,
    lat_max: 9.0,
    lon_min: 78.0,
    lon_max: 82.0,
};

/// A lat/lon bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl GeoBounds {
    pub fn new(lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> Result<Self, MetaError> {
        let bounds = Self {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
        };
        bounds.validate()?;
        Ok(bounds)
    }

    /// Checks ordering and range of all four edges.
    ///
    /// Latitudes must be strictly inside (-90, 90) since Web Mercator
    /// is undefined at the poles.
    pub fn validate(&self) -> Result<(), MetaError> {
        let Self {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
        } = *self;
        let fail = |msg: String| Err(MetaError::Bounds(msg));
        if ![lat_min, lat_max, lon_min, lon_max]
            .iter()
            .all(|v| v.is_finite())
        {
            return fail(format!("non-finite edge in {self}"));
        }
        if lat_min >= lat_max {
            return fail(format!("lat_min {lat_min} >= lat_max {lat_max}"));
        }
        if lon_min >= lon_max {
            return fail(format!("lon_min {lon_min} >= lon_max {lon_max}"));
        }
        if lat_min <= -90.0 || lat_max >= 90.0 {
            return fail(format!("latitudes {lat_min}..{lat_max} reach a pole"));
        }
        if lon_min < -180.0 || lon_max > 180.0 {
            return fail(format!("longitudes {lon_min}..{lon_max} outside [-180, 180]"));
        }
        Ok(())
    }

    /// Southwest corner, `x` = lon, `y` = lat.
    pub fn sw(&self) -> Coord<f64> {
        Coord {
            x: self.lon_min,
            y: self.lat_min,
        }
    }

    /// Northeast corner, `x` = lon, `y` = lat.
    pub fn ne(&self) -> Coord<f64> {
        Coord {
            x: self.lon_max,
            y: self.lat_max,
        }
    }
}

impl fmt::Display for GeoBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lat {}..{}, lon {}..{}",
            self.lat_min, self.lat_max, self.lon_min, self.lon_max
        )
    }
}

/// Parses `"lat_min,lat_max,lon_min,lon_max"`.
impl FromStr for GeoBounds {
    type Err = MetaError;

    fn from_str(s: &str) -> Result<Self, MetaError> {
        let edges = s
            .split(',')
            .map(|part| f64::from_str(part.trim()))
            .collect::<Result<Vec<f64>, _>>()
            .map_err(|e| MetaError::Bounds(format!("{s:?}: {e}")))?;
        match edges[..] {
            [lat_min, lat_max, lon_min, lon_max] => Self::new(lat_min, lat_max, lon_min, lon_max),
            _ => Err(MetaError::Bounds(format!(
                "{s:?}: expected lat_min,lat_max,lon_min,lon_max"
            ))),
        }
    }
}
