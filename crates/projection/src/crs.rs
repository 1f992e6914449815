//! Coordinate reference systems with forward and inverse point transforms.

use serde::{Deserialize, Serialize};

use crate::error::{ProjectionError, Result};
use crate::lambert::LambertConformal;
use crate::mercator::Mercator;

/// Spherical radius used by the CERRA and UWCW grids.
pub const SPHERE_RADIUS: f64 = 6371229.0;

/// WGS84 semi-major axis, used as the Mercator sphere radius.
pub const WGS84_RADIUS: f64 = 6378137.0;

/// A coordinate reference system.
///
/// Serialized as a tagged object, e.g.
/// `{"projection": "lambert_conformal", "central_longitude": 8.0, ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CrsDef", into = "CrsDef")]
pub enum Crs {
    /// Geographic longitude/latitude in degrees.
    PlateCarree { central_longitude: f64 },
    LambertConformal(LambertConformal),
    Mercator(Mercator),
}

impl Crs {
    pub fn plate_carree() -> Self {
        Crs::PlateCarree {
            central_longitude: 0.0,
        }
    }

    pub fn lambert_conformal(
        central_longitude: f64,
        central_latitude: f64,
        standard_parallels: [f64; 2],
        earth_radius: f64,
    ) -> Result<Self> {
        Ok(Crs::LambertConformal(LambertConformal::new(
            central_longitude,
            central_latitude,
            standard_parallels,
            earth_radius,
        )?))
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self, Crs::PlateCarree { .. })
    }

    /// Geographic (lon, lat) to this system's native (x, y).
    pub fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        match self {
            Crs::PlateCarree { central_longitude } => (wrap_180(lon - central_longitude), lat),
            Crs::LambertConformal(p) => p.forward(lon, lat),
            Crs::Mercator(p) => p.forward(lon, lat),
        }
    }

    /// Native (x, y) to geographic (lon, lat).
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Crs::PlateCarree { central_longitude } => (wrap_180(x + central_longitude), y),
            Crs::LambertConformal(p) => p.inverse(x, y),
            Crs::Mercator(p) => p.inverse(x, y),
        }
    }

    /// Transform one point given in `src` coordinates into this system.
    pub fn transform_point(&self, x: f64, y: f64, src: &Crs) -> (f64, f64) {
        let (lon, lat) = src.inverse(x, y);
        self.forward(lon, lat)
    }

    /// Transform many points given in `src` coordinates into this system.
    ///
    /// Returns `(x, y, z)` triples; `z` is always zero for these 2-D systems.
    pub fn transform_points(&self, xs: &[f64], ys: &[f64], src: &Crs) -> Result<Vec<[f64; 3]>> {
        if xs.len() != ys.len() {
            return Err(ProjectionError::LengthMismatch(xs.len(), ys.len()));
        }
        Ok(xs
            .iter()
            .zip(ys)
            .map(|(&x, &y)| {
                let (px, py) = self.transform_point(x, y, src);
                [px, py, 0.0]
            })
            .collect())
    }
}

fn wrap_180(mut lon: f64) -> f64 {
    while lon > 180.0 {
        lon -= 360.0;
    }
    while lon < -180.0 {
        lon += 360.0;
    }
    lon
}

fn default_sphere() -> f64 {
    SPHERE_RADIUS
}

fn default_wgs84() -> f64 {
    WGS84_RADIUS
}

// Parameters in degrees as written in configuration and attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "projection", rename_all = "snake_case")]
enum CrsDef {
    #[serde(alias = "latlon")]
    PlateCarree {
        #[serde(default)]
        central_longitude: f64,
    },
    #[serde(alias = "lcc")]
    LambertConformal {
        central_longitude: f64,
        central_latitude: f64,
        standard_parallels: [f64; 2],
        #[serde(default = "default_sphere")]
        earth_radius: f64,
    },
    Mercator {
        #[serde(default)]
        central_longitude: f64,
        #[serde(default = "default_wgs84")]
        earth_radius: f64,
    },
}

impl TryFrom<CrsDef> for Crs {
    type Error = ProjectionError;

    fn try_from(def: CrsDef) -> Result<Self> {
        match def {
            CrsDef::PlateCarree { central_longitude } => Ok(Crs::PlateCarree { central_longitude }),
            CrsDef::LambertConformal {
                central_longitude,
                central_latitude,
                standard_parallels,
                earth_radius,
            } => Crs::lambert_conformal(central_longitude, central_latitude, standard_parallels, earth_radius),
            CrsDef::Mercator {
                central_longitude,
                earth_radius,
            } => Ok(Crs::Mercator(Mercator::new(central_longitude, earth_radius))),
        }
    }
}

impl From<Crs> for CrsDef {
    fn from(crs: Crs) -> Self {
        let to_deg = 180.0 / std::f64::consts::PI;
        match crs {
            Crs::PlateCarree { central_longitude } => CrsDef::PlateCarree { central_longitude },
            Crs::LambertConformal(p) => CrsDef::LambertConformal {
                central_longitude: p.lon0 * to_deg,
                central_latitude: p.lat0 * to_deg,
                standard_parallels: [p.latin1 * to_deg, p.latin2 * to_deg],
                earth_radius: p.earth_radius,
            },
            Crs::Mercator(p) => CrsDef::Mercator {
                central_longitude: p.central_longitude,
                earth_radius: p.earth_radius,
            },
        }
    }
}
