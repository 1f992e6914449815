//! Spherical Mercator projection.

use std::f64::consts::PI;

/// Latitude limit beyond which Mercator y diverges.
const MAX_LAT: f64 = 89.5;

#[derive(Debug, Clone, PartialEq)]
pub struct Mercator {
    /// Central meridian in degrees
    pub central_longitude: f64,
    /// Sphere radius (metres)
    pub earth_radius: f64,
}

impl Mercator {
    pub fn new(central_longitude: f64, earth_radius: f64) -> Self {
        Self {
            central_longitude,
            earth_radius,
        }
    }

    /// Geographic (lon, lat in degrees) to projected (x, y in metres).
    pub fn forward(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let to_rad = PI / 180.0;
        let mut dlon = lon_deg - self.central_longitude;
        while dlon > 180.0 {
            dlon -= 360.0;
        }
        while dlon < -180.0 {
            dlon += 360.0;
        }
        let lat = lat_deg.clamp(-MAX_LAT, MAX_LAT) * to_rad;
        let x = self.earth_radius * dlon * to_rad;
        let y = self.earth_radius * (PI / 4.0 + lat / 2.0).tan().ln();
        (x, y)
    }

    /// Projected (x, y in metres) to geographic (lon, lat in degrees).
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let to_deg = 180.0 / PI;
        let lon = self.central_longitude + (x / self.earth_radius) * to_deg;
        let lat = (2.0 * (y / self.earth_radius).exp().atan() - PI / 2.0) * to_deg;
        (lon, lat)
    }
}
