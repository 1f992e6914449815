//! Lambert Conformal Conic projection on a sphere.
//!
//! Used by the CERRA and UWCW regional reanalysis/forecast grids.
//! It maps a cone tangent or secant to the Earth's surface onto a flat plane.
//!
//! The projection parameters are:
//! - Central meridian (lon0) and latitude of origin (lat0)
//! - Standard parallel(s): latin1 and latin2 (equal for a tangent cone)
//! - Sphere radius in metres
//!
//! Projected coordinates are metres from the origin, without false
//! easting or northing.

use std::f64::consts::PI;

use crate::error::{ProjectionError, Result};

/// Lambert Conformal Conic projection with precomputed cone constants.
#[derive(Debug, Clone, PartialEq)]
pub struct LambertConformal {
    /// Central meridian in radians
    pub lon0: f64,
    /// Latitude of origin in radians
    pub lat0: f64,
    /// First standard parallel in radians
    pub latin1: f64,
    /// Second standard parallel in radians
    pub latin2: f64,
    /// Sphere radius (metres)
    pub earth_radius: f64,
    /// Cone constant (n)
    n: f64,
    /// F constant
    f: f64,
    /// Rho at the latitude of origin
    rho0: f64,
}

impl LambertConformal {
    /// Create a projection from parameters in degrees.
    pub fn new(
        central_longitude: f64,
        central_latitude: f64,
        standard_parallels: [f64; 2],
        earth_radius: f64,
    ) -> Result<Self> {
        let to_rad = PI / 180.0;
        let lon0 = central_longitude * to_rad;
        let lat0 = central_latitude * to_rad;
        let latin1 = standard_parallels[0] * to_rad;
        let latin2 = standard_parallels[1] * to_rad;

        if earth_radius <= 0.0 {
            return Err(ProjectionError::InvalidParameters(format!(
                "earth radius must be positive, got {}",
                earth_radius
            )));
        }

        // Compute cone constant n
        let n = if (latin1 - latin2).abs() < 1e-10 {
            // Tangent cone
            latin1.sin()
        } else {
            // Secant cone
            let ln_ratio = (latin1.cos() / latin2.cos()).ln();
            let tan_ratio = ((PI / 4.0 + latin2 / 2.0).tan() / (PI / 4.0 + latin1 / 2.0).tan()).ln();
            ln_ratio / tan_ratio
        };
        if n.abs() < 1e-12 || !n.is_finite() {
            return Err(ProjectionError::InvalidParameters(
                "standard parallels give a degenerate cone".to_string(),
            ));
        }

        let f = (latin1.cos() * (PI / 4.0 + latin1 / 2.0).tan().powf(n)) / n;
        let rho0 = earth_radius * f / (PI / 4.0 + lat0 / 2.0).tan().powf(n);

        Ok(Self {
            lon0,
            lat0,
            latin1,
            latin2,
            earth_radius,
            n,
            f,
            rho0,
        })
    }

    /// Geographic (lon, lat in degrees) to projected (x, y in metres).
    pub fn forward(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let to_rad = PI / 180.0;
        let lat = lat_deg * to_rad;
        let dlon = wrap_pi(lon_deg * to_rad - self.lon0);

        let rho = self.earth_radius * self.f / (PI / 4.0 + lat / 2.0).tan().powf(self.n);
        let theta = self.n * dlon;

        (rho * theta.sin(), self.rho0 - rho * theta.cos())
    }

    /// Projected (x, y in metres) to geographic (lon, lat in degrees).
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let to_deg = 180.0 / PI;
        let dy = self.rho0 - y;

        let mut rho = (x * x + dy * dy).sqrt();
        let theta = if self.n < 0.0 {
            rho = -rho;
            (-x).atan2(-dy)
        } else {
            x.atan2(dy)
        };

        let lat = 2.0 * ((self.earth_radius * self.f / rho).powf(1.0 / self.n)).atan() - PI / 2.0;
        let lon = wrap_pi(self.lon0 + theta / self.n);

        (lon * to_deg, lat * to_deg)
    }
}

/// Normalize an angle to [-π, π].
fn wrap_pi(mut angle: f64) -> f64 {
    while angle > PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cerra() -> LambertConformal {
        LambertConformal::new(8.0, 50.0, [50.0, 50.0], 6371229.0).unwrap()
    }

    #[test]
    fn test_origin_maps_to_zero() {
        let proj = cerra();
        let (x, y) = proj.forward(8.0, 50.0);
        assert!(x.abs() < 1e-6, "x should be ~0, got {}", x);
        assert!(y.abs() < 1e-6, "y should be ~0, got {}", y);
    }

    #[test]
    fn test_roundtrip() {
        let proj = cerra();
        for (lon, lat) in [(-17.4859, 20.2923), (74.1051, 63.7695), (4.9, 52.4)] {
            let (x, y) = proj.forward(lon, lat);
            let (lon2, lat2) = proj.inverse(x, y);
            assert!((lon - lon2).abs() < 1e-8, "lon roundtrip failed: {} vs {}", lon, lon2);
            assert!((lat - lat2).abs() < 1e-8, "lat roundtrip failed: {} vs {}", lat, lat2);
        }
    }

    #[test]
    fn test_east_is_positive_x() {
        let proj = cerra();
        let (x_east, _) = proj.forward(12.0, 50.0);
        let (_, y_north) = proj.forward(8.0, 55.0);
        assert!(x_east > 0.0);
        assert!(y_north > 0.0);
    }

    #[test]
    fn test_secant_cone() {
        let proj = LambertConformal::new(-97.5, 38.5, [33.0, 45.0], 6371229.0).unwrap();
        let (x, y) = proj.forward(-90.0, 40.0);
        let (lon, lat) = proj.inverse(x, y);
        assert!((lon + 90.0).abs() < 1e-8);
        assert!((lat - 40.0).abs() < 1e-8);
    }

    #[test]
    fn test_degenerate_cone_rejected() {
        assert!(LambertConformal::new(0.0, 0.0, [0.0, 0.0], 6371229.0).is_err());
    }
}
