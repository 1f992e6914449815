//! Common test fixtures for alignment tests.
//!
//! Fixed times and locations so that expected values in tests can be
//! written down by hand.

use chrono::{DateTime, Duration, TimeZone, Utc};

/// Base time every synthetic time axis is measured from: 2024-01-01T00Z.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// `t0 + h` hours.
pub fn at_hour(h: i64) -> DateTime<Utc> {
    t0() + Duration::hours(h)
}

pub fn hours(h: i64) -> Duration {
    Duration::hours(h)
}

pub fn times(hs: &[i64]) -> Vec<DateTime<Utc>> {
    hs.iter().map(|&h| at_hour(h)).collect()
}

pub fn leads(hs: &[i64]) -> Vec<Duration> {
    hs.iter().map(|&h| hours(h)).collect()
}

/// Station locations as (latitude, longitude).
pub mod stations {
    /// Three stations inside the unit-spaced 4x5 grid at the origin.
    pub const INSIDE: [(f64, f64); 3] = [(0.5, 0.5), (1.25, 2.75), (2.0, 3.0)];

    /// A station far outside every synthetic grid.
    pub const OUTSIDE: (f64, f64) = (45.0, -120.0);

    /// Oslo (Blindern), Bergen (Florida), Tromsø.
    pub const NORWAY: [(f64, f64); 3] = [(59.9423, 10.72), (60.383, 5.3327), (69.6537, 18.9373)];
}

/// Forecast cycles used across time-alignment tests.
pub mod cycles {
    /// Four 6-hourly cycles starting at t0.
    pub const SIX_HOURLY: [i64; 4] = [0, 6, 12, 18];

    /// Three-hourly lead times out to 6 h.
    pub const LEADS_0_3_6: [i64; 3] = [0, 3, 6];
}
