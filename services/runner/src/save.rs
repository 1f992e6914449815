//! Output naming for aligned datasets.
//!
//! No file is written: the runner only reports where each dataset would
//! be saved.

use std::collections::{BTreeMap, HashMap};

use align_common::names::{REFERENCE_TIME, VALID_TIME};
use align_common::{properties_of, Dataset, Timestamp};
use anyhow::{anyhow, Context, Result};
use chrono::Datelike;
use ingestion::{Pattern, PatternValue};

/// The year, month and day a dataset is named after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

/// Most frequent value of `key`, the smallest on ties.
fn most_frequent<K: Ord + Copy>(times: &[Timestamp], key: impl Fn(&Timestamp) -> K) -> Option<K> {
    let mut counts: BTreeMap<K, usize> = BTreeMap::new();
    for t in times {
        *counts.entry(key(t)).or_default() += 1;
    }
    let max = counts.values().copied().max()?;
    counts.into_iter().find(|(_, n)| *n == max).map(|(k, _)| k)
}

/// The most frequent year of a dataset's times, then the most frequent
/// month within that year, then the most frequent day within that month.
///
/// Forecasts are dated by `reference_time`, observations by `valid_time`.
pub fn dominant_date(ds: &Dataset) -> Result<SaveDate> {
    let coord_name = if properties_of(ds)?.is_forecast() { REFERENCE_TIME } else { VALID_TIME };
    let coord = ds
        .coord(coord_name)
        .ok_or_else(|| anyhow!("Dataset has no '{}' coordinate to date it by", coord_name))?;
    let times: Vec<Timestamp> = coord
        .values
        .as_time()
        .ok_or_else(|| anyhow!("'{}' is not a time coordinate", coord_name))?
        .iter()
        .flatten()
        .copied()
        .collect();

    let year = most_frequent(&times, |t| t.year()).ok_or_else(|| anyhow!("'{}' holds no times", coord_name))?;
    let times: Vec<Timestamp> = times.into_iter().filter(|t| t.year() == year).collect();
    let month = most_frequent(&times, |t| t.month()).ok_or_else(|| anyhow!("no times in {}", year))?;
    let times: Vec<Timestamp> = times.into_iter().filter(|t| t.month() == month).collect();
    let day = most_frequent(&times, |t| t.day()).ok_or_else(|| anyhow!("no times in {}-{}", year, month))?;
    Ok(SaveDate { year, month, day })
}

/// Fill `{name}`, `{year}`, `{month}` and `{day}` of `template`.
pub fn output_path(template: &str, name: &str, ds: &Dataset) -> Result<String> {
    let date = dominant_date(ds).with_context(|| format!("Cannot name output of '{}'", name))?;
    let values = HashMap::from([
        ("name", PatternValue::Text(name.to_string())),
        ("year", PatternValue::Int(date.year as i64)),
        ("month", PatternValue::Int(date.month as i64)),
        ("day", PatternValue::Int(date.day as i64)),
    ]);
    let path = Pattern::parse(template)?.render(&values)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use align_common::Coordinate;
    use chrono::{TimeZone, Utc};
    use test_utils::point_observation;

    fn at(y: i32, m: u32, d: u32) -> Timestamp {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn observation_at(times: Vec<Timestamp>) -> Dataset {
        let hours: Vec<i64> = (0..times.len() as i64).collect();
        let mut ds = point_observation(&hours, &[(0.0, 0.0)]);
        ds.assign_coord(VALID_TIME, Coordinate::times(VALID_TIME, times)).unwrap();
        ds
    }

    #[test]
    fn test_dominant_date_nested_modes() {
        // 2023 wins on count; within it February, within that the 3rd.
        let ds = observation_at(vec![
            at(2022, 5, 1),
            at(2023, 1, 9),
            at(2023, 2, 3),
            at(2023, 2, 3),
            at(2023, 2, 4),
        ]);
        assert_eq!(
            dominant_date(&ds).unwrap(),
            SaveDate {
                year: 2023,
                month: 2,
                day: 3
            }
        );
    }

    #[test]
    fn test_ties_take_earliest() {
        let ds = observation_at(vec![at(2024, 3, 2), at(2024, 3, 1)]);
        assert_eq!(dominant_date(&ds).unwrap().day, 1);
    }

    #[test]
    fn test_output_path() {
        let ds = observation_at(vec![at(2024, 3, 7)]);
        assert_eq!(
            output_path("out/{name}/{year}{month:02}{day:02}.json", "stations", &ds).unwrap(),
            "out/stations/20240307.json"
        );
        assert!(output_path("out/{member}.json", "stations", &ds).is_err());
    }
}
