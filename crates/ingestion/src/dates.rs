//! Forecast cycle date sets and file-path expansion.

use std::collections::{BTreeSet, HashMap};

use align_common::{AlignError, Result, Timestamp};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::pattern::{Pattern, PatternValue};

pub const REFERENCE_TIME_FIELD: &str = "reference_time";
pub const VALID_TIME_FIELD: &str = "valid_time";
pub const LEAD_TIME_FIELD: &str = "lead_time";

/// Date settings as written in a run configuration. Every key is optional
/// so that per-dataset settings can override global ones key by key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatesConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
}

impl DatesConfig {
    /// `self` with every key set in `overrides` replaced.
    pub fn merged(&self, overrides: &DatesConfig) -> DatesConfig {
        DatesConfig {
            start: overrides.start.clone().or_else(|| self.start.clone()),
            end: overrides.end.clone().or_else(|| self.end.clone()),
            period: overrides.period.clone().or_else(|| self.period.clone()),
            range: overrides.range.clone().or_else(|| self.range.clone()),
            step: overrides.step.clone().or_else(|| self.step.clone()),
        }
    }
}

fn required<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| AlignError::configuration(format!("dates: missing '{}'", key)))
}

/// Forecast cycles from `start` to `end` every `period`, each with lead
/// times `0..=range` every `step`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dates {
    reference_times: BTreeSet<Timestamp>,
    lead_times: BTreeSet<Duration>,
    valid_times: BTreeSet<Timestamp>,
}

impl Dates {
    pub fn new(start: Timestamp, end: Timestamp, period: Duration, range: Duration, step: Duration) -> Result<Self> {
        if period <= Duration::zero() || step <= Duration::zero() {
            return Err(AlignError::configuration("dates: period and step must be positive"));
        }
        if range < Duration::zero() {
            return Err(AlignError::configuration("dates: range must not be negative"));
        }
        if end < start {
            return Err(AlignError::configuration(format!(
                "dates: end {} is before start {}",
                end, start
            )));
        }

        let mut lead_times = BTreeSet::new();
        let mut lead = Duration::zero();
        while lead <= range {
            lead_times.insert(lead);
            lead = lead + step;
        }

        let mut reference_times = BTreeSet::new();
        let mut valid_times = BTreeSet::new();
        let mut date = start;
        while date <= end {
            reference_times.insert(date);
            valid_times.extend(lead_times.iter().map(|&l| date + l));
            date = date + period;
        }

        Ok(Self {
            reference_times,
            lead_times,
            valid_times,
        })
    }

    pub fn from_config(config: &DatesConfig) -> Result<Self> {
        Self::new(
            parse_timestamp(required(&config.start, "start")?)?,
            parse_timestamp(required(&config.end, "end")?)?,
            parse_duration(required(&config.period, "period")?)?,
            parse_duration(required(&config.range, "range")?)?,
            parse_duration(required(&config.step, "step")?)?,
        )
    }

    pub fn reference_times(&self) -> &BTreeSet<Timestamp> {
        &self.reference_times
    }

    pub fn lead_times(&self) -> &BTreeSet<Duration> {
        &self.lead_times
    }

    pub fn valid_times(&self) -> &BTreeSet<Timestamp> {
        &self.valid_times
    }

    /// Expand `template` over every combination of the date fields it
    /// contains. Lead times are substituted as whole hours.
    pub fn substitute(&self, template: &str) -> Result<Vec<String>> {
        let pattern = Pattern::parse(template)?;
        let mut axes: Vec<(&str, Vec<PatternValue>)> = Vec::new();
        for name in pattern.names() {
            let values = match name {
                REFERENCE_TIME_FIELD => self.reference_times.iter().map(|&t| PatternValue::Time(t)).collect(),
                VALID_TIME_FIELD => self.valid_times.iter().map(|&t| PatternValue::Time(t)).collect(),
                LEAD_TIME_FIELD => self
                    .lead_times
                    .iter()
                    .map(|l| PatternValue::Int(l.num_hours()))
                    .collect(),
                other => {
                    return Err(AlignError::configuration(format!(
                        "unknown field '{}' in file pattern '{}'",
                        other, template
                    )))
                }
            };
            axes.push((name, values));
        }

        let mut paths = BTreeSet::new();
        let mut current: HashMap<&str, PatternValue> = HashMap::new();
        expand(&pattern, &axes, &mut current, &mut paths)?;
        Ok(paths.into_iter().collect())
    }

    /// [`Dates::substitute`] over several templates, sorted and deduplicated.
    pub fn substitute_all<S: AsRef<str>>(&self, templates: &[S]) -> Result<Vec<String>> {
        let mut paths = BTreeSet::new();
        for template in templates {
            paths.extend(self.substitute(template.as_ref())?);
        }
        Ok(paths.into_iter().collect())
    }
}

fn expand<'a>(
    pattern: &Pattern,
    axes: &[(&'a str, Vec<PatternValue>)],
    current: &mut HashMap<&'a str, PatternValue>,
    out: &mut BTreeSet<String>,
) -> Result<()> {
    match axes.split_first() {
        None => {
            out.insert(pattern.render(current)?);
        }
        Some(((name, values), rest)) => {
            for value in values {
                current.insert(*name, value.clone());
                expand(pattern, rest, current, out)?;
            }
        }
    }
    Ok(())
}

/// Parse a duration such as `6h`, `1D`, `30m`, `10s`, `2W` or `500ms`.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    let value: i64 = digits
        .parse()
        .map_err(|_| AlignError::configuration(format!("invalid duration '{}'", s)))?;
    match unit {
        "ms" => Ok(Duration::milliseconds(value)),
        "s" => Ok(Duration::seconds(value)),
        "m" => Ok(Duration::minutes(value)),
        "h" | "H" => Ok(Duration::hours(value)),
        "D" | "d" => Ok(Duration::days(value)),
        "W" | "w" => Ok(Duration::weeks(value)),
        "M" | "Y" => Err(AlignError::configuration(format!(
            "duration '{}': calendar unit '{}' has no fixed length",
            s, unit
        ))),
        _ => Err(AlignError::configuration(format!("duration '{}': unknown unit '{}'", s, unit))),
    }
}

/// Parse an RFC 3339 timestamp or a naive UTC date/time down to the hour
/// (`2024-01-01`, `2024-01-01T06`, `2024-01-01T06:00`, `2024-01-01T06:00:00`).
pub fn parse_timestamp(s: &str) -> Result<Timestamp> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(&format!("{}:00", s), "%Y-%m-%dT%H:%M") {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    if let Some(naive) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    Err(AlignError::configuration(format!("invalid timestamp '{}'", s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> Timestamp {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("6h").unwrap(), Duration::hours(6));
        assert_eq!(parse_duration("1D").unwrap(), Duration::days(1));
        assert_eq!(parse_duration("30m").unwrap(), Duration::minutes(30));
        assert_eq!(parse_duration("10s").unwrap(), Duration::seconds(10));
        assert_eq!(parse_duration("2W").unwrap(), Duration::weeks(2));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::milliseconds(500));
        assert!(parse_duration("1M").is_err());
        assert!(parse_duration("h").is_err());
        assert!(parse_duration("3x").is_err());
    }

    #[test]
    fn test_parse_timestamp_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 2, 6, 0, 0).unwrap();
        assert_eq!(ts("2024-01-02T06"), expected);
        assert_eq!(ts("2024-01-02T06:00"), expected);
        assert_eq!(ts("2024-01-02T06:00:00"), expected);
        assert_eq!(ts("2024-01-02T06:00:00Z"), expected);
        assert_eq!(ts("2024-01-02"), Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_date_sets() {
        let dates = Dates::new(
            ts("2024-01-01T00"),
            ts("2024-01-01T12"),
            Duration::hours(6),
            Duration::hours(6),
            Duration::hours(3),
        )
        .unwrap();
        assert_eq!(dates.reference_times().len(), 3);
        assert_eq!(
            dates.lead_times().iter().map(|l| l.num_hours()).collect::<Vec<_>>(),
            vec![0, 3, 6]
        );
        // 00..18 every 3h
        assert_eq!(dates.valid_times().len(), 7);
    }

    #[test]
    fn test_invalid_dates() {
        let t = ts("2024-01-01");
        assert!(Dates::new(t, t, Duration::zero(), Duration::hours(1), Duration::hours(1)).is_err());
        assert!(Dates::new(t + Duration::hours(1), t, Duration::hours(1), Duration::hours(1), Duration::hours(1)).is_err());
        let missing = DatesConfig {
            start: Some("2024-01-01".into()),
            ..Default::default()
        };
        assert!(matches!(Dates::from_config(&missing), Err(AlignError::Configuration(m)) if m.contains("end")));
    }

    #[test]
    fn test_substitute_product_of_present_fields() {
        let dates = Dates::new(
            ts("2024-01-01T00"),
            ts("2024-01-01T06"),
            Duration::hours(6),
            Duration::hours(3),
            Duration::hours(3),
        )
        .unwrap();
        let paths = dates
            .substitute("/data/{reference_time:%Y%m%d%H}/f{lead_time:03}.json")
            .unwrap();
        assert_eq!(
            paths,
            vec![
                "/data/2024010100/f000.json",
                "/data/2024010100/f003.json",
                "/data/2024010106/f000.json",
                "/data/2024010106/f003.json",
            ]
        );
        assert_eq!(dates.substitute("/data/static.json").unwrap(), vec!["/data/static.json"]);
        assert!(matches!(dates.substitute("/data/{member}.json"), Err(AlignError::Configuration(_))));
    }

    #[test]
    fn test_merge_overrides_key_by_key() {
        let global = DatesConfig {
            start: Some("2024-01-01".into()),
            end: Some("2024-01-02".into()),
            period: Some("1D".into()),
            range: Some("6h".into()),
            step: Some("6h".into()),
        };
        let local = DatesConfig {
            step: Some("3h".into()),
            ..Default::default()
        };
        let merged = global.merged(&local);
        assert_eq!(merged.step.as_deref(), Some("3h"));
        assert_eq!(merged.start, global.start);
        assert_eq!(Dates::from_config(&merged).unwrap().lead_times().len(), 3);
    }
}
