//! Pairwise temporal alignment.
//!
//! Four transitions, chosen by the time tags of the two datasets:
//!
//! | source      | other       | join keys                                  |
//! |-------------|-------------|--------------------------------------------|
//! | forecast    | forecast    | `reference_time` (always inner), `lead_time` |
//! | forecast    | observation | forecast flattened to `valid_time`         |
//! | observation | observation | `valid_time`                               |
//! | observation | forecast    | observation picked at forecast valid times |

use std::collections::{BTreeSet, HashSet};

use align_common::names::{LEAD_TIME, REFERENCE_TIME, VALID_TIME};
use align_common::{properties_of, AlignError, CoordValues, Coordinate, Dataset, Label, Result, Time, Timestamp};
use chrono::Duration;
use ndarray::{ArrayD, IxDyn};
use tracing::{debug, warn};

use crate::options::{LeadTimeMode, TimeAlignOptions};

/// Name of the temporary dimension a forecast is stacked into.
const STACKED_TIME: &str = "time";

/// Add `valid_time = reference_time + lead_time` over
/// `(reference_time, lead_time)` to a forecast. Observations are returned
/// unchanged.
pub fn add_valid_time(ds: &Dataset) -> Result<Dataset> {
    if !properties_of(ds)?.is_forecast() {
        return Ok(ds.clone());
    }
    let refs = reference_times(ds)?;
    let leads = lead_times(ds)?;
    let values: Vec<Option<Timestamp>> = refs
        .iter()
        .flat_map(|&r| leads.iter().map(move |&l| Some(r + l)))
        .collect();
    let values = ArrayD::from_shape_vec(IxDyn(&[refs.len(), leads.len()]), values)?;
    let coord = Coordinate::new(
        vec![REFERENCE_TIME.to_string(), LEAD_TIME.to_string()],
        CoordValues::Time(values),
    )?;
    let mut out = ds.clone();
    out.assign_coord(VALID_TIME, coord)?;
    Ok(out)
}

/// Align `ds` with `other`, returning both aligned datasets in argument
/// order.
pub fn align_with(ds: &Dataset, other: &Dataset, options: &TimeAlignOptions) -> Result<(Dataset, Dataset)> {
    let (a, b) = (properties_of(ds)?.time, properties_of(other)?.time);
    debug!(source = %a, other = %b, only_common = options.only_common, "Aligning in time");
    match (a, b) {
        (Time::Forecast, Time::Forecast) => align_forecast_forecast(ds, other, options.only_common),
        (Time::Forecast, Time::Observation) => {
            align_forecast_observation(ds, other, options.only_common, options.lead_time)
        }
        (Time::Observation, Time::Observation) => align_observation_observation(ds, other, options.only_common),
        (Time::Observation, Time::Forecast) => align_observation_forecast(ds, other, options.only_common),
    }
}

/// Restrict both forecasts to their common reference times, then either
/// intersect (`only_common`) or unite their lead times.
pub fn align_forecast_forecast(ds1: &Dataset, ds2: &Dataset, only_common: bool) -> Result<(Dataset, Dataset)> {
    let common = intersection(&ds1.index(REFERENCE_TIME)?, &ds2.index(REFERENCE_TIME)?);
    let ds1 = ds1.sel(REFERENCE_TIME, &common)?;
    let ds2 = ds2.sel(REFERENCE_TIME, &common)?;

    if only_common {
        let leads = intersection(&ds1.index(LEAD_TIME)?, &ds2.index(LEAD_TIME)?);
        Ok((ds1.sel(LEAD_TIME, &leads)?, ds2.sel(LEAD_TIME, &leads)?))
    } else {
        let leads = union(&ds1.index(LEAD_TIME)?, &ds2.index(LEAD_TIME)?);
        let ds1 = add_valid_time(&ds1.reindex(LEAD_TIME, &leads)?)?;
        let ds2 = add_valid_time(&ds2.reindex(LEAD_TIME, &leads)?)?;
        Ok((ds1, ds2))
    }
}

/// Flatten a forecast onto `valid_time` and join it with an observation.
///
/// The reference times must be evenly spaced. Valid times reached by more
/// than one (reference time, lead time) pair keep the first pair.
pub fn align_forecast_observation(
    forecast: &Dataset,
    observation: &Dataset,
    only_common: bool,
    lead_time: LeadTimeMode,
) -> Result<(Dataset, Dataset)> {
    let forecast = add_valid_time(forecast)?;
    let refs = reference_times(&forecast)?;
    let spacing = uniform_spacing(&refs)?;

    let reduced = match lead_time {
        LeadTimeMode::StartMin => match spacing {
            Some(spacing) => forecast.filter_dim(LEAD_TIME, |l| l.as_delta().map_or(false, |d| d < spacing))?,
            None => forecast,
        },
        LeadTimeMode::StartMax => {
            let max_lead = lead_times(&forecast)?
                .into_iter()
                .max()
                .ok_or_else(|| AlignError::precondition("forecast has no lead times"))?;
            let keep = start_max_reference_times(&refs, max_lead)?;
            forecast.filter_dim(REFERENCE_TIME, |l| l.as_time().map_or(false, |t| keep.contains(&t)))?
        }
    };

    let stacked = reduced
        .stack(REFERENCE_TIME, LEAD_TIME, STACKED_TIME)?
        .swap_dims(STACKED_TIME, VALID_TIME)?
        .transpose_front(&[VALID_TIME]);
    let stacked = first_valid_times(&stacked)?;

    let fc_labels = stacked.index(VALID_TIME)?;
    let obs_labels = observation.index(VALID_TIME)?;
    if only_common {
        let common = intersection(&fc_labels, &obs_labels);
        Ok((stacked.sel(VALID_TIME, &common)?, observation.sel(VALID_TIME, &common)?))
    } else {
        let all = union(&fc_labels, &obs_labels);
        Ok((stacked.reindex(VALID_TIME, &all)?, observation.reindex(VALID_TIME, &all)?))
    }
}

/// Join two observations on `valid_time`.
pub fn align_observation_observation(ds1: &Dataset, ds2: &Dataset, only_common: bool) -> Result<(Dataset, Dataset)> {
    let (a, b) = (ds1.index(VALID_TIME)?, ds2.index(VALID_TIME)?);
    let labels = if only_common { intersection(&a, &b) } else { union(&a, &b) };
    if only_common {
        Ok((ds1.sel(VALID_TIME, &labels)?, ds2.sel(VALID_TIME, &labels)?))
    } else {
        Ok((ds1.reindex(VALID_TIME, &labels)?, ds2.reindex(VALID_TIME, &labels)?))
    }
}

/// Pick the observation at the valid times of a forecast, giving it the
/// forecast's `(reference_time, lead_time)` layout.
///
/// The forecast is first clipped to the observed period: reference times
/// before the first observation are dropped, as are reference times whose
/// last lead time runs past the last observation.
pub fn align_observation_forecast(
    observation: &Dataset,
    forecast: &Dataset,
    only_common: bool,
) -> Result<(Dataset, Dataset)> {
    let obs_times = time_values(observation, VALID_TIME)?;
    let (obs_min, obs_max) = match (obs_times.iter().min(), obs_times.iter().max()) {
        (Some(&min), Some(&max)) => (min, max),
        _ => return Err(AlignError::precondition("observation has no valid times")),
    };

    let mut cut = add_valid_time(forecast)?;
    if reference_times(&cut)?.iter().any(|&r| r < obs_min) {
        cut = cut.filter_dim(REFERENCE_TIME, |l| l.as_time().map_or(false, |t| t >= obs_min))?;
    }
    let leads = lead_times(&cut)?;
    if let Some(&last_lead) = leads.last() {
        let refs = reference_times(&cut)?;
        let max_valid = refs.iter().flat_map(|&r| leads.iter().map(move |&l| r + l)).max();
        if max_valid.map_or(false, |v| v > obs_max) {
            cut = cut.filter_dim(REFERENCE_TIME, |l| l.as_time().map_or(false, |t| t + last_lead <= obs_max))?;
            if cut.dim_size(REFERENCE_TIME) == Some(0) {
                return Err(AlignError::precondition(
                    "no forecast reference time has all its lead times within the observed period",
                ));
            }
        }
    }
    debug!(
        reference_times = cut.dim_size(REFERENCE_TIME).unwrap_or(0),
        "Clipped forecast to observed period"
    );

    let indexer = cut.require_coord(VALID_TIME)?.clone();
    let mut aligned = observation.sel_nd(VALID_TIME, &indexer)?;
    aligned.assign_coord(REFERENCE_TIME, cut.require_coord(REFERENCE_TIME)?.clone())?;
    aligned.assign_coord(LEAD_TIME, cut.require_coord(LEAD_TIME)?.clone())?;

    if only_common {
        return Ok((aligned, cut));
    }

    let full = add_valid_time(forecast)?;
    let refs = union(&aligned.index(REFERENCE_TIME)?, &full.index(REFERENCE_TIME)?);
    let leads = union(&aligned.index(LEAD_TIME)?, &full.index(LEAD_TIME)?);
    let aligned = aligned.reindex(REFERENCE_TIME, &refs)?.reindex(LEAD_TIME, &leads)?;
    let full = add_valid_time(&full.reindex(REFERENCE_TIME, &refs)?.reindex(LEAD_TIME, &leads)?)?;

    let mut aligned = aligned;
    aligned.assign_coord(VALID_TIME, full.require_coord(VALID_TIME)?.clone())?;
    Ok((aligned, full))
}

/// Items of `a` that also occur in `b`, in the order of `a`, without
/// repeats.
pub(crate) fn intersection(a: &[Label], b: &[Label]) -> Vec<Label> {
    let in_b: HashSet<&Label> = b.iter().collect();
    let mut seen = HashSet::new();
    a.iter()
        .filter(|l| in_b.contains(l) && seen.insert(*l))
        .cloned()
        .collect()
}

/// Sorted union of two label sets.
pub(crate) fn union(a: &[Label], b: &[Label]) -> Vec<Label> {
    a.iter().chain(b).cloned().collect::<BTreeSet<_>>().into_iter().collect()
}

fn time_values(ds: &Dataset, dim: &str) -> Result<Vec<Timestamp>> {
    ds.index(dim)?
        .iter()
        .map(|l| {
            l.as_time()
                .ok_or_else(|| AlignError::dimension(format!("'{}' is not a time coordinate", dim)))
        })
        .collect()
}

fn reference_times(ds: &Dataset) -> Result<Vec<Timestamp>> {
    time_values(ds, REFERENCE_TIME)
}

fn lead_times(ds: &Dataset) -> Result<Vec<Duration>> {
    ds.index(LEAD_TIME)?
        .iter()
        .map(|l| {
            l.as_delta()
                .ok_or_else(|| AlignError::dimension("'lead_time' is not a duration coordinate"))
        })
        .collect()
}

/// The constant spacing of `refs`, `None` for fewer than two values.
fn uniform_spacing(refs: &[Timestamp]) -> Result<Option<Duration>> {
    let diffs: Vec<Duration> = refs.windows(2).map(|w| w[1] - w[0]).collect();
    match diffs.first() {
        None => Ok(None),
        Some(&first) if diffs.iter().all(|&d| d == first) => Ok(Some(first)),
        Some(_) => Err(AlignError::unsupported(
            "Aligning a forecast with non-continuous reference times with an observation is not implemented.",
        )),
    }
}

/// Reference times `min + k * max_lead` up to the last reference time that
/// the forecast actually holds.
fn start_max_reference_times(refs: &[Timestamp], max_lead: Duration) -> Result<HashSet<Timestamp>> {
    let (first, last) = match (refs.iter().min(), refs.iter().max()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => return Ok(HashSet::new()),
    };
    if first == last {
        return Ok(HashSet::from([first]));
    }
    if max_lead <= Duration::zero() {
        return Err(AlignError::precondition(
            "start-max lead time selection needs a positive maximum lead time",
        ));
    }
    let present: HashSet<Timestamp> = refs.iter().copied().collect();
    let mut keep = HashSet::new();
    let mut t = first;
    while t < last {
        if present.contains(&t) {
            keep.insert(t);
        }
        t += max_lead;
    }
    Ok(keep)
}

/// Drop repeated `valid_time` labels, keeping the first occurrence.
fn first_valid_times(stacked: &Dataset) -> Result<Dataset> {
    let labels = stacked.index(VALID_TIME)?;
    let mut seen = HashSet::new();
    let keep: Vec<usize> = labels
        .iter()
        .enumerate()
        .filter(|(_, l)| seen.insert(*l))
        .map(|(i, _)| i)
        .collect();
    if keep.len() == labels.len() {
        return Ok(stacked.clone());
    }
    warn!(
        duplicates = labels.len() - keep.len(),
        "Forecast reaches some valid times more than once, keeping the earliest reference time"
    );
    stacked.isel(VALID_TIME, &keep)
}
