//! Collection-level temporal alignment onto one shared timeline.

use align_common::{properties_of, AlignError, Collection, Dataset, Result, Time};
use tracing::info;

use crate::options::{CollectionTimeOptions, ReturnAs};
use crate::time::{add_valid_time, align_with};

/// Align every member of `datasets` onto a common timeline, keeping the
/// collection shape.
///
/// The forecasts' valid-time layouts are folded into one forecast timeline,
/// the observations' into one observation timeline, and the two are
/// reconciled into a master timeline every member is then aligned against.
pub fn align_time(datasets: Collection<Dataset>, options: &CollectionTimeOptions) -> Result<Collection<Dataset>> {
    if options.return_as != ReturnAs::Forecast {
        return Err(AlignError::unsupported(
            "Currently only temporal alignment return forecast structure is supported.",
        ));
    }
    let timeline = master_timeline(&datasets, options)?;
    datasets.try_map(|ds| Ok(align_with(&ds, &timeline, &options.pairwise)?.0))
}

/// The shared timeline of a collection, holding coordinates only.
pub fn master_timeline(datasets: &Collection<Dataset>, options: &CollectionTimeOptions) -> Result<Dataset> {
    let mut forecasts: Option<Dataset> = None;
    let mut observations: Option<Dataset> = None;

    for ds in datasets.values() {
        let (slot, timeline) = match properties_of(ds)?.time {
            Time::Forecast => (&mut forecasts, add_valid_time(ds)?.coords_only()),
            Time::Observation => (&mut observations, ds.coords_only()),
        };
        *slot = Some(match slot.take() {
            None => timeline,
            Some(previous) => align_with(&timeline, &previous, &options.pairwise)?.1,
        });
    }

    let timeline = match (observations, forecasts) {
        (None, None) => return Err(AlignError::configuration("No observations or forecasts found")),
        (Some(obs), None) => obs,
        (None, Some(fcst)) => fcst,
        (Some(obs), Some(fcst)) => align_with(&obs, &fcst, &options.pairwise)?.1,
    };
    info!(dims = ?timeline.dim_names(), "Built master timeline");
    Ok(timeline)
}
