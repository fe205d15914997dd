//! Extraction along a trajectory.
//!
//! For every point of a trajectory, the cells of a box centred on the point are fetched and
//! summarised into one [ResultRow]. Points are processed in order, one request at a time.
//!
//! Before anything is fetched the trajectory is validated, its dataset looked up, its dates
//! parsed and the union of its boxes checked against the dataset's coverage. The dataset's axes
//! are then loaded once and every point resolved against them, before any grid is fetched.
//! Points resolving to indices remembered by the [RequestDeduplicator] reuse the remembered row.

use crate::axes::{GridAxes, ResolvedIndices};
use crate::bounds::{check_bounds, RequestBounds};
use crate::client::{ClientConfig, FailureMode};
use crate::decoder::GridDecoder;
use crate::dedup::RequestDeduplicator;
use crate::error::{ErrorKind, XtractoError};
use crate::executor::{Fetcher, QueryExecutor};
use crate::longitude;
use crate::metrics::{DEDUPLICATED_POINTS, FAILED_POINTS};
use crate::models::{self, PointFailure, Range, ResultRow, ResultTable, TimeRequest, Trajectory};
use crate::registry::{DatasetDescriptor, DatasetId, Registry};
use crate::statistics::Summary;

use tracing::{debug, warn};
use validator::Validate;

/// Whether a failed point can be skipped in best-effort mode.
fn is_point_failure(error: &XtractoError) -> bool {
    matches!(error.kind(), ErrorKind::Transport | ErrorKind::Decode)
}

/// A point of a trajectory, in the dataset's longitude convention.
struct Point<'a> {
    longitude: Range,
    latitude: Range,
    time: TimeRequest,
    requested_date: &'a str,
}

/// Summarise the cells around one point, reusing a remembered row when possible.
async fn extract_point<F: Fetcher, D: GridDecoder>(
    executor: &QueryExecutor<'_, F, D>,
    axes: &GridAxes,
    descriptor: &DatasetDescriptor,
    dedup: &mut RequestDeduplicator,
    point: &Point<'_>,
    indices: ResolvedIndices,
) -> Result<ResultRow, XtractoError> {
    if let Some(row) = dedup.lookup(&indices) {
        debug!(?indices, "Reusing row");
        DEDUPLICATED_POINTS.inc();
        return Ok(row);
    }
    let values = executor.fetch_grid(descriptor, &indices).await?;
    let summary = Summary::of(&values, descriptor.missing.as_ref());
    let row = ResultRow::new(
        summary,
        axes.times(&indices).first().copied(),
        point.longitude,
        point.latitude,
        point.requested_date,
    );
    dedup.remember(indices, &row);
    Ok(row)
}

/// Summarise the cells around every point of a trajectory.
///
/// Returns one row per point, in input order, each reporting the box requested around its
/// point. Validation, lookup and bounds errors are raised before any grid is fetched. Transport
/// and decode errors abort the extraction unless the configured [FailureMode] is
/// [FailureMode::BestEffort].
///
/// # Arguments
///
/// * `registry`: Registry to look the dataset up in
/// * `fetcher`: Downloads query responses
/// * `decoder`: Decodes query responses
/// * `config`: Client configuration
/// * `trajectory`: Points to extract around
/// * `dataset`: Dataset name or 1-based registry index
#[tracing::instrument(
    level = "DEBUG",
    skip_all,
    fields(dataset = %dataset, points = trajectory.len())
)]
pub async fn extract_along_trajectory<F: Fetcher, D: GridDecoder>(
    registry: &Registry,
    fetcher: &F,
    decoder: &D,
    config: &ClientConfig,
    trajectory: &Trajectory,
    dataset: &DatasetId,
) -> Result<ResultTable, XtractoError> {
    trajectory.validate()?;
    let descriptor = registry.lookup(dataset)?;
    let times = models::parse_dates(&trajectory.dates)?;
    let longitudes = longitude::normalize(&trajectory.longitudes, descriptor.lon_360);

    let points: Vec<Point> = longitudes
        .iter()
        .zip(&trajectory.latitudes)
        .zip(&times)
        .enumerate()
        .map(|(i, ((lon, lat), time))| {
            let x_half_width = trajectory.x_half_width(i);
            let y_half_width = trajectory.y_half_width(i);
            Point {
                longitude: (lon - x_half_width, lon + x_half_width),
                latitude: (lat - y_half_width, lat + y_half_width),
                time: *time,
                requested_date: &trajectory.dates[i],
            }
        })
        .collect();

    let bounds = points
        .iter()
        .map(|point| {
            RequestBounds::new(
                point.longitude,
                point.latitude,
                std::slice::from_ref(&point.time),
            )
        })
        .reduce(|union, bounds| union.union(&bounds));
    if let Some(bounds) = bounds {
        check_bounds(descriptor, &bounds)?;
    }

    let executor = QueryExecutor::new(fetcher, decoder, &config.base_url, config.verbose);
    let axes = executor.load_axes(descriptor).await?;
    // Resolve every point before fetching so that out of range times fetch nothing.
    let resolved = points
        .iter()
        .map(|point| {
            axes.resolve(
                descriptor,
                point.longitude,
                point.latitude,
                Some((point.time, point.time)),
            )
        })
        .collect::<Result<Vec<ResolvedIndices>, XtractoError>>()?;

    let mut dedup = RequestDeduplicator::new(config.deduplication);
    let mut table = ResultTable::default();
    for (index, (point, indices)) in points.iter().zip(resolved).enumerate() {
        match extract_point(&executor, &axes, descriptor, &mut dedup, point, indices).await {
            Ok(row) => table.rows.push(row),
            Err(error)
                if config.failure_mode == FailureMode::BestEffort && is_point_failure(&error) =>
            {
                let message = error.chain().join(": ");
                warn!(index, "Skipping point: {}", message);
                FAILED_POINTS.inc();
                dedup.on_failure();
                table.rows.push(ResultRow::new(
                    Summary::undefined(),
                    None,
                    point.longitude,
                    point.latitude,
                    point.requested_date,
                ));
                table.failures.push(PointFailure { index, message });
            }
            Err(error) => return Err(error),
        }
    }
    Ok(table)
}
