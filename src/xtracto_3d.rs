//! Extraction of a box.

use crate::bounds::{check_bounds, RequestBounds};
use crate::client::ClientConfig;
use crate::decoder::GridDecoder;
use crate::error::XtractoError;
use crate::executor::{Fetcher, QueryExecutor};
use crate::longitude;
use crate::models::{BoxRequest, GridExtract, Range, TimeRequest};
use crate::registry::{DatasetDescriptor, DatasetId, Registry};

use validator::{Validate, ValidationError};

/// Normalise a longitude interval to the dataset's convention.
fn normalize_range(range: Range, lon_360: bool) -> Result<Range, XtractoError> {
    let normalized = longitude::normalize(&[range.0, range.1], lon_360);
    if normalized[0] > normalized[1] {
        let mut error = ValidationError::new("Longitude range crosses the dataset's seam");
        error.add_param("min".into(), &normalized[0]);
        error.add_param("max".into(), &normalized[1]);
        return Err(error.into());
    }
    Ok((normalized[0], normalized[1]))
}

/// Parse the first and last dates of a request.
fn parse_time_range(
    time: &Option<(String, String)>,
) -> Result<Option<(TimeRequest, TimeRequest)>, XtractoError> {
    match time {
        Some((first, last)) => Ok(Some((first.parse()?, last.parse()?))),
        None => Ok(None),
    }
}

/// Extract every cell of a region of a dataset.
///
/// `longitude` must already be in the dataset's convention.
pub(crate) async fn extract_region<F: Fetcher, D: GridDecoder>(
    descriptor: &DatasetDescriptor,
    fetcher: &F,
    decoder: &D,
    config: &ClientConfig,
    longitude: Range,
    latitude: Range,
    time: &Option<(String, String)>,
) -> Result<GridExtract, XtractoError> {
    let time = parse_time_range(time)?;
    let times: Vec<TimeRequest> = time.iter().flat_map(|(a, b)| [*a, *b]).collect();
    check_bounds(descriptor, &RequestBounds::new(longitude, latitude, &times))?;

    let executor = QueryExecutor::new(fetcher, decoder, &config.base_url, config.verbose);
    let axes = executor.load_axes(descriptor).await?;
    let indices = axes.resolve(descriptor, longitude, latitude, time)?;
    let mut values = executor.fetch_grid(descriptor, &indices).await?;
    if let Some(missing) = &descriptor.missing {
        values.mapv_inplace(|value| {
            if missing.is_missing(&value) {
                f64::NAN
            } else {
                value
            }
        });
    }
    let (x0, x1) = indices.longitude;
    let (y0, y1) = indices.latitude;
    Ok(GridExtract {
        dataset_id: descriptor.dataset_id.clone(),
        variable: descriptor.variable.clone(),
        units: descriptor.units.clone(),
        longitudes: axes.longitude[x0..=x1].to_vec(),
        latitudes: axes.latitude[y0..=y1].to_vec(),
        times: axes.times(&indices),
        values,
    })
}

/// Extract every cell of a box.
///
/// Times default to the final timestep of datasets with a time axis.
///
/// # Arguments
///
/// * `registry`: Registry to look the dataset up in
/// * `fetcher`: Downloads query responses
/// * `decoder`: Decodes query responses
/// * `config`: Client configuration
/// * `request`: Box to extract
/// * `dataset`: Dataset name or 1-based registry index
#[tracing::instrument(level = "DEBUG", skip_all, fields(dataset = %dataset))]
pub async fn extract_box<F: Fetcher, D: GridDecoder>(
    registry: &Registry,
    fetcher: &F,
    decoder: &D,
    config: &ClientConfig,
    request: &BoxRequest,
    dataset: &DatasetId,
) -> Result<GridExtract, XtractoError> {
    request.validate()?;
    let descriptor = registry.lookup(dataset)?;
    let longitude = normalize_range(request.longitude, descriptor.lon_360)?;
    extract_region(
        descriptor,
        fetcher,
        decoder,
        config,
        longitude,
        request.latitude,
        &request.time,
    )
    .await
}
