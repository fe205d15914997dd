//! Extraction of a polygon.
//!
//! The polygon's bounding box is extracted, then cells whose centre lies outside the polygon are
//! set to NaN. Cells on the boundary are kept.

use crate::client::ClientConfig;
use crate::decoder::GridDecoder;
use crate::error::XtractoError;
use crate::executor::Fetcher;
use crate::longitude;
use crate::models::{GridExtract, PolygonRequest, Range};
use crate::registry::{DatasetId, Registry};
use crate::xtracto_3d::extract_region;

use geo::{Intersects, LineString, Point, Polygon};
use validator::Validate;

fn extent(values: &[f64]) -> Range {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), value| {
            (min.min(*value), max.max(*value))
        })
}

/// Set cells whose centre lies outside `polygon` to NaN.
fn mask(extract: &mut GridExtract, polygon: &Polygon<f64>) {
    for ((_, j, k), value) in extract.values.indexed_iter_mut() {
        let centre = Point::new(extract.longitudes[k], extract.latitudes[j]);
        if !polygon.intersects(&centre) {
            *value = f64::NAN;
        }
    }
}

/// Extract every cell inside a polygon.
///
/// # Arguments
///
/// * `registry`: Registry to look the dataset up in
/// * `fetcher`: Downloads query responses
/// * `decoder`: Decodes query responses
/// * `config`: Client configuration
/// * `request`: Polygon to extract
/// * `dataset`: Dataset name or 1-based registry index
#[tracing::instrument(level = "DEBUG", skip_all, fields(dataset = %dataset))]
pub async fn extract_polygon<F: Fetcher, D: GridDecoder>(
    registry: &Registry,
    fetcher: &F,
    decoder: &D,
    config: &ClientConfig,
    request: &PolygonRequest,
    dataset: &DatasetId,
) -> Result<GridExtract, XtractoError> {
    request.validate()?;
    let descriptor = registry.lookup(dataset)?;
    let longitudes = longitude::normalize(&request.longitudes, descriptor.lon_360);
    let mut extract = extract_region(
        descriptor,
        fetcher,
        decoder,
        config,
        extent(&longitudes),
        extent(&request.latitudes),
        &request.time,
    )
    .await?;
    let exterior: LineString<f64> = longitudes
        .iter()
        .zip(&request.latitudes)
        .map(|(lon, lat)| (*lon, *lat))
        .collect::<Vec<_>>()
        .into();
    mask(&mut extract, &Polygon::new(exterior, vec![]));
    Ok(extract)
}
