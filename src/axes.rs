//! Coordinate index resolution.
//!
//! Requests are expressed in coordinates, while griddap queries address cells by index. The
//! coordinate axes of a dataset are loaded once per call into [GridAxes], and every request is
//! resolved against them to the nearest grid cells.

use crate::error::XtractoError;
use crate::models::{Range, TimeRequest};
use crate::registry::DatasetDescriptor;

use time::OffsetDateTime;

/// Returns the index of the axis value nearest to `target`.
///
/// Ties resolve to the lower index. NaN axis values are never selected. Returns [None] if the
/// axis holds no comparable values.
pub fn nearest_index(axis: &[f64], target: f64) -> Option<usize> {
    let mut nearest: Option<(usize, f64)> = None;
    for (i, value) in axis.iter().enumerate() {
        let distance = (value - target).abs();
        if distance.is_nan() {
            continue;
        }
        match nearest {
            Some((_, best)) if distance >= best => (),
            _ => nearest = Some((i, distance)),
        }
    }
    nearest.map(|(i, _)| i)
}

/// Seconds since the Unix epoch.
pub fn epoch_seconds(instant: OffsetDateTime) -> f64 {
    instant.unix_timestamp_nanos() as f64 / 1e9
}

/// Instant `seconds` after the Unix epoch, if representable.
pub fn from_epoch_seconds(seconds: f64) -> Option<OffsetDateTime> {
    if !seconds.is_finite() {
        return None;
    }
    OffsetDateTime::from_unix_timestamp_nanos((seconds * 1e9).round() as i128).ok()
}

fn ordered(a: usize, b: usize) -> (usize, usize) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Cell indices of a request, inclusive on both ends.
///
/// Two requests resolving to equal indices fetch identical cells.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct ResolvedIndices {
    /// First and last longitude index
    pub longitude: (usize, usize),
    /// First and last latitude index, in axis order
    pub latitude: (usize, usize),
    /// First and last time index. [None] for grids without a time axis.
    pub time: Option<(usize, usize)>,
    /// Altitude index. [None] for grids without an altitude axis.
    pub altitude: Option<usize>,
}

impl ResolvedIndices {
    /// Number of cells along each of time, latitude and longitude.
    pub fn shape(&self) -> (usize, usize, usize) {
        let time = self.time.map_or(1, |(t0, t1)| t1 - t0 + 1);
        (
            time,
            self.latitude.1 - self.latitude.0 + 1,
            self.longitude.1 - self.longitude.0 + 1,
        )
    }
}

/// Coordinate axes of a dataset.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GridAxes {
    /// Longitudes, in the dataset's convention
    pub longitude: Vec<f64>,
    /// Latitudes, in axis order
    pub latitude: Vec<f64>,
    /// Times in seconds since the Unix epoch. Empty for grids without a time axis.
    pub time: Vec<f64>,
    /// Altitudes, for grids with an altitude axis
    pub altitude: Option<Vec<f64>>,
}

impl GridAxes {
    /// Resolve a request to cell indices.
    ///
    /// # Arguments
    ///
    /// * `descriptor`: Dataset the axes belong to
    /// * `longitude`: Longitude interval, in the dataset's convention
    /// * `latitude`: Latitude interval
    /// * `time`: First and last requested times. Ignored for grids without a time axis.
    ///   Defaults to the final timestep otherwise.
    pub fn resolve(
        &self,
        descriptor: &DatasetDescriptor,
        longitude: Range,
        latitude: Range,
        time: Option<(TimeRequest, TimeRequest)>,
    ) -> Result<ResolvedIndices, XtractoError> {
        let lon0 = self.nearest(descriptor, "longitude", &self.longitude, longitude.0)?;
        let lon1 = self.nearest(descriptor, "longitude", &self.longitude, longitude.1)?;
        // North to south axes are addressed from the northern edge.
        let (lat_first, lat_last) = if descriptor.lat_south {
            (latitude.1, latitude.0)
        } else {
            latitude
        };
        let lat0 = self.nearest(descriptor, "latitude", &self.latitude, lat_first)?;
        let lat1 = self.nearest(descriptor, "latitude", &self.latitude, lat_last)?;
        let time = if descriptor.has_time() {
            let (first, last) = time.unwrap_or((TimeRequest::Last(0), TimeRequest::Last(0)));
            let t0 = self.time_index(descriptor, &first)?;
            let t1 = self.time_index(descriptor, &last)?;
            Some(ordered(t0, t1))
        } else {
            None
        };
        Ok(ResolvedIndices {
            longitude: ordered(lon0, lon1),
            latitude: ordered(lat0, lat1),
            time,
            altitude: self.altitude_index(),
        })
    }

    fn nearest(
        &self,
        descriptor: &DatasetDescriptor,
        axis: &'static str,
        values: &[f64],
        target: f64,
    ) -> Result<usize, XtractoError> {
        nearest_index(values, target).ok_or_else(|| XtractoError::EmptyAxis {
            dataset: descriptor.dataset_id.clone(),
            axis,
        })
    }

    /// Resolve a requested time to an index of the time axis.
    fn time_index(
        &self,
        descriptor: &DatasetDescriptor,
        request: &TimeRequest,
    ) -> Result<usize, XtractoError> {
        match request {
            TimeRequest::At(instant) => {
                self.nearest(descriptor, "time", &self.time, epoch_seconds(*instant))
            }
            TimeRequest::Last(steps) => self
                .time
                .len()
                .checked_sub(1)
                .ok_or_else(|| XtractoError::EmptyAxis {
                    dataset: descriptor.dataset_id.clone(),
                    axis: "time",
                })?
                .checked_sub(*steps)
                .ok_or_else(|| XtractoError::OutOfBounds {
                    dataset: descriptor.dataset_id.clone(),
                    axes: vec!["time"],
                }),
        }
    }

    /// Index of the altitude nearest to the surface.
    pub fn altitude_index(&self) -> Option<usize> {
        self.altitude
            .as_ref()
            .and_then(|altitude| nearest_index(altitude, 0.0))
    }

    /// Instants of the resolved time indices.
    pub fn times(&self, indices: &ResolvedIndices) -> Vec<OffsetDateTime> {
        match indices.time {
            Some((t0, t1)) => self.time[t0..=t1]
                .iter()
                .filter_map(|seconds| from_epoch_seconds(*seconds))
                .collect(),
            None => vec![],
        }
    }
}
