//! Bounds validation.
//!
//! A request is checked against the coverage of its dataset once, using the union of every box
//! it covers, before anything is fetched.

use crate::error::XtractoError;
use crate::models::{Range, TimeRequest};
use crate::registry::DatasetDescriptor;

use time::OffsetDateTime;

/// Closed intervals covered by a request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RequestBounds {
    /// Longitude interval, in the dataset's convention
    pub longitude: Range,
    /// Latitude interval
    pub latitude: Range,
    /// Interval of absolute times. `last` tokens do not contribute.
    pub time: Option<(OffsetDateTime, OffsetDateTime)>,
}

impl RequestBounds {
    /// Bounds of a single box.
    pub fn new(longitude: Range, latitude: Range, times: &[TimeRequest]) -> Self {
        let time = times
            .iter()
            .filter_map(TimeRequest::instant)
            .fold(None, |acc: Option<(OffsetDateTime, OffsetDateTime)>, t| {
                Some(match acc {
                    Some((first, last)) => (first.min(t), last.max(t)),
                    None => (t, t),
                })
            });
        RequestBounds {
            longitude,
            latitude,
            time,
        }
    }

    /// Smallest bounds enclosing both `self` and `other`.
    pub fn union(&self, other: &RequestBounds) -> RequestBounds {
        let time = match (self.time, other.time) {
            (Some(a), Some(b)) => Some((a.0.min(b.0), a.1.max(b.1))),
            (a, b) => a.or(b),
        };
        RequestBounds {
            longitude: (
                self.longitude.0.min(other.longitude.0),
                self.longitude.1.max(other.longitude.1),
            ),
            latitude: (
                self.latitude.0.min(other.latitude.0),
                self.latitude.1.max(other.latitude.1),
            ),
            time,
        }
    }
}

fn outside(range: Range, min: f64, max: f64) -> bool {
    range.0 < min || range.1 > max
}

/// Check that `bounds` lies within the coverage of `descriptor`.
///
/// Every exceeding axis is reported in a single [XtractoError::OutOfBounds].
pub fn check_bounds(
    descriptor: &DatasetDescriptor,
    bounds: &RequestBounds,
) -> Result<(), XtractoError> {
    let mut axes = vec![];
    if outside(bounds.longitude, descriptor.lon_min, descriptor.lon_max) {
        axes.push("longitude");
    }
    if outside(bounds.latitude, descriptor.lat_min, descriptor.lat_max) {
        axes.push("latitude");
    }
    if descriptor.has_time() {
        if let Some((first, last)) = bounds.time {
            let before = descriptor.min_time.is_some_and(|min_time| first < min_time);
            let after = descriptor.max_time.is_some_and(|max_time| last > max_time);
            if before || after {
                axes.push("time");
            }
        }
    }
    if axes.is_empty() {
        Ok(())
    } else {
        Err(XtractoError::OutOfBounds {
            dataset: descriptor.dataset_id.clone(),
            axes,
        })
    }
}
