//! Missing data descriptors
//!
//! Grids can contain missing data which should be ignored during aggregation. ERDDAP marks
//! missing cells as `null` in JSON responses, which decode to NaN. NetCDF responses and some
//! datasets instead describe missing data with attributes. Currently we support:
//!
//! * A single missing value (`_FillValue` or `missing_value`)
//! * Multiple missing values
//! * A valid minimum value (`valid_min`)
//! * A valid maximum value (`valid_max`)
//! * A valid range of values (`valid_range`)

use serde::{Deserialize, Serialize};
use validator::ValidationError;

/// Missing data
///
/// This enum can represent all known descriptions of missing data used in NetCDF files.
/// It is generic over the type of missing data values, although in practice grids are
/// aggregated as [f64].
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Missing<T> {
    /// A single missing value
    MissingValue(T),
    /// Multple missing values
    MissingValues(Vec<T>),
    /// Valid minimum
    ValidMin(T),
    /// Valid maxiumum
    ValidMax(T),
    /// Valid range
    ValidRange(T, T),
}

impl<T: PartialOrd + Serialize> Missing<T> {
    /// Validate a [Missing] descriptor.
    pub fn validate(&self) -> Result<(), ValidationError> {
        // Validate min + max for valid ranges.
        if let Missing::ValidRange(min, max) = self {
            if min >= max {
                let mut error =
                    ValidationError::new("Missing data valid range min must be less than max");
                error.add_param("min".into(), min);
                error.add_param("max".into(), max);
                return Err(error);
            };
        };
        Ok(())
    }
}

impl<T: PartialOrd> Missing<T> {
    /// Filter function to check whether the provided value is a 'missing' value
    pub fn is_missing(&self, x: &T) -> bool {
        match self {
            Missing::MissingValue(value) => x == value,
            Missing::MissingValues(values) => values.contains(x),
            Missing::ValidMin(min) => x < min,
            Missing::ValidMax(max) => x > max,
            Missing::ValidRange(min, max) => x < min || x > max,
        }
    }
}

impl Missing<f64> {
    /// Combine the missing data attributes of a netCDF variable into a single descriptor.
    ///
    /// A valid range takes precedence over fill values, since values outside the range are
    /// discarded regardless.
    pub fn from_attributes(
        fill_values: Vec<f64>,
        valid_min: Option<f64>,
        valid_max: Option<f64>,
    ) -> Option<Self> {
        match (valid_min, valid_max) {
            (Some(min), Some(max)) => Some(Missing::ValidRange(min, max)),
            (Some(min), None) => Some(Missing::ValidMin(min)),
            (None, Some(max)) => Some(Missing::ValidMax(max)),
            (None, None) => match fill_values.len() {
                0 => None,
                1 => Some(Missing::MissingValue(fill_values[0])),
                _ => Some(Missing::MissingValues(fill_values)),
            },
        }
    }
}
