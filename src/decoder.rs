//! Grid response decoders.

#[cfg(feature = "netcdf")]
pub mod nc;

use crate::axes::epoch_seconds;
use crate::error::XtractoError;

use ndarray::Array3;
use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

#[cfg(feature = "netcdf")]
pub use nc::NetCdfDecoder;

/// Values of a decoded response.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GridData {
    /// Axes of the values, outermost first. Times are seconds since the Unix epoch.
    pub axes: Vec<(String, Vec<f64>)>,
    /// Values in row-major order. Missing values are NaN.
    pub values: Vec<f64>,
}

impl GridData {
    /// Values of the named axis.
    pub fn axis(&self, name: &str) -> Option<&[f64]> {
        self.axes
            .iter()
            .find(|(axis, _)| axis == name)
            .map(|(_, values)| values.as_slice())
    }

    /// Number of values described by the axes.
    fn expected_len(&self) -> usize {
        self.axes.iter().map(|(_, values)| values.len()).product()
    }

    /// Check that the values fill the axes exactly.
    pub fn check_shape(&self) -> Result<(), XtractoError> {
        if !self.axes.is_empty() && self.values.len() != self.expected_len() {
            return Err(XtractoError::ShapeMismatch {
                values: self.values.len(),
                expected: self.expected_len(),
            });
        }
        Ok(())
    }

    /// Arrange the values as `(time, latitude, longitude)`.
    ///
    /// Axes other than latitude and longitude are folded into the first dimension, so grids
    /// without a time axis have a first dimension of length 1.
    pub fn into_array3(self) -> Result<Array3<f64>, XtractoError> {
        let latitudes = self.axis("latitude").map_or(0, |axis| axis.len());
        let longitudes = self.axis("longitude").map_or(0, |axis| axis.len());
        let cells = latitudes * longitudes;
        if cells == 0 || self.values.len() % cells != 0 {
            return Err(XtractoError::ShapeMismatch {
                values: self.values.len(),
                expected: cells,
            });
        }
        let shape = (self.values.len() / cells, latitudes, longitudes);
        Ok(Array3::from_shape_vec(shape, self.values)?)
    }
}

/// Decodes a response file.
pub trait GridDecoder {
    /// File extension of the response format, used in query URLs.
    fn extension(&self) -> &'static str;

    /// Decode the values of `variable` and the axes they span.
    ///
    /// # Arguments
    ///
    /// * `path`: Response file
    /// * `variable`: Grid variable or, for axis queries, axis name
    fn decode(&self, path: &Path, variable: &str) -> Result<GridData, XtractoError>;
}

/// Body of an ERDDAP `.json` response.
#[derive(Debug, Deserialize)]
struct JsonResponse {
    table: JsonTable,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonTable {
    column_names: Vec<String>,
    rows: Vec<Vec<Value>>,
}

/// Decoder for ERDDAP `.json` tables.
///
/// Each row holds the coordinates of one cell followed by its value. `null` cells decode to
/// NaN and ISO 8601 times decode to seconds since the Unix epoch.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonDecoder;

impl JsonDecoder {
    fn cell(column: &str, value: &Value) -> Result<f64, XtractoError> {
        let invalid = || XtractoError::InvalidCell {
            column: column.to_string(),
            value: value.to_string(),
        };
        match value {
            Value::Null => Ok(f64::NAN),
            Value::Number(number) => number.as_f64().ok_or_else(invalid),
            Value::String(text) => OffsetDateTime::parse(text, &Rfc3339)
                .map(epoch_seconds)
                .or_else(|_| text.parse::<f64>())
                .map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}

impl GridDecoder for JsonDecoder {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn decode(&self, path: &Path, variable: &str) -> Result<GridData, XtractoError> {
        let file = File::open(path)?;
        let response: JsonResponse = serde_json::from_reader(BufReader::new(file))?;
        let table = response.table;
        let value_column = table
            .column_names
            .iter()
            .position(|name| name == variable)
            .ok_or_else(|| XtractoError::MissingVariable {
                name: variable.to_string(),
            })?;

        let mut axes: Vec<(String, Vec<f64>)> = table
            .column_names
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != value_column)
            .map(|(_, name)| (name.clone(), vec![]))
            .collect();
        let mut values = Vec::with_capacity(table.rows.len());
        for row in &table.rows {
            if row.len() != table.column_names.len() {
                return Err(XtractoError::ShapeMismatch {
                    values: row.len(),
                    expected: table.column_names.len(),
                });
            }
            let mut axis = axes.iter_mut();
            for (i, (name, cell)) in table.column_names.iter().zip(row).enumerate() {
                let cell = Self::cell(name, cell)?;
                if i == value_column {
                    values.push(cell);
                } else if let Some((_, coordinates)) = axis.next() {
                    // Coordinates repeat for every cell, keep each value once in order.
                    if !coordinates.iter().any(|c| c.to_bits() == cell.to_bits()) {
                        coordinates.push(cell);
                    }
                }
            }
        }
        let data = GridData { axes, values };
        data.check_shape()?;
        Ok(data)
    }
}
