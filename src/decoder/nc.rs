//! netCDF response decoder.

use crate::decoder::{GridData, GridDecoder};
use crate::error::XtractoError;
use crate::types::Missing;

use std::path::Path;

/// Decoder for ERDDAP `.nc` responses.
///
/// Values matching the variable's `_FillValue`, `missing_value`, `valid_min`, `valid_max` or
/// `valid_range` attributes decode to NaN.
#[derive(Clone, Copy, Debug, Default)]
pub struct NetCdfDecoder;

fn f64_attribute(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !var.attributes().any(|attr| attr.name() == name) {
        return None;
    }
    let value = var.attribute_value(name)?.ok()?;
    f64::try_from(value).ok()
}

fn range_attribute(var: &netcdf::Variable, name: &str) -> Option<(f64, f64)> {
    if !var.attributes().any(|attr| attr.name() == name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        netcdf::AttributeValue::Doubles(values) if values.len() == 2 => Some((values[0], values[1])),
        netcdf::AttributeValue::Floats(values) if values.len() == 2 => {
            Some((values[0].into(), values[1].into()))
        }
        _ => None,
    }
}

/// Missing data descriptor of a variable, from its attributes.
fn missing(var: &netcdf::Variable) -> Option<Missing<f64>> {
    let fill_values: Vec<f64> = ["_FillValue", "missing_value"]
        .iter()
        .filter_map(|name| f64_attribute(var, name))
        .collect();
    let (valid_min, valid_max) = match range_attribute(var, "valid_range") {
        Some((min, max)) => (Some(min), Some(max)),
        None => (
            f64_attribute(var, "valid_min"),
            f64_attribute(var, "valid_max"),
        ),
    };
    Missing::from_attributes(fill_values, valid_min, valid_max)
}

impl GridDecoder for NetCdfDecoder {
    fn extension(&self) -> &'static str {
        "nc"
    }

    fn decode(&self, path: &Path, variable: &str) -> Result<GridData, XtractoError> {
        let file = netcdf::open(path)?;
        let var = file
            .variable(variable)
            .ok_or_else(|| XtractoError::MissingVariable {
                name: variable.to_string(),
            })?;
        let mut values: Vec<f64> = var.get_values(..)?;
        if let Some(missing) = missing(&var) {
            for value in values.iter_mut() {
                if missing.is_missing(value) {
                    *value = f64::NAN;
                }
            }
        }

        let mut axes = vec![];
        // An axis is its own only dimension.
        let is_axis = var.dimensions().len() == 1 && var.dimensions()[0].name() == variable;
        if !is_axis {
            for dimension in var.dimensions() {
                let name = dimension.name();
                let coordinates = file
                    .variable(&name)
                    .ok_or_else(|| XtractoError::MissingVariable { name: name.clone() })?;
                axes.push((name, coordinates.get_values(..)?));
            }
        }
        let data = GridData { axes, values };
        data.check_shape()?;
        Ok(data)
    }
}
