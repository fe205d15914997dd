//! Griddap query URLs.

use crate::axes::ResolvedIndices;
use crate::error::XtractoError;
use crate::registry::DatasetDescriptor;

use url::Url;

/// URL of the griddap endpoint of a dataset, without a query.
fn griddap_url(
    base: &Url,
    descriptor: &DatasetDescriptor,
    extension: &str,
) -> Result<Url, XtractoError> {
    let base = descriptor.base_url.as_ref().unwrap_or(base);
    // Url::join replaces the final path segment unless the path ends with a slash.
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join(&format!(
        "griddap/{}.{}",
        descriptor.dataset_id, extension
    ))?)
}

/// URL of a query returning every value of a coordinate axis.
///
/// # Arguments
///
/// * `base`: ERDDAP server, used unless the descriptor names its own
/// * `descriptor`: Dataset to query
/// * `extension`: Response format, e.g. `json`
/// * `axis`: Axis name
pub fn axis_url(
    base: &Url,
    descriptor: &DatasetDescriptor,
    extension: &str,
    axis: &str,
) -> Result<Url, XtractoError> {
    let mut url = griddap_url(base, descriptor, extension)?;
    url.set_query(Some(&format!("{}[0:1:last]", axis)));
    Ok(url)
}

/// Query for the cells of a dataset's variable at resolved indices.
#[derive(Clone, Copy, Debug)]
pub struct GridQuery<'a> {
    descriptor: &'a DatasetDescriptor,
    indices: ResolvedIndices,
}

impl<'a> GridQuery<'a> {
    /// Returns a new GridQuery
    pub fn new(descriptor: &'a DatasetDescriptor, indices: ResolvedIndices) -> Self {
        Self {
            descriptor,
            indices,
        }
    }

    /// Constraint expression, e.g. `sst[0:1:0][0:1:0][3:1:5][2:1:4]`.
    ///
    /// Dimensions are ordered time, altitude, latitude, longitude. Time and altitude are omitted
    /// when the indices do not address them.
    pub fn constraint(&self) -> String {
        let mut constraint = self.descriptor.variable.clone();
        if let Some((t0, t1)) = self.indices.time {
            constraint.push_str(&format!("[{}:1:{}]", t0, t1));
        }
        if let Some(altitude) = self.indices.altitude {
            constraint.push_str(&format!("[{}:1:{}]", altitude, altitude));
        }
        let (y0, y1) = self.indices.latitude;
        let (x0, x1) = self.indices.longitude;
        constraint.push_str(&format!("[{}:1:{}][{}:1:{}]", y0, y1, x0, x1));
        constraint
    }

    /// Full query URL.
    pub fn url(&self, base: &Url, extension: &str) -> Result<Url, XtractoError> {
        let mut url = griddap_url(base, self.descriptor, extension)?;
        url.set_query(Some(&self.constraint()));
        Ok(url)
    }
}
