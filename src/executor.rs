//! Griddap query execution.
//!
//! Every query is downloaded into a scratch file which is decoded and then removed, whether or
//! not decoding succeeds.

use crate::axes::{GridAxes, ResolvedIndices};
use crate::decoder::{GridData, GridDecoder};
use crate::error::XtractoError;
use crate::metrics::{QUERIES, RESPONSES};
use crate::query::{axis_url, GridQuery};
use crate::registry::DatasetDescriptor;

use ndarray::Array3;
use std::path::Path;
use tracing::{debug, info};
use url::Url;

/// Fetcher trait.
///
/// Defines the interface for downloading query responses.
pub trait Fetcher {
    /// Download `url` into the file at `destination`, returning the response status.
    ///
    /// # Arguments
    ///
    /// * `url`: Query URL
    /// * `destination`: Existing scratch file to overwrite with the response body
    fn fetch(
        &self,
        url: &Url,
        destination: &Path,
    ) -> impl std::future::Future<Output = Result<u16, XtractoError>>;
}

/// Runs the queries of a single extraction.
pub struct QueryExecutor<'a, F: Fetcher, D: GridDecoder> {
    fetcher: &'a F,
    decoder: &'a D,
    base_url: &'a Url,
    verbose: bool,
}

impl<'a, F: Fetcher, D: GridDecoder> QueryExecutor<'a, F, D> {
    /// Returns a new QueryExecutor
    ///
    /// # Arguments
    ///
    /// * `fetcher`: Downloads responses
    /// * `decoder`: Decodes responses
    /// * `base_url`: ERDDAP server for datasets that do not name their own
    /// * `verbose`: Log every query at INFO rather than DEBUG level
    pub fn new(fetcher: &'a F, decoder: &'a D, base_url: &'a Url, verbose: bool) -> Self {
        Self {
            fetcher,
            decoder,
            base_url,
            verbose,
        }
    }

    fn log(&self, message: &str, url: &Url, status: Option<u16>) {
        if self.verbose {
            info!(%url, status, "{}", message);
        } else {
            debug!(%url, status, "{}", message);
        }
    }

    async fn fetch_and_decode(&self, url: &Url, variable: &str) -> Result<GridData, XtractoError> {
        let scratch = tempfile::Builder::new()
            .prefix("xtracto-")
            .suffix(&format!(".{}", self.decoder.extension()))
            .tempfile()?;
        self.log("Fetching", url, None);
        let status = self.fetcher.fetch(url, scratch.path()).await?;
        RESPONSES.with_label_values(&[&status.to_string()]).inc();
        self.log("Fetched", url, Some(status));
        // The scratch file is removed when dropped on return.
        self.decoder.decode(scratch.path(), variable)
    }

    async fn load_axis(
        &self,
        descriptor: &DatasetDescriptor,
        axis: &'static str,
    ) -> Result<Vec<f64>, XtractoError> {
        let url = axis_url(self.base_url, descriptor, self.decoder.extension(), axis)?;
        QUERIES.with_label_values(&["axis"]).inc();
        let data = self.fetch_and_decode(&url, axis).await?;
        if data.values.is_empty() {
            return Err(XtractoError::EmptyAxis {
                dataset: descriptor.dataset_id.clone(),
                axis,
            });
        }
        Ok(data.values)
    }

    /// Load the coordinate axes of a dataset.
    #[tracing::instrument(level = "DEBUG", skip_all, fields(dataset = %descriptor.dataset_id))]
    pub async fn load_axes(&self, descriptor: &DatasetDescriptor) -> Result<GridAxes, XtractoError> {
        let longitude = self.load_axis(descriptor, "longitude").await?;
        let latitude = self.load_axis(descriptor, "latitude").await?;
        let time = if descriptor.has_time() {
            self.load_axis(descriptor, "time").await?
        } else {
            vec![]
        };
        let altitude = if descriptor.has_altitude {
            Some(self.load_axis(descriptor, "altitude").await?)
        } else {
            None
        };
        Ok(GridAxes {
            longitude,
            latitude,
            time,
            altitude,
        })
    }

    /// Fetch the cells at `indices`, shaped `(time, latitude, longitude)`.
    pub async fn fetch_grid(
        &self,
        descriptor: &DatasetDescriptor,
        indices: &ResolvedIndices,
    ) -> Result<Array3<f64>, XtractoError> {
        let url = GridQuery::new(descriptor, *indices).url(self.base_url, self.decoder.extension())?;
        QUERIES.with_label_values(&["grid"]).inc();
        let array = self
            .fetch_and_decode(&url, &descriptor.variable)
            .await?
            .into_array3()?;
        let (nt, ny, nx) = indices.shape();
        if array.dim() != (nt, ny, nx) {
            return Err(XtractoError::ShapeMismatch {
                values: array.len(),
                expected: nt * ny * nx,
            });
        }
        Ok(array)
    }
}
