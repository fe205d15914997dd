use crate::error::XtractoError;
use crate::executor::Fetcher;
use crate::models::ResultRow;
use crate::registry::{DatasetDescriptor, GridKind, Registry};

use serde_json::{json, Value};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::macros::datetime;
use time::OffsetDateTime;
use url::Url;

/// Create a time series DatasetDescriptor covering the synthetic grid.
pub(crate) fn get_test_descriptor() -> DatasetDescriptor {
    DatasetDescriptor {
        name: "testSst".to_string(),
        dataset_id: "testSst".to_string(),
        title: "Test SST".to_string(),
        variable: "sst".to_string(),
        units: "degree_C".to_string(),
        kind: GridKind::GriddedTimeSeries,
        lon_360: true,
        lat_south: false,
        has_altitude: true,
        lon_min: 229.0,
        lon_max: 236.0,
        lat_min: 39.0,
        lat_max: 46.0,
        min_time: Some(datetime!(2006-01-10 0:00 UTC)),
        max_time: Some(datetime!(2006-01-25 0:00 UTC)),
        missing: None,
        base_url: None,
    }
}

/// Create a bathymetry DatasetDescriptor with only required fields set.
pub(crate) fn get_test_bathymetry_descriptor() -> DatasetDescriptor {
    DatasetDescriptor {
        name: "testTopo".to_string(),
        dataset_id: "testTopo".to_string(),
        title: String::new(),
        variable: "altitude".to_string(),
        units: String::new(),
        kind: GridKind::BathymetryGrid,
        lon_360: false,
        lat_south: false,
        has_altitude: false,
        lon_min: -180.0,
        lon_max: 180.0,
        lat_min: -90.0,
        lat_max: 90.0,
        min_time: None,
        max_time: None,
        missing: None,
        base_url: None,
    }
}

/// Create a Registry holding the test descriptors.
pub(crate) fn get_test_registry() -> Registry {
    Registry::new(
        "test",
        vec![get_test_descriptor(), get_test_bathymetry_descriptor()],
    )
    .unwrap()
}

/// Base URL of the mock server.
pub(crate) fn get_test_base_url() -> Url {
    Url::parse("https://erddap.example.com/erddap/").unwrap()
}

/// Times of the synthetic grid.
pub(crate) fn get_test_times() -> Vec<OffsetDateTime> {
    vec![
        datetime!(2006-01-10 0:00 UTC),
        datetime!(2006-01-15 0:00 UTC),
        datetime!(2006-01-20 0:00 UTC),
        datetime!(2006-01-25 0:00 UTC),
    ]
}

fn steps(first: f64, last: f64, step: f64) -> Vec<f64> {
    let count = ((last - first) / step).round() as usize + 1;
    (0..count).map(|i| first + i as f64 * step).collect()
}

/// Axis values of the synthetic datasets.
fn synthetic_axis(dataset: &str, axis: &str) -> Vec<Value> {
    match (dataset, axis) {
        ("testSst", "longitude") => steps(229.0, 236.0, 0.5).into_iter().map(Value::from).collect(),
        ("testSst", "latitude") => steps(39.0, 46.0, 0.5).into_iter().map(Value::from).collect(),
        ("testSst", "altitude") => vec![json!(0.0)],
        ("testSst", "time") => get_test_times()
            .into_iter()
            .map(|t| json!(t.format(&Rfc3339).unwrap()))
            .collect(),
        ("testTopo", "longitude") => steps(-180.0, 180.0, 1.0).into_iter().map(Value::from).collect(),
        ("testTopo", "latitude") => steps(-90.0, 90.0, 1.0).into_iter().map(Value::from).collect(),
        _ => vec![],
    }
}

/// Value of a synthetic grid cell, derived from its indices.
pub(crate) fn synthetic_value(time: usize, lat: usize, lon: usize) -> f64 {
    10.0 + time as f64 + 0.1 * lat as f64 + 0.01 * lon as f64
}

/// Parse a `[start:stride:stop]` constraint.
fn parse_dimension(dimension: &str) -> (usize, usize) {
    let parts: Vec<&str> = dimension.trim_end_matches(']').split(':').collect();
    (parts[0].parse().unwrap(), parts[2].parse().unwrap())
}

/// Respond to axis and grid queries against the synthetic datasets as ERDDAP `.json` would.
pub(crate) fn synthetic_response(url: &Url) -> Result<String, XtractoError> {
    let dataset = url
        .path()
        .rsplit('/')
        .next()
        .unwrap()
        .trim_end_matches(".json")
        .to_string();
    let query = url.query().unwrap();
    let mut parts = query.split('[');
    let variable = parts.next().unwrap();
    let dimensions: Vec<&str> = parts.collect();

    if query.ends_with("[0:1:last]") {
        let rows: Vec<Value> = synthetic_axis(&dataset, variable)
            .into_iter()
            .map(|value| json!([value]))
            .collect();
        return Ok(json!({"table": {"columnNames": [variable], "rows": rows}}).to_string());
    }

    let axis_names: Vec<&str> = if dataset == "testSst" {
        vec!["time", "altitude", "latitude", "longitude"]
    } else {
        vec!["latitude", "longitude"]
    };
    let ranges: Vec<(usize, usize)> = dimensions.iter().map(|d| parse_dimension(d)).collect();
    assert_eq!(axis_names.len(), ranges.len(), "unexpected query {}", query);
    let axes: Vec<Vec<Value>> = axis_names
        .iter()
        .map(|name| synthetic_axis(&dataset, name))
        .collect();

    let mut rows = vec![];
    let cells: usize = ranges.iter().map(|(first, last)| last - first + 1).product();
    for cell in 0..cells {
        // Unravel the cell number into indices, last dimension fastest.
        let mut remainder = cell;
        let mut indices = vec![0; ranges.len()];
        for (d, (first, last)) in ranges.iter().enumerate().rev() {
            let len = last - first + 1;
            indices[d] = first + remainder % len;
            remainder /= len;
        }
        let mut row: Vec<Value> = indices
            .iter()
            .zip(&axes)
            .map(|(i, axis)| axis[*i].clone())
            .collect();
        let n = indices.len();
        let time = if n == 4 { indices[0] } else { 0 };
        row.push(json!(synthetic_value(time, indices[n - 2], indices[n - 1])));
        rows.push(Value::Array(row));
    }
    let mut column_names: Vec<&str> = axis_names.clone();
    column_names.push(variable);
    Ok(json!({"table": {"columnNames": column_names, "rows": rows}}).to_string())
}

type Responder = Box<dyn Fn(&Url) -> Result<String, XtractoError>>;

/// Fetcher serving canned responses and recording every request.
pub(crate) struct MockFetcher {
    responder: Responder,
    /// URLs fetched, in order
    pub urls: RefCell<Vec<Url>>,
    /// Scratch files written, in order
    pub destinations: RefCell<Vec<PathBuf>>,
}

impl MockFetcher {
    pub(crate) fn new(responder: impl Fn(&Url) -> Result<String, XtractoError> + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            urls: RefCell::new(vec![]),
            destinations: RefCell::new(vec![]),
        }
    }

    /// Serve the synthetic datasets.
    pub(crate) fn synthetic() -> Self {
        Self::new(synthetic_response)
    }

    /// Number of grid queries fetched.
    pub(crate) fn grid_queries(&self) -> usize {
        self.urls
            .borrow()
            .iter()
            .filter(|url| !url.query().unwrap_or_default().ends_with("[0:1:last]"))
            .count()
    }

    /// Number of queries of any kind fetched.
    pub(crate) fn queries(&self) -> usize {
        self.urls.borrow().len()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &Url, destination: &Path) -> Result<u16, XtractoError> {
        self.urls.borrow_mut().push(url.clone());
        self.destinations
            .borrow_mut()
            .push(destination.to_path_buf());
        let body = (self.responder)(url)?;
        std::fs::write(destination, body)?;
        Ok(200)
    }
}

/// Assert that two rows are equal bit for bit, NaN included.
pub(crate) fn assert_identical(expected: &ResultRow, actual: &ResultRow) {
    let bits = |row: &ResultRow| {
        [
            row.mean, row.stdev, row.lon_min, row.lon_max, row.lat_min, row.lat_max, row.median,
            row.mad,
        ]
        .map(f64::to_bits)
    };
    assert_eq!(bits(expected), bits(actual));
    assert_eq!(expected.n, actual.n);
    assert_eq!(expected.satellite_date, actual.satellite_date);
    assert_eq!(expected.requested_date, actual.requested_date);
}
