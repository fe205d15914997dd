//! Data types and associated functions and methods

use crate::error::XtractoError;
use crate::statistics::Summary;

use ndarray::Array3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use validator::{Validate, ValidationError};

/// Column names of a [ResultTable], in order.
pub const COLUMN_NAMES: [&str; 11] = [
    "mean",
    "stdev",
    "n",
    "satellite date",
    "lon min",
    "lon max",
    "lat min",
    "lat max",
    "requested date",
    "median",
    "mad",
];

/// A requested time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TimeRequest {
    /// An absolute instant
    At(OffsetDateTime),
    /// The final timestep of the dataset, minus the given number of steps
    Last(usize),
}

impl TimeRequest {
    /// The absolute instant, if any.
    pub fn instant(&self) -> Option<OffsetDateTime> {
        match self {
            TimeRequest::At(instant) => Some(*instant),
            TimeRequest::Last(_) => None,
        }
    }
}

impl FromStr for TimeRequest {
    type Err = XtractoError;

    /// Parse `last`, `last-N`, `YYYY-MM-DD` (midnight UTC) or an RFC 3339 timestamp.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || XtractoError::InvalidDate {
            value: s.to_string(),
        };
        let trimmed = s.trim();
        if let Some(offset) = trimmed.strip_prefix("last") {
            let offset = offset.trim();
            if offset.is_empty() {
                return Ok(TimeRequest::Last(0));
            }
            return offset
                .strip_prefix('-')
                .and_then(|steps| steps.trim().parse::<usize>().ok())
                .map(TimeRequest::Last)
                .ok_or_else(invalid);
        }
        if let Ok(instant) = OffsetDateTime::parse(trimmed, &Rfc3339) {
            return Ok(TimeRequest::At(instant));
        }
        let date_format = format_description!("[year]-[month]-[day]");
        Date::parse(trimmed, date_format)
            .map(|date| TimeRequest::At(date.midnight().assume_utc()))
            .map_err(|_| invalid())
    }
}

/// Parse every date of a request.
pub fn parse_dates(dates: &[String]) -> Result<Vec<TimeRequest>, XtractoError> {
    dates.iter().map(|date| date.parse()).collect()
}

/// An ordered sequence of points along which data is extracted.
///
/// Half widths are either a single value applied to every point or one value per point.
#[derive(Clone, Debug, PartialEq, Validate)]
#[validate(schema(function = "validate_trajectory"))]
pub struct Trajectory {
    /// Longitudes of the points, in either convention
    #[validate(length(min = 1, message = "trajectory must contain at least one point"))]
    pub longitudes: Vec<f64>,
    /// Latitudes of the points
    pub latitudes: Vec<f64>,
    /// Dates of the points, see [TimeRequest]
    pub dates: Vec<String>,
    /// Half widths of the search boxes in degrees of longitude
    pub x_half_widths: Vec<f64>,
    /// Half widths of the search boxes in degrees of latitude
    pub y_half_widths: Vec<f64>,
}

impl Trajectory {
    /// Return a new Trajectory object.
    pub fn new<S: Into<String>>(
        longitudes: Vec<f64>,
        latitudes: Vec<f64>,
        dates: Vec<S>,
        x_half_widths: Vec<f64>,
        y_half_widths: Vec<f64>,
    ) -> Self {
        Trajectory {
            longitudes,
            latitudes,
            dates: dates.into_iter().map(Into::into).collect(),
            x_half_widths,
            y_half_widths,
        }
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.longitudes.len()
    }

    /// Whether the trajectory has no points.
    pub fn is_empty(&self) -> bool {
        self.longitudes.is_empty()
    }

    /// Longitude half width of point `i`.
    pub fn x_half_width(&self, i: usize) -> f64 {
        per_point(&self.x_half_widths, i)
    }

    /// Latitude half width of point `i`.
    pub fn y_half_width(&self, i: usize) -> f64 {
        per_point(&self.y_half_widths, i)
    }
}

fn per_point(values: &[f64], i: usize) -> f64 {
    if values.len() == 1 {
        values[0]
    } else {
        values[i]
    }
}

/// Validate that half widths are scalar or per point, finite and not negative
fn validate_half_widths(half_widths: &[f64], len: usize) -> Result<(), ValidationError> {
    if half_widths.len() != 1 && half_widths.len() != len {
        let mut error =
            ValidationError::new("Half widths must be a single value or one value per point");
        error.add_param("half widths".into(), &half_widths.len());
        error.add_param("points".into(), &len);
        return Err(error);
    }
    if half_widths
        .iter()
        .any(|width| !width.is_finite() || *width < 0.0)
    {
        return Err(ValidationError::new(
            "Half widths must be finite and not negative",
        ));
    }
    Ok(())
}

/// Validate that every latitude is finite and lies in [-90, 90]
fn validate_latitudes(latitudes: &[f64]) -> Result<(), ValidationError> {
    if latitudes
        .iter()
        .any(|lat| !lat.is_finite() || lat.abs() > 90.0)
    {
        return Err(ValidationError::new("Latitudes must lie within [-90, 90]"));
    }
    Ok(())
}

/// Validate that every longitude is finite
fn validate_longitudes(longitudes: &[f64]) -> Result<(), ValidationError> {
    if longitudes.iter().any(|lon| !lon.is_finite()) {
        return Err(ValidationError::new("Longitudes must be finite"));
    }
    Ok(())
}

/// Validate trajectory
fn validate_trajectory(trajectory: &Trajectory) -> Result<(), ValidationError> {
    let len = trajectory.longitudes.len();
    if trajectory.latitudes.len() != len || trajectory.dates.len() != len {
        let mut error = ValidationError::new(
            "Longitude, latitude and date sequences must have the same length",
        );
        error.add_param("longitudes".into(), &len);
        error.add_param("latitudes".into(), &trajectory.latitudes.len());
        error.add_param("dates".into(), &trajectory.dates.len());
        return Err(error);
    }
    validate_half_widths(&trajectory.x_half_widths, len)?;
    validate_half_widths(&trajectory.y_half_widths, len)?;
    validate_longitudes(&trajectory.longitudes)?;
    validate_latitudes(&trajectory.latitudes)?;
    Ok(())
}

/// A closed interval `(min, max)`.
pub type Range = (f64, f64);

/// Validate that an interval is finite and ordered
fn validate_range(range: &Range) -> Result<(), ValidationError> {
    if !range.0.is_finite() || !range.1.is_finite() {
        return Err(ValidationError::new("Range bounds must be finite"));
    }
    if range.0 > range.1 {
        let mut error = ValidationError::new("Range minimum must not exceed maximum");
        error.add_param("min".into(), &range.0);
        error.add_param("max".into(), &range.1);
        return Err(error);
    }
    Ok(())
}

/// Request to extract every cell of a box.
#[derive(Clone, Debug, PartialEq, Validate)]
#[validate(schema(function = "validate_box_request"))]
pub struct BoxRequest {
    /// Longitude interval, in either convention
    #[validate(custom = "validate_range")]
    pub longitude: Range,
    /// Latitude interval
    #[validate(custom = "validate_range")]
    pub latitude: Range,
    /// First and last dates, see [TimeRequest]. Required for datasets with a time axis.
    pub time: Option<(String, String)>,
}

/// Validate box request
fn validate_box_request(request: &BoxRequest) -> Result<(), ValidationError> {
    validate_latitudes(&[request.latitude.0, request.latitude.1])
}

/// Request to extract every cell inside a polygon.
#[derive(Clone, Debug, PartialEq, Validate)]
#[validate(schema(function = "validate_polygon_request"))]
pub struct PolygonRequest {
    /// Longitudes of the vertices, in either convention
    #[validate(length(min = 3, message = "polygon must have at least 3 vertices"))]
    pub longitudes: Vec<f64>,
    /// Latitudes of the vertices
    pub latitudes: Vec<f64>,
    /// First and last dates, see [TimeRequest]. Required for datasets with a time axis.
    pub time: Option<(String, String)>,
}

/// Validate polygon request
fn validate_polygon_request(request: &PolygonRequest) -> Result<(), ValidationError> {
    if request.longitudes.len() != request.latitudes.len() {
        let mut error =
            ValidationError::new("Polygon longitudes and latitudes must have the same length");
        error.add_param("longitudes".into(), &request.longitudes.len());
        error.add_param("latitudes".into(), &request.latitudes.len());
        return Err(error);
    }
    validate_longitudes(&request.longitudes)?;
    validate_latitudes(&request.latitudes)
}

/// Summary of the cells around one trajectory point.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResultRow {
    /// Mean of valid cells
    pub mean: f64,
    /// Population standard deviation of valid cells
    pub stdev: f64,
    /// Number of valid cells
    pub n: usize,
    /// Time of the grid the cells were taken from
    #[serde(rename = "satellite date", with = "time::serde::rfc3339::option")]
    pub satellite_date: Option<OffsetDateTime>,
    /// Westernmost longitude of the requested box, in the dataset's convention
    #[serde(rename = "lon min")]
    pub lon_min: f64,
    /// Easternmost longitude of the requested box
    #[serde(rename = "lon max")]
    pub lon_max: f64,
    /// Southernmost latitude of the requested box
    #[serde(rename = "lat min")]
    pub lat_min: f64,
    /// Northernmost latitude of the requested box
    #[serde(rename = "lat max")]
    pub lat_max: f64,
    /// Date as requested for the point
    #[serde(rename = "requested date")]
    pub requested_date: String,
    /// Median of valid cells
    pub median: f64,
    /// Median absolute deviation of valid cells
    pub mad: f64,
}

impl ResultRow {
    /// Return a ResultRow object.
    pub fn new(
        summary: Summary,
        satellite_date: Option<OffsetDateTime>,
        longitude: Range,
        latitude: Range,
        requested_date: &str,
    ) -> Self {
        ResultRow {
            mean: summary.mean,
            stdev: summary.stdev,
            n: summary.count,
            satellite_date,
            lon_min: longitude.0,
            lon_max: longitude.1,
            lat_min: latitude.0,
            lat_max: latitude.1,
            requested_date: requested_date.to_string(),
            median: summary.median,
            mad: summary.mad,
        }
    }
}

/// A point whose row could not be computed.
#[derive(Clone, Debug, PartialEq)]
pub struct PointFailure {
    /// 0-based position of the point in the trajectory
    pub index: usize,
    /// Error message and causes
    pub message: String,
}

/// Rows of a trajectory extraction, one per point in input order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultTable {
    /// One row per point
    pub rows: Vec<ResultRow>,
    /// Points that failed in best-effort mode. Their rows hold undefined statistics.
    pub failures: Vec<PointFailure>,
}

impl ResultTable {
    /// Column names, in order.
    pub fn column_names(&self) -> &'static [&'static str] {
        &COLUMN_NAMES
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the table as CSV with a header row.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), XtractoError> {
        let mut writer = csv::Writer::from_writer(writer);
        for row in &self.rows {
            writer.serialize(row)?;
        }
        if self.rows.is_empty() {
            writer.write_record(COLUMN_NAMES)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Cells of a box or polygon.
#[derive(Clone, Debug, PartialEq)]
pub struct GridExtract {
    /// ERDDAP dataset ID
    pub dataset_id: String,
    /// Grid variable
    pub variable: String,
    /// Units of the grid variable
    pub units: String,
    /// Longitudes of the cells, in the dataset's convention
    pub longitudes: Vec<f64>,
    /// Latitudes of the cells, in the dataset's axis order
    pub latitudes: Vec<f64>,
    /// Times of the grids. Empty for grids without a time axis.
    pub times: Vec<OffsetDateTime>,
    /// Values shaped `(time, latitude, longitude)`; NaN marks missing or masked cells
    pub values: Array3<f64>,
}

impl GridExtract {
    /// Summary of every valid cell.
    pub fn summary(&self) -> Summary {
        Summary::of(&self.values, None)
    }

    /// Write the cells as CSV, one row per cell.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), XtractoError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(["time", "latitude", "longitude", self.variable.as_str()])?;
        for ((t, j, k), value) in self.values.indexed_iter() {
            let time = match self.times.get(t) {
                Some(time) => time.format(&Rfc3339).unwrap_or_default(),
                None => String::new(),
            };
            writer.write_record([
                time,
                self.latitudes[j].to_string(),
                self.longitudes[k].to_string(),
                value.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl fmt::Display for GridExtract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (nt, ny, nx) = self.values.dim();
        write!(
            f,
            "{} {} [{}]: {} times x {} latitudes x {} longitudes",
            self.dataset_id, self.variable, self.units, nt, ny, nx
        )
    }
}

/// A point of a trajectory file.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct TrackPoint {
    /// Longitude, in either convention
    #[serde(alias = "lon")]
    pub longitude: f64,
    /// Latitude
    #[serde(alias = "lat")]
    pub latitude: f64,
    /// Date, see [TimeRequest]
    #[serde(alias = "time")]
    pub date: String,
}

/// Read trajectory points from CSV with a header row.
pub fn read_track<R: std::io::Read>(reader: R) -> Result<Vec<TrackPoint>, XtractoError> {
    let mut reader = csv::Reader::from_reader(reader);
    let points = reader
        .deserialize()
        .collect::<Result<Vec<TrackPoint>, csv::Error>>()?;
    Ok(points)
}
