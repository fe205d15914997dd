//! Dataset registry.
//!
//! The registry is a versioned, read-only table of [DatasetDescriptor]s. It is loaded once, either
//! from the table embedded in the crate or from a JSON file, and passed by reference to every
//! extraction.

use crate::error::XtractoError;
use crate::types::Missing;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use url::Url;
use validator::{Validate, ValidationError};

/// Registry embedded in the crate.
const BUILTIN_REGISTRY: &str = include_str!("../data/registry.json");

/// Layout of a grid dataset.
///
/// Resolved once when the descriptor is looked up, and used to select the query shape.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GridKind {
    /// Time series of grids, optionally with an altitude axis
    #[default]
    GriddedTimeSeries,
    /// Static grid with longitude and latitude axes only
    BathymetryGrid,
}

/// Metadata describing one ERDDAP grid dataset.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[serde(deny_unknown_fields)]
#[validate(schema(function = "validate_descriptor"))]
pub struct DatasetDescriptor {
    /// Registry key
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    /// ERDDAP dataset ID
    #[validate(length(min = 1, message = "dataset_id must not be empty"))]
    pub dataset_id: String,
    /// Human readable title
    #[serde(default)]
    pub title: String,
    /// Grid variable to extract
    #[validate(length(min = 1, message = "variable must not be empty"))]
    pub variable: String,
    /// Units of the grid variable
    #[serde(default)]
    pub units: String,
    /// Layout of the grid
    #[serde(default)]
    pub kind: GridKind,
    /// Whether longitudes are in [0, 360) rather than [-180, 180)
    pub lon_360: bool,
    /// Whether the latitude axis is stored north to south
    #[serde(default)]
    pub lat_south: bool,
    /// Whether the grid has an altitude axis between time and latitude
    #[serde(default)]
    pub has_altitude: bool,
    /// Westernmost longitude covered
    pub lon_min: f64,
    /// Easternmost longitude covered
    pub lon_max: f64,
    /// Southernmost latitude covered
    pub lat_min: f64,
    /// Northernmost latitude covered
    pub lat_max: f64,
    /// First time covered
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub min_time: Option<OffsetDateTime>,
    /// Last time covered
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub max_time: Option<OffsetDateTime>,
    /// Description of missing data beyond the NaN/null cells of a response
    #[serde(default)]
    pub missing: Option<Missing<f64>>,
    /// ERDDAP server hosting the dataset, if not the configured default
    #[serde(default)]
    pub base_url: Option<Url>,
}

impl DatasetDescriptor {
    /// Whether requests against this dataset carry a time axis.
    pub fn has_time(&self) -> bool {
        self.kind == GridKind::GriddedTimeSeries
    }

    /// Whether every keyword occurs in the name, ID, title or variable, ignoring case.
    fn matches(&self, keywords: &[&str]) -> bool {
        let haystack = format!(
            "{} {} {} {}",
            self.name, self.dataset_id, self.title, self.variable
        )
        .to_lowercase();
        keywords
            .iter()
            .all(|keyword| haystack.contains(&keyword.to_lowercase()))
    }
}

impl fmt::Display for DatasetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({})", self.name, self.dataset_id)?;
        if !self.title.is_empty() {
            writeln!(f, "  title:      {}", self.title)?;
        }
        writeln!(f, "  variable:   {} [{}]", self.variable, self.units)?;
        writeln!(
            f,
            "  longitude:  {} to {} ({})",
            self.lon_min,
            self.lon_max,
            if self.lon_360 { "0-360" } else { "-180-180" }
        )?;
        writeln!(
            f,
            "  latitude:   {} to {}{}",
            self.lat_min,
            self.lat_max,
            if self.lat_south { " (north to south)" } else { "" }
        )?;
        if let (Some(min_time), Some(max_time)) = (self.min_time, self.max_time) {
            writeln!(
                f,
                "  time:       {} to {}",
                min_time.format(&Rfc3339).map_err(|_| fmt::Error)?,
                max_time.format(&Rfc3339).map_err(|_| fmt::Error)?
            )?;
        }
        if self.has_altitude {
            writeln!(f, "  altitude:   yes")?;
        }
        Ok(())
    }
}

/// Validate the relationships between descriptor fields.
fn validate_descriptor(descriptor: &DatasetDescriptor) -> Result<(), ValidationError> {
    if descriptor.lon_min >= descriptor.lon_max {
        let mut error = ValidationError::new("lon_min must be less than lon_max");
        error.add_param("lon_min".into(), &descriptor.lon_min);
        error.add_param("lon_max".into(), &descriptor.lon_max);
        return Err(error);
    }
    if descriptor.lat_min >= descriptor.lat_max {
        let mut error = ValidationError::new("lat_min must be less than lat_max");
        error.add_param("lat_min".into(), &descriptor.lat_min);
        error.add_param("lat_max".into(), &descriptor.lat_max);
        return Err(error);
    }
    match (descriptor.kind, descriptor.min_time, descriptor.max_time) {
        (GridKind::GriddedTimeSeries, Some(min_time), Some(max_time)) => {
            if min_time > max_time {
                return Err(ValidationError::new(
                    "min_time must not be later than max_time",
                ));
            }
        }
        (GridKind::GriddedTimeSeries, _, _) => {
            return Err(ValidationError::new(
                "gridded time series require min_time and max_time",
            ));
        }
        (GridKind::BathymetryGrid, _, _) => (),
    }
    if let Some(missing) = &descriptor.missing {
        missing.validate()?;
    }
    Ok(())
}

/// Identifies a dataset in a [Registry].
#[derive(Clone, Debug, PartialEq)]
pub enum DatasetId {
    /// Exact registry name
    Name(String),
    /// 1-based position in the registry
    Index(usize),
}

impl FromStr for DatasetId {
    type Err = std::convert::Infallible;

    /// Parse a dataset ID. Anything that is not an unsigned integer is a name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(DatasetId::from(s))
    }
}

impl From<&str> for DatasetId {
    /// Same as [FromStr], so that clap parses `150` as an index.
    fn from(id: &str) -> Self {
        match id.parse::<usize>() {
            Ok(index) => DatasetId::Index(index),
            Err(_) => DatasetId::Name(id.to_string()),
        }
    }
}

impl From<usize> for DatasetId {
    fn from(index: usize) -> Self {
        DatasetId::Index(index)
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetId::Name(name) => write!(f, "{}", name),
            DatasetId::Index(index) => write!(f, "#{}", index),
        }
    }
}

/// Versioned table of dataset descriptors.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Registry {
    /// Version of the metadata table
    pub version: String,
    /// Descriptors in registry order
    datasets: Vec<DatasetDescriptor>,
}

impl Registry {
    /// Return a registry holding `datasets`.
    pub fn new(version: &str, datasets: Vec<DatasetDescriptor>) -> Result<Self, XtractoError> {
        let registry = Registry {
            version: version.to_string(),
            datasets,
        };
        registry.validate()?;
        Ok(registry)
    }

    /// Return the registry embedded in the crate.
    pub fn builtin() -> Result<Self, XtractoError> {
        Self::from_reader(BUILTIN_REGISTRY.as_bytes())
    }

    /// Read a registry from JSON.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, XtractoError> {
        let registry: Registry = serde_json::from_reader(reader)?;
        registry.validate()?;
        Ok(registry)
    }

    /// Read a registry from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self, XtractoError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    fn validate(&self) -> Result<(), XtractoError> {
        for descriptor in &self.datasets {
            descriptor.validate()?;
        }
        Ok(())
    }

    /// Number of datasets in the registry.
    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    /// Whether the registry holds no datasets.
    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Iterate over the datasets with their 1-based indices.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &DatasetDescriptor)> {
        self.datasets
            .iter()
            .enumerate()
            .map(|(i, descriptor)| (i + 1, descriptor))
    }

    /// Look up a dataset by name or 1-based index.
    pub fn lookup(&self, id: &DatasetId) -> Result<&DatasetDescriptor, XtractoError> {
        match id {
            DatasetId::Name(name) => self
                .datasets
                .iter()
                .find(|descriptor| descriptor.name == *name)
                .ok_or_else(|| XtractoError::DatasetNotFound { name: name.clone() }),
            DatasetId::Index(index) => index
                .checked_sub(1)
                .and_then(|i| self.datasets.get(i))
                .ok_or(XtractoError::DatasetIndexOutOfRange {
                    index: *index,
                    size: self.datasets.len(),
                }),
        }
    }

    /// Return the datasets matching every keyword, with their 1-based indices.
    pub fn search(&self, keywords: &[&str]) -> Vec<(usize, &DatasetDescriptor)> {
        self.iter()
            .filter(|(_, descriptor)| descriptor.matches(keywords))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;
    use crate::error::ErrorKind;
    use serde_test::{assert_de_tokens, assert_de_tokens_error, Token};

    #[test]
    fn test_required_fields() {
        let descriptor = test_utils::get_test_bathymetry_descriptor();
        assert_de_tokens(
            &descriptor,
            &[
                Token::Struct {
                    name: "DatasetDescriptor",
                    len: 9,
                },
                Token::Str("name"),
                Token::Str("testTopo"),
                Token::Str("dataset_id"),
                Token::Str("testTopo"),
                Token::Str("variable"),
                Token::Str("altitude"),
                Token::Str("kind"),
                Token::Enum { name: "GridKind" },
                Token::Str("bathymetry_grid"),
                Token::Unit,
                Token::Str("lon_360"),
                Token::Bool(false),
                Token::Str("lon_min"),
                Token::F64(-180.0),
                Token::Str("lon_max"),
                Token::F64(180.0),
                Token::Str("lat_min"),
                Token::F64(-90.0),
                Token::Str("lat_max"),
                Token::F64(90.0),
                Token::StructEnd,
            ],
        );
        descriptor.validate().unwrap()
    }

    #[test]
    fn test_missing_variable() {
        assert_de_tokens_error::<DatasetDescriptor>(
            &[
                Token::Struct {
                    name: "DatasetDescriptor",
                    len: 2,
                },
                Token::Str("name"),
                Token::Str("foo"),
                Token::Str("dataset_id"),
                Token::Str("foo"),
                Token::StructEnd,
            ],
            "missing field `variable`",
        )
    }

    #[test]
    fn test_invalid_kind() {
        assert_de_tokens_error::<DatasetDescriptor>(
            &[
                Token::Struct {
                    name: "DatasetDescriptor",
                    len: 2,
                },
                Token::Str("kind"),
                Token::Enum { name: "GridKind" },
                Token::Str("foo"),
                Token::StructEnd,
            ],
            "unknown variant `foo`, expected `gridded_time_series` or `bathymetry_grid`",
        )
    }

    #[test]
    #[should_panic(expected = "gridded time series require min_time and max_time")]
    fn test_time_series_without_times() {
        let mut descriptor = test_utils::get_test_descriptor();
        descriptor.max_time = None;
        descriptor.validate().unwrap()
    }

    #[test]
    #[should_panic(expected = "lat_min must be less than lat_max")]
    fn test_invalid_latitudes() {
        let mut descriptor = test_utils::get_test_descriptor();
        descriptor.lat_min = 50.0;
        descriptor.validate().unwrap()
    }

    #[test]
    #[should_panic(expected = "variable must not be empty")]
    fn test_empty_variable() {
        let mut descriptor = test_utils::get_test_descriptor();
        descriptor.variable = "".to_string();
        descriptor.validate().unwrap()
    }

    #[test]
    fn test_json_fields() {
        let json = r#"{"name": "testSst", "dataset_id": "testSst", "title": "Test SST", "variable": "sst", "units": "degree_C", "lon_360": true, "has_altitude": true, "lon_min": 229.0, "lon_max": 236.0, "lat_min": 39.0, "lat_max": 46.0, "min_time": "2006-01-10T00:00:00Z", "max_time": "2006-01-25T00:00:00Z"}"#;
        let descriptor = serde_json::from_str::<DatasetDescriptor>(json).unwrap();
        assert_eq!(descriptor, test_utils::get_test_descriptor());
    }

    #[test]
    fn test_builtin() {
        let registry = Registry::builtin().unwrap();
        assert!(!registry.is_empty());
        let etopo = registry.lookup(&"ETOPO180".into()).unwrap();
        assert_eq!(GridKind::BathymetryGrid, etopo.kind);
        assert!(!etopo.has_time());
    }

    #[test]
    fn test_lookup_name() {
        let registry = test_utils::get_test_registry();
        let descriptor = registry.lookup(&"testTopo".into()).unwrap();
        assert_eq!("testTopo", descriptor.name);
    }

    #[test]
    fn test_lookup_index() {
        let registry = test_utils::get_test_registry();
        assert_eq!("testSst", registry.lookup(&1.into()).unwrap().name);
        assert_eq!("testTopo", registry.lookup(&2.into()).unwrap().name);
    }

    #[test]
    fn test_lookup_unknown_name() {
        let registry = test_utils::get_test_registry();
        let error = registry.lookup(&"foo".into()).unwrap_err();
        assert_eq!(ErrorKind::NotFound, error.kind());
        assert!(error.to_string().contains("foo"));
    }

    #[test]
    fn test_lookup_index_out_of_range() {
        let registry = test_utils::get_test_registry();
        for index in [0, 3, 150] {
            let error = registry.lookup(&index.into()).unwrap_err();
            assert_eq!(ErrorKind::NotFound, error.kind());
            let message = error.to_string();
            assert!(message.contains(&index.to_string()));
            assert!(message.contains("1 to 2"));
        }
    }

    #[test]
    fn test_dataset_id_from_str() {
        assert_eq!(DatasetId::Index(150), "150".parse().unwrap());
        assert_eq!(
            DatasetId::Name("erdBAssta5day".to_string()),
            "erdBAssta5day".parse().unwrap()
        );
        assert_eq!(DatasetId::Index(150), DatasetId::from("150"));
        assert_eq!(DatasetId::Name("-1".to_string()), DatasetId::from("-1"));
    }

    #[test]
    fn test_search() {
        let registry = test_utils::get_test_registry();
        let found = registry.search(&["SST"]);
        assert_eq!(1, found.len());
        assert_eq!(1, found[0].0);
        assert!(registry.search(&["sst", "altitude"]).is_empty());
        assert_eq!(2, registry.search(&[]).len());
    }

    #[test]
    fn test_from_reader_invalid() {
        let json = r#"{"version": "1", "datasets": [{"name": "a", "dataset_id": "a", "variable": "v", "lon_360": false, "lon_min": 10.0, "lon_max": 0.0, "lat_min": 0.0, "lat_max": 1.0, "kind": "bathymetry_grid"}]}"#;
        let error = Registry::from_reader(json.as_bytes()).unwrap_err();
        assert_eq!(ErrorKind::Validation, error.kind());
    }

    #[test]
    fn test_display() {
        let descriptor = test_utils::get_test_descriptor();
        let info = descriptor.to_string();
        assert!(info.starts_with("testSst (testSst)"));
        assert!(info.contains("sst [degree_C]"));
        assert!(info.contains("2006-01-10T00:00:00Z"));
    }
}
