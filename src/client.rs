//! Client configuration and façade.

use crate::cli::CommandLineArgs;
use crate::decoder::{GridDecoder, JsonDecoder};
use crate::dedup::Deduplication;
use crate::error::XtractoError;
use crate::executor::Fetcher;
use crate::fetcher_http::HttpFetcher;
use crate::models::{BoxRequest, GridExtract, PolygonRequest, ResultTable, Trajectory};
use crate::registry::{DatasetDescriptor, DatasetId, Registry};
use crate::{xtracto, xtracto_3d, xtractogon};

use std::time::Duration;
use url::Url;

/// ERDDAP server used unless configured otherwise.
pub const DEFAULT_BASE_URL: &str = "https://coastwatch.pfeg.noaa.gov/erddap/";

/// What happens when fetching or decoding the cells of a trajectory point fails.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum FailureMode {
    /// Abort the extraction
    #[default]
    FailFast,
    /// Emit a row with undefined statistics, record the failure and continue
    BestEffort,
}

/// Client configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientConfig {
    /// ERDDAP server for datasets that do not name their own
    pub base_url: Url,
    /// Limit on the duration of each request
    pub timeout: Duration,
    /// Which rows are reused by later trajectory points
    pub deduplication: Deduplication,
    /// Handling of per-point failures
    pub failure_mode: FailureMode,
    /// Log every query at INFO level
    pub verbose: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL to be valid"),
            timeout: Duration::from_secs(120),
            deduplication: Deduplication::default(),
            failure_mode: FailureMode::default(),
            verbose: false,
        }
    }
}

impl ClientConfig {
    /// Build a configuration from command line arguments.
    pub fn from_args(args: &CommandLineArgs) -> Result<Self, XtractoError> {
        let deduplication = match args.lru_capacity {
            Some(capacity) => Deduplication::Lru { capacity },
            None => Deduplication::Previous,
        };
        let failure_mode = if args.best_effort {
            FailureMode::BestEffort
        } else {
            FailureMode::FailFast
        };
        Ok(Self {
            base_url: Url::parse(&args.base_url)?,
            timeout: Duration::from_secs(args.timeout),
            deduplication,
            failure_mode,
            verbose: args.verbose,
        })
    }
}

/// Extracts data from the datasets of a registry.
///
/// The fetcher and decoder default to HTTP and ERDDAP `.json` responses.
pub struct Xtractor<F: Fetcher = HttpFetcher, D: GridDecoder = JsonDecoder> {
    registry: Registry,
    fetcher: F,
    decoder: D,
    config: ClientConfig,
}

impl Xtractor {
    /// Create an Xtractor fetching over HTTP and decoding JSON.
    pub fn new(registry: Registry, config: ClientConfig) -> Result<Self, XtractoError> {
        let fetcher = HttpFetcher::new(config.timeout)?;
        Ok(Self::with_parts(registry, fetcher, JsonDecoder, config))
    }
}

impl<F: Fetcher, D: GridDecoder> Xtractor<F, D> {
    /// Create an Xtractor from its parts.
    pub fn with_parts(registry: Registry, fetcher: F, decoder: D, config: ClientConfig) -> Self {
        Self {
            registry,
            fetcher,
            decoder,
            config,
        }
    }

    /// The registry datasets are looked up in.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The fetcher queries are sent through.
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Summarise the cells around every point of a trajectory.
    ///
    /// See [xtracto::extract_along_trajectory].
    pub async fn xtracto(
        &self,
        trajectory: &Trajectory,
        dataset: &DatasetId,
    ) -> Result<ResultTable, XtractoError> {
        xtracto::extract_along_trajectory(
            &self.registry,
            &self.fetcher,
            &self.decoder,
            &self.config,
            trajectory,
            dataset,
        )
        .await
    }

    /// Extract every cell of a box.
    ///
    /// See [xtracto_3d::extract_box].
    pub async fn xtracto_3d(
        &self,
        request: &BoxRequest,
        dataset: &DatasetId,
    ) -> Result<GridExtract, XtractoError> {
        xtracto_3d::extract_box(
            &self.registry,
            &self.fetcher,
            &self.decoder,
            &self.config,
            request,
            dataset,
        )
        .await
    }

    /// Extract every cell inside a polygon.
    ///
    /// See [xtractogon::extract_polygon].
    pub async fn xtractogon(
        &self,
        request: &PolygonRequest,
        dataset: &DatasetId,
    ) -> Result<GridExtract, XtractoError> {
        xtractogon::extract_polygon(
            &self.registry,
            &self.fetcher,
            &self.decoder,
            &self.config,
            request,
            dataset,
        )
        .await
    }

    /// Datasets matching every keyword, with their 1-based indices.
    pub fn search(&self, keywords: &[&str]) -> Vec<(usize, &DatasetDescriptor)> {
        self.registry.search(keywords)
    }

    /// Descriptor of a dataset.
    pub fn info(&self, dataset: &DatasetId) -> Result<&DatasetDescriptor, XtractoError> {
        self.registry.lookup(dataset)
    }
}
