//! This crate provides a client for extracting satellite and model data from
//! [ERDDAP](https://coastwatch.pfeg.noaa.gov/erddap/) servers. Data can be summarised along an
//! animal track, extracted for a box, or extracted for a polygon. Only the cells needed are
//! requested from the server, so large gridded datasets never need to be downloaded in full.
//!
//! Datasets are described by a [registry](registry::Registry) holding their coverage and
//! conventions. Requests are checked against the registry before any query is sent.
//!
//! The client is built on top of a number of open source components.
//!
//! * [Tokio](tokio), the most popular asynchronous Rust runtime.
//! * [reqwest] performs HTTP requests against the ERDDAP griddap service.
//! * [Serde](serde) performs (de)serialisation of JSON responses, registries and CSV rows.
//! * [ndarray] provides [NumPy](https://numpy.org)-like n-dimensional arrays used in numerical
//!   computation, with statistics from [ndarray-stats](ndarray_stats).
//! * [geo] tests which grid cells lie inside a polygon.

pub mod axes;
pub mod bounds;
pub mod cli;
pub mod client;
pub mod decoder;
pub mod dedup;
pub mod error;
pub mod executor;
pub mod fetcher_http;
pub mod longitude;
pub mod metrics;
pub mod models;
pub mod query;
pub mod registry;
pub mod statistics;
#[cfg(test)]
pub mod test_utils;
pub mod tracing;
pub mod types;
pub mod xtracto;
pub mod xtracto_3d;
pub mod xtractogon;
