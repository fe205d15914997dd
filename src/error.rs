//! Error handling.

use std::error::Error;
use strum_macros::Display;
use thiserror::Error;
use tracing::{event, Level};

/// Broad classification of an [XtractoError].
///
/// Every error is fatal to the call that raised it. The kind tells the caller whether anything
/// was fetched before the failure: validation, lookup and bounds errors are raised before any
/// network activity.
#[derive(Clone, Copy, Debug, Display, PartialEq)]
pub enum ErrorKind {
    /// Inconsistent or malformed request
    Validation,
    /// Unknown dataset
    NotFound,
    /// Requested region outside the dataset's coverage
    OutOfBounds,
    /// Fetching a response failed
    Transport,
    /// A response could not be decoded
    Decode,
}

/// Xtracto error type
///
/// This type encapsulates the various errors that may occur.
#[derive(Debug, Error)]
pub enum XtractoError {
    /// Error validating a request (single error)
    #[error("request is not valid")]
    ValidationSingle(#[from] validator::ValidationError),

    /// Error validating a request (multiple errors)
    #[error("request is not valid")]
    Validation(#[from] validator::ValidationErrors),

    /// A date could not be parsed
    #[error("invalid date {value}")]
    InvalidDate { value: String },

    /// A server URL could not be parsed
    #[error("invalid URL")]
    InvalidUrl(#[from] url::ParseError),

    /// Dataset name has no match in the registry
    #[error("dataset {name} not found in registry")]
    DatasetNotFound { name: String },

    /// Dataset index outside of [1, size]
    #[error("dataset index {index} out of range: registry holds datasets 1 to {size}")]
    DatasetIndexOutOfRange { index: usize, size: usize },

    /// Requested region exceeds the dataset's coverage
    #[error("requested {} outside the coverage of dataset {dataset}", .axes.join(", "))]
    OutOfBounds {
        dataset: String,
        axes: Vec<&'static str>,
    },

    /// Error building the HTTP client
    #[error("failed to build HTTP client")]
    HttpClient(#[from] reqwest::Error),

    /// Error performing an HTTP request
    #[error("failed to fetch {url}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server responded with an unsuccessful status
    #[error("request for {url} failed with status {status}")]
    HttpStatus { url: String, status: u16 },

    /// Error reading or writing a file
    #[error("file I/O failed")]
    Io(#[from] std::io::Error),

    /// Response is not valid JSON
    #[error("failed to decode grid response")]
    DecodeJson(#[from] serde_json::Error),

    /// Response does not contain an expected column or variable
    #[error("grid response has no {name}")]
    MissingVariable { name: String },

    /// A response cell could not be interpreted
    #[error("grid response column {column} holds invalid value {value}")]
    InvalidCell { column: String, value: String },

    /// Response values do not match its axes
    #[error("grid response holds {values} values but its axes describe {expected}")]
    ShapeMismatch { values: usize, expected: usize },

    /// A loaded coordinate axis contained no values
    #[error("{axis} axis of dataset {dataset} is empty")]
    EmptyAxis { dataset: String, axis: &'static str },

    /// Error building a grid array
    #[error("failed to create array from shape")]
    ShapeInvalid(#[from] ndarray::ShapeError),

    /// Error reading a netCDF file
    #[cfg(feature = "netcdf")]
    #[error("failed to decode netCDF file")]
    NetCdf(#[from] netcdf::Error),

    /// Error reading or writing CSV
    #[error("CSV error")]
    Csv(#[from] csv::Error),
}

impl XtractoError {
    /// Return the [ErrorKind] of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            XtractoError::ValidationSingle(_)
            | XtractoError::Validation(_)
            | XtractoError::InvalidDate { value: _ }
            | XtractoError::InvalidUrl(_)
            | XtractoError::Csv(_) => ErrorKind::Validation,

            XtractoError::DatasetNotFound { name: _ }
            | XtractoError::DatasetIndexOutOfRange { index: _, size: _ } => ErrorKind::NotFound,

            XtractoError::OutOfBounds {
                dataset: _,
                axes: _,
            } => ErrorKind::OutOfBounds,

            XtractoError::HttpClient(_)
            | XtractoError::Fetch { url: _, source: _ }
            | XtractoError::HttpStatus { url: _, status: _ }
            | XtractoError::Io(_) => ErrorKind::Transport,

            XtractoError::DecodeJson(_)
            | XtractoError::MissingVariable { name: _ }
            | XtractoError::InvalidCell {
                column: _,
                value: _,
            }
            | XtractoError::ShapeMismatch {
                values: _,
                expected: _,
            }
            | XtractoError::EmptyAxis {
                dataset: _,
                axis: _,
            }
            | XtractoError::ShapeInvalid(_) => ErrorKind::Decode,

            #[cfg(feature = "netcdf")]
            XtractoError::NetCdf(_) => ErrorKind::Decode,
        }
    }

    /// Return the message of this error followed by the messages of its causes.
    ///
    /// Consecutive duplicate messages are removed.
    pub fn chain(&self) -> Vec<String> {
        let mut messages = vec![self.to_string()];
        let mut current = self.source();
        while let Some(source) = current {
            messages.push(source.to_string());
            current = source.source();
        }
        messages.dedup();
        messages
    }

    /// Log this error and its causes.
    pub fn log(&self) {
        let mut messages = self.chain().into_iter();
        if let Some(message) = messages.next() {
            event!(Level::ERROR, kind = %self.kind(), "{}", message);
        }
        for cause in messages {
            event!(Level::ERROR, "Caused by: {}", cause);
        }
    }
}
