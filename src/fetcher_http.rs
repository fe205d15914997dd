use crate::error::XtractoError;
use crate::executor::Fetcher;

use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// HTTP fetcher.
///
/// Implements [Fetcher] for HTTP and HTTPS.
#[derive(Debug)]
pub struct HttpFetcher {
    reqwest_client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a new HTTP fetcher.
    ///
    /// # Arguments
    ///
    /// * `timeout`: Limit on the duration of each request, including reading the body
    pub fn new(timeout: Duration) -> Result<Self, XtractoError> {
        let reqwest_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { reqwest_client })
    }
}

impl Fetcher for HttpFetcher {
    /// Download `url` into `destination`.
    ///
    /// # Arguments
    ///
    /// * `url`: Query URL
    /// * `destination`: Scratch file to write the body to
    #[tracing::instrument(level = "DEBUG", skip(self, url), fields(url = %url))]
    async fn fetch(&self, url: &Url, destination: &Path) -> Result<u16, XtractoError> {
        let fetch_error = |source| XtractoError::Fetch {
            url: url.to_string(),
            source,
        };
        let response = self
            .reqwest_client
            .get(url.as_str())
            .send()
            .await
            .map_err(fetch_error)?;
        let status = response.status();
        debug!(status = status.as_u16(), "Response received");
        if !status.is_success() {
            return Err(XtractoError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await.map_err(fetch_error)?;
        tokio::fs::write(destination, &body).await?;
        Ok(status.as_u16())
    }
}
