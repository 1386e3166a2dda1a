//! HTTP transport for the FogBugz API.
//!
//! The client only ever needs one primitive: fetch a URL with `GET` and
//! return the body as text. Keeping it behind a trait lets the session and
//! response handling be exercised without a network.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use super::error::{ApiError, Result};

/// Fixed request deadline in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Something that can fetch a URL and hand back the response body.
pub trait Transport {
    /// Perform a `GET` of `url` and return the body text.
    ///
    /// Implementations map an exceeded deadline to `ApiError::Timeout`.
    /// An empty body is returned as an empty string; interpreting it is
    /// the caller's job.
    fn get(&self, url: &str) -> impl Future<Output = Result<String>> + Send;
}

/// The `reqwest`-backed transport used outside of tests.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Build a transport with the fixed 10 second deadline.
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Build a transport with a custom deadline.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Network)?;
        Ok(Self { client, timeout })
    }

    /// The configured request deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn map_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.timeout)
        } else {
            ApiError::Network(err)
        }
    }
}

impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        debug!(%status, "Received response");

        // FogBugz reports failures in the XML body, so the status code is
        // only logged. An unreadable body is treated like an empty one.
        match response.text().await {
            Ok(body) => Ok(body),
            Err(e) if e.is_timeout() => Err(self.map_error(e)),
            Err(e) => {
                debug!("Failed to read response body: {}", e);
                Ok(String::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeout_is_ten_seconds() {
        let transport = HttpTransport::new().unwrap();
        assert_eq!(transport.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_custom_timeout() {
        let transport = HttpTransport::with_timeout(Duration::from_millis(250)).unwrap();
        assert_eq!(transport.timeout(), Duration::from_millis(250));
    }
}
