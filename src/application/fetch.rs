//! Single-attempt upstream fetch with a bounded total timeout.

use std::time::Duration;

use bytes::Bytes;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("upstream returned status {status}")]
    Upstream { status: u16 },
    #[error("upstream unreachable: {source}")]
    Unreachable {
        #[source]
        source: reqwest::Error,
    },
}

/// Thin wrapper over a shared `reqwest` client. One GET per inbound
/// request, full body buffered, no retries; connections may be reused
/// across requests but nothing else is shared.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
}

impl UpstreamClient {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// Fetch the document behind `url`. A non-200 status is surfaced
    /// verbatim as [`FetchError::Upstream`]; network-level failure
    /// (DNS, refused connection, timeout) as [`FetchError::Unreachable`].
    pub async fn fetch(&self, url: &Url) -> Result<Bytes, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| FetchError::Unreachable { source })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            debug!(
                target = "riquadro::fetch",
                url = %url,
                status = status.as_u16(),
                "upstream returned non-200"
            );
            return Err(FetchError::Upstream {
                status: status.as_u16(),
            });
        }

        response
            .bytes()
            .await
            .map_err(|source| FetchError::Unreachable { source })
    }
}
