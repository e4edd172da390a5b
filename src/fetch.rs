use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use std::time::Duration;

pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                              (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
pub const MAX_REDIRECTS: usize = 5;
pub const SCAN_TIMEOUT: Duration = Duration::from_secs(20);
pub const CHECK_TIMEOUT: Duration = Duration::from_secs(15);

/// Outcome of a single GET. `status == 0` means the request never produced
/// an HTTP response; `body` then carries the transport error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::new(0, reason)
    }

    pub fn is_transport_failure(&self) -> bool {
        self.status == 0
    }
}

/// Something that can GET a page. Failures are folded into the response
/// rather than returned as errors; there are no retries.
pub trait Fetch: Send + Sync {
    fn fetch(&self, url: &str) -> FetchResponse;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> FetchResponse {
        let response = match self.client.get(url).send() {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(url, error = %e, "fetch failed");
                return FetchResponse::failed(e.to_string());
            }
        };
        let status = response.status().as_u16();
        match response.text() {
            Ok(body) => {
                tracing::debug!(url, status, bytes = body.len(), "fetched");
                FetchResponse::new(status, body)
            }
            Err(e) => {
                tracing::debug!(url, status, error = %e, "body read failed");
                FetchResponse::failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::{Fetch, FetchResponse};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned responses keyed by URL; unknown URLs fail like a refused connection.
    #[derive(Default)]
    pub struct CannedFetcher {
        pages: HashMap<String, FetchResponse>,
        pub requested: Mutex<Vec<String>>,
    }

    impl CannedFetcher {
        pub fn with(mut self, url: &str, status: u16, body: &str) -> Self {
            self.pages
                .insert(url.to_string(), FetchResponse::new(status, body));
            self
        }
    }

    impl Fetch for CannedFetcher {
        fn fetch(&self, url: &str) -> FetchResponse {
            self.requested
                .lock()
                .unwrap()
                .push(url.to_string());
            self.pages
                .get(url)
                .cloned()
                .unwrap_or_else(|| FetchResponse::failed("connection refused"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_response_is_transport_failure() {
        let response = FetchResponse::failed("timed out");
        assert!(response.is_transport_failure());
        assert_eq!(response.body, "timed out");
        assert!(!FetchResponse::new(404, "").is_transport_failure());
    }

    #[test]
    fn test_http_fetcher_builds() {
        assert!(HttpFetcher::new(CHECK_TIMEOUT).is_ok());
    }
}
