//! HTTP transport for OAI-PMH requests.

use std::time::Duration;

use reqwest::blocking::Client;

use crate::config::{DEFAULT_MAX_RESPONSE_SIZE, HTTP_TIMEOUT_SECS};
use crate::error::{HarvesterError, Result};

/// User agent string identifying this harvester.
const USER_AGENT: &str = concat!("pmc-harvester/", env!("CARGO_PKG_VERSION"));

/// Fetch-by-URL capability used by the harvest client.
///
/// Implementations return the response body of a successful request and an
/// error for unreachable hosts and non-success statuses. They must not
/// retry; failures propagate to the harvest caller.
pub trait Fetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

impl<F: Fetcher + ?Sized> Fetcher for &F {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        (**self).fetch(url)
    }
}

/// Create a configured HTTP client.
pub fn create_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|source| HarvesterError::Transport {
            url: String::new(),
            source,
        })
}

/// [`Fetcher`] backed by a blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_response_size: u64,
}

impl HttpFetcher {
    /// Fetcher with the default client and response size limit.
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(create_client()?, DEFAULT_MAX_RESPONSE_SIZE))
    }

    #[must_use]
    pub fn with_client(client: Client, max_response_size: u64) -> Self {
        Self {
            client,
            max_response_size,
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let transport = |source| HarvesterError::Transport {
            url: url.to_string(),
            source,
        };

        tracing::debug!(url, "GET");
        let response = self.client.get(url).send().map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvesterError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let too_large = |size| HarvesterError::ResponseTooLarge {
            url: url.to_string(),
            size,
            limit: self.max_response_size,
        };

        if let Some(length) = response.content_length() {
            if length > self.max_response_size {
                return Err(too_large(length));
            }
        }

        let bytes = response.bytes().map_err(transport)?;
        let size = bytes.len() as u64;
        if size > self.max_response_size {
            return Err(too_large(size));
        }

        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_client() {
        let client = create_client();
        assert!(client.is_ok());
    }

    #[test]
    fn test_user_agent_has_version() {
        assert!(USER_AGENT.starts_with("pmc-harvester/"));
    }
}
