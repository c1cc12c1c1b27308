//! Trait abstractions over the host collaborators: the network and the
//! archive unpacker. Tests swap in mocks to simulate failures without a
//! network or a 7-Zip install.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use mwi_core::Error;

/// HTTP client trait for abstracting network operations.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Perform a GET request and return the response body as bytes.
    async fn get(&self, url: &str) -> Result<Vec<u8>, Error>;

    /// Perform a GET request with a timeout.
    async fn get_with_timeout(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, Error>;
}

/// Extracts an archive into a directory.
#[cfg_attr(test, automock)]
pub trait Unpacker: Send + Sync {
    fn unpack(&self, archive: &Path, dest_dir: &Path) -> Result<(), Error>;
}

/// Real HTTP client implementation using reqwest.
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(concat!("mingw-installer/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn send(&self, request: reqwest::RequestBuilder, url: &str) -> Result<Vec<u8>, Error> {
        let response = request.send().await.map_err(|e| Error::NetworkFailure {
            message: e.to_string(),
        })?;

        if !response.status().is_success() {
            return Err(Error::NetworkFailure {
                message: format!("HTTP {} for {}", response.status(), url),
            });
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| Error::NetworkFailure {
                message: e.to_string(),
            })
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>, Error> {
        self.send(self.client.get(url), url).await
    }

    async fn get_with_timeout(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, Error> {
        self.send(self.client.get(url).timeout(timeout), url).await
    }
}
