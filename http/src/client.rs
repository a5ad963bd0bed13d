//! OData HTTP client implementation

use crate::error::ClientError;
use odata_source_core::fetch::{FetchError, ResourceFetcher, ResourcePage};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// reqwest-based fetch collaborator
///
/// Issues a `GET` for the fully built request URL and decodes the OData JSON
/// envelope. Timeouts are enforced here; the orchestrator never cancels a
/// request.
#[derive(Clone, Debug)]
pub struct ODataHttpClient {
    client: Client,
}

impl ODataHttpClient {
    /// Create a client with default settings and no timeout
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Wrap an already configured reqwest client
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Start configuring a client
    #[must_use]
    pub fn builder() -> ODataHttpClientBuilder {
        ODataHttpClientBuilder::default()
    }

    /// Fetch one page of a resource
    ///
    /// # Errors
    ///
    /// - [`FetchError::Transport`] when the request cannot be completed
    ///   (connection failure, timeout)
    /// - [`FetchError::Status`] for a non-success status, with the response body
    /// - [`FetchError::Decode`] when the body is not a valid OData envelope
    pub async fn fetch_page<T>(&self, url: &str) -> Result<ResourcePage<T>, FetchError>
    where
        T: DeserializeOwned,
    {
        tracing::debug!(%url, "GET");

        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FetchError::transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::debug!(status = status.as_u16(), "Request rejected");
            return Err(FetchError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<ResourcePage<T>>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}

impl Default for ODataHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ResourceFetcher<T> for ODataHttpClient
where
    T: DeserializeOwned + Send + 'static,
{
    fn fetch(
        &self,
        url: String,
    ) -> Pin<Box<dyn Future<Output = Result<ResourcePage<T>, FetchError>> + Send + '_>> {
        Box::pin(async move { self.fetch_page(&url).await })
    }
}

/// Builder for [`ODataHttpClient`]
#[derive(Debug, Default)]
pub struct ODataHttpClientBuilder {
    timeout: Option<Duration>,
    bearer_token: Option<String>,
    user_agent: Option<String>,
}

impl ODataHttpClientBuilder {
    /// Fail requests that take longer than `timeout`
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Send `Authorization: Bearer <token>` with every request
    #[must_use]
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Override the `User-Agent` header
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Build the client
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidHeader`] when the token cannot be sent as
    /// a header, or [`ClientError::Build`] when reqwest rejects the settings.
    pub fn build(self) -> Result<ODataHttpClient, ClientError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.bearer_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                ClientError::InvalidHeader {
                    name: "authorization",
                    reason: e.to_string(),
                }
            })?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = self.user_agent {
            builder = builder.user_agent(user_agent);
        }

        let client = builder
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;
        Ok(ODataHttpClient::with_client(client))
    }
}
