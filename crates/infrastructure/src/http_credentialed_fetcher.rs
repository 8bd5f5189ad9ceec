use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use tabwarden_application::{CredentialedFetcher, FetchedResponse};
use tabwarden_core::{AppError, AppResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Reqwest-based fetcher that carries ambient cookies across requests.
///
/// The client keeps a cookie jar, so the renewed cookie returned by the
/// refresh endpoint is retained and sent with every subsequent refresh.
/// This is the `credentials: include` equivalent for a headless client.
pub struct HttpCredentialedFetcher {
    http_client: reqwest::Client,
}

impl HttpCredentialedFetcher {
    /// Creates a fetcher with an enabled cookie jar and request timeout.
    pub fn new() -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| {
                AppError::Internal(format!("failed to build HTTP client: {error}"))
            })?;

        Ok(Self { http_client })
    }

    /// Creates a fetcher from a preconfigured client; the client must have
    /// a cookie jar enabled for credentials to stick across refreshes.
    #[must_use]
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl CredentialedFetcher for HttpCredentialedFetcher {
    async fn get(&self, url: &Url) -> AppResult<FetchedResponse> {
        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(|error| {
                AppError::Transport(format!("cookie refresh request failed: {error}"))
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|error| {
            AppError::Transport(format!("failed reading refresh response body: {error}"))
        })?;

        Ok(FetchedResponse { status, body })
    }
}
