//! Profile fetch boundary
//!
//! The orchestrator and the health probe only see [`ProfileFetcher`]. The
//! production implementation, [`HttpProfileFetcher`], reads profiles from a
//! JSON profile service; tests plug in scripted fetchers.

use crate::config::IDENTITY_PLACEHOLDER;
use crate::error::FetchError;
use crate::types::Profile;
use tokio_util::sync::CancellationToken;

/// Abstraction over profile fetching, enabling testability.
#[async_trait::async_trait]
pub trait ProfileFetcher: Send + Sync {
    /// Fetch the profile for `identity` using `credential`.
    ///
    /// `cancel` fires when the watchdog gives up on this call; implementations
    /// should stop work and return [`FetchError::Cancelled`] when it does.
    async fn fetch_profile(
        &self,
        identity: &str,
        credential: &str,
        cancel: CancellationToken,
    ) -> Result<Profile, FetchError>;
}

/// Production [`ProfileFetcher`] backed by an HTTP profile service.
///
/// `GET <endpoint with {identity} substituted>` with the credential sent as a
/// `sessionid` cookie. 404 means the identity does not exist; any other
/// non-success status is a transient failure.
#[derive(Clone, Debug)]
pub struct HttpProfileFetcher {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpProfileFetcher {
    /// Create a fetcher for an endpoint template containing `{identity}`
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    /// Create a fetcher with a preconfigured client
    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// URL requested for `identity`
    pub fn profile_url(&self, identity: &str) -> String {
        self.endpoint
            .replace(IDENTITY_PLACEHOLDER, &urlencoding::encode(identity))
    }

    async fn request(&self, identity: &str, credential: &str) -> Result<Profile, FetchError> {
        let url = self.profile_url(identity);
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::COOKIE, format!("sessionid={credential}"))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound {
                identity: identity.to_string(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

#[async_trait::async_trait]
impl ProfileFetcher for HttpProfileFetcher {
    async fn fetch_profile(
        &self,
        identity: &str,
        credential: &str,
        cancel: CancellationToken,
    ) -> Result<Profile, FetchError> {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(identity, "Profile request aborted");
                Err(FetchError::Cancelled)
            }
            result = self.request(identity, credential) => result,
        }
    }
}
