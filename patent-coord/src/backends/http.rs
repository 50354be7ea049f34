//! Remote backend reached over HTTP.
//!
//! Posts the [`BackendRequest`] as JSON to `{base_url}/search` and expects a
//! [`BackendResponse`] body. Suits search bots deployed as services.

use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::backend::{BackendCapability, BackendRequest, BackendResponse};
use crate::error::CoordError;

/// Connection settings for an [`HttpBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpBackendConfig {
    pub base_url: String,
    /// Sent as a bearer token when set.
    pub api_key: Option<String>,
    /// Client-level request timeout in seconds.
    pub timeout_seconds: u64,
    /// Custom User-Agent string. If `None`, the crate name and version.
    pub user_agent: Option<String>,
}

impl HttpBackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            timeout_seconds: 60,
            user_agent: None,
        }
    }
}

/// A backend that delegates to a remote search service.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    name: String,
    endpoint: Url,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpBackend {
    /// Build a backend for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`CoordError::Config`] if the base URL is invalid or the
    /// timeout is zero, and [`CoordError::Http`] if the client cannot be
    /// constructed.
    pub fn new(name: impl Into<String>, config: &HttpBackendConfig) -> Result<Self, CoordError> {
        if config.timeout_seconds == 0 {
            return Err(CoordError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        Ok(Self {
            name: name.into(),
            endpoint: search_endpoint(&config.base_url)?,
            api_key: config.api_key.clone(),
            client: build_client(config)?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn post(&self, request: &BackendRequest) -> Result<BackendResponse, CoordError> {
        let mut builder = self.client.post(self.endpoint.clone()).json(request);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| CoordError::Http(format!("request to {} failed: {e}", self.name)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoordError::Http(format!(
                "{} returned HTTP {}",
                self.name,
                status.as_u16()
            )));
        }

        response
            .json::<BackendResponse>()
            .await
            .map_err(|e| CoordError::Http(format!("invalid response from {}: {e}", self.name)))
    }
}

#[async_trait]
impl BackendCapability for HttpBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(
        &self,
        request: &BackendRequest,
        cancel: &CancellationToken,
    ) -> Result<BackendResponse, CoordError> {
        tokio::select! {
            () = cancel.cancelled() => Err(CoordError::Cancelled("search".to_owned())),
            response = self.post(request) => response,
        }
    }
}

/// Resolve `{base_url}/search`, keeping any path prefix on the base.
fn search_endpoint(base_url: &str) -> Result<Url, CoordError> {
    let mut base = Url::parse(base_url)
        .map_err(|e| CoordError::Config(format!("invalid backend url {base_url}: {e}")))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("search")
        .map_err(|e| CoordError::Config(format!("invalid backend url {base_url}: {e}")))
}

/// Build a [`reqwest::Client`] for backend requests.
///
/// # Errors
///
/// Returns [`CoordError::Http`] if the client cannot be constructed.
fn build_client(config: &HttpBackendConfig) -> Result<reqwest::Client, CoordError> {
    let ua = match config.user_agent {
        Some(ref custom) => custom.clone(),
        None => concat!("patent-coord/", env!("CARGO_PKG_VERSION")).to_owned(),
    };

    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(ua)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| CoordError::Http(format!("failed to build HTTP client: {e}")))
}
