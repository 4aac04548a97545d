use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::BackendError;
use crate::retry::{execute_with_retry, RetryConfig};

/// Connection settings shared by the HTTP adapters.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub base_url: String,
    pub token: String,
    /// Per-request timeout. Callers bound whole operations separately.
    pub request_timeout: Duration,
    pub retry: RetryConfig,
}

impl HttpSettings {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            request_timeout: Duration::from_secs(10),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// JSON GET client with a fixed authorization header and retry policy.
#[derive(Debug, Clone)]
pub(crate) struct ApiClient {
    provider: &'static str,
    client: Client,
    base_url: String,
    retry: RetryConfig,
}

impl ApiClient {
    pub(crate) fn new(
        provider: &'static str,
        settings: &HttpSettings,
        authorization: String,
    ) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let mut auth = HeaderValue::from_str(&authorization)
            .map_err(|_| BackendError::Config(format!("{provider} token is not a valid header value")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| BackendError::transport(provider, err))?;

        Ok(Self {
            provider,
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            retry: settings.retry,
        })
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET `path` with `query`, retried on transient failures, decoded as
    /// `T`.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, BackendError> {
        let url = self.url(path);
        let target = url.as_str();
        execute_with_retry(&self.retry, target, move |_| self.get_once(target, query)).await
    }

    async fn get_once<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, BackendError> {
        debug!(provider = self.provider, url, ?query, "provider request");
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|err| BackendError::transport(self.provider, err))?;

        match response.status() {
            StatusCode::OK => response
                .json::<T>()
                .await
                .map_err(|err| BackendError::malformed(self.provider, err)),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(BackendError::Status {
                    provider: self.provider,
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}
