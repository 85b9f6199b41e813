//! HTTP fetcher: `GET <base_url>/<endpoint>?<params>` decoded as JSON.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::LoaderConfig;
use crate::error::FetchError;
use crate::fetcher::Fetcher;
use crate::query::Query;

/// Fetches a URL and returns the response body. Abstraction for testing.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// GET the URL; non-2xx statuses are errors.
    async fn get(&self, url: &Url) -> Result<String, FetchError>;
}

/// Reqwest-based HTTP client.
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(FetchError::from)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &Url) -> Result<String, FetchError> {
        let body = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}

/// Loads `T` from a JSON API rooted at `base_url`.
///
/// `Query::new("dashboard").param("f", "all")` against `http://localhost:3000/api/`
/// requests `http://localhost:3000/api/dashboard?f=all`.
pub struct HttpFetcher<T> {
    base_url: Url,
    client: Arc<dyn HttpClient>,
    _payload: PhantomData<fn() -> T>,
}

impl<T> HttpFetcher<T> {
    /// Reqwest client with the timeout and base URL from `config`.
    pub fn from_config(config: &LoaderConfig) -> Result<Self, FetchError> {
        let client = ReqwestHttpClient::new(config.http_timeout)?;
        Self::with_client(&config.base_url, Arc::new(client))
    }

    pub fn with_client(base_url: &str, client: Arc<dyn HttpClient>) -> Result<Self, FetchError> {
        let mut base_url =
            Url::parse(base_url).map_err(|e| FetchError::new(format!("base url: {}", e)))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            base_url,
            client,
            _payload: PhantomData,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves `query` to the URL that will be requested.
    pub fn url_for(&self, query: &Query) -> Result<Url, FetchError> {
        let endpoint = query.endpoint().trim_start_matches('/');
        let mut url = self
            .base_url
            .join(endpoint)
            .map_err(|e| FetchError::new(format!("endpoint {:?}: {}", endpoint, e)))?;
        if !query.params().is_empty() {
            url.query_pairs_mut().extend_pairs(query.params());
        }
        Ok(url)
    }
}

#[async_trait]
impl<T> Fetcher<Query, T> for HttpFetcher<T>
where
    T: DeserializeOwned + Send + 'static,
{
    async fn fetch(&self, query: &Query) -> Result<T, FetchError> {
        let url = self.url_for(query)?;
        tracing::debug!(url = %url, "GET");
        let body = self.client.get(&url).await?;
        Ok(serde_json::from_str(&body)?)
    }
}
