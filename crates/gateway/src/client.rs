//! REST client for the hosted tables.

use crate::error::GatewayError;
use crate::query::Query;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_RANGE};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
const PREFER: &str = "Prefer";

/// Connection settings for the hosted database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Project URL (e.g., "https://xyz.supabase.co").
    pub url: String,
    /// Public anon key sent as `apikey` and bearer token.
    pub anon_key: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl GatewayConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            timeout_secs: 15,
        }
    }

    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.url.trim().is_empty() || self.anon_key.trim().is_empty() {
            return Err(GatewayError::Config(
                "gateway url and anon key are required".to_string(),
            ));
        }
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(GatewayError::Config(format!(
                "gateway url must be http(s): {}",
                self.url
            )));
        }
        Ok(())
    }
}

/// Thin client issuing table queries and mutations.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl RestClient {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: format!("{}/rest/v1", config.url.trim_end_matches('/')),
            api_key: config.anon_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_headers(&self) -> Result<HeaderMap, GatewayError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|e| GatewayError::Config(format!("invalid api key: {}", e)))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| GatewayError::Config(format!("invalid api key: {}", e)))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }

    pub(crate) fn request(&self, method: Method, query: &Query) -> Result<RequestBuilder, GatewayError> {
        let url = format!("{}/{}", self.base_url, query.table());
        Ok(self
            .http
            .request(method, url)
            .headers(self.auth_headers()?)
            .query(query.params()))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, GatewayError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), body = %body, "Gateway request failed");
        Err(GatewayError::from_response(status.as_u16(), &body))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// All rows matching the query.
    pub async fn fetch_all<T: DeserializeOwned>(&self, query: &Query) -> Result<Vec<T>, GatewayError> {
        let response = self.send(self.request(Method::GET, query)?).await?;
        Self::decode(response).await
    }

    /// Exactly one row; zero rows yields `GatewayError::NotFound`.
    pub async fn fetch_single<T: DeserializeOwned>(&self, query: &Query) -> Result<T, GatewayError> {
        let request = self
            .request(Method::GET, query)?
            .header(ACCEPT, SINGLE_OBJECT);
        let response = self.send(request).await?;
        Self::decode(response).await
    }

    /// Zero or one row.
    pub async fn fetch_maybe_single<T: DeserializeOwned>(
        &self,
        query: &Query,
    ) -> Result<Option<T>, GatewayError> {
        match self.fetch_single(query).await {
            Ok(row) => Ok(Some(row)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Exact row count without transferring rows.
    pub async fn count(&self, query: &Query) -> Result<u64, GatewayError> {
        let request = self
            .request(Method::HEAD, query)?
            .header(PREFER, "count=exact");
        let response = self.send(request).await?;
        let range = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        Ok(parse_content_range(range).unwrap_or(0))
    }

    /// Insert one row and return its representation.
    pub async fn insert<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
    ) -> Result<T, GatewayError> {
        let request = self
            .request(Method::POST, &Query::from(table))?
            .header(PREFER, "return=representation")
            .header(ACCEPT, SINGLE_OBJECT)
            .json(body);
        let response = self.send(request).await?;
        Self::decode(response).await
    }

    /// Update the single row matching `query` and return it.
    pub async fn update_single<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        query: &Query,
        body: &B,
    ) -> Result<T, GatewayError> {
        let request = self
            .request(Method::PATCH, query)?
            .header(PREFER, "return=representation")
            .header(ACCEPT, SINGLE_OBJECT)
            .json(body);
        let response = self.send(request).await?;
        Self::decode(response).await
    }

    /// Update every row matching `query` without returning them.
    pub async fn update<B: Serialize + ?Sized>(&self, query: &Query, body: &B) -> Result<(), GatewayError> {
        let request = self
            .request(Method::PATCH, query)?
            .header(PREFER, "return=minimal")
            .json(body);
        self.send(request).await?;
        Ok(())
    }

    /// Insert or merge on the query's conflict target and return the row.
    pub async fn upsert<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        query: &Query,
        body: &B,
    ) -> Result<T, GatewayError> {
        let request = self
            .request(Method::POST, query)?
            .header(PREFER, "resolution=merge-duplicates,return=representation")
            .header(ACCEPT, SINGLE_OBJECT)
            .json(body);
        let response = self.send(request).await?;
        Self::decode(response).await
    }
}

/// Total from a `Content-Range` header such as `0-24/3573` or `*/0`.
pub fn parse_content_range(value: &str) -> Option<u64> {
    value.rsplit('/').next()?.trim().parse().ok()
}
