//! `reqwest`-backed [`RequestExecutor`] talking to the admin API.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;
use shared::{error::ApiException, protocol::HttpMethod};
use tracing::{debug, warn};
use url::Url;

use crate::RequestExecutor;

pub struct HttpRequestExecutor {
    http: Client,
    base_url: Url,
}

impl HttpRequestExecutor {
    /// `base_url` is the admin root that collection paths such as
    /// `api/locations/` are resolved against.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self> {
        let mut base_url =
            Url::parse(base_url).with_context(|| format!("invalid admin url: {base_url}"))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute self-links replace the base entirely.
    pub fn resolve(&self, resource: &str) -> Result<Url> {
        self.base_url
            .join(resource)
            .with_context(|| format!("invalid resource path: {resource}"))
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[async_trait]
impl RequestExecutor for HttpRequestExecutor {
    async fn execute(
        &self,
        method: HttpMethod,
        resource: &str,
        params: Option<Value>,
    ) -> Result<Value> {
        let url = self.resolve(resource)?;
        debug!(%method, %url, "http: sending request");

        let mut request = self.http.request(to_reqwest_method(method), url.clone());
        if let Some(params) = &params {
            request = request.json(params);
        }
        let response = request
            .send()
            .await
            .with_context(|| format!("{method} {url} failed"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("failed to read response body of {method} {url}"))?;

        if !status.is_success() {
            warn!(%method, %url, status = status.as_u16(), "http: request rejected");
            return Err(ApiException::from_status(status.as_u16(), body.trim()).into());
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).with_context(|| format!("invalid JSON returned by {method} {url}"))
    }
}

#[cfg(test)]
#[path = "tests/http_executor_tests.rs"]
mod tests;
