//! Thin `reqwest` client over the HTTP API.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{CliError, CliResult};

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    async fn handle_response<R: DeserializeOwned>(&self, url: &str, response: reqwest::Response) -> CliResult<R> {
        let status = response.status();
        let bytes = response.bytes().await.map_err(|source| CliError::Request { url: url.to_string(), source })?;
        if !status.is_success() {
            let message = serde_json::from_slice::<Value>(&bytes)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
                .unwrap_or_else(|| String::from_utf8_lossy(&bytes).to_string());
            return Err(CliError::Api { status: status.as_u16(), message });
        }
        serde_json::from_slice(&bytes).map_err(|e| CliError::Other(anyhow::anyhow!("malformed response: {e}")))
    }

    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> CliResult<R> {
        let url = format!("{}{path}", self.base_url);
        let response = self.http.get(&url).send().await.map_err(|source| CliError::Request { url: url.clone(), source })?;
        self.handle_response(&url, response).await
    }

    pub async fn post<B: serde::Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> CliResult<R> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| CliError::Request { url: url.clone(), source })?;
        self.handle_response(&url, response).await
    }

    pub async fn delete<R: DeserializeOwned>(&self, path: &str) -> CliResult<R> {
        let url = format!("{}{path}", self.base_url);
        let response = self.http.delete(&url).send().await.map_err(|source| CliError::Request { url: url.clone(), source })?;
        self.handle_response(&url, response).await
    }

    /// `DELETE` with no expected response body, used by `/index/` reset.
    pub async fn delete_empty(&self, path: &str) -> CliResult<()> {
        let url = format!("{}{path}", self.base_url);
        let response = self.http.delete(&url).send().await.map_err(|source| CliError::Request { url: url.clone(), source })?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CliError::Api { status: status.as_u16(), message });
        }
        Ok(())
    }

    /// Liveness probe used by `status`/`list`: true if anything answers `/health/`.
    pub async fn is_reachable(&self) -> bool {
        let url = format!("{}/health/", self.base_url);
        matches!(self.http.get(&url).send().await, Ok(resp) if resp.status().is_success())
    }
}
