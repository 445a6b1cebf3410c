//! HTTP client wrapper with timeout and retry.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{CloudError, Result};
use crate::retry::RetryPolicy;

/// HTTP client whose requests all go through one [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    retry: RetryPolicy,
}

impl HttpClient {
    pub fn new(retry: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .timeout(retry.timeout)
            .build()
            .map_err(|e| CloudError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, retry })
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// GET a resource and return its body.
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let client = &self.client;
        self.retry
            .run("http get", move || async move {
                debug!(url, "GET");
                let resp = check_status(client.get(url).send().await?, url)?;
                Ok(resp.bytes().await?.to_vec())
            })
            .await
    }

    /// GET a resource as text.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let bytes = self.get_bytes(url).await?;
        String::from_utf8(bytes)
            .map_err(|e| CloudError::InvalidResponse(format!("{url} is not UTF-8: {e}")))
    }

    /// GET a JSON document.
    pub async fn get_json<R: DeserializeOwned>(&self, url: &str) -> Result<R> {
        let bytes = self.get_bytes(url).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// POST a JSON body and decode a JSON response.
    pub async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let client = &self.client;
        let bytes = self
            .retry
            .run("http post", move || async move {
                debug!(url, "POST");
                let resp = client.post(url).json(body).send().await?;
                let resp = check_status(resp, url)?;
                Ok(resp.bytes().await?.to_vec())
            })
            .await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn check_status(resp: reqwest::Response, url: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(CloudError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        })
    }
}
