//! reqwest client for the global library service.

use async_trait::async_trait;
use library_core::{Family, FileDescriptor};
use reqwest::{Client, Response};

use super::{decode_collection, GlobalSource};
use crate::error::{Result, SyncError};

/// HTTP client for the global library API.
#[derive(Clone)]
pub struct HttpGlobalClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpGlobalClient {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self::with_client(Client::new(), base_url, token)
    }

    pub fn with_client(client: Client, base_url: &str, token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Response> {
        let url = format!("{}/api/{}", self.base_url, path);
        let mut request = self.client.get(&url).query(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(SyncError::Backend { status, message });
        }

        Ok(resp)
    }
}

#[async_trait]
impl GlobalSource for HttpGlobalClient {
    async fn fetch_collection(&self, family: Family) -> Result<serde_json::Value> {
        tracing::debug!("Fetching {} from {}", family, self.base_url);
        self.get(family.endpoint(), &[])
            .await?
            .json()
            .await
            .map_err(|e| SyncError::Parse(e.to_string()))
    }

    async fn lookup_files(&self, ids: &[i64]) -> Result<Vec<FileDescriptor>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let joined = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let payload: serde_json::Value = self
            .get("files", &[("ids", joined)])
            .await?
            .json()
            .await
            .map_err(|e| SyncError::Parse(e.to_string()))?;
        decode_collection(payload)
    }

    async fn download_file(&self, id: i64) -> Result<Vec<u8>> {
        let bytes = self
            .get(&format!("files/{}", id), &[])
            .await?
            .bytes()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
