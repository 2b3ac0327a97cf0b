//! Fabric API client implementation.
//!
//! This module provides the HTTP client for the Fabric REST API. Each
//! operation accepts exactly the status codes the API documents for success;
//! anything else is reported and never retried.

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, trace};

use crate::config::DEFAULT_API_BASE_URL;
use crate::error::{FabricDeployError, FabricError, Result};

use super::api::WorkspaceApi;
use super::types::{CreateNotebookRequest, ListResponse, WorkspaceItem};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Fabric REST API client.
#[derive(Debug, Clone)]
pub struct FabricClient {
    /// HTTP client.
    client: Client,
    /// API base URL without trailing slash.
    base_url: String,
    /// Bearer token.
    token: String,
}

impl FabricClient {
    /// Creates a client for the public Fabric endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(token: &str) -> Result<Self> {
        Self::with_base_url(token, DEFAULT_API_BASE_URL, DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a client for a custom endpoint and timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_base_url(token: &str, base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| FabricError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Builds a full URL for an API path.
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Sends a request and checks the response status.
    async fn send(&self, operation: &str, request: RequestBuilder, expected: &[StatusCode]) -> Result<Response> {
        trace!("Sending request: {operation}");

        let response = request
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .send()
            .await
            .map_err(|e| FabricError::network(format!("{operation} failed: {e}")))?;

        let status = response.status();
        debug!("{operation} returned {status}");

        if expected.contains(&status) {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(FabricDeployError::Fabric(FabricError::AuthenticationFailed {
                message: format!("{operation} rejected with {status}: {body}"),
            }));
        }

        Err(FabricDeployError::Fabric(FabricError::unexpected_status(
            operation,
            status.as_u16(),
            body,
        )))
    }

    /// Fetches every page of a list endpoint.
    ///
    /// A continuation token seen before means the server is cycling and the
    /// listing fails instead of looping.
    async fn list_all(&self, operation: &str, path: &str) -> Result<Vec<WorkspaceItem>> {
        let mut items = Vec::new();
        let mut continuation: Option<String> = None;
        let mut seen_tokens = HashSet::new();

        loop {
            let mut request = self.client.get(self.url(path));
            if let Some(token) = &continuation {
                request = request.query(&[("continuationToken", token.as_str())]);
            }

            let response = self.send(operation, request, &[StatusCode::OK]).await?;
            let page: ListResponse<WorkspaceItem> = response.json().await.map_err(|e| {
                FabricError::InvalidResponse {
                    message: format!("Failed to parse {operation} response: {e}"),
                }
            })?;

            items.extend(page.value);

            match page.continuation_token.filter(|t| !t.is_empty()) {
                Some(token) => {
                    if !seen_tokens.insert(token.clone()) {
                        return Err(FabricError::InvalidResponse {
                            message: format!("{operation} repeated continuation token '{token}'"),
                        }
                        .into());
                    }
                    continuation = Some(token);
                }
                None => break,
            }
        }

        Ok(items)
    }
}

#[async_trait]
impl WorkspaceApi for FabricClient {
    async fn list_items(&self, workspace_id: &str) -> Result<Vec<WorkspaceItem>> {
        self.list_all("list items", &format!("workspaces/{workspace_id}/items"))
            .await
    }

    async fn list_lakehouses(&self, workspace_id: &str) -> Result<Vec<WorkspaceItem>> {
        self.list_all("list lakehouses", &format!("workspaces/{workspace_id}/lakehouses"))
            .await
    }

    async fn create_lakehouse(&self, workspace_id: &str, definition: &serde_json::Value) -> Result<String> {
        let request = self
            .client
            .post(self.url(&format!("workspaces/{workspace_id}/lakehouses")))
            .json(definition);

        let response = self
            .send("create lakehouse", request, &[StatusCode::CREATED])
            .await?;

        let created: WorkspaceItem = response.json().await.map_err(|e| FabricError::InvalidResponse {
            message: format!("Failed to parse create lakehouse response: {e}"),
        })?;

        Ok(created.id)
    }

    async fn delete_lakehouse(&self, workspace_id: &str, lakehouse_id: &str) -> Result<()> {
        let request = self
            .client
            .delete(self.url(&format!("workspaces/{workspace_id}/lakehouses/{lakehouse_id}")));

        self.send("delete lakehouse", request, &[StatusCode::OK]).await?;
        Ok(())
    }

    async fn create_notebook(&self, workspace_id: &str, request: &CreateNotebookRequest) -> Result<()> {
        let http_request = self
            .client
            .post(self.url(&format!("workspaces/{workspace_id}/items")))
            .json(request);

        self.send(
            "create notebook",
            http_request,
            &[StatusCode::CREATED, StatusCode::ACCEPTED],
        )
        .await?;
        Ok(())
    }
}
