//! Persistence adapter for the remote Postgres-over-HTTP endpoint
//!
//! Every query is a single POST of `{query, params}`; the service substitutes
//! `$1, $2, ...` server-side and answers with a `data` array of rows.
//! Network errors, non-2xx statuses and malformed bodies all come back as
//! `Err` values. There is no retry, backoff or timeout configuration: one
//! attempt per call.

use crate::config::QUERY_ENDPOINT;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Credentials sent with every remote request
#[derive(Clone)]
pub struct RemoteCredentials {
    pub bearer_token: String,
    pub app_id: String,
    pub usage_key: String,
}

impl fmt::Debug for RemoteCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteCredentials")
            .field("bearer_token", &"<redacted>")
            .field("app_id", &self.app_id)
            .field("usage_key", &"<redacted>")
            .finish()
    }
}

/// Executes parameterized queries against a remote database
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, query: &str, params: Vec<Value>) -> Result<Vec<Value>>;
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    params: &'a [Value],
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    data: Option<Vec<Value>>,
}

/// HTTP implementation of the persistence adapter
#[derive(Clone)]
pub struct HttpPersistence {
    client: reqwest::Client,
    endpoint: String,
    credentials: RemoteCredentials,
}

impl HttpPersistence {
    pub fn new(base_url: &str, credentials: RemoteCredentials) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            endpoint: endpoint_url(base_url, QUERY_ENDPOINT),
            credentials,
        })
    }
}

#[async_trait]
impl QueryExecutor for HttpPersistence {
    async fn execute(&self, query: &str, params: Vec<Value>) -> Result<Vec<Value>> {
        let request = self
            .client
            .post(&self.endpoint)
            .json(&QueryRequest {
                query,
                params: &params,
            });

        let response = authorize(request, &self.credentials).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Database query failed: {}", status);
            return Err(AppError::Remote(format!("HTTP {}", status.as_u16())));
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| AppError::Remote(format!("Malformed query response: {}", e)))?;

        Ok(body.data.unwrap_or_default())
    }
}

/// Executor used when no remote credentials are configured
#[derive(Debug, Clone, Copy, Default)]
pub struct DisconnectedExecutor;

#[async_trait]
impl QueryExecutor for DisconnectedExecutor {
    async fn execute(&self, _query: &str, _params: Vec<Value>) -> Result<Vec<Value>> {
        Err(AppError::Remote(
            "Remote persistence is not configured".to_string(),
        ))
    }
}

pub(crate) fn build_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!("goaltracker/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

pub(crate) fn endpoint_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// Attach the bearer token and the app / usage identification headers
pub(crate) fn authorize(
    request: reqwest::RequestBuilder,
    credentials: &RemoteCredentials,
) -> reqwest::RequestBuilder {
    request
        .bearer_auth(&credentials.bearer_token)
        .header("X-Generated-App-ID", &credentials.app_id)
        .header("X-Usage-Key", &credentials.usage_key)
}
