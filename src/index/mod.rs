//! Elasticsearch-compatible search index connector: fetch raw log
//! documents and write annotated rows back.

pub mod document;

pub use document::{BulkOutcome, TimeRange};

use crate::config::IndexConfig;
use crate::record::AnnotatedRecord;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("no index hosts configured")]
    NoHosts,

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("search index at {url} is unreachable: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },
}

pub struct IndexClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
}

impl IndexClient {
    /// Build a client for the first configured host. No request is made.
    pub fn new(config: &IndexConfig) -> Result<Self, IndexError> {
        let host = config.hosts.first().ok_or(IndexError::NoHosts)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_certs)
            .build()
            .map_err(IndexError::Client)?;

        Ok(Self {
            client,
            base_url: host.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// Build a client and make sure the cluster answers.
    pub async fn connect(config: &IndexConfig) -> Result<Self, IndexError> {
        let client = Self::new(config)?;
        let cluster = client.ping().await?;
        info!(url = %client.base_url, %cluster, "connected to search index");
        Ok(client)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.basic_auth(&self.username, Some(&self.password))
    }

    async fn send(&self, url: &str, req: RequestBuilder) -> Result<reqwest::Response, IndexError> {
        let resp = self
            .authed(req)
            .send()
            .await
            .map_err(|source| IndexError::Request {
                url: url.to_string(),
                source,
            })?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(IndexError::Status {
                url: url.to_string(),
                status,
                body,
            });
        }
        Ok(resp)
    }

    async fn json(&self, url: &str, resp: reqwest::Response) -> Result<Value, IndexError> {
        resp.json().await.map_err(|source| IndexError::Request {
            url: url.to_string(),
            source,
        })
    }

    /// Cluster name reported by the root endpoint.
    pub async fn ping(&self) -> Result<String, IndexError> {
        let url = self.url("/");
        let resp = self
            .authed(self.client.get(&url))
            .send()
            .await
            .map_err(|source| IndexError::Unreachable {
                url: url.clone(),
                source,
            })?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(IndexError::Status { url, status, body });
        }
        let info = self.json(&url, resp).await?;
        Ok(info["cluster_name"].as_str().unwrap_or("unknown").to_string())
    }

    /// Search `index_pattern` and return each hit's source with its `_id`.
    pub async fn fetch_logs(
        &self,
        index_pattern: &str,
        time_range: Option<&TimeRange>,
        query: Option<&Value>,
        size: usize,
    ) -> Result<Vec<Value>, IndexError> {
        let url = self.url(&format!("{index_pattern}/_search"));
        let body = document::search_body(size, time_range, query);
        debug!(%url, %body, "searching index");

        let resp = self.send(&url, self.client.post(&url).json(&body)).await?;
        let response = self.json(&url, resp).await?;
        let docs = document::hits_to_documents(&response);
        info!(index = index_pattern, documents = docs.len(), "fetched logs from index");
        Ok(docs)
    }

    async fn ensure_index(&self, index: &str) -> Result<(), IndexError> {
        let url = self.url(index);
        let resp = self
            .authed(self.client.head(&url))
            .send()
            .await
            .map_err(|source| IndexError::Request {
                url: url.clone(),
                source,
            })?;
        if resp.status() != StatusCode::NOT_FOUND {
            return Ok(());
        }

        self.send(&url, self.client.put(&url).json(&document::index_mappings()))
            .await?;
        info!(index, "created index with security analysis mappings");
        Ok(())
    }

    /// Create `index` with the analysis mapping if needed, then bulk-index
    /// one document per row.
    pub async fn write_analysis_results(
        &self,
        rows: &[AnnotatedRecord],
        index: &str,
    ) -> Result<BulkOutcome, IndexError> {
        if rows.is_empty() {
            return Ok(BulkOutcome::default());
        }
        self.ensure_index(index).await?;

        let analysis_timestamp = chrono::Utc::now().to_rfc3339();
        let body = document::bulk_body(rows, index, &analysis_timestamp);
        let url = self.url("_bulk");
        let resp = self
            .send(
                &url,
                self.client
                    .post(&url)
                    .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
                    .body(body),
            )
            .await?;
        let outcome = BulkOutcome::from_response(&self.json(&url, resp).await?);
        info!(index, indexed = outcome.indexed, failed = outcome.failed, "wrote analysis results");
        Ok(outcome)
    }
}
