//! `RecordGateway` over the task store's HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use super::gateway::{RecordGateway, RemoteError};
use super::models::{ColumnId, ColumnOrder, NewTask, TaskRecord};

/// Talks to a `scrumboard serve` instance (or anything speaking the same
/// routes). One request per operation, no retries.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// URL of one task, with the id percent-encoded as a single path
    /// segment.
    fn task_url(&self, id: &str) -> Result<Url, RemoteError> {
        let mut url = Url::parse(&self.url("/api/tasks")).map_err(|e| {
            RemoteError::transport(format!("Invalid store URL '{}': {}", self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|()| {
                RemoteError::transport(format!("Store URL '{}' cannot carry a path", self.base_url))
            })?
            .push(id);
        Ok(url)
    }
}

fn send_error(what: &str, err: reqwest::Error) -> RemoteError {
    let status = err.status().map(|s| s.as_u16());
    let message = if err.is_timeout() {
        format!("{} timed out", what)
    } else {
        format!("{}: {}", what, err)
    };
    RemoteError::new(status, message)
}

/// Turn a non-success response into a `RemoteError`, preferring the
/// store's `{"error": ...}` message over the bare status text.
async fn check(what: &str, resp: Response) -> Result<Response, RemoteError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        });
    tracing::warn!(status = status.as_u16(), %detail, "{} failed", what);
    Err(RemoteError::new(
        Some(status.as_u16()),
        format!("Failed to {}: {}", what, detail),
    ))
}

async fn decode<T: DeserializeOwned>(what: &str, resp: Response) -> Result<T, RemoteError> {
    resp.json::<T>()
        .await
        .map_err(|e| RemoteError::transport(format!("Invalid response to {}: {}", what, e)))
}

#[async_trait]
impl RecordGateway for HttpGateway {
    async fn health(&self) -> Result<(), RemoteError> {
        let resp = self
            .client
            .get(self.url("/health"))
            .send()
            .await
            .map_err(|e| send_error("health check", e))?;
        check("check health", resp).await?;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<TaskRecord>, RemoteError> {
        let resp = self
            .client
            .get(self.url("/api/tasks"))
            .send()
            .await
            .map_err(|e| send_error("list tasks", e))?;
        let resp = check("list tasks", resp).await?;
        decode("list tasks", resp).await
    }

    async fn get(&self, id: &str) -> Result<Option<TaskRecord>, RemoteError> {
        let resp = self
            .client
            .get(self.task_url(id)?)
            .send()
            .await
            .map_err(|e| send_error("fetch task", e))?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = check("fetch task", resp).await?;
        decode("fetch task", resp).await.map(Some)
    }

    async fn create(&self, task: &NewTask) -> Result<TaskRecord, RemoteError> {
        let resp = self
            .client
            .post(self.url("/api/tasks"))
            .json(task)
            .send()
            .await
            .map_err(|e| send_error("create task", e))?;
        let resp = check("create task", resp).await?;
        decode("create task", resp).await
    }

    async fn replace(&self, record: &TaskRecord) -> Result<(), RemoteError> {
        let resp = self
            .client
            .put(self.task_url(&record.id)?)
            .json(record)
            .send()
            .await
            .map_err(|e| send_error("update task", e))?;
        check("update task", resp).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), RemoteError> {
        let resp = self
            .client
            .delete(self.task_url(id)?)
            .send()
            .await
            .map_err(|e| send_error("delete task", e))?;
        check("delete task", resp).await?;
        Ok(())
    }

    async fn reorder_columns(&self, order: &[ColumnId]) -> Result<(), RemoteError> {
        let resp = self
            .client
            .put(self.url("/api/columns/order"))
            .json(&ColumnOrder::from_columns(order))
            .send()
            .await
            .map_err(|e| send_error("update column order", e))?;
        check("update column order", resp).await?;
        Ok(())
    }

    async fn column_order(&self) -> Result<Vec<ColumnId>, RemoteError> {
        let resp = self
            .client
            .get(self.url("/api/columns/order"))
            .send()
            .await
            .map_err(|e| send_error("fetch column order", e))?;
        let resp = check("fetch column order", resp).await?;
        let order: ColumnOrder = decode("fetch column order", resp).await?;
        order
            .to_columns()
            .map_err(|e| RemoteError::transport(format!("Invalid column order: {}", e)))
    }
}
