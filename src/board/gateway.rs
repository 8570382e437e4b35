use async_trait::async_trait;
use thiserror::Error;

use super::models::{ColumnId, NewTask, TaskRecord};

/// Uniform failure of a remote call.
///
/// `status` is the HTTP status when the store answered, `None` when no
/// response arrived at all (connect failure, timeout, undecodable body).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", describe(.status, .message))]
pub struct RemoteError {
    pub status: Option<u16>,
    pub message: String,
}

fn describe(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("remote call failed with status {}: {}", code, message),
        None => format!("remote call failed: {}", message),
    }
}

impl RemoteError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Some(404), message)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

/// Capability set the board engine needs from the task store.
///
/// One logical operation maps to one remote call. Implementations do not
/// retry and make no promise about the ordering of concurrent writes.
#[async_trait]
pub trait RecordGateway: Send + Sync {
    /// Liveness check.
    async fn health(&self) -> Result<(), RemoteError>;

    /// Every persisted record, in no particular order.
    async fn list_all(&self) -> Result<Vec<TaskRecord>, RemoteError>;

    /// One record, `None` when the store does not know the id.
    async fn get(&self, id: &str) -> Result<Option<TaskRecord>, RemoteError>;

    /// Persist a new record; the store assigns the id.
    async fn create(&self, task: &NewTask) -> Result<TaskRecord, RemoteError>;

    /// Overwrite every field of an existing record.
    async fn replace(&self, record: &TaskRecord) -> Result<(), RemoteError>;

    async fn delete(&self, id: &str) -> Result<(), RemoteError>;

    /// Persist the display order of the four lanes.
    async fn reorder_columns(&self, order: &[ColumnId]) -> Result<(), RemoteError>;

    /// Read back the persisted lane order.
    async fn column_order(&self) -> Result<Vec<ColumnId>, RemoteError>;
}
