//! In-process `RecordGateway` for tests and local experiments.
//!
//! Keeps records in insertion order, records every call, and lets a test
//! inject failures or hold a call open until it is released, which is how
//! out-of-order completions are reproduced deterministically.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::gateway::{RecordGateway, RemoteError};
use super::models::{ColumnId, NewTask, TaskRecord};

/// Gateway operations, used to target failures and holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Health,
    List,
    Get,
    Create,
    Replace,
    Delete,
    ReorderColumns,
    ColumnOrder,
}

/// One observed gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Health,
    List,
    Get(String),
    Create(NewTask),
    Replace(TaskRecord),
    Delete(String),
    ReorderColumns(Vec<ColumnId>),
    ColumnOrder,
}

#[derive(Default)]
struct Inner {
    records: Vec<TaskRecord>,
    column_order: Option<Vec<ColumnId>>,
    calls: Vec<Call>,
    failures: HashMap<Op, VecDeque<RemoteError>>,
    failing_ids: HashMap<String, RemoteError>,
    holds: HashMap<Op, VecDeque<oneshot::Receiver<()>>>,
    next_id: u64,
}

#[derive(Clone, Default)]
pub struct MemoryGateway {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<TaskRecord>) -> Self {
        let gw = Self::new();
        gw.lock().records = records;
        gw
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn records(&self) -> Vec<TaskRecord> {
        self.lock().records.clone()
    }

    pub fn set_records(&self, records: Vec<TaskRecord>) {
        self.lock().records = records;
    }

    pub fn record(&self, id: &str) -> Option<TaskRecord> {
        self.lock().records.iter().find(|r| r.id == id).cloned()
    }

    pub fn stored_column_order(&self) -> Option<Vec<ColumnId>> {
        self.lock().column_order.clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Make the next call of `op` fail with `error`.
    pub fn fail_next(&self, op: Op, error: RemoteError) {
        self.lock().failures.entry(op).or_default().push_back(error);
    }

    /// Make every replace of `id` fail until cleared.
    pub fn fail_replace_of(&self, id: &str, error: RemoteError) {
        self.lock().failing_ids.insert(id.to_string(), error);
    }

    /// Hold the next call of `op` open until the returned sender fires
    /// (or is dropped). The call observes store state at the moment it
    /// was issued.
    pub fn hold_next(&self, op: Op) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.lock().holds.entry(op).or_default().push_back(rx);
        tx
    }

    /// Log the call and take any queued failure and hold for it.
    fn enter(&self, op: Op, call: Call) -> (Option<RemoteError>, Option<oneshot::Receiver<()>>) {
        let mut inner = self.lock();
        inner.calls.push(call);
        let failure = inner.failures.get_mut(&op).and_then(VecDeque::pop_front);
        let hold = inner.holds.get_mut(&op).and_then(VecDeque::pop_front);
        (failure, hold)
    }

    async fn wait(hold: Option<oneshot::Receiver<()>>) {
        if let Some(rx) = hold {
            let _ = rx.await;
        }
    }
}

#[async_trait]
impl RecordGateway for MemoryGateway {
    async fn health(&self) -> Result<(), RemoteError> {
        let (failure, hold) = self.enter(Op::Health, Call::Health);
        Self::wait(hold).await;
        failure.map_or(Ok(()), Err)
    }

    async fn list_all(&self) -> Result<Vec<TaskRecord>, RemoteError> {
        let (failure, hold) = self.enter(Op::List, Call::List);
        let snapshot = self.records();
        Self::wait(hold).await;
        match failure {
            Some(err) => Err(err),
            None => Ok(snapshot),
        }
    }

    async fn get(&self, id: &str) -> Result<Option<TaskRecord>, RemoteError> {
        let (failure, hold) = self.enter(Op::Get, Call::Get(id.to_string()));
        Self::wait(hold).await;
        match failure {
            Some(err) => Err(err),
            None => Ok(self.record(id)),
        }
    }

    async fn create(&self, task: &NewTask) -> Result<TaskRecord, RemoteError> {
        let (failure, hold) = self.enter(Op::Create, Call::Create(task.clone()));
        Self::wait(hold).await;
        if let Some(err) = failure {
            return Err(err);
        }
        let mut inner = self.lock();
        inner.next_id += 1;
        let record = TaskRecord {
            id: format!("task-{}", inner.next_id),
            title: task.title.clone(),
            description: task.description.clone(),
            column: task.column,
            row: task.row,
        };
        inner.records.push(record.clone());
        Ok(record)
    }

    async fn replace(&self, record: &TaskRecord) -> Result<(), RemoteError> {
        let (failure, hold) = self.enter(Op::Replace, Call::Replace(record.clone()));
        Self::wait(hold).await;
        if let Some(err) = failure {
            return Err(err);
        }
        let mut inner = self.lock();
        if let Some(err) = inner.failing_ids.get(&record.id) {
            return Err(err.clone());
        }
        match inner.records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(RemoteError::not_found(format!("Task {} not found", record.id))),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), RemoteError> {
        let (failure, hold) = self.enter(Op::Delete, Call::Delete(id.to_string()));
        Self::wait(hold).await;
        if let Some(err) = failure {
            return Err(err);
        }
        let mut inner = self.lock();
        let before = inner.records.len();
        inner.records.retain(|r| r.id != id);
        if inner.records.len() == before {
            return Err(RemoteError::not_found(format!("Task {} not found", id)));
        }
        Ok(())
    }

    async fn reorder_columns(&self, order: &[ColumnId]) -> Result<(), RemoteError> {
        let (failure, hold) = self.enter(Op::ReorderColumns, Call::ReorderColumns(order.to_vec()));
        Self::wait(hold).await;
        if let Some(err) = failure {
            return Err(err);
        }
        self.lock().column_order = Some(order.to_vec());
        Ok(())
    }

    async fn column_order(&self) -> Result<Vec<ColumnId>, RemoteError> {
        let (failure, hold) = self.enter(Op::ColumnOrder, Call::ColumnOrder);
        Self::wait(hold).await;
        if let Some(err) = failure {
            return Err(err);
        }
        Ok(self
            .stored_column_order()
            .unwrap_or_else(|| ColumnId::ALL.to_vec()))
    }
}
