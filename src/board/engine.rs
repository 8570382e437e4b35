//! Board synchronization engine.
//!
//! `BoardEngine` owns the canonical in-memory board and is its only
//! writer. Mutations are applied to the board synchronously, before the
//! first await, and published through a `watch` channel so a presenter
//! sees them immediately. Persistence then goes through the injected
//! `RecordGateway`, and `load()` re-derives the whole board from the
//! store whenever local state may have drifted.
//!
//! ## Staleness
//!
//! Each `load()` issuance and each optimistic mutation advances an epoch.
//! A `load()` result is applied only if the epoch is still the one it
//! was issued under; otherwise it is discarded, never aborted. When a
//! load is discarded only because of an optimistic mutation (no newer
//! load was issued), the engine remembers that it owes a catch-up load.
//! The operation whose reconciling load was dropped runs that catch-up
//! itself once no other load is in flight, and a clean move runs it too.
//!
//! ## Rows
//!
//! Persisted rows of a column stay dense (`0..count`). Moves rewrite the
//! rows of every affected column and a delete compacts its source column.
//! A create compacts its target column first if the store handed us gaps,
//! so the new card's `row = count` always lands last.

use futures::future::join_all;
use tokio::sync::watch;

use super::gateway::{RecordGateway, RemoteError};
use super::layout;
use super::models::{Board, Card, ColumnId, NewTask, TaskRecord};
use crate::errors::BoardError;

/// Upper bound on back-to-back catch-up loads for one operation.
const MAX_CATCH_UP_LOADS: usize = 3;

/// Result of a mutation that targets a specific card or column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Applied,
    /// The target is not on the local board. The presenter may be
    /// working from stale data; nothing was sent to the store.
    NotFound,
}

/// Result of a successful fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// A newer load or a local mutation happened while this fetch was in
    /// flight, so its result was dropped.
    Superseded,
}

#[derive(Debug, Clone, Default)]
struct SyncBook {
    epoch: u64,
    latest_load: u64,
    loads_in_flight: usize,
    catch_up: bool,
}

/// Everything a presenter can observe.
#[derive(Debug, Clone, Default)]
pub struct BoardState {
    pub board: Board,
    pub is_loading: bool,
    pub warming_up: bool,
    pub last_error: Option<BoardError>,
    sync: SyncBook,
}

enum Edit {
    Title(String),
    Description(String),
}

pub struct BoardEngine<G> {
    gateway: G,
    state: watch::Sender<BoardState>,
}

impl<G: RecordGateway> BoardEngine<G> {
    pub fn new(gateway: G) -> Self {
        let (state, _) = watch::channel(BoardState::default());
        Self { gateway, state }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Receiver that is notified on every published state change.
    pub fn subscribe(&self) -> watch::Receiver<BoardState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> BoardState {
        self.state.borrow().clone()
    }

    pub fn board(&self) -> Board {
        self.state.borrow().board.clone()
    }

    pub fn last_error(&self) -> Option<BoardError> {
        self.state.borrow().last_error.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn clear_error(&self) {
        self.state.send_if_modified(|s| s.last_error.take().is_some());
    }

    fn record_error(&self, err: BoardError) {
        tracing::warn!(error = %err, "board operation failed");
        self.state.send_modify(|s| s.last_error = Some(err));
    }

    /// Apply an optimistic change to the board. When `f` reports a change
    /// the epoch advances, so any load already in flight is discarded.
    fn mutate<R>(&self, f: impl FnOnce(&mut Board) -> Option<R>) -> Option<R> {
        let mut out = None;
        self.state.send_if_modified(|s| {
            out = f(&mut s.board);
            if out.is_some() {
                s.sync.epoch += 1;
            }
            out.is_some()
        });
        out
    }

    // ── Reconciliation ────────────────────────────────────────────────

    /// Replace the board's cards with a fresh read of the store.
    ///
    /// The column display order is kept; it travels on its own channel.
    /// On failure the previous board stays visible and the error becomes
    /// `last_error`, unless a newer load has been issued meanwhile.
    pub async fn load(&self) -> Result<LoadOutcome, BoardError> {
        let ticket = self.begin_load();
        tracing::debug!(ticket, "loading tasks");
        let result = self.gateway.list_all().await;
        self.finish_load(ticket, result)
    }

    /// `load()`, followed by catch-up loads while the result keeps being
    /// dropped in favour of a local mutation and nobody else is loading.
    async fn reconcile(&self) -> Result<LoadOutcome, BoardError> {
        let mut outcome = self.load().await;
        for _ in 0..MAX_CATCH_UP_LOADS {
            if outcome != Ok(LoadOutcome::Superseded) || !self.owes_catch_up() {
                break;
            }
            tracing::debug!("running catch-up load");
            outcome = self.load().await;
        }
        outcome
    }

    fn owes_catch_up(&self) -> bool {
        let state = self.state.borrow();
        state.sync.catch_up && state.sync.loads_in_flight == 0
    }

    fn begin_load(&self) -> u64 {
        let mut ticket = 0;
        self.state.send_modify(|s| {
            s.sync.epoch += 1;
            s.sync.latest_load = s.sync.epoch;
            s.sync.loads_in_flight += 1;
            s.is_loading = true;
            ticket = s.sync.epoch;
        });
        ticket
    }

    fn finish_load(
        &self,
        ticket: u64,
        result: Result<Vec<TaskRecord>, RemoteError>,
    ) -> Result<LoadOutcome, BoardError> {
        let mut outcome = Ok(LoadOutcome::Superseded);
        self.state.send_if_modified(|s| {
            s.sync.loads_in_flight = s.sync.loads_in_flight.saturating_sub(1);
            let still_loading = s.sync.loads_in_flight > 0;
            let mut changed = s.is_loading != still_loading;
            s.is_loading = still_loading;

            let is_current = s.sync.epoch == ticket;
            let is_latest_load = s.sync.latest_load == ticket;
            match result {
                Ok(records) if is_current => {
                    let count = records.len();
                    s.board = layout::board_from_records(records, &s.board.column_order());
                    s.sync.catch_up = false;
                    if s.last_error.as_ref().is_some_and(BoardError::is_load_failure) {
                        s.last_error = None;
                    }
                    tracing::debug!(ticket, count, "board reconciled");
                    outcome = Ok(LoadOutcome::Applied);
                    changed = true;
                }
                Ok(_) => {
                    if is_latest_load {
                        s.sync.catch_up = true;
                    }
                    tracing::debug!(ticket, "discarding stale load");
                }
                Err(err) => {
                    let err = BoardError::LoadFailed(err);
                    if is_latest_load {
                        tracing::warn!(error = %err, "failed to load tasks");
                        s.last_error = Some(err.clone());
                        changed = true;
                    }
                    outcome = Err(err);
                }
            }
            changed
        });
        outcome
    }

    /// Cold-start sequence: check the store is up, adopt its column order, then
    /// load the cards. `warming_up` is set for the duration.
    pub async fn warm_up(&self) -> Result<LoadOutcome, BoardError> {
        self.state.send_modify(|s| s.warming_up = true);
        let result = self.warm_up_inner().await;
        self.state.send_modify(|s| s.warming_up = false);
        if let Err(err) = &result {
            // load() records its own failures.
            if !err.is_load_failure() {
                self.record_error(err.clone());
            }
        }
        result
    }

    async fn warm_up_inner(&self) -> Result<LoadOutcome, BoardError> {
        self.gateway
            .health()
            .await
            .map_err(|e| BoardError::transport("reach the task store", e))?;
        let order = self
            .gateway
            .column_order()
            .await
            .map_err(|e| BoardError::transport("fetch column order", e))?;
        self.state.send_modify(|s| layout::apply_column_order(&mut s.board, &order));
        self.load().await
    }

    // ── Card operations ───────────────────────────────────────────────

    /// Append a new card to `column`, then reload to pick up the
    /// store-assigned id. Apart from closing row gaps in `column`, the
    /// board is not touched until that load lands.
    pub async fn create_card(&self, column: ColumnId, title: &str) -> Result<TaskRecord, BoardError> {
        let title = title.trim();
        if title.is_empty() {
            self.record_error(BoardError::EmptyTitle);
            return Err(BoardError::EmptyTitle);
        }

        if let Err(err) = self.compact(column).await {
            let _ = self.reconcile().await;
            return Err(err);
        }
        let row = {
            let state = self.state.borrow();
            state.board.column(column).map_or(0, |c| c.cards.len())
        };
        let task = NewTask {
            title: title.to_string(),
            description: None,
            column: column.index(),
            row: row as i32,
        };

        let record = match self.gateway.create(&task).await {
            Ok(record) => record,
            Err(e) => {
                let err = BoardError::transport("create task", e);
                self.record_error(err.clone());
                return Err(err);
            }
        };
        tracing::info!(id = %record.id, column = %column, row, "created task");

        let _ = self.reconcile().await;
        Ok(record)
    }

    pub async fn update_title(&self, card_id: &str, title: &str) -> Result<Mutation, BoardError> {
        let title = title.trim();
        if title.is_empty() {
            self.record_error(BoardError::EmptyTitle);
            return Err(BoardError::EmptyTitle);
        }
        self.update_card(card_id, Edit::Title(title.to_string()))
            .await
    }

    pub async fn update_description(
        &self,
        card_id: &str,
        description: &str,
    ) -> Result<Mutation, BoardError> {
        self.update_card(card_id, Edit::Description(description.to_string()))
            .await
    }

    /// Edit in place, send the full record, reload on success. The record
    /// keeps the card's persisted row, so an edit never reorders. A failed
    /// write leaves the local edit in place for the user to retry.
    async fn update_card(&self, card_id: &str, edit: Edit) -> Result<Mutation, BoardError> {
        let record = self.mutate(|board| {
            let (column_id, position) = board.locate(card_id)?;
            let card = board.column_mut(column_id)?.cards.get_mut(position)?;
            match edit {
                Edit::Title(title) => card.title = title,
                Edit::Description(description) => card.description = description,
            }
            Some(card.to_record(column_id, card.row))
        });
        let Some(record) = record else {
            tracing::debug!(card_id, "update target not on board");
            return Ok(Mutation::NotFound);
        };

        if let Err(e) = self.gateway.replace(&record).await {
            let err = BoardError::for_record("update task", card_id, e);
            self.record_error(err.clone());
            return Err(err);
        }
        tracing::info!(card_id, "updated task");

        let _ = self.reconcile().await;
        Ok(Mutation::Applied)
    }

    /// Remove the card at once, delete it remotely, then always reconcile.
    ///
    /// A store that no longer knows the id counts as success, after which
    /// the rows of the card's column are compacted and persisted. If the
    /// delete failed and the reconciling load could not be applied, the
    /// card is put back where it was.
    pub async fn delete_card(&self, card_id: &str) -> Result<Mutation, BoardError> {
        let Some((column_id, position, card)) =
            self.mutate(|board| layout::take_card(board, card_id))
        else {
            tracing::debug!(card_id, "delete target not on board");
            return Ok(Mutation::NotFound);
        };

        let failure = match self.gateway.delete(card_id).await {
            Ok(()) => None,
            Err(e) if e.is_not_found() => {
                tracing::debug!(card_id, "task already gone from the store");
                None
            }
            Err(e) => Some(BoardError::for_record("delete task", card_id, e)),
        };
        let compacted = match &failure {
            Some(err) => {
                self.record_error(err.clone());
                Ok(())
            }
            None => self.compact(column_id).await,
        };

        let reconciled = matches!(self.reconcile().await, Ok(LoadOutcome::Applied));
        match failure {
            Some(err) => {
                if !reconciled {
                    self.restore_card(column_id, position, card);
                }
                Err(err)
            }
            None => {
                tracing::info!(card_id, "deleted task");
                compacted.map(|()| Mutation::Applied)
            }
        }
    }

    fn restore_card(&self, column_id: ColumnId, position: usize, card: Card) {
        self.mutate(|board| {
            if board.card(&card.id).is_some() {
                return None;
            }
            let column = board.column_mut(column_id)?;
            let at = position.min(column.cards.len());
            column.cards.insert(at, card);
            Some(())
        });
    }

    /// Move a card and persist the new positions of every card in the
    /// affected column(s).
    ///
    /// The board changes before any call is made. Writes are issued
    /// concurrently and all of them are attempted even if some fail. A
    /// clean move does not reload; a failed one reloads to resynchronize.
    pub async fn move_card(
        &self,
        card_id: &str,
        from: ColumnId,
        to: ColumnId,
        target_index: Option<usize>,
    ) -> Result<Mutation, BoardError> {
        let records = self.mutate(|board| {
            let affected = layout::move_card(board, card_id, from, to, target_index)?;
            Some(layout::column_records(board, &affected))
        });
        let Some(records) = records else {
            tracing::debug!(card_id, from = %from, "move target not in source column");
            return Ok(Mutation::NotFound);
        };

        if let Err(err) = self.persist_rows(&records).await {
            let _ = self.reconcile().await;
            return Err(err);
        }
        tracing::info!(card_id, from = %from, to = %to, attempted = records.len(), "moved task");
        if self.owes_catch_up() {
            tracing::debug!("running catch-up load after move");
            let _ = self.reconcile().await;
        }
        Ok(Mutation::Applied)
    }

    /// Write every record concurrently. All writes are attempted even if
    /// some fail; a failure is recorded as `last_error`.
    async fn persist_rows(&self, records: &[TaskRecord]) -> Result<(), BoardError> {
        let attempted = records.len();
        let results = join_all(records.iter().map(|r| self.gateway.replace(r))).await;
        let mut failures = records
            .iter()
            .zip(results)
            .filter_map(|(record, result)| result.err().map(|e| (record.id.clone(), e)));

        let Some((failed_id, first)) = failures.next() else {
            return Ok(());
        };
        let failed = 1 + failures.count();

        tracing::warn!(failed_id = %failed_id, failed, attempted, "rows only partly persisted");
        let err = BoardError::MovePersistence {
            failed,
            attempted,
            first,
        };
        self.record_error(err.clone());
        Err(err)
    }

    /// Close row gaps in `column_id` and persist the cards that shifted.
    async fn compact(&self, column_id: ColumnId) -> Result<(), BoardError> {
        let records = self.mutate(|board| {
            let records = layout::compact_column(board, column_id);
            (!records.is_empty()).then_some(records)
        });
        match records {
            Some(records) => {
                tracing::debug!(column = %column_id, shifted = records.len(), "compacting rows");
                self.persist_rows(&records).await
            }
            None => Ok(()),
        }
    }

    /// Move a column in the display order and persist the new order.
    pub async fn move_column(&self, from: usize, to: usize) -> Result<Mutation, BoardError> {
        let mut order = None;
        self.state.send_if_modified(|s| {
            if layout::move_column(&mut s.board, from, to) {
                order = Some(s.board.column_order());
                true
            } else {
                false
            }
        });
        let Some(order) = order else {
            tracing::debug!(from, "column index out of range");
            return Ok(Mutation::NotFound);
        };

        if let Err(e) = self.gateway.reorder_columns(&order).await {
            let err = BoardError::transport("update column order", e);
            self.record_error(err.clone());
            return Err(err);
        }
        tracing::info!(from, to, "moved column");
        Ok(Mutation::Applied)
    }
}
