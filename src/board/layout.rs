//! Conversion between the flat `(column, row)` tagged records of the store
//! and the ordered board, plus the positional move algorithms.
//!
//! Everything here is synchronous and side-effect free apart from the
//! `&mut Board` it is handed, so the engine can apply a mutation before
//! its first suspension point.

use super::models::{Board, Card, ColumnId, TaskRecord};

/// Build a board from an unordered record set.
///
/// Records are grouped by column index (out-of-range indices land in the
/// backlog) and each group is sorted by `row`. The sort is stable, so
/// equal rows keep their fetch order.
pub fn board_from_records(records: Vec<TaskRecord>, order: &[ColumnId]) -> Board {
    let mut board = Board::with_order(order);
    for record in records {
        let column_id = ColumnId::from_index_or_backlog(record.column);
        if let Some(column) = board.column_mut(column_id) {
            column.cards.push(Card::from_record(record));
        }
    }
    for column in &mut board.columns {
        column.cards.sort_by_key(|card| card.row);
    }
    board
}

/// Reassign dense zero-based rows to every card of a column.
pub fn reindex_column(board: &mut Board, column_id: ColumnId) {
    if let Some(column) = board.column_mut(column_id) {
        for (row, card) in column.cards.iter_mut().enumerate() {
            card.row = row as i32;
        }
    }
}

/// Close any gaps in a column's rows. Returns the records of the cards
/// whose row changed, which are the only ones the store needs to hear
/// about.
pub fn compact_column(board: &mut Board, column_id: ColumnId) -> Vec<TaskRecord> {
    let before: Vec<i32> = board
        .column(column_id)
        .map(|c| c.cards.iter().map(|card| card.row).collect())
        .unwrap_or_default();
    reindex_column(board, column_id);
    column_records(board, &[column_id])
        .into_iter()
        .zip(before)
        .filter(|(record, old_row)| record.row != *old_row)
        .map(|(record, _)| record)
        .collect()
}

/// Records to persist for the given columns, one per card, carrying the
/// column's index and each card's current sequence position.
pub fn column_records(board: &Board, columns: &[ColumnId]) -> Vec<TaskRecord> {
    columns
        .iter()
        .filter_map(|id| board.column(*id))
        .flat_map(|column| {
            column
                .cards
                .iter()
                .enumerate()
                .map(move |(row, card)| card.to_record(column.id, row as i32))
        })
        .collect()
}

/// Move a card between (or within) columns.
///
/// The card is removed from `from` and inserted into `to` at
/// `target_index`, clamped to the destination length after removal;
/// `None` appends. Rows of every affected column are recomputed densely.
///
/// Returns the affected columns (source first), or `None` when the card
/// is not in `from` or either column is missing, in which case the board
/// is left untouched.
pub fn move_card(
    board: &mut Board,
    card_id: &str,
    from: ColumnId,
    to: ColumnId,
    target_index: Option<usize>,
) -> Option<Vec<ColumnId>> {
    board.column(to)?;
    let source = board.column_mut(from)?;
    let position = source.position_of(card_id)?;
    let card = source.cards.remove(position);

    let destination = board.column_mut(to)?;
    let insert_at = target_index
        .unwrap_or(destination.cards.len())
        .min(destination.cards.len());
    destination.cards.insert(insert_at, card);

    let affected = if from == to { vec![from] } else { vec![from, to] };
    for column in &affected {
        reindex_column(board, *column);
    }
    Some(affected)
}

/// Remove a card from wherever it lives, returning its column, position
/// and the card itself so the removal can be undone.
pub fn take_card(board: &mut Board, card_id: &str) -> Option<(ColumnId, usize, Card)> {
    let (column_id, position) = board.locate(card_id)?;
    let column = board.column_mut(column_id)?;
    let card = column.cards.remove(position);
    Some((column_id, position, card))
}

/// Move a column in the display order. Cards are untouched since rows
/// are column-relative.
///
/// `to` is clamped to the last index. Returns `false` (and leaves the
/// board untouched) when `from` is out of range.
pub fn move_column(board: &mut Board, from: usize, to: usize) -> bool {
    if from >= board.columns.len() {
        return false;
    }
    let to = to.min(board.columns.len() - 1);
    let column = board.columns.remove(from);
    board.columns.insert(to, column);
    true
}

/// Rearrange the columns to follow `order`. Columns `order` does not
/// mention keep their relative order after the listed ones.
pub fn apply_column_order(board: &mut Board, order: &[ColumnId]) {
    let mut remaining = std::mem::take(&mut board.columns);
    for id in order {
        if let Some(pos) = remaining.iter().position(|c| c.id == *id) {
            board.columns.push(remaining.remove(pos));
        }
    }
    board.columns.append(&mut remaining);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, column: i32, row: i32) -> TaskRecord {
        TaskRecord {
            id: id.to_string(),
            title: format!("task {}", id),
            description: None,
            column,
            row,
        }
    }

    fn ids(board: &Board, column: ColumnId) -> Vec<String> {
        board
            .column(column)
            .unwrap()
            .cards
            .iter()
            .map(|c| c.id.clone())
            .collect()
    }

    fn rows(board: &Board, column: ColumnId) -> Vec<i32> {
        board
            .column(column)
            .unwrap()
            .cards
            .iter()
            .map(|c| c.row)
            .collect()
    }

    #[test]
    fn groups_by_column_and_sorts_by_row() {
        let board = board_from_records(
            vec![
                record("c", 1, 2),
                record("a", 1, 0),
                record("d", 3, 0),
                record("b", 1, 1),
            ],
            &ColumnId::ALL,
        );
        assert_eq!(ids(&board, ColumnId::Todo), vec!["a", "b", "c"]);
        assert_eq!(ids(&board, ColumnId::Done), vec!["d"]);
        assert!(ids(&board, ColumnId::Backlog).is_empty());
    }

    #[test]
    fn out_of_range_column_lands_in_backlog() {
        let board = board_from_records(vec![record("x", 9, 0), record("y", -2, 1)], &ColumnId::ALL);
        assert_eq!(ids(&board, ColumnId::Backlog), vec!["x", "y"]);
    }

    #[test]
    fn equal_rows_keep_fetch_order() {
        let board = board_from_records(
            vec![record("first", 0, 1), record("second", 0, 1), record("zero", 0, 0)],
            &ColumnId::ALL,
        );
        assert_eq!(ids(&board, ColumnId::Backlog), vec!["zero", "first", "second"]);
    }

    #[test]
    fn grouping_respects_requested_column_order() {
        let order = [ColumnId::Done, ColumnId::Backlog, ColumnId::Todo, ColumnId::InProgress];
        let board = board_from_records(vec![record("a", 3, 0)], &order);
        assert_eq!(board.column_order(), order.to_vec());
        assert_eq!(board.columns[0].cards.len(), 1);
    }

    #[test]
    fn move_across_columns_reindexes_both() {
        let mut board = board_from_records(
            vec![record("x", 1, 0), record("y", 1, 1)],
            &ColumnId::ALL,
        );
        let affected = move_card(&mut board, "x", ColumnId::Todo, ColumnId::Done, Some(0)).unwrap();
        assert_eq!(affected, vec![ColumnId::Todo, ColumnId::Done]);
        assert_eq!(ids(&board, ColumnId::Todo), vec!["y"]);
        assert_eq!(ids(&board, ColumnId::Done), vec!["x"]);
        assert_eq!(rows(&board, ColumnId::Todo), vec![0]);
        assert_eq!(rows(&board, ColumnId::Done), vec![0]);
    }

    #[test]
    fn move_within_column_clamps_and_reindexes() {
        let mut board = board_from_records(
            vec![record("a", 0, 0), record("b", 0, 5), record("c", 0, 9)],
            &ColumnId::ALL,
        );
        let affected =
            move_card(&mut board, "a", ColumnId::Backlog, ColumnId::Backlog, Some(99)).unwrap();
        assert_eq!(affected, vec![ColumnId::Backlog]);
        assert_eq!(ids(&board, ColumnId::Backlog), vec!["b", "c", "a"]);
        assert_eq!(rows(&board, ColumnId::Backlog), vec![0, 1, 2]);
    }

    #[test]
    fn move_without_index_appends() {
        let mut board = board_from_records(
            vec![record("a", 0, 0), record("b", 2, 0)],
            &ColumnId::ALL,
        );
        move_card(&mut board, "a", ColumnId::Backlog, ColumnId::InProgress, None).unwrap();
        assert_eq!(ids(&board, ColumnId::InProgress), vec!["b", "a"]);
    }

    #[test]
    fn move_of_card_not_in_source_is_a_no_op() {
        let mut board = board_from_records(vec![record("a", 0, 0)], &ColumnId::ALL);
        let before = board.clone();
        assert!(move_card(&mut board, "a", ColumnId::Todo, ColumnId::Done, None).is_none());
        assert!(move_card(&mut board, "zzz", ColumnId::Backlog, ColumnId::Done, None).is_none());
        assert_eq!(board, before);
    }

    #[test]
    fn repeated_move_is_idempotent() {
        let mut board = board_from_records(
            vec![record("a", 0, 0), record("b", 0, 1), record("c", 0, 2)],
            &ColumnId::ALL,
        );
        move_card(&mut board, "c", ColumnId::Backlog, ColumnId::Backlog, Some(0));
        let once = board.clone();
        move_card(&mut board, "c", ColumnId::Backlog, ColumnId::Backlog, Some(0));
        assert_eq!(board, once);
    }

    #[test]
    fn column_records_are_dense_per_column() {
        let board = board_from_records(
            vec![record("a", 1, 3), record("b", 1, 7), record("c", 2, 4)],
            &ColumnId::ALL,
        );
        let records = column_records(&board, &[ColumnId::Todo, ColumnId::InProgress]);
        let summary: Vec<(&str, i32, i32)> = records
            .iter()
            .map(|r| (r.id.as_str(), r.column, r.row))
            .collect();
        assert_eq!(summary, vec![("a", 1, 0), ("b", 1, 1), ("c", 2, 0)]);
    }

    #[test]
    fn reindex_makes_rows_dense() {
        let mut board = board_from_records(
            vec![record("a", 3, 2), record("b", 3, 8)],
            &ColumnId::ALL,
        );
        reindex_column(&mut board, ColumnId::Done);
        assert_eq!(rows(&board, ColumnId::Done), vec![0, 1]);
    }

    #[test]
    fn compact_returns_only_shifted_cards() {
        let mut board = board_from_records(
            vec![record("a", 1, 0), record("b", 1, 2), record("c", 1, 3)],
            &ColumnId::ALL,
        );
        let changed = compact_column(&mut board, ColumnId::Todo);
        let summary: Vec<(&str, i32)> = changed.iter().map(|r| (r.id.as_str(), r.row)).collect();
        assert_eq!(summary, vec![("b", 1), ("c", 2)]);
        assert_eq!(rows(&board, ColumnId::Todo), vec![0, 1, 2]);

        assert!(compact_column(&mut board, ColumnId::Todo).is_empty());
        assert!(compact_column(&mut board, ColumnId::Backlog).is_empty());
    }

    #[test]
    fn take_card_reports_origin() {
        let mut board = board_from_records(
            vec![record("a", 2, 0), record("b", 2, 1)],
            &ColumnId::ALL,
        );
        let (column, position, card) = take_card(&mut board, "b").unwrap();
        assert_eq!(column, ColumnId::InProgress);
        assert_eq!(position, 1);
        assert_eq!(card.id, "b");
        assert!(take_card(&mut board, "b").is_none());
    }

    #[test]
    fn move_column_reorders_display() {
        let mut board = Board::default();
        assert!(move_column(&mut board, 0, 2));
        assert_eq!(
            board.column_order(),
            vec![ColumnId::Todo, ColumnId::InProgress, ColumnId::Backlog, ColumnId::Done]
        );
    }

    #[test]
    fn move_column_clamps_target_and_rejects_bad_source() {
        let mut board = Board::default();
        assert!(move_column(&mut board, 1, 40));
        assert_eq!(board.columns[3].id, ColumnId::Todo);
        let before = board.clone();
        assert!(!move_column(&mut board, 4, 0));
        assert_eq!(board, before);
    }

    #[test]
    fn apply_column_order_keeps_cards_and_unlisted_columns() {
        let mut board = board_from_records(vec![record("a", 2, 0)], &ColumnId::ALL);
        apply_column_order(&mut board, &[ColumnId::InProgress, ColumnId::Done]);
        assert_eq!(
            board.column_order(),
            vec![ColumnId::InProgress, ColumnId::Done, ColumnId::Backlog, ColumnId::Todo]
        );
        assert_eq!(ids(&board, ColumnId::InProgress), vec!["a"]);
    }
}
