use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the four fixed lanes of the board.
///
/// This enum is the only place the column ↔ index mapping lives. The
/// gateway and the store only ever see the integer index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnId {
    Backlog,
    Todo,
    InProgress,
    Done,
}

impl ColumnId {
    /// Default left-to-right order of the lanes.
    pub const ALL: [ColumnId; 4] = [
        ColumnId::Backlog,
        ColumnId::Todo,
        ColumnId::InProgress,
        ColumnId::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backlog => "backlog",
            Self::Todo => "todo",
            Self::InProgress => "inprogress",
            Self::Done => "done",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Backlog => "Backlog",
            Self::Todo => "To Do",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }

    /// Persisted column index of this lane.
    pub fn index(&self) -> i32 {
        match self {
            Self::Backlog => 0,
            Self::Todo => 1,
            Self::InProgress => 2,
            Self::Done => 3,
        }
    }

    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(Self::Backlog),
            1 => Some(Self::Todo),
            2 => Some(Self::InProgress),
            3 => Some(Self::Done),
            _ => None,
        }
    }

    /// Records carrying an unknown column index land in the backlog.
    pub fn from_index_or_backlog(index: i32) -> Self {
        Self::from_index(index).unwrap_or(Self::Backlog)
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "backlog" => Ok(Self::Backlog),
            "todo" => Ok(Self::Todo),
            "inprogress" | "in_progress" | "in-progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            _ => Err(format!(
                "Invalid column '{}'. Valid values: backlog, todo, inprogress, done",
                s
            )),
        }
    }
}

/// A task as shown on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Position at last persistence. Between fetches the sequence
    /// position inside the owning column is authoritative.
    pub row: i32,
}

impl Card {
    pub fn from_record(record: TaskRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            description: record.description.unwrap_or_default(),
            row: record.row,
        }
    }

    pub fn to_record(&self, column: ColumnId, row: i32) -> TaskRecord {
        TaskRecord {
            id: self.id.clone(),
            title: self.title.clone(),
            description: Some(self.description.clone()),
            column: column.index(),
            row,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    pub title: String,
    pub cards: Vec<Card>,
}

impl Column {
    pub fn empty(id: ColumnId) -> Self {
        Self {
            id,
            title: id.title().to_string(),
            cards: Vec::new(),
        }
    }

    pub fn position_of(&self, card_id: &str) -> Option<usize> {
        self.cards.iter().position(|c| c.id == card_id)
    }
}

/// Ordered columns, each holding an ordered sequence of cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub columns: Vec<Column>,
}

impl Default for Board {
    fn default() -> Self {
        Self::with_order(&ColumnId::ALL)
    }
}

impl Board {
    /// An empty board with the given column display order.
    pub fn with_order(order: &[ColumnId]) -> Self {
        Self {
            columns: order.iter().copied().map(Column::empty).collect(),
        }
    }

    pub fn column(&self, id: ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub fn column_mut(&mut self, id: ColumnId) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.id == id)
    }

    pub fn column_order(&self) -> Vec<ColumnId> {
        self.columns.iter().map(|c| c.id).collect()
    }

    /// Owning column and sequence position of a card.
    pub fn locate(&self, card_id: &str) -> Option<(ColumnId, usize)> {
        self.columns
            .iter()
            .find_map(|col| col.position_of(card_id).map(|pos| (col.id, pos)))
    }

    pub fn card(&self, card_id: &str) -> Option<&Card> {
        self.columns
            .iter()
            .flat_map(|c| c.cards.iter())
            .find(|c| c.id == card_id)
    }

    pub fn card_count(&self) -> usize {
        self.columns.iter().map(|c| c.cards.len()).sum()
    }

    /// All card identifiers, sorted, for multiset comparisons.
    pub fn card_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .columns
            .iter()
            .flat_map(|c| c.cards.iter().map(|card| card.id.clone()))
            .collect();
        ids.sort();
        ids
    }
}

/// The flat persisted shape of one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub column: i32,
    pub row: i32,
}

/// Payload of a create call; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub column: i32,
    pub row: i32,
}

/// Column-order side channel payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnOrder {
    pub ordered_column_ids: Vec<String>,
}

impl ColumnOrder {
    pub fn from_columns(order: &[ColumnId]) -> Self {
        Self {
            ordered_column_ids: order.iter().map(|c| c.as_str().to_string()).collect(),
        }
    }

    /// Parse into a full permutation of the four lanes.
    pub fn to_columns(&self) -> Result<Vec<ColumnId>, String> {
        let columns = self
            .ordered_column_ids
            .iter()
            .map(|s| ColumnId::from_str(s))
            .collect::<Result<Vec<_>, _>>()?;
        let is_permutation = columns.len() == ColumnId::ALL.len()
            && ColumnId::ALL.iter().all(|c| columns.contains(c));
        if !is_permutation {
            return Err(format!(
                "Column order must list each of the {} columns exactly once",
                ColumnId::ALL.len()
            ));
        }
        Ok(columns)
    }
}
