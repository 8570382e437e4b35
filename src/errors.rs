//! Typed error hierarchy for the board.
//!
//! `RemoteError` (in `board::gateway`) is what the store hands back;
//! `BoardError` is what the engine records as `last_error` and returns
//! from its operations. A card missing from the local board is not an
//! error at all, see `board::engine::Mutation::NotFound`.

use thiserror::Error;

use crate::board::gateway::RemoteError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("Task title must not be empty")]
    EmptyTitle,

    #[error("Failed to load tasks: {0}")]
    LoadFailed(#[source] RemoteError),

    #[error("Task {id} not found in the store")]
    NotFoundRemotely { id: String },

    #[error("Failed to {action}: {source}")]
    Transport {
        action: &'static str,
        #[source]
        source: RemoteError,
    },

    #[error("Failed to persist {failed} of {attempted} card positions: {first}")]
    MovePersistence {
        failed: usize,
        attempted: usize,
        #[source]
        first: RemoteError,
    },
}

impl BoardError {
    pub fn transport(action: &'static str, source: RemoteError) -> Self {
        Self::Transport { action, source }
    }

    /// Classify a failure of a call that targeted one record.
    pub fn for_record(action: &'static str, id: &str, source: RemoteError) -> Self {
        if source.is_not_found() {
            Self::NotFoundRemotely { id: id.to_string() }
        } else {
            Self::transport(action, source)
        }
    }

    pub fn is_load_failure(&self) -> bool {
        matches!(self, Self::LoadFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_remote_error_becomes_not_found_remotely() {
        let err = BoardError::for_record("update task", "abc", RemoteError::not_found("missing"));
        match &err {
            BoardError::NotFoundRemotely { id } => assert_eq!(id, "abc"),
            _ => panic!("Expected NotFoundRemotely"),
        }
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn other_failures_stay_transport() {
        let err = BoardError::for_record(
            "update task",
            "abc",
            RemoteError::new(Some(503), "unavailable"),
        );
        match &err {
            BoardError::Transport { action, source } => {
                assert_eq!(*action, "update task");
                assert_eq!(source.status, Some(503));
            }
            _ => panic!("Expected Transport"),
        }
        assert!(err.to_string().starts_with("Failed to update task"));
    }

    #[test]
    fn move_persistence_reports_counts() {
        let err = BoardError::MovePersistence {
            failed: 2,
            attempted: 5,
            first: RemoteError::transport("timeout"),
        };
        let msg = err.to_string();
        assert!(msg.contains("2 of 5"));
        assert!(!err.is_load_failure());
        assert!(BoardError::LoadFailed(RemoteError::transport("x")).is_load_failure());
    }

    #[test]
    fn board_error_implements_std_error() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&BoardError::EmptyTitle);
        let err = BoardError::transport("x", RemoteError::transport("y"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
