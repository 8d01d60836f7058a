//! Board state store.
//!
//! Holds the published [`Board`] behind an `Arc`. Updates are copy-on-write:
//! each one builds a new board from the current value and publishes it, so a
//! previously returned `Arc<Board>` never changes underneath its holder and
//! observers detect change with `Arc::ptr_eq`.

use std::sync::Arc;

use crate::model::Board;

#[derive(Debug, Clone, Default)]
pub struct BoardStore {
    current: Arc<Board>,
    revision: u64,
}

impl BoardStore {
    pub fn new(board: Board) -> Self {
        Self {
            current: Arc::new(board),
            revision: 0,
        }
    }

    /// The currently published board.
    pub fn current(&self) -> Arc<Board> {
        Arc::clone(&self.current)
    }

    pub fn board(&self) -> &Board {
        &self.current
    }

    /// Number of publications since creation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Replace the whole board (initial load or reload).
    pub fn replace(&mut self, board: Board) -> Arc<Board> {
        self.publish(board)
    }

    /// Publish the board produced by `f` from the current value.
    pub fn update<F>(&mut self, f: F) -> Arc<Board>
    where
        F: FnOnce(&Board) -> Board,
    {
        let next = f(&self.current);
        self.publish(next)
    }

    fn publish(&mut self, board: Board) -> Arc<Board> {
        self.current = Arc::new(board);
        self.revision += 1;
        tracing::trace!(revision = self.revision, "board published");
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::board;
    use crate::model::BoardSettings;

    #[test]
    fn update_publishes_new_value_and_keeps_old_one() {
        let mut store = BoardStore::new(board(&[("a", &["t1"])]));
        let before = store.current();

        let after = store.update(|b| {
            b.with_settings(BoardSettings { is_condensed: true })
        });

        assert!(!Arc::ptr_eq(&before, &after));
        assert!(!before.settings.is_condensed);
        assert!(after.settings.is_condensed);
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn current_is_stable_without_updates() {
        let store = BoardStore::new(board(&[("a", &[])]));
        assert!(Arc::ptr_eq(&store.current(), &store.current()));
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn replace_swaps_whole_board() {
        let mut store = BoardStore::default();
        assert!(store.board().columns.is_empty());
        store.replace(board(&[("a", &["t1"]), ("b", &[])]));
        assert_eq!(store.board().column_order.len(), 2);
        assert_eq!(store.board().tasks.len(), 1);
    }
}
