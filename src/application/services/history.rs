//! History manager
//!
//! Linear undo/redo over full tree snapshots. Recording after an undo discards the
//! redoable branch.

use tracing::{instrument, trace};

use crate::domain::PageTree;

/// Snapshot stack with a cursor pointing at the current state.
#[derive(Debug, Clone)]
pub struct HistoryManager {
    snapshots: Vec<PageTree>,
    cursor: usize,
    limit: Option<usize>,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(PageTree::default())
    }
}

impl HistoryManager {
    /// Start a history whose first snapshot is `initial`.
    pub fn new(initial: PageTree) -> Self {
        Self::with_limit(initial, None)
    }

    /// Like [`new`](Self::new), keeping at most `limit` snapshots (at least one).
    pub fn with_limit(initial: PageTree, limit: Option<usize>) -> Self {
        Self {
            snapshots: vec![initial],
            cursor: 0,
            limit: limit.map(|l| l.max(1)),
        }
    }

    /// Truncate after the cursor, append a snapshot of `tree`, move the cursor onto it.
    #[instrument(level = "trace", skip_all)]
    pub fn record(&mut self, tree: &PageTree) {
        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push(tree.clone());
        self.cursor = self.snapshots.len() - 1;

        if let Some(limit) = self.limit {
            let overflow = self.snapshots.len().saturating_sub(limit);
            if overflow > 0 {
                self.snapshots.drain(..overflow);
                self.cursor -= overflow;
            }
        }
        trace!("history: recorded, cursor={} len={}", self.cursor, self.snapshots.len());
    }

    /// Step back; `None` when there is nothing to undo.
    pub fn undo(&mut self) -> Option<&PageTree> {
        if !self.can_undo() {
            trace!("history: nothing to undo");
            return None;
        }
        self.cursor -= 1;
        trace!("history: undo, cursor={}", self.cursor);
        self.snapshots.get(self.cursor)
    }

    /// Step forward; `None` when there is nothing to redo.
    pub fn redo(&mut self) -> Option<&PageTree> {
        if !self.can_redo() {
            trace!("history: nothing to redo");
            return None;
        }
        self.cursor += 1;
        trace!("history: redo, cursor={}", self.cursor);
        self.snapshots.get(self.cursor)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    pub fn current(&self) -> &PageTree {
        &self.snapshots[self.cursor]
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Forget everything and restart from `tree`.
    pub fn clear(&mut self, tree: PageTree) {
        self.snapshots = vec![tree];
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Node;

    fn tree(n: usize) -> PageTree {
        PageTree::from_roots((0..n).map(|i| Node::new(format!("n{i}"), "text")).collect())
    }

    #[test]
    fn given_limit_when_recording_past_it_then_oldest_dropped() {
        let mut history = HistoryManager::with_limit(tree(0), Some(3));
        for n in 1..=5 {
            history.record(&tree(n));
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.current(), &tree(5));
        assert!(history.undo().is_some());
        assert!(history.undo().is_some());
        assert_eq!(history.current(), &tree(3));
        assert!(history.undo().is_none());
    }
}
