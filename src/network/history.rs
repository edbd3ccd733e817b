//! Undo/redo over immutable topology snapshots.

use std::collections::VecDeque;

use super::editor::EditError;
use super::topology::Topology;

/// Default number of undo steps kept.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Current topology plus the snapshots it was derived from.
///
/// The undo stack is bounded: once `capacity` snapshots are stored the oldest
/// one is dropped.
#[derive(Debug, Clone)]
pub struct EditHistory {
    current: Topology,
    undo: VecDeque<Topology>,
    redo: Vec<Topology>,
    capacity: usize,
}

impl EditHistory {
    pub fn new(initial: Topology, capacity: usize) -> Self {
        Self {
            current: initial,
            undo: VecDeque::new(),
            redo: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn current(&self) -> &Topology {
        &self.current
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Run an edit against the current snapshot. On success the previous
    /// snapshot becomes undoable and the redo stack is cleared; on failure
    /// nothing changes.
    pub fn apply<F>(&mut self, edit: F) -> Result<(), EditError>
    where
        F: FnOnce(&Topology) -> Result<Topology, EditError>,
    {
        let next = edit(&self.current).inspect_err(|e| log::warn!("Edit refused: {}", e))?;
        let previous = std::mem::replace(&mut self.current, next);
        if self.undo.len() >= self.capacity {
            self.undo.pop_front();
        }
        self.undo.push_back(previous);
        self.redo.clear();
        Ok(())
    }

    /// Restore the previous snapshot. Returns false when there is none.
    pub fn undo(&mut self) -> bool {
        match self.undo.pop_back() {
            Some(previous) => {
                let current = std::mem::replace(&mut self.current, previous);
                self.redo.push(current);
                true
            }
            None => false,
        }
    }

    /// Re-apply the last undone snapshot. Returns false when there is none.
    pub fn redo(&mut self) -> bool {
        match self.redo.pop() {
            Some(next) => {
                let current = std::mem::replace(&mut self.current, next);
                self.undo.push_back(current);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::editor::{optimize_space, replace_node};
    use crate::network::node::{Node, NodeKind, Ways};
    use crate::network::topology::Position;

    fn start() -> Topology {
        Topology::new(1, 1).place(Position::new(0, 0), Node::new(0, NodeKind::Antenna))
    }

    #[test]
    fn undo_and_redo_walk_snapshots() {
        let mut history = EditHistory::new(start(), DEFAULT_HISTORY_CAPACITY);
        history.apply(|t| replace_node(t, 0, NodeKind::Combiner { ways: Ways::Two })).unwrap();
        assert_eq!(history.current().len(), 3);
        assert!(history.undo());
        assert_eq!(history.current(), &start());
        assert!(!history.undo());
        assert!(history.redo());
        assert_eq!(history.current().len(), 3);
        assert!(!history.redo());
    }

    #[test]
    fn failed_edit_changes_nothing() {
        let mut history = EditHistory::new(start(), DEFAULT_HISTORY_CAPACITY);
        let result = history.apply(|t| replace_node(t, 9, NodeKind::Load));
        assert_eq!(result, Err(EditError::NodeNotFound(9)));
        assert!(!history.can_undo());
        assert_eq!(history.current(), &start());
    }

    #[test]
    fn new_edit_clears_redo() {
        let mut history = EditHistory::new(start(), DEFAULT_HISTORY_CAPACITY);
        history.apply(|t| replace_node(t, 0, NodeKind::Load)).unwrap();
        history.undo();
        assert!(history.can_redo());
        history.apply(|t| Ok(optimize_space(t.clone()))).unwrap();
        assert!(!history.can_redo());
    }

    #[test]
    fn capacity_drops_oldest_snapshot() {
        let mut history = EditHistory::new(start(), 2);
        for kind in ["load", "antenna", "attenuator"] {
            history.apply(|t| replace_node(t, 0, kind.parse().unwrap())).unwrap();
        }
        assert!(history.undo());
        assert!(history.undo());
        assert!(!history.undo());
        // the initial antenna snapshot fell off, the oldest kept one is "load"
        assert_eq!(history.current().node(0).unwrap().kind, NodeKind::Load);
    }
}
