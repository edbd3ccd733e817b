//! Sparse grid holding the placed network elements.
//!
//! The grid position of a node only matters for one thing in the computation:
//! whether the node sits above (source side) or below (service side) the
//! repeater. Everything else is carried by the `end_element_id` links.
//!
//! Structural primitives consume the topology and return the edited value.
//! Callers that need the previous state (undo, a computation still reading it)
//! keep a clone; nothing is ever mutated behind a shared snapshot.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::node::{Node, NodeId};

/// Cell coordinates, row 0 is the top of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    cells: Vec<Vec<Option<Node>>>,
    col_count: usize,
    /// id → position, rebuilt after every structural change.
    index: HashMap<NodeId, Position>,
}

impl Default for Topology {
    fn default() -> Self {
        Topology::new(1, 1)
    }
}

impl Topology {
    /// Empty grid; never smaller than 1×1.
    pub fn new(rows: usize, cols: usize) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        Self {
            cells: vec![vec![None; cols]; rows],
            col_count: cols,
            index: HashMap::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.cells.len()
    }

    pub fn col_count(&self) -> usize {
        self.col_count
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Node> {
        self.cells.get(row)?.get(col)?.as_ref()
    }

    pub fn get_at(&self, position: Position) -> Option<&Node> {
        self.get(position.row, position.col)
    }

    /// Position of the node with the given id. With duplicated ids (an
    /// unvalidated plan) the first one in row-major order wins.
    pub fn find(&self, id: NodeId) -> Option<Position> {
        self.index.get(&id).copied()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.find(id).and_then(|position| self.get_at(position))
    }

    /// All placed nodes in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (Position, &Node)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .flat_map(|(row, cells)| cells.iter().enumerate().filter_map(move |(col, cell)| cell.as_ref().map(|node| (Position::new(row, col), node))))
    }

    /// Nodes whose cable connects to `id`.
    pub fn children_of(&self, id: NodeId) -> impl Iterator<Item = (Position, &Node)> + '_ {
        self.iter().filter(move |(_, node)| node.end_element_id == Some(id))
    }

    pub fn repeater(&self) -> Option<(Position, &Node)> {
        self.iter().find(|(_, node)| node.kind.is_repeater())
    }

    /// True on the service side of the network (strictly below the repeater row).
    /// Without a repeater every node is on the source side.
    pub fn is_below_repeater(&self, position: Position) -> bool {
        self.repeater().is_some_and(|(repeater, _)| position.row > repeater.row)
    }

    pub fn is_row_empty(&self, row: usize) -> bool {
        self.cells.get(row).is_some_and(|cells| cells.iter().all(Option::is_none))
    }

    pub fn is_col_empty(&self, col: usize) -> bool {
        col < self.col_count && self.cells.iter().all(|cells| cells[col].is_none())
    }

    /// Put `node` at `position`, growing the grid when the position lies
    /// outside it. Whatever occupied the cell is dropped.
    pub fn place(mut self, position: Position, node: Node) -> Self {
        while self.row_count() <= position.row {
            self.cells.push(vec![None; self.col_count]);
        }
        if self.col_count <= position.col {
            self.col_count = position.col + 1;
            for cells in &mut self.cells {
                cells.resize(self.col_count, None);
            }
        }
        self.cells[position.row][position.col] = Some(node);
        self.reindex();
        self
    }

    /// Empty the cell holding `id`. Links pointing at it are left as they are.
    pub fn remove_node(mut self, id: NodeId) -> Self {
        if let Some(position) = self.find(id) {
            self.cells[position.row][position.col] = None;
            self.reindex();
        }
        self
    }

    /// Insert an empty row before `index`; `index == row_count` appends.
    pub fn insert_row(mut self, index: usize) -> Self {
        if index > self.row_count() {
            return self;
        }
        self.cells.insert(index, vec![None; self.col_count]);
        self.reindex();
        self
    }

    /// Remove row `index` and every node in it. Refused on a single-row grid.
    pub fn remove_row(mut self, index: usize) -> Self {
        if self.row_count() <= 1 || index >= self.row_count() {
            return self;
        }
        self.cells.remove(index);
        self.reindex();
        self
    }

    /// Insert an empty column before `index`; `index == col_count` appends.
    pub fn insert_col(mut self, index: usize) -> Self {
        if index > self.col_count {
            return self;
        }
        for cells in &mut self.cells {
            cells.insert(index, None);
        }
        self.col_count += 1;
        self.reindex();
        self
    }

    /// Remove column `index` and every node in it. Refused on a single-column grid.
    pub fn remove_col(mut self, index: usize) -> Self {
        if self.col_count <= 1 || index >= self.col_count {
            return self;
        }
        for cells in &mut self.cells {
            cells.remove(index);
        }
        self.col_count -= 1;
        self.reindex();
        self
    }

    /// Move the cells of `row` from `from_col` onwards one column to the right,
    /// leaving `from_col` empty. Other rows keep their layout unless the last
    /// cell of `row` is occupied, in which case the grid gains a column.
    pub fn shift_row_elements_right(mut self, row: usize, from_col: usize) -> Self {
        if row >= self.row_count() || from_col >= self.col_count {
            return self;
        }
        if self.cells[row][self.col_count - 1].is_some() {
            self.col_count += 1;
            for cells in &mut self.cells {
                cells.push(None);
            }
        }
        let cells = &mut self.cells[row];
        cells.pop();
        cells.insert(from_col, None);
        self.reindex();
        self
    }

    fn reindex(&mut self) {
        let mut index = HashMap::new();
        for (position, node) in self.iter() {
            index.entry(node.id).or_insert(position);
        }
        self.index = index;
    }

    /// Build a topology from positioned nodes, growing the grid to fit.
    pub fn from_cells(rows: usize, cols: usize, cells: impl IntoIterator<Item = (Position, Node)>) -> Self {
        cells.into_iter().fold(Topology::new(rows, cols), |topology, (position, node)| topology.place(position, node))
    }
}
