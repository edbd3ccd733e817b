//! Structural edits applied when the user changes the type of a node.
//!
//! All operations take a topology value and hand back the edited one; the
//! caller decides whether to keep the previous snapshot. Grid compaction is
//! never implicit: call [`optimize_space`] after an edit when a minimal grid is
//! wanted.

use std::collections::HashSet;
use std::fmt;

use super::node::{Node, NodeId, NodeKind};
use super::topology::{Position, Topology};

/// Reasons a type-change intent is refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    NodeNotFound(NodeId),
    /// The network already has a repeater (its id is carried).
    RepeaterExists(NodeId),
    /// The repeater joins both sides of the network and cannot be turned into something else.
    RepeaterLocked(NodeId),
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditError::NodeNotFound(id) => write!(f, "Node {} not found", id),
            EditError::RepeaterExists(id) => write!(f, "Network already has a repeater (node {})", id),
            EditError::RepeaterLocked(id) => write!(f, "Node {} is the repeater and cannot change type", id),
        }
    }
}

impl std::error::Error for EditError {}

/// An id not used by any node of `topology`: one past the current maximum, or
/// the smallest free id once the maximum is `NodeId::MAX`.
pub fn generate_new_id(topology: &Topology) -> NodeId {
    let Some(max) = topology.iter().map(|(_, node)| node.id).max() else {
        return 0;
    };
    max.checked_add(1).unwrap_or_else(|| {
        let used: HashSet<NodeId> = topology.iter().map(|(_, node)| node.id).collect();
        // a grid holds far fewer than NodeId::MAX nodes, so a gap exists
        (0..NodeId::MAX).find(|id| !used.contains(id)).unwrap_or(NodeId::MAX)
    })
}

/// Delete every node that hangs off `id`, depth first: a deleted node's own
/// dependents go with it. `id` itself stays.
///
/// Links normally form a tree here; a visited set keeps malformed, looping
/// links from recursing forever.
pub fn remove_connected_elements_above(topology: Topology, id: NodeId) -> Topology {
    let mut visited = HashSet::from([id]);
    let mut doomed = Vec::new();
    collect_dependents(&topology, id, &mut visited, &mut doomed);
    if !doomed.is_empty() {
        log::debug!("Removing {} nodes connected to node {}: {:?}", doomed.len(), id, doomed);
    }
    doomed.into_iter().fold(topology, |topology, doomed_id| topology.remove_node(doomed_id))
}

/// Post-order walk: children are listed before the node they hang off.
fn collect_dependents(topology: &Topology, id: NodeId, visited: &mut HashSet<NodeId>, doomed: &mut Vec<NodeId>) {
    let children: Vec<NodeId> = topology.children_of(id).map(|(_, node)| node.id).collect();
    for child in children {
        if !visited.insert(child) {
            continue;
        }
        collect_dependents(topology, child, visited, doomed);
        doomed.push(child);
    }
}

/// Remove fully empty rows and columns, highest index first so earlier
/// removals do not move the ones still to be checked. The grid never shrinks
/// below 1×1.
pub fn optimize_space(topology: Topology) -> Topology {
    let (rows, cols) = (topology.row_count(), topology.col_count());
    let mut topology = (0..rows).rev().fold(topology, |topology, row| {
        if topology.is_row_empty(row) { topology.remove_row(row) } else { topology }
    });
    topology = (0..cols).rev().fold(topology, |topology, col| {
        if topology.is_col_empty(col) { topology.remove_col(col) } else { topology }
    });
    if (rows, cols) != (topology.row_count(), topology.col_count()) {
        log::debug!(
            "Compacted grid from {}x{} to {}x{}",
            rows,
            cols,
            topology.row_count(),
            topology.col_count()
        );
    }
    topology
}

/// Turn node `id` into a node of `kind`.
///
/// The replacement keeps the id, parent link and cable so inbound references
/// stay valid. When the old node was a splitter/combiner its branches are
/// deleted first. When the new kind is a splitter/combiner one fresh antenna
/// per port is spawned next to it: in the row above on the source side of the
/// repeater, in the row below on the service side. Rows and columns are added
/// as needed.
///
/// # Errors
///
/// - [`EditError::NodeNotFound`] when no node has this id
/// - [`EditError::RepeaterExists`] when asking for a second repeater
/// - [`EditError::RepeaterLocked`] when the repeater would become something else
pub fn replace_node(topology: &Topology, id: NodeId, kind: NodeKind) -> Result<Topology, EditError> {
    let position = topology.find(id).ok_or(EditError::NodeNotFound(id))?;
    let old = topology.get_at(position).ok_or(EditError::NodeNotFound(id))?;
    if old.kind.is_repeater() && !kind.is_repeater() {
        return Err(EditError::RepeaterLocked(id));
    }
    if kind.is_repeater() {
        if let Some((_, repeater)) = topology.repeater() {
            if repeater.id != id {
                return Err(EditError::RepeaterExists(repeater.id));
            }
        }
    }

    let below = topology.is_below_repeater(position);
    let mut replacement = Node::new(id, kind.clone()).with_cable(old.cable.clone());
    replacement.end_element_id = old.end_element_id;
    log::debug!("Replacing node {} ({}) at {:?} with {}", id, old.kind, position, kind);

    let mut next = topology.clone();
    if old.kind.is_combining() {
        next = remove_connected_elements_above(next, id);
    }
    next = next.place(position, replacement);
    if let Some(ways) = kind.ways() {
        next = spawn_children(next, id, ways.count(), below);
    }
    Ok(next)
}

/// Place `count` new antennas linked to `parent`, starting at the parent's
/// column in the adjacent row. Occupied cells are pushed right.
fn spawn_children(topology: Topology, parent: NodeId, count: usize, below: bool) -> Topology {
    let Some(position) = topology.find(parent) else {
        return topology;
    };
    let (mut topology, child_row) = if below {
        let row = position.row + 1;
        if row == topology.row_count() { (topology.insert_row(row), row) } else { (topology, row) }
    } else if position.row == 0 {
        // the parent moves down to row 1
        (topology.insert_row(0), 0)
    } else {
        (topology, position.row - 1)
    };

    for offset in 0..count {
        let col = position.col + offset;
        if col >= topology.col_count() {
            let end = topology.col_count();
            topology = topology.insert_col(end);
        } else if topology.get(child_row, col).is_some() {
            topology = topology.shift_row_elements_right(child_row, col);
        }
        let child = Node::new(generate_new_id(&topology), NodeKind::Antenna).with_parent(parent);
        log::debug!("Spawned antenna {} for node {} at ({}, {})", child.id, parent, child_row, col);
        topology = topology.place(Position::new(child_row, col), child);
    }
    topology
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::node::Ways;

    fn at(row: usize, col: usize) -> Position {
        Position::new(row, col)
    }

    fn antenna(id: NodeId, parent: NodeId) -> Node {
        Node::new(id, NodeKind::Antenna).with_parent(parent)
    }

    /// Donor side: antennas 1, 2 → combiner 3 → repeater 4.
    /// Service side: repeater 4 → splitter 5 → antennas 6, 7.
    fn network() -> Topology {
        Topology::from_cells(
            5,
            2,
            [
                (at(0, 0), antenna(1, 3)),
                (at(0, 1), antenna(2, 3)),
                (at(1, 0), Node::new(3, NodeKind::Combiner { ways: Ways::Two }).with_parent(4)),
                (at(2, 0), Node::new(4, NodeKind::Repeater { max_output_power: 33.0 })),
                (at(3, 0), Node::new(5, NodeKind::Splitter { ways: Ways::Two }).with_parent(4)),
                (at(4, 0), antenna(6, 5)),
                (at(4, 1), antenna(7, 5)),
            ],
        )
    }

    fn assert_unique_ids(topology: &Topology) {
        let ids: Vec<NodeId> = topology.iter().map(|(_, n)| n.id).collect();
        let unique: HashSet<NodeId> = ids.iter().copied().collect();
        assert_eq!(ids.len(), unique.len(), "duplicate ids in {:?}", ids);
        assert!(topology.find(generate_new_id(topology)).is_none());
    }

    fn assert_links_resolve(topology: &Topology) {
        for (_, node) in topology.iter() {
            if let Some(parent) = node.end_element_id {
                assert!(topology.find(parent).is_some(), "node {} points at missing {}", node.id, parent);
            }
        }
    }

    fn assert_compact(topology: &Topology) {
        assert!(topology.row_count() >= 1 && topology.col_count() >= 1);
        if topology.row_count() > 1 {
            assert!((0..topology.row_count()).all(|row| !topology.is_row_empty(row)));
        }
        if topology.col_count() > 1 {
            assert!((0..topology.col_count()).all(|col| !topology.is_col_empty(col)));
        }
    }

    #[test]
    fn new_id_is_past_the_maximum() {
        assert_eq!(generate_new_id(&Topology::default()), 0);
        assert_eq!(generate_new_id(&network()), 8);
        let sparse = Topology::new(1, 3)
            .place(at(0, 0), Node::new(0, NodeKind::Load))
            .place(at(0, 2), Node::new(5, NodeKind::Load));
        assert_eq!(generate_new_id(&sparse), 6);
    }

    #[test]
    fn new_id_after_largest_id_takes_smallest_free() {
        let full = Topology::new(1, 2)
            .place(at(0, 0), Node::new(NodeId::MAX, NodeKind::Antenna))
            .place(at(0, 1), Node::new(0, NodeKind::Load));
        assert_eq!(generate_new_id(&full), 1);

        let replaced = replace_node(&full, NodeId::MAX, NodeKind::Splitter { ways: Ways::Two }).unwrap();
        assert_eq!(replaced.len(), 4);
        let mut children: Vec<NodeId> = replaced.children_of(NodeId::MAX).map(|(_, node)| node.id).collect();
        children.sort();
        assert_eq!(children, vec![1, 2]);
    }

    #[test]
    fn cascade_removes_nested_branches() {
        // combiner 3 gets a nested combiner 8 with its own antenna 9
        let topology = network()
            .insert_row(0)
            .place(at(1, 1), Node::new(8, NodeKind::Combiner { ways: Ways::Two }).with_parent(3))
            .place(at(0, 1), antenna(9, 8));
        let pruned = remove_connected_elements_above(topology, 3);
        for gone in [1, 2, 8, 9] {
            assert!(pruned.find(gone).is_none(), "node {} should be removed", gone);
        }
        for kept in [3, 4, 5, 6, 7] {
            assert!(pruned.find(kept).is_some(), "node {} should be kept", kept);
        }
        assert_links_resolve(&pruned);
    }

    #[test]
    fn cascade_terminates_on_looping_links() {
        let topology = Topology::from_cells(
            1,
            3,
            [(at(0, 0), antenna(1, 2)), (at(0, 1), antenna(2, 1)), (at(0, 2), Node::new(3, NodeKind::Load).with_parent(3))],
        );
        let pruned = remove_connected_elements_above(topology.clone(), 1);
        assert!(pruned.find(1).is_some());
        assert!(pruned.find(2).is_none());
        // a self link does not delete the node itself
        let pruned = remove_connected_elements_above(topology, 3);
        assert!(pruned.find(3).is_some());
    }

    #[test]
    fn optimize_space_drops_empty_rows_and_columns() {
        let topology = Topology::new(4, 4).place(at(1, 2), Node::new(1, NodeKind::Antenna)).place(at(3, 2), Node::new(2, NodeKind::Antenna));
        let compact = optimize_space(topology);
        assert_eq!((compact.row_count(), compact.col_count()), (2, 1));
        assert_eq!(compact.find(1), Some(at(0, 0)));
        assert_eq!(compact.find(2), Some(at(1, 0)));
    }

    #[test]
    fn optimize_space_keeps_one_cell() {
        let compact = optimize_space(Topology::new(3, 5));
        assert_eq!((compact.row_count(), compact.col_count()), (1, 1));
    }

    #[test]
    fn replacing_source_side_antenna_spawns_children_above() {
        let edited = replace_node(&network(), 1, NodeKind::Splitter { ways: Ways::Two }).unwrap();
        // node 1 sat in row 0, so a row was added on top
        assert_eq!(edited.row_count(), 6);
        let replaced = edited.node(1).unwrap();
        assert_eq!(replaced.kind, NodeKind::Splitter { ways: Ways::Two });
        assert_eq!(replaced.end_element_id, Some(3));
        assert_eq!(replaced.signal_power, Ways::Two.insertion_loss());
        assert_eq!(edited.find(1), Some(at(1, 0)));
        let children: Vec<(Position, NodeId)> = edited.children_of(1).map(|(p, n)| (p, n.id)).collect();
        assert_eq!(children, vec![(at(0, 0), 8), (at(0, 1), 9)]);
        assert!(edited.children_of(1).all(|(_, n)| n.kind == NodeKind::Antenna));
        assert_unique_ids(&edited);
        assert_links_resolve(&edited);
    }

    #[test]
    fn replacing_combiner_rebuilds_its_branches() {
        let edited = replace_node(&network(), 3, NodeKind::Combiner { ways: Ways::Three }).unwrap();
        assert!(edited.find(1).is_none() && edited.find(2).is_none());
        let children: Vec<(Position, NodeId)> = edited.children_of(3).map(|(p, n)| (p, n.id)).collect();
        assert_eq!(children, vec![(at(0, 0), 8), (at(0, 1), 9), (at(0, 2), 10)]);
        assert_eq!(edited.col_count(), 3);
        assert_unique_ids(&edited);
        assert_links_resolve(&edited);
    }

    #[test]
    fn replacing_service_side_antenna_spawns_children_below() {
        let edited = replace_node(&network(), 6, NodeKind::Splitter { ways: Ways::Two }).unwrap();
        assert_eq!(edited.row_count(), 6);
        let children: Vec<Position> = edited.children_of(6).map(|(p, _)| p).collect();
        assert_eq!(children, vec![at(5, 0), at(5, 1)]);
        assert_eq!(edited.node(6).unwrap().end_element_id, Some(5));
    }

    #[test]
    fn spawning_pushes_occupied_cells_right() {
        let first = replace_node(&network(), 6, NodeKind::Splitter { ways: Ways::Two }).unwrap();
        let second = replace_node(&first, 7, NodeKind::Splitter { ways: Ways::Two }).unwrap();
        let row_of_7: Vec<Position> = second.children_of(7).map(|(p, _)| p).collect();
        assert_eq!(row_of_7, vec![at(5, 1), at(5, 2)]);
        let row_of_6: Vec<Position> = second.children_of(6).map(|(p, _)| p).collect();
        assert_eq!(row_of_6, vec![at(5, 0), at(5, 3)]);
        assert_eq!(second.col_count(), 4);
        assert_unique_ids(&second);
    }

    #[test]
    fn splitter_back_to_antenna_round_trip() {
        let edited = replace_node(&network(), 5, NodeKind::Antenna).unwrap();
        assert!(edited.find(6).is_none() && edited.find(7).is_none());
        assert_eq!(edited.node(5).unwrap().end_element_id, Some(4));
        let compact = optimize_space(edited);
        assert_eq!(compact.row_count(), 4);
        assert_compact(&compact);
        assert_links_resolve(&compact);
    }

    #[test]
    fn repeater_rules_are_enforced() {
        let topology = network();
        assert_eq!(replace_node(&topology, 4, NodeKind::Antenna), Err(EditError::RepeaterLocked(4)));
        assert_eq!(
            replace_node(&topology, 1, NodeKind::Repeater { max_output_power: 30.0 }),
            Err(EditError::RepeaterExists(4))
        );
        let retuned = replace_node(&topology, 4, NodeKind::Repeater { max_output_power: 30.0 }).unwrap();
        assert_eq!(retuned.node(4).unwrap().kind, NodeKind::Repeater { max_output_power: 30.0 });
        assert_eq!(replace_node(&topology, 99, NodeKind::Load), Err(EditError::NodeNotFound(99)));
    }

    #[test]
    fn edit_leaves_source_snapshot_untouched() {
        let topology = network();
        let before = topology.clone();
        let _ = replace_node(&topology, 3, NodeKind::Splitter { ways: Ways::Four }).unwrap();
        assert_eq!(topology, before);
    }

    #[test]
    fn ids_stay_unique_over_edit_sequences() {
        let mut topology = network();
        let edits: [(NodeId, &str); 6] = [(1, "combiner3"), (6, "splitter4"), (3, "antenna"), (7, "combiner2"), (5, "load"), (2, "splitter2")];
        for (id, kind) in edits {
            if topology.find(id).is_none() {
                continue;
            }
            topology = replace_node(&topology, id, kind.parse().unwrap()).unwrap();
            assert_unique_ids(&topology);
            assert_links_resolve(&topology);
            topology = optimize_space(topology);
            assert_unique_ids(&topology);
            assert_compact(&topology);
        }
    }
}
