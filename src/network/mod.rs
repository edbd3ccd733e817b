//! RF distribution network model.
//!
//! - `cable`: cable catalogue and per-band loss
//! - `node`: network elements (antennas, loads, splitters, combiners, repeater, inline elements)
//! - `topology`: the sparse grid holding placed nodes, with its structural primitives
//! - `editor`: type-change transforms, cascade deletion and grid compaction
//! - `history`: undo/redo over topology snapshots

pub mod cable;
pub mod editor;
pub mod history;
pub mod node;
pub mod topology;

pub use cable::Frequency;
pub use editor::{optimize_space, replace_node};
pub use history::EditHistory;
pub use node::{Node, NodeId, NodeKind};
pub use topology::{Position, Topology};
