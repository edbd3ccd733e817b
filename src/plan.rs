//! Plan file loading, saving and validation.
//!
//! A plan file is the JSON encoding of a decoded [`Topology`]: the grid size
//! plus every occupied cell with the node placed in it.
//!
//! Loading only rejects what a topology cannot represent (an empty grid,
//! cells outside it, two nodes in one cell). Semantic problems such as
//! dangling links or duplicate ids are reported by [`plan_issues`]; the
//! propagation engine copes with them, so callers decide whether to refuse.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::network::{Node, NodeId, Position, Topology};

/// Error type for plan loading failures.
#[derive(Debug)]
pub enum PlanLoadError {
    FileReadError(String),
    ParseError(String),
    ValidationError(String),
}

impl std::fmt::Display for PlanLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanLoadError::FileReadError(msg) => write!(f, "Failed to read file: {}", msg),
            PlanLoadError::ParseError(msg) => write!(f, "Failed to parse JSON: {}", msg),
            PlanLoadError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for PlanLoadError {}

/// One occupied grid cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedNode {
    pub row: usize,
    pub col: usize,
    pub node: Node,
}

/// Root structure of a plan file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanFile {
    pub rows: usize,
    pub cols: usize,
    #[serde(default)]
    pub cells: Vec<PlacedNode>,
}

impl From<&Topology> for PlanFile {
    fn from(topology: &Topology) -> Self {
        PlanFile {
            rows: topology.row_count(),
            cols: topology.col_count(),
            cells: topology
                .iter()
                .map(|(position, node)| PlacedNode {
                    row: position.row,
                    col: position.col,
                    node: node.clone(),
                })
                .collect(),
        }
    }
}

impl TryFrom<PlanFile> for Topology {
    type Error = String;

    fn try_from(plan: PlanFile) -> Result<Self, Self::Error> {
        if plan.rows == 0 || plan.cols == 0 {
            return Err(format!("Grid must be at least 1x1, got {}x{}", plan.rows, plan.cols));
        }
        let mut occupied = HashSet::new();
        for cell in &plan.cells {
            if cell.row >= plan.rows || cell.col >= plan.cols {
                return Err(format!(
                    "Node {} at ({}, {}) lies outside the {}x{} grid",
                    cell.node.id, cell.row, cell.col, plan.rows, plan.cols
                ));
            }
            if !occupied.insert((cell.row, cell.col)) {
                return Err(format!("Cell ({}, {}) holds more than one node", cell.row, cell.col));
            }
        }
        Ok(Topology::from_cells(
            plan.rows,
            plan.cols,
            plan.cells.into_iter().map(|cell| (Position::new(cell.row, cell.col), cell.node)),
        ))
    }
}

/// Decode a plan from its JSON text.
pub fn parse_plan(data: &str) -> Result<Topology, PlanLoadError> {
    let plan: PlanFile = serde_json::from_str(data)
        .context("Invalid JSON format")
        .map_err(|e| PlanLoadError::ParseError(format!("{:#}", e)))?;
    Topology::try_from(plan).map_err(PlanLoadError::ValidationError)
}

/// Load and decode a plan file.
///
/// # Parameters
///
/// * `path` - Path to the plan JSON file
///
/// # Returns
///
/// The decoded topology, or an error naming the failing stage.
pub fn load_plan(path: &Path) -> Result<Topology, PlanLoadError> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))
        .map_err(|e| PlanLoadError::FileReadError(format!("{:#}", e)))?;
    let topology = parse_plan(&data)?;
    log::info!(
        "Loaded plan {} ({}x{} grid, {} nodes)",
        path.display(),
        topology.row_count(),
        topology.col_count(),
        topology.len()
    );
    Ok(topology)
}

/// Encode a topology as pretty-printed plan JSON.
pub fn plan_to_json(topology: &Topology) -> anyhow::Result<String> {
    serde_json::to_string_pretty(&PlanFile::from(topology)).context("Failed to encode plan")
}

pub fn save_plan(topology: &Topology, path: &Path) -> anyhow::Result<()> {
    let json = plan_to_json(topology)?;
    fs::write(path, json).with_context(|| format!("Failed to write plan: {}", path.display()))?;
    log::info!("Saved plan {}", path.display());
    Ok(())
}

/// Every referential-integrity problem in `topology`, in grid order.
///
/// Checks:
/// - node ids are unique
/// - at most one repeater
/// - every parent link names an existing node other than the node itself
/// - cable lengths are finite and non-negative
pub fn plan_issues(topology: &Topology) -> Vec<String> {
    let mut issues = Vec::new();

    let mut seen: HashMap<NodeId, Position> = HashMap::new();
    for (position, node) in topology.iter() {
        if let Some(first) = seen.insert(node.id, position) {
            issues.push(format!(
                "Duplicate node id {} at ({}, {}) and ({}, {})",
                node.id, first.row, first.col, position.row, position.col
            ));
        }
    }

    let repeaters: Vec<NodeId> = topology.iter().filter(|(_, node)| node.kind.is_repeater()).map(|(_, node)| node.id).collect();
    if repeaters.len() > 1 {
        issues.push(format!("Network has {} repeaters ({:?}), at most one is allowed", repeaters.len(), repeaters));
    }

    for (_, node) in topology.iter() {
        match node.end_element_id {
            Some(parent) if parent == node.id => issues.push(format!("Node {} is linked to itself", node.id)),
            Some(parent) if topology.find(parent).is_none() => issues.push(format!("Node {} is linked to missing node {}", node.id, parent)),
            _ => {}
        }
    }

    for (_, node) in topology.iter() {
        if !node.cable.length.is_finite() || node.cable.length < 0.0 {
            issues.push(format!("Node {} has invalid cable length {}", node.id, node.cable.length));
        }
    }

    issues
}

/// `Ok(())` if the topology is consistent, otherwise the first issue found.
pub fn validate_plan(topology: &Topology) -> Result<(), String> {
    match plan_issues(topology).into_iter().next() {
        Some(issue) => Err(issue),
        None => Ok(()),
    }
}
