//! Signal propagation over a topology snapshot.
//!
//! Computes, for every node, the power (dBm) arriving there given the base
//! station level injected at the sources and the operating band.
//!
//! The evaluation is a memoized depth-first traversal with a cycle guard, so
//! any grid the editor can produce (dangling links, self references, loops)
//! yields a finite value for every node instead of an error or a hang.
//!
//! Units:
//! - Power: dBm, mW (conversion provided)
//! - Gains, losses and cable attenuation: dB

use std::collections::HashMap;

use crate::network::cable::{Frequency, cable_loss};
use crate::network::node::{Node, NodeId, NodeKind};
use crate::network::topology::{Position, Topology};

/// Power reported for anything the engine cannot resolve: a missing node, a
/// link closing a cycle, a node without inputs, an unknown kind.
pub const FALLBACK_POWER: f64 = 0.0;

/// Convert power from dBm to milliwatts.
///
/// ```text
/// P(mW) = 10^(P(dBm) / 10)
/// 0 dBm → 1 mW, 10 dBm → 10 mW, -10 dBm → 0.1 mW
/// ```
pub fn dbm_to_mw(dbm: f64) -> f64 {
    10f64.powf(dbm / 10.0)
}

/// Convert power from milliwatts to dBm, the inverse of [`dbm_to_mw`].
///
/// For `mw <= 0` the result is -∞ or NaN; callers only pass sums of
/// converted dBm values, which are always positive.
pub fn mw_to_dbm(mw: f64) -> f64 {
    10.0 * mw.log10()
}

/// Compute the signal power at every node of `topology`.
///
/// # Parameters
///
/// * `topology` - Snapshot to evaluate; it is only read
/// * `base_station_signal` - Level injected at every source-side antenna/load (dBm)
/// * `frequency` - Operating band, selects the cable attenuation
///
/// # Returns
///
/// Map from node id to dBm. Every placed node has an entry.
pub fn compute_signal_power(topology: &Topology, base_station_signal: f64, frequency: Frequency) -> HashMap<NodeId, f64> {
    let mut propagation = Propagation::new(topology, base_station_signal, frequency);
    let powers: HashMap<NodeId, f64> = topology.iter().map(|(_, node)| (node.id, propagation.calculate(node.id).power)).collect();
    log::debug!("Computed signal power for {} nodes at {}", powers.len(), frequency);
    powers
}

/// Signal power at a single node; [`FALLBACK_POWER`] for an unknown id.
pub fn power_at(topology: &Topology, id: NodeId, base_station_signal: f64, frequency: Frequency) -> f64 {
    Propagation::new(topology, base_station_signal, frequency).calculate(id).power
}

/// Result of evaluating one node.
#[derive(Debug, Clone, Copy)]
struct Evaluated {
    power: f64,
    /// Smallest recursion depth of a still-open node whose cycle fallback this
    /// value depends on. Such a value is only valid inside the current call
    /// chain and must not be memoized.
    open_cycle: Option<usize>,
}

impl Evaluated {
    fn settled(power: f64) -> Self {
        Self { power, open_cycle: None }
    }
}

/// Per-invocation state: memo table and the nodes currently on the stack.
struct Propagation<'a> {
    topology: &'a Topology,
    source_signal: f64,
    frequency: Frequency,
    cache: HashMap<NodeId, f64>,
    /// id → recursion depth at which it is being evaluated.
    in_progress: HashMap<NodeId, usize>,
}

impl<'a> Propagation<'a> {
    fn new(topology: &'a Topology, source_signal: f64, frequency: Frequency) -> Self {
        Self {
            topology,
            source_signal,
            frequency,
            cache: HashMap::new(),
            in_progress: HashMap::new(),
        }
    }

    fn calculate(&mut self, id: NodeId) -> Evaluated {
        if let Some(&power) = self.cache.get(&id) {
            return Evaluated::settled(power);
        }
        if let Some(&depth) = self.in_progress.get(&id) {
            log::debug!("Cycle through node {}, using fallback power", id);
            return Evaluated {
                power: FALLBACK_POWER,
                open_cycle: Some(depth),
            };
        }
        let topology = self.topology;
        let Some(position) = topology.find(id) else {
            return Evaluated::settled(FALLBACK_POWER);
        };
        let Some(node) = topology.get_at(position) else {
            return Evaluated::settled(FALLBACK_POWER);
        };

        let depth = self.in_progress.len();
        self.in_progress.insert(id, depth);
        let mut open_cycle = None;

        let power = match &node.kind {
            NodeKind::Antenna | NodeKind::Load if topology.is_below_repeater(position) => self.service_source(node, &mut open_cycle),
            NodeKind::Antenna | NodeKind::Load => node.signal_power + self.source_signal,
            NodeKind::Combiner { .. } => self.combiner(node, &mut open_cycle),
            NodeKind::Repeater { .. } => self.repeater(node, position, &mut open_cycle),
            NodeKind::Splitter { .. } => match self.strongest_input(node, position, &mut open_cycle) {
                Some(input) => input + node.signal_power,
                None => FALLBACK_POWER,
            },
            NodeKind::Booster { max_output_power } => match self.strongest_input(node, position, &mut open_cycle) {
                Some(input) => (input + node.signal_power).min(*max_output_power),
                None => FALLBACK_POWER,
            },
            NodeKind::Coupler { .. } | NodeKind::Attenuator => match self.strongest_input(node, position, &mut open_cycle) {
                Some(input) => input + node.signal_power,
                None => FALLBACK_POWER,
            },
        };

        self.in_progress.remove(&id);
        // a fallback taken for this very node is resolved now that it is done
        if open_cycle.is_some_and(|open| open >= depth) {
            open_cycle = None;
        }
        if open_cycle.is_none() {
            self.cache.insert(id, power);
        }
        Evaluated { power, open_cycle }
    }

    /// Evaluate `id` as an input, folding its cycle dependency into `open_cycle`.
    fn input(&mut self, id: NodeId, open_cycle: &mut Option<usize>) -> f64 {
        let evaluated = self.calculate(id);
        if let Some(depth) = evaluated.open_cycle {
            *open_cycle = Some(open_cycle.map_or(depth, |current| current.min(depth)));
        }
        evaluated.power
    }

    /// Power delivered by `child` at the far end of its own cable.
    fn delivered(&mut self, child: &Node, open_cycle: &mut Option<usize>) -> f64 {
        self.input(child.id, open_cycle) + cable_loss(&child.cable, self.frequency)
    }

    /// Linear-domain sum of every branch feeding the combiner, plus its insertion loss.
    fn combiner(&mut self, node: &Node, open_cycle: &mut Option<usize>) -> f64 {
        let topology = self.topology;
        let mut total_mw = 0.0;
        let mut inputs = 0;
        for (_, child) in topology.children_of(node.id) {
            total_mw += dbm_to_mw(self.delivered(child, open_cycle));
            inputs += 1;
        }
        if inputs == 0 {
            return FALLBACK_POWER;
        }
        mw_to_dbm(total_mw) + node.signal_power
    }

    /// Strongest source-side branch plus the repeater gain. Branches hanging
    /// below the repeater are its outputs, not its inputs.
    fn repeater(&mut self, node: &Node, position: Position, open_cycle: &mut Option<usize>) -> f64 {
        match self.strongest_child_above(node, position, open_cycle) {
            Some(input) => input + node.signal_power,
            None => FALLBACK_POWER,
        }
    }

    /// Input set of a splitter or inline element: children structurally above
    /// it, plus its parent when the parent sits in a lower row index. Only one
    /// is expected to be live; the maximum is taken when several are.
    ///
    /// The row comparison is a positional heuristic for telling upstream from
    /// downstream neighbours and can misfire on hand-contorted grids.
    fn strongest_input(&mut self, node: &Node, position: Position, open_cycle: &mut Option<usize>) -> Option<f64> {
        let topology = self.topology;
        let mut strongest = self.strongest_child_above(node, position, open_cycle);
        if let Some(parent) = node.end_element_id {
            if topology.find(parent).is_some_and(|parent_position| parent_position.row < position.row) {
                let delivered = self.input(parent, open_cycle) + cable_loss(&node.cable, self.frequency);
                strongest = Some(strongest.map_or(delivered, |current| current.max(delivered)));
            }
        }
        strongest
    }

    fn strongest_child_above(&mut self, node: &Node, position: Position, open_cycle: &mut Option<usize>) -> Option<f64> {
        let topology = self.topology;
        let mut strongest: Option<f64> = None;
        for (child_position, child) in topology.children_of(node.id) {
            if child_position.row >= position.row {
                continue;
            }
            let delivered = self.delivered(child, open_cycle);
            strongest = Some(strongest.map_or(delivered, |current| current.max(delivered)));
        }
        strongest
    }

    /// Antenna or load on the service side: whatever its parent delivers over
    /// this node's cable.
    fn service_source(&mut self, node: &Node, open_cycle: &mut Option<usize>) -> f64 {
        if let Some(parent) = node.end_element_id {
            return self.input(parent, open_cycle) + cable_loss(&node.cable, self.frequency);
        }
        // broken link: look for a node that names this one as its parent instead
        let topology = self.topology;
        match topology.children_of(node.id).next() {
            Some((_, child)) => self.delivered(child, open_cycle),
            None => FALLBACK_POWER,
        }
    }
}
