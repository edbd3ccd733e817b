//! Per-node signal report built from a propagation result.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::config::PlannerConfig;
use crate::network::{NodeId, Topology};
use crate::propagation::FALLBACK_POWER;

/// Coverage class of a node's signal level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalQuality {
    Weak,
    Good,
    Excellent,
}

impl SignalQuality {
    /// `Weak` below `weak`, `Excellent` at or above `excellent`, `Good` in between.
    pub fn classify(power: f64, weak: f64, excellent: f64) -> Self {
        if power < weak {
            SignalQuality::Weak
        } else if power >= excellent {
            SignalQuality::Excellent
        } else {
            SignalQuality::Good
        }
    }
}

impl fmt::Display for SignalQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalQuality::Weak => write!(f, "weak"),
            SignalQuality::Good => write!(f, "good"),
            SignalQuality::Excellent => write!(f, "excellent"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeReport {
    pub id: NodeId,
    pub kind: String,
    pub row: usize,
    pub col: usize,
    pub power_dbm: f64,
    pub quality: SignalQuality,
    /// Coupler tap levels (dBm), absent for other kinds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taps_dbm: Option<(f64, f64)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignalReport {
    /// RFC 3339 timestamp.
    pub generated_at: String,
    pub frequency_mhz: u32,
    pub base_station_signal: f64,
    pub nodes: Vec<NodeReport>,
}

impl SignalReport {
    /// One entry per placed node, in row-major grid order.
    pub fn build(topology: &Topology, powers: &HashMap<NodeId, f64>, config: &PlannerConfig) -> Self {
        Self::build_at(Utc::now(), topology, powers, config)
    }

    fn build_at(generated_at: DateTime<Utc>, topology: &Topology, powers: &HashMap<NodeId, f64>, config: &PlannerConfig) -> Self {
        let nodes = topology
            .iter()
            .map(|(position, node)| {
                let power = powers.get(&node.id).copied().unwrap_or(FALLBACK_POWER);
                NodeReport {
                    id: node.id,
                    kind: node.kind.label(),
                    row: position.row,
                    col: position.col,
                    power_dbm: power,
                    quality: SignalQuality::classify(power, config.weak_signal_threshold, config.excellent_signal_threshold),
                    taps_dbm: node.tap_outputs(power),
                }
            })
            .collect();
        Self {
            generated_at: generated_at.to_rfc3339(),
            frequency_mhz: config.frequency.mhz(),
            base_station_signal: config.base_station_signal,
            nodes,
        }
    }

    pub fn count(&self, quality: SignalQuality) -> usize {
        self.nodes.iter().filter(|n| n.quality == quality).count()
    }
}

impl fmt::Display for SignalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Signal report at {} MHz, base station {:.1} dBm ({})",
            self.frequency_mhz, self.base_station_signal, self.generated_at
        )?;
        writeln!(f, "{:>6}  {:<12} {:>9}  {:>11}  {:<9}  taps", "id", "kind", "cell", "power dBm", "quality")?;
        for node in &self.nodes {
            let cell = format!("{},{}", node.row, node.col);
            write!(f, "{:>6}  {:<12} {:>9}  {:>11.2}  {:<9}", node.id, node.kind, cell, node.power_dbm, node.quality.to_string())?;
            if let Some((tap1, tap2)) = node.taps_dbm {
                write!(f, "  {:.2} / {:.2}", tap1, tap2)?;
            }
            writeln!(f)?;
        }
        write!(
            f,
            "{} nodes: {} excellent, {} good, {} weak",
            self.nodes.len(),
            self.count(SignalQuality::Excellent),
            self.count(SignalQuality::Good),
            self.count(SignalQuality::Weak)
        )
    }
}
