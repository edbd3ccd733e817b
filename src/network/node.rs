//! Network elements.
//!
//! Every element shares the same record (id, gain/loss, parent link, cable);
//! the variant specific parameters live in [`NodeKind`]. Parent links are plain
//! ids resolved through the [`Topology`](super::topology::Topology), never
//! owning references, so a grid can be copied or reshaped freely.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::cable::Cable;

/// Identifier of a node, unique across a topology.
pub type NodeId = u32;

/// Port count of a splitter or combiner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Ways {
    Two,
    Three,
    Four,
}

impl Ways {
    pub fn count(self) -> usize {
        match self {
            Ways::Two => 2,
            Ways::Three => 3,
            Ways::Four => 4,
        }
    }

    /// Typical insertion loss of a passive N-way splitter/combiner, in dB.
    pub fn insertion_loss(self) -> f64 {
        match self {
            Ways::Two => -3.5,
            Ways::Three => -5.5,
            Ways::Four => -7.0,
        }
    }
}

impl TryFrom<u8> for Ways {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Ways::Two),
            3 => Ok(Ways::Three),
            4 => Ok(Ways::Four),
            other => Err(format!("Unsupported port count {}, expected 2, 3 or 4", other)),
        }
    }
}

impl From<Ways> for u8 {
    fn from(ways: Ways) -> Self {
        ways.count() as u8
    }
}

/// Variant of a network element together with its variant specific parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    /// Radiating/receiving end of the network.
    Antenna,
    /// Terminating end of the network.
    Load,
    Splitter {
        ways: Ways,
    },
    Combiner {
        ways: Ways,
    },
    /// Amplifying midpoint; relays the strongest input branch.
    Repeater {
        max_output_power: f64,
    },
    /// Inline element with two tapped outputs.
    Coupler {
        attenuation1: f64,
        attenuation2: f64,
    },
    /// Inline amplifier with an output ceiling.
    Booster {
        max_output_power: f64,
    },
    Attenuator,
}

impl NodeKind {
    /// Gain (positive) or loss (negative) a freshly placed element starts with.
    pub fn default_signal_power(&self) -> f64 {
        match self {
            NodeKind::Antenna | NodeKind::Load => 0.0,
            NodeKind::Splitter { ways } | NodeKind::Combiner { ways } => ways.insertion_loss(),
            NodeKind::Repeater { .. } => 30.0,
            NodeKind::Coupler { .. } => -0.5,
            NodeKind::Booster { .. } => 15.0,
            NodeKind::Attenuator => -10.0,
        }
    }

    /// Splitters and combiners own a set of child branches.
    pub fn is_combining(&self) -> bool {
        self.ways().is_some()
    }

    pub fn is_repeater(&self) -> bool {
        matches!(self, NodeKind::Repeater { .. })
    }

    pub fn ways(&self) -> Option<Ways> {
        match self {
            NodeKind::Splitter { ways } | NodeKind::Combiner { ways } => Some(*ways),
            _ => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            NodeKind::Antenna => "Antenna".to_string(),
            NodeKind::Load => "Load".to_string(),
            NodeKind::Splitter { ways } => format!("Splitter{}", ways.count()),
            NodeKind::Combiner { ways } => format!("Combiner{}", ways.count()),
            NodeKind::Repeater { .. } => "Repeater".to_string(),
            NodeKind::Coupler { .. } => "Coupler".to_string(),
            NodeKind::Booster { .. } => "Booster".to_string(),
            NodeKind::Attenuator => "Attenuator".to_string(),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Parses the kind names used on the command line (`splitter3`, `booster`, ...),
/// filling in catalogue defaults for the variant parameters.
impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        let kind = match name.as_str() {
            "antenna" => NodeKind::Antenna,
            "load" => NodeKind::Load,
            "repeater" => NodeKind::Repeater { max_output_power: 33.0 },
            "coupler" => NodeKind::Coupler {
                attenuation1: -6.0,
                attenuation2: -10.0,
            },
            "booster" => NodeKind::Booster { max_output_power: 27.0 },
            "attenuator" => NodeKind::Attenuator,
            _ => {
                let (prefix, digits) = name.split_at(name.find(|c: char| c.is_ascii_digit()).unwrap_or(name.len()));
                let ways = digits
                    .parse::<u8>()
                    .map_err(|_| format!("Unknown node kind '{}'", s))
                    .and_then(Ways::try_from)?;
                match prefix {
                    "splitter" => NodeKind::Splitter { ways },
                    "combiner" => NodeKind::Combiner { ways },
                    _ => return Err(format!("Unknown node kind '{}'", s)),
                }
            }
        };
        Ok(kind)
    }
}

/// A placed network element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Gain if positive, loss if negative; source rating for antennas and loads (dB/dBm).
    pub signal_power: f64,
    /// The single node this element's cable connects to.
    #[serde(default)]
    pub end_element_id: Option<NodeId>,
    #[serde(default)]
    pub cable: Cable,
    pub kind: NodeKind,
}

impl Node {
    /// New unconnected node with the catalogue default gain for its kind.
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            signal_power: kind.default_signal_power(),
            end_element_id: None,
            cable: Cable::default(),
            kind,
        }
    }

    pub fn with_parent(mut self, parent: NodeId) -> Self {
        self.end_element_id = Some(parent);
        self
    }

    pub fn with_cable(mut self, cable: Cable) -> Self {
        self.cable = cable;
        self
    }

    pub fn with_signal_power(mut self, signal_power: f64) -> Self {
        self.signal_power = signal_power;
        self
    }

    /// Tapped output levels of a coupler given its through-path power.
    pub fn tap_outputs(&self, through_power: f64) -> Option<(f64, f64)> {
        match self.kind {
            NodeKind::Coupler { attenuation1, attenuation2 } => Some((through_power + attenuation1, through_power + attenuation2)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::cable::CableType;

    #[test]
    fn kind_names_parse_with_defaults() {
        assert_eq!("Antenna".parse::<NodeKind>().unwrap(), NodeKind::Antenna);
        assert_eq!("splitter3".parse::<NodeKind>().unwrap(), NodeKind::Splitter { ways: Ways::Three });
        assert_eq!("combiner4".parse::<NodeKind>().unwrap(), NodeKind::Combiner { ways: Ways::Four });
        assert!(matches!("booster".parse::<NodeKind>().unwrap(), NodeKind::Booster { .. }));
        assert!("splitter5".parse::<NodeKind>().is_err());
        assert!("splitter".parse::<NodeKind>().is_err());
        assert!("dish".parse::<NodeKind>().is_err());
    }

    #[test]
    fn kind_classification() {
        let splitter = NodeKind::Splitter { ways: Ways::Two };
        assert!(splitter.is_combining());
        assert!(!NodeKind::Repeater { max_output_power: 33.0 }.is_combining());
        assert_eq!(NodeKind::Combiner { ways: Ways::Four }.label(), "Combiner4");
    }

    #[test]
    fn new_node_takes_catalogue_loss() {
        let node = Node::new(7, NodeKind::Combiner { ways: Ways::Three });
        assert_eq!(node.signal_power, -5.5);
        assert_eq!(node.end_element_id, None);
    }

    #[test]
    fn coupler_taps_are_relative_to_through_power() {
        let coupler = Node::new(1, "coupler".parse().unwrap());
        assert_eq!(coupler.tap_outputs(10.0), Some((4.0, 0.0)));
        assert_eq!(Node::new(2, NodeKind::Antenna).tap_outputs(10.0), None);
    }

    #[test]
    fn node_json_is_internally_tagged() {
        let node = Node::new(3, NodeKind::Splitter { ways: Ways::Two })
            .with_parent(1)
            .with_cable(Cable::new(12.0, CableType::D8Fb));
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["kind"]["type"], "splitter");
        assert_eq!(json["kind"]["ways"], 2);
        assert_eq!(json["cable"]["type"], "8D-FB");
        let back: Node = serde_json::from_value(json).unwrap();
        assert_eq!(back, node);
    }
}
