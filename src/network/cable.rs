//! Cable catalogue and per-frequency attenuation.
//!
//! Attenuation tables are expressed in dB per 100 length units (metres in
//! practice). All values are ≤ 0: a cable only ever loses signal. Optical links
//! are modelled as lossless at every band.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operating bands supported by the planner, in MHz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "u32", into = "u32")]
pub enum Frequency {
    Mhz800,
    #[default]
    Mhz900,
    Mhz1800,
    Mhz2100,
    Mhz2600,
}

impl Frequency {
    pub const ALL: [Frequency; 5] = [Frequency::Mhz800, Frequency::Mhz900, Frequency::Mhz1800, Frequency::Mhz2100, Frequency::Mhz2600];

    pub fn mhz(self) -> u32 {
        match self {
            Frequency::Mhz800 => 800,
            Frequency::Mhz900 => 900,
            Frequency::Mhz1800 => 1800,
            Frequency::Mhz2100 => 2100,
            Frequency::Mhz2600 => 2600,
        }
    }

    pub fn from_mhz(mhz: u32) -> Option<Self> {
        Frequency::ALL.into_iter().find(|f| f.mhz() == mhz)
    }
}

impl TryFrom<u32> for Frequency {
    type Error = String;

    fn try_from(mhz: u32) -> Result<Self, Self::Error> {
        Frequency::from_mhz(mhz).ok_or_else(|| format!("Unsupported frequency {} MHz, expected one of 800, 900, 1800, 2100, 2600", mhz))
    }
}

impl From<Frequency> for u32 {
    fn from(f: Frequency) -> Self {
        f.mhz()
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} MHz", self.mhz())
    }
}

/// Coaxial and fibre cable families found in indoor distribution systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CableType {
    /// 1/2" corrugated feeder.
    #[serde(rename = "CF1/2")]
    #[default]
    CfHalf,
    #[serde(rename = "10D-FB")]
    D10Fb,
    #[serde(rename = "8D-FB")]
    D8Fb,
    #[serde(rename = "5D-FB")]
    D5Fb,
    #[serde(rename = "Optical")]
    Optical,
}

// dB per 100 m, ordered as Frequency::ALL
const CF_HALF_ATTENUATION: [(Frequency, f64); 5] = [
    (Frequency::Mhz800, -6.5),
    (Frequency::Mhz900, -7.0),
    (Frequency::Mhz1800, -10.0),
    (Frequency::Mhz2100, -10.9),
    (Frequency::Mhz2600, -12.3),
];
const D10_FB_ATTENUATION: [(Frequency, f64); 5] = [
    (Frequency::Mhz800, -8.5),
    (Frequency::Mhz900, -9.1),
    (Frequency::Mhz1800, -13.3),
    (Frequency::Mhz2100, -14.5),
    (Frequency::Mhz2600, -16.4),
];
const D8_FB_ATTENUATION: [(Frequency, f64); 5] = [
    (Frequency::Mhz800, -11.0),
    (Frequency::Mhz900, -11.8),
    (Frequency::Mhz1800, -17.0),
    (Frequency::Mhz2100, -18.6),
    (Frequency::Mhz2600, -21.0),
];
const D5_FB_ATTENUATION: [(Frequency, f64); 5] = [
    (Frequency::Mhz800, -18.0),
    (Frequency::Mhz900, -19.3),
    (Frequency::Mhz1800, -28.4),
    (Frequency::Mhz2100, -31.0),
    (Frequency::Mhz2600, -35.0),
];
const OPTICAL_ATTENUATION: [(Frequency, f64); 5] = [
    (Frequency::Mhz800, 0.0),
    (Frequency::Mhz900, 0.0),
    (Frequency::Mhz1800, 0.0),
    (Frequency::Mhz2100, 0.0),
    (Frequency::Mhz2600, 0.0),
];

impl CableType {
    pub const ALL: [CableType; 5] = [CableType::CfHalf, CableType::D10Fb, CableType::D8Fb, CableType::D5Fb, CableType::Optical];

    /// Attenuation table for this cable family.
    pub fn attenuation_table(self) -> &'static [(Frequency, f64)] {
        match self {
            CableType::CfHalf => &CF_HALF_ATTENUATION,
            CableType::D10Fb => &D10_FB_ATTENUATION,
            CableType::D8Fb => &D8_FB_ATTENUATION,
            CableType::D5Fb => &D5_FB_ATTENUATION,
            CableType::Optical => &OPTICAL_ATTENUATION,
        }
    }

    /// Attenuation in dB per 100 length units, `None` when the band is not tabulated.
    pub fn attenuation_per_100(self, frequency: Frequency) -> Option<f64> {
        self.attenuation_table().iter().find(|(f, _)| *f == frequency).map(|(_, db)| *db)
    }

    pub fn label(self) -> &'static str {
        match self {
            CableType::CfHalf => "CF1/2",
            CableType::D10Fb => "10D-FB",
            CableType::D8Fb => "8D-FB",
            CableType::D5Fb => "5D-FB",
            CableType::Optical => "Optical",
        }
    }
}

/// Physical link between a node and its parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CableRecord")]
pub struct Cable {
    pub length: f64,
    #[serde(rename = "type")]
    pub cable_type: CableType,
    /// Draw the cable with a bend instead of a straight segment. Rendering only.
    #[serde(default)]
    pub curved: bool,
}

impl Cable {
    pub fn new(length: f64, cable_type: CableType) -> Self {
        Self {
            length: length.max(0.0),
            cable_type,
            curved: false,
        }
    }
}

/// Cable as written in a plan file, before the length is checked.
#[derive(Deserialize)]
struct CableRecord {
    length: f64,
    #[serde(rename = "type")]
    cable_type: CableType,
    #[serde(default)]
    curved: bool,
}

impl TryFrom<CableRecord> for Cable {
    type Error = String;

    fn try_from(record: CableRecord) -> Result<Self, Self::Error> {
        if !record.length.is_finite() || record.length < 0.0 {
            return Err(format!("Invalid cable length {}, must be a finite non-negative number", record.length));
        }
        Ok(Cable {
            length: record.length,
            cable_type: record.cable_type,
            curved: record.curved,
        })
    }
}

impl Default for Cable {
    fn default() -> Self {
        Cable::new(0.0, CableType::default())
    }
}

/// Loss (dB, ≤ 0) of a cable at the given band.
///
/// ```text
/// loss = length × attenuation[frequency] / 100
/// ```
///
/// A band missing from the attenuation table yields 0 dB. That is a neutral
/// default, not a realistic figure.
pub fn cable_loss(cable: &Cable, frequency: Frequency) -> f64 {
    let per_100 = cable.cable_type.attenuation_per_100(frequency).unwrap_or(0.0);
    cable.length * per_100 / 100.0
}
