//! Zone recommendation: project scope and uncertainty select a zone, and a
//! zone selects the recommended good-practice frameworks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Declared project scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    Small,
    Medium,
    Large,
}

/// Declared project uncertainty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Uncertainty {
    Low,
    Medium,
    High,
}

/// A recommendation bucket. Serialized as `"Zone A"` .. `"Zone E"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Zone {
    #[serde(rename = "Zone A")]
    A,
    #[serde(rename = "Zone B")]
    B,
    #[serde(rename = "Zone C")]
    C,
    #[serde(rename = "Zone D")]
    D,
    #[serde(rename = "Zone E")]
    E,
}

/// Rows are scope (Small, Medium, Large), columns are uncertainty
/// (Low, Medium, High). Not symmetric about the diagonal.
const ZONE_TABLE: [[Zone; 3]; 3] = [
    [Zone::A, Zone::B, Zone::D],
    [Zone::B, Zone::C, Zone::D],
    [Zone::B, Zone::D, Zone::E],
];

/// Look up the zone for a scope/uncertainty pair.
///
/// Returns `None` when either input is missing.
pub fn calculate_zone(scope: Option<Scope>, uncertainty: Option<Uncertainty>) -> Option<Zone> {
    let row = match scope? {
        Scope::Small => 0,
        Scope::Medium => 1,
        Scope::Large => 2,
    };
    let col = match uncertainty? {
        Uncertainty::Low => 0,
        Uncertainty::Medium => 1,
        Uncertainty::High => 2,
    };
    Some(ZONE_TABLE[row][col])
}

/// Framework codes recommended for a zone, most suitable first.
///
/// Codes refer to the built-in catalog in [`crate::presets`].
pub fn frameworks_for_zone(zone: Zone) -> &'static [&'static str] {
    match zone {
        Zone::A => &["Kanban", "PRINCE2"],
        Zone::B => &["PRINCE2", "PMBOK"],
        Zone::C => &["AgilePM", "PRINCE2", "PMBOK"],
        Zone::D => &["Scrum", "AgilePM", "Lean"],
        Zone::E => &["MSP", "SAFe", "Lean"],
    }
}

pub fn zone_description(zone: Zone) -> &'static str {
    match zone {
        Zone::A => {
            "Small, well-understood work. Keep governance light: a visible task board and a clear owner are usually enough."
        }
        Zone::B => {
            "Modest scope or some uncertainty. Use a structured, stage-gated approach with defined roles and checkpoints."
        }
        Zone::C => {
            "Medium scope with moderate uncertainty. Combine up-front structure with iterative delivery and regular re-planning."
        }
        Zone::D => {
            "High uncertainty relative to scope. Favour short feedback cycles, incremental delivery and empirical control."
        }
        Zone::E => {
            "Large scope with high uncertainty. Manage as a programme: coordinated workstreams, benefits tracking and adaptive governance."
        }
    }
}

impl Zone {
    pub const ALL: [Zone; 5] = [Zone::A, Zone::B, Zone::C, Zone::D, Zone::E];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "Zone A",
            Self::B => "Zone B",
            Self::C => "Zone C",
            Self::D => "Zone D",
            Self::E => "Zone E",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Zone {
    type Err = ZoneParseError;

    /// Accepts `"Zone C"`, `"zone c"` or just `"C"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let letter = trimmed
            .get(..5)
            .filter(|head| head.eq_ignore_ascii_case("zone "))
            .map_or(trimmed, |_| trimmed[5..].trim());
        match letter.to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            "D" => Ok(Self::D),
            "E" => Ok(Self::E),
            _ => Err(ZoneParseError(s.to_owned())),
        }
    }
}

impl FromStr for Scope {
    type Err = ZoneParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" => Ok(Self::Small),
            "medium" => Ok(Self::Medium),
            "large" => Ok(Self::Large),
            _ => Err(ZoneParseError(s.to_owned())),
        }
    }
}

impl FromStr for Uncertainty {
    type Err = ZoneParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(ZoneParseError(s.to_owned())),
        }
    }
}

/// Error returned when a zone, scope, or uncertainty string is not recognized.
#[derive(Debug, Clone)]
pub struct ZoneParseError(pub String);

impl fmt::Display for ZoneParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized zone input: {:?}", self.0)
    }
}

impl std::error::Error for ZoneParseError {}
