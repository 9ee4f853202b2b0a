//! Signal-related type definitions
//!
//! Value types that describe a junction's light state. They travel on
//! events and in snapshots, so every type here is serializable.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Approach direction of a four-way junction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    #[serde(rename = "N", alias = "north", alias = "NORTH")]
    North,
    #[serde(rename = "S", alias = "south", alias = "SOUTH")]
    South,
    #[serde(rename = "E", alias = "east", alias = "EAST")]
    East,
    #[serde(rename = "W", alias = "west", alias = "WEST")]
    West,
}

impl Direction {
    /// All four approaches in storage order
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Tie-break order for selection: N > E > S > W
    pub const PRIORITY: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Short code ("N", "S", "E", "W")
    pub fn code(self) -> &'static str {
        match self {
            Direction::North => "N",
            Direction::South => "S",
            Direction::East => "E",
            Direction::West => "W",
        }
    }

    /// Human-readable name used in display labels
    pub fn name(self) -> &'static str {
        match self {
            Direction::North => "North",
            Direction::South => "South",
            Direction::East => "East",
            Direction::West => "West",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "n" | "north" => Ok(Direction::North),
            "s" | "south" => Ok(Direction::South),
            "e" | "east" => Ok(Direction::East),
            "w" | "west" => Ok(Direction::West),
            other => Err(format!("unknown direction '{}'", other)),
        }
    }
}

/// Light colour of the active phase
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubPhase {
    Green,
    Yellow,
    AllRed,
}

impl fmt::Display for SubPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubPhase::Green => write!(f, "GREEN"),
            SubPhase::Yellow => write!(f, "YELLOW"),
            SubPhase::AllRed => write!(f, "ALL_RED"),
        }
    }
}

/// What the junction is currently showing
///
/// Either a single favoured approach or one of the override sentinels.
/// Serialized as a plain string: `"N"`, `"ALL_RED"`, `"FLASH_YELLOW"`,
/// `"PRIORITY_GREEN"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum PhaseIndicator {
    Approach(Direction),
    AllRed,
    FlashYellow,
    PriorityGreen,
}

impl PhaseIndicator {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseIndicator::Approach(d) => d.code(),
            PhaseIndicator::AllRed => "ALL_RED",
            PhaseIndicator::FlashYellow => "FLASH_YELLOW",
            PhaseIndicator::PriorityGreen => "PRIORITY_GREEN",
        }
    }

    /// The favoured approach, if this is a normal phase
    pub fn approach(&self) -> Option<Direction> {
        match self {
            PhaseIndicator::Approach(d) => Some(*d),
            _ => None,
        }
    }
}

impl fmt::Display for PhaseIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<PhaseIndicator> for String {
    fn from(p: PhaseIndicator) -> Self {
        p.as_str().to_string()
    }
}

impl TryFrom<String> for PhaseIndicator {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "ALL_RED" => Ok(PhaseIndicator::AllRed),
            "FLASH_YELLOW" => Ok(PhaseIndicator::FlashYellow),
            "PRIORITY_GREEN" => Ok(PhaseIndicator::PriorityGreen),
            other => other.parse::<Direction>().map(PhaseIndicator::Approach),
        }
    }
}

/// Controller state machine state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControllerMode {
    NormalGreen,
    NormalYellow,
    /// All-red interval between a yellow and the next green
    NormalClearance,
    OverrideForceRed,
    OverrideFlashYellow,
    OverrideExtend,
    OverrideEmergency,
}

impl ControllerMode {
    pub fn is_override(self) -> bool {
        !matches!(
            self,
            ControllerMode::NormalGreen
                | ControllerMode::NormalYellow
                | ControllerMode::NormalClearance
        )
    }
}

impl fmt::Display for ControllerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ControllerMode::NormalGreen => "NORMAL_GREEN",
            ControllerMode::NormalYellow => "NORMAL_YELLOW",
            ControllerMode::NormalClearance => "NORMAL_CLEARANCE",
            ControllerMode::OverrideForceRed => "OVERRIDE_FORCE_RED",
            ControllerMode::OverrideFlashYellow => "OVERRIDE_FLASH_YELLOW",
            ControllerMode::OverrideExtend => "OVERRIDE_EXTEND",
            ControllerMode::OverrideEmergency => "OVERRIDE_EMERGENCY",
        };
        f.write_str(s)
    }
}

/// Kind of an externally issued override command
///
/// Kinds this build does not know deserialize as `Unknown` and are
/// ignored by arbitration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverrideKind {
    EmergencyCorridor,
    ForceRed,
    FlashYellow,
    ExtendGreen,
    Optimize,
    Reset,
    #[serde(other)]
    Unknown,
}

impl OverrideKind {
    /// Arbitration precedence, highest wins. `None` for unknown kinds.
    pub fn precedence(self) -> Option<u8> {
        match self {
            OverrideKind::EmergencyCorridor => Some(5),
            OverrideKind::ForceRed => Some(4),
            OverrideKind::FlashYellow => Some(3),
            OverrideKind::ExtendGreen => Some(2),
            OverrideKind::Optimize => Some(1),
            OverrideKind::Reset => Some(0),
            OverrideKind::Unknown => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OverrideKind::EmergencyCorridor => "EMERGENCY_CORRIDOR",
            OverrideKind::ForceRed => "FORCE_RED",
            OverrideKind::FlashYellow => "FLASH_YELLOW",
            OverrideKind::ExtendGreen => "EXTEND_GREEN",
            OverrideKind::Optimize => "OPTIMIZE",
            OverrideKind::Reset => "RESET",
            OverrideKind::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for OverrideKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OverrideKind {
    type Err = std::convert::Infallible;

    /// Never fails: unrecognised names map to `Unknown`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_uppercase().as_str() {
            "EMERGENCY_CORRIDOR" => OverrideKind::EmergencyCorridor,
            "FORCE_RED" => OverrideKind::ForceRed,
            "FLASH_YELLOW" => OverrideKind::FlashYellow,
            "EXTEND_GREEN" => OverrideKind::ExtendGreen,
            "OPTIMIZE" => OverrideKind::Optimize,
            "RESET" => OverrideKind::Reset,
            _ => OverrideKind::Unknown,
        })
    }
}

/// Why an active override stopped governing the junction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClearReason {
    /// Explicit RESET command
    Reset,
    /// Command aged past its TTL or left arbitration
    Expired,
    /// Override ran out its own duration
    Completed,
    /// A different command won arbitration
    Superseded,
}
