//! Shared type definitions for event data
//!
//! Snapshot structs published by the controller and carried on events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::signal_types::{ControllerMode, Direction, OverrideKind, PhaseIndicator, SubPhase};

/// Live demand on one approach, as observers see it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApproachView {
    /// Approach direction
    pub direction: Direction,
    /// Passenger-car-unit demand
    pub pcu: f64,
    /// Display-only queue length estimate in metres
    pub queue_estimate_m: f64,
}

/// Read-only snapshot of a junction, published once per tick
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JunctionSnapshot {
    /// Junction identifier
    pub junction_id: String,
    /// Favoured approach or override sentinel
    pub current_phase: PhaseIndicator,
    /// Light colour of the active phase
    pub sub_phase: SubPhase,
    /// State machine state
    pub mode: ControllerMode,
    /// Seconds left in the current phase; `None` while indefinite
    pub time_remaining_seconds: Option<u32>,
    /// Operator-facing label, e.g. "North Green"
    pub display_label: String,
    /// Kind of the override governing the junction, if any
    pub active_override_kind: Option<OverrideKind>,
    /// Approaches currently shown green or yellow
    pub active_directions: Vec<Direction>,
    /// Per-approach demand
    pub approaches: Vec<ApproachView>,
    /// Services per approach in the current fairness window
    pub service_counts: BTreeMap<Direction, u32>,
    /// Number of ticks this controller has run
    pub tick: u64,
    /// Time of the tick that produced this snapshot
    pub updated_at: DateTime<Utc>,
}
