//! Junction state
//!
//! The full controller state for one junction. The controller builds a new
//! value every tick and swaps it in; snapshots are projections of it.

use aspc_common::events::{
    ControllerMode, Direction, JunctionSnapshot, PhaseIndicator, SubPhase,
};
use chrono::{DateTime, Utc};

use super::approach::Approaches;
use super::arbiter::Override;
use super::selector::ServiceCounts;

/// Countdown on the current light state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseTimer {
    Counting(u32),
    /// Held until an external command ends it
    Indefinite,
}

impl PhaseTimer {
    pub fn seconds(self) -> Option<u32> {
        match self {
            PhaseTimer::Counting(s) => Some(s),
            PhaseTimer::Indefinite => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JunctionState {
    pub junction_id: String,
    pub approaches: Approaches,
    pub mode: ControllerMode,
    pub current_phase: PhaseIndicator,
    pub sub_phase: SubPhase,
    pub timer: PhaseTimer,
    /// Approaches showing green or yellow
    pub active_directions: Vec<Direction>,
    pub service_counts: ServiceCounts,
    pub active_override: Option<Override>,
    /// Last approach given a normal green; excluded from the next selection
    pub last_served: Direction,
    pub tick: u64,
    pub updated_at: DateTime<Utc>,
}

impl JunctionState {
    /// Operator-facing description of what the junction shows
    pub fn display_label(&self) -> String {
        let name = self
            .current_phase
            .approach()
            .unwrap_or(self.last_served)
            .name();
        match self.mode {
            ControllerMode::NormalGreen => format!("{} Green", name),
            ControllerMode::NormalYellow => format!("{} Yellow", name),
            ControllerMode::NormalClearance => "All Red (Clearance)".to_string(),
            ControllerMode::OverrideExtend => format!("{} Green (Extended)", name),
            ControllerMode::OverrideForceRed => "All Red (Manual Override)".to_string(),
            ControllerMode::OverrideFlashYellow => "Flashing Yellow".to_string(),
            ControllerMode::OverrideEmergency => {
                let names: Vec<&str> = self.active_directions.iter().map(|d| d.name()).collect();
                format!("Emergency Corridor: {}", names.join(" + "))
            }
        }
    }

    pub fn snapshot(&self) -> JunctionSnapshot {
        JunctionSnapshot {
            junction_id: self.junction_id.clone(),
            current_phase: self.current_phase,
            sub_phase: self.sub_phase,
            mode: self.mode,
            time_remaining_seconds: self.timer.seconds(),
            display_label: self.display_label(),
            active_override_kind: self.active_override.as_ref().map(|o| o.kind),
            active_directions: self.active_directions.clone(),
            approaches: self.approaches.views(),
            service_counts: self.service_counts.to_map(),
            tick: self.tick,
            updated_at: self.updated_at,
        }
    }
}
