//! Controller tuning constants
//!
//! Every threshold and duration the signal core uses, loaded from the
//! `[tuning]` section of the config file. Missing keys keep their defaults.

use aspc_common::events::Direction;
use serde::{Deserialize, Serialize};

use super::pcu::PcuWeights;

/// Tunable constants for selection, timing and overrides
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ControllerTuning {
    /// PCU above which an approach pre-empts fairness
    pub critical_pcu_threshold: f64,
    /// Services per approach allowed in one fairness window
    pub fairness_cap: u32,
    /// Nominal cycle length the green share is taken from (seconds)
    pub cycle_budget_s: u32,
    /// Lower bound on total demand used as the green-share denominator
    pub floor_total_pcu: f64,
    pub min_green_s: u32,
    pub max_green_s: u32,
    pub yellow_s: u32,
    /// All-red interval after each yellow; 0 goes straight to the next green
    pub all_red_clearance_s: u32,
    /// Age after which a command leaves arbitration (seconds)
    pub override_ttl_s: u32,
    pub force_red_s: u32,
    pub extend_green_bonus_s: u32,
    pub emergency_s: u32,
    /// Approach served first after a cold start
    pub initial_phase: Direction,
    /// Display-only queue length per PCU (metres)
    pub queue_meters_per_pcu: f64,
    pub pcu_weights: PcuWeights,
}

impl Default for ControllerTuning {
    fn default() -> Self {
        Self {
            critical_pcu_threshold: 50.0,
            fairness_cap: 2,
            cycle_budget_s: 120,
            floor_total_pcu: 80.0,
            min_green_s: 15,
            max_green_s: 60,
            yellow_s: 3,
            all_red_clearance_s: 0,
            override_ttl_s: 120,
            force_red_s: 60,
            extend_green_bonus_s: 30,
            emergency_s: 120,
            initial_phase: Direction::North,
            queue_meters_per_pcu: 7.0,
            pcu_weights: PcuWeights::default(),
        }
    }
}

impl ControllerTuning {
    /// Reject combinations the controller cannot run sensibly
    ///
    /// Called once at startup; the tick itself tolerates any values.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_green_s > self.max_green_s {
            return Err(format!(
                "min_green_s ({}) exceeds max_green_s ({})",
                self.min_green_s, self.max_green_s
            ));
        }
        if self.min_green_s == 0 {
            return Err("min_green_s must be at least 1".to_string());
        }
        if self.cycle_budget_s == 0 {
            return Err("cycle_budget_s must be positive".to_string());
        }
        if self.fairness_cap == 0 {
            return Err("fairness_cap must be at least 1".to_string());
        }
        if !self.critical_pcu_threshold.is_finite() || self.critical_pcu_threshold < 0.0 {
            return Err("critical_pcu_threshold must be a non-negative number".to_string());
        }
        if !self.floor_total_pcu.is_finite() || self.floor_total_pcu <= 0.0 {
            return Err("floor_total_pcu must be positive".to_string());
        }
        if !self.queue_meters_per_pcu.is_finite() || self.queue_meters_per_pcu < 0.0 {
            return Err("queue_meters_per_pcu must be a non-negative number".to_string());
        }
        self.pcu_weights.validate()
    }
}
