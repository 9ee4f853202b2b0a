//! Approach demand
//!
//! Per-class vehicle counts for one approach and the derived PCU and queue
//! estimate. `Approaches` always holds all four directions.

use std::collections::BTreeMap;

use aspc_common::events::{ApproachView, Direction};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::pcu::{queue_estimate, weigh, PcuWeights};

/// Vehicle class as reported by the sensing layer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum VehicleClass {
    #[serde(alias = "motorcycle", alias = "motorbike", alias = "bike", alias = "scooter")]
    TwoWheeler,
    Car,
    Bus,
    Truck,
    #[serde(alias = "auto", alias = "rickshaw")]
    AutoRickshaw,
    #[serde(alias = "cycle")]
    Bicycle,
}

impl VehicleClass {
    pub const ALL: [VehicleClass; 6] = [
        VehicleClass::TwoWheeler,
        VehicleClass::Car,
        VehicleClass::Bus,
        VehicleClass::Truck,
        VehicleClass::AutoRickshaw,
        VehicleClass::Bicycle,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VehicleClass::TwoWheeler => "two_wheeler",
            VehicleClass::Car => "car",
            VehicleClass::Bus => "bus",
            VehicleClass::Truck => "truck",
            VehicleClass::AutoRickshaw => "auto_rickshaw",
            VehicleClass::Bicycle => "bicycle",
        }
    }

    /// Parse a free-form class label, accepting common detector aliases
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "two_wheeler" | "motorcycle" | "motorbike" | "bike" | "scooter" => {
                Some(VehicleClass::TwoWheeler)
            }
            "car" => Some(VehicleClass::Car),
            "bus" => Some(VehicleClass::Bus),
            "truck" | "lorry" => Some(VehicleClass::Truck),
            "auto_rickshaw" | "auto" | "rickshaw" => Some(VehicleClass::AutoRickshaw),
            "bicycle" | "cycle" => Some(VehicleClass::Bicycle),
            _ => None,
        }
    }
}

/// Non-negative vehicle counts keyed by class
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleCounts(BTreeMap<VehicleClass, u32>);

fn clamp_count(count: i64) -> u32 {
    u32::try_from(count.max(0)).unwrap_or(u32::MAX)
}

impl VehicleCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`VehicleCounts::set`]
    pub fn with(mut self, class: VehicleClass, count: i64) -> Self {
        self.set(class, count);
        self
    }

    /// Set a count; negative input is clamped to zero
    pub fn set(&mut self, class: VehicleClass, count: i64) {
        self.0.insert(class, clamp_count(count));
    }

    pub fn add(&mut self, class: VehicleClass, count: i64) {
        let entry = self.0.entry(class).or_insert(0);
        *entry = entry.saturating_add(clamp_count(count));
    }

    pub fn get(&self, class: VehicleClass) -> u32 {
        self.0.get(&class).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (VehicleClass, u32)> + '_ {
        self.0.iter().map(|(class, count)| (*class, *count))
    }

    pub fn total_vehicles(&self) -> u64 {
        self.0.values().map(|c| u64::from(*c)).sum()
    }

    /// Build counts from raw `label -> count` pairs
    ///
    /// Unrecognised labels are counted as cars and logged.
    pub fn from_labels<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: AsRef<str>,
    {
        let mut counts = Self::new();
        for (label, count) in raw {
            let class = match VehicleClass::from_label(label.as_ref()) {
                Some(class) => class,
                None => {
                    warn!(
                        "Unknown vehicle type '{}', counting as car",
                        label.as_ref()
                    );
                    VehicleClass::Car
                }
            };
            counts.add(class, count);
        }
        counts
    }
}

/// Latest demand reading for one approach
#[derive(Debug, Clone, PartialEq)]
pub struct ApproachState {
    pub direction: Direction,
    pub counts: VehicleCounts,
    pub pcu: f64,
    pub queue_estimate_m: f64,
}

impl ApproachState {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            counts: VehicleCounts::new(),
            pcu: 0.0,
            queue_estimate_m: 0.0,
        }
    }

    /// Replace the counts and recompute derived figures
    pub fn update(&mut self, counts: VehicleCounts, weights: &PcuWeights, meters_per_pcu: f64) {
        self.pcu = weigh(&counts, weights);
        self.queue_estimate_m = queue_estimate(self.pcu, meters_per_pcu);
        self.counts = counts;
    }

    pub fn view(&self) -> ApproachView {
        ApproachView {
            direction: self.direction,
            pcu: self.pcu,
            queue_estimate_m: self.queue_estimate_m,
        }
    }
}

/// Demand on all four approaches
#[derive(Debug, Clone, PartialEq)]
pub struct Approaches {
    states: [ApproachState; 4],
}

fn slot(direction: Direction) -> usize {
    match direction {
        Direction::North => 0,
        Direction::South => 1,
        Direction::East => 2,
        Direction::West => 3,
    }
}

impl Default for Approaches {
    fn default() -> Self {
        Self {
            states: Direction::ALL.map(ApproachState::new),
        }
    }
}

impl Approaches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, direction: Direction) -> &ApproachState {
        &self.states[slot(direction)]
    }

    pub fn pcu(&self, direction: Direction) -> f64 {
        self.get(direction).pcu
    }

    pub fn total_pcu(&self) -> f64 {
        self.states.iter().map(|s| s.pcu).sum()
    }

    pub fn update(
        &mut self,
        direction: Direction,
        counts: VehicleCounts,
        weights: &PcuWeights,
        meters_per_pcu: f64,
    ) {
        self.states[slot(direction)].update(counts, weights, meters_per_pcu);
    }

    /// Set a PCU figure directly, bypassing counts
    ///
    /// Used by tests and benches that reason in PCU rather than vehicles.
    pub fn set_pcu(&mut self, direction: Direction, pcu: f64, meters_per_pcu: f64) {
        let state = &mut self.states[slot(direction)];
        state.pcu = if pcu.is_finite() { pcu.max(0.0) } else { 0.0 };
        state.queue_estimate_m = queue_estimate(state.pcu, meters_per_pcu);
    }

    /// Views in N, S, E, W order
    pub fn views(&self) -> Vec<ApproachView> {
        self.states.iter().map(ApproachState::view).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_counts_clamped() {
        let counts = VehicleCounts::new().with(VehicleClass::Car, -7);
        assert_eq!(counts.get(VehicleClass::Car), 0);
    }

    #[test]
    fn test_from_labels_aliases_and_unknown() {
        let counts = VehicleCounts::from_labels([
            ("motorcycle", 4),
            ("auto", 2),
            ("hovercraft", 3),
            ("car", 1),
        ]);
        assert_eq!(counts.get(VehicleClass::TwoWheeler), 4);
        assert_eq!(counts.get(VehicleClass::AutoRickshaw), 2);
        // unknown label lands on car
        assert_eq!(counts.get(VehicleClass::Car), 4);
        assert_eq!(counts.total_vehicles(), 10);
    }

    #[test]
    fn test_counts_deserialize_with_aliases() {
        let counts: VehicleCounts =
            serde_json::from_str(r#"{"car": 3, "motorcycle": 5, "bus": 1}"#).unwrap();
        assert_eq!(counts.get(VehicleClass::TwoWheeler), 5);
        assert_eq!(counts.get(VehicleClass::Bus), 1);
    }

    #[test]
    fn test_approach_update_recomputes() {
        let mut approaches = Approaches::new();
        let counts = VehicleCounts::new().with(VehicleClass::Bus, 2);
        approaches.update(Direction::East, counts, &PcuWeights::default(), 7.0);

        assert!((approaches.pcu(Direction::East) - 6.0).abs() < 1e-9);
        assert!((approaches.get(Direction::East).queue_estimate_m - 42.0).abs() < 1e-9);
        assert!((approaches.total_pcu() - 6.0).abs() < 1e-9);
        assert_eq!(approaches.pcu(Direction::North), 0.0);
    }

    #[test]
    fn test_views_cover_all_directions() {
        let views = Approaches::new().views();
        let dirs: Vec<Direction> = views.iter().map(|v| v.direction).collect();
        assert_eq!(dirs, Direction::ALL.to_vec());
    }
}
