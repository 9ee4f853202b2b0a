//! Phase selection
//!
//! Picks the next approach to serve from current demand, the approach just
//! served and the fairness window. Pure: no clock, no I/O.
//!
//! Rules, in order:
//! 1. The previous approach is never chosen again directly.
//! 2. Any candidate above the critical threshold pre-empts fairness.
//! 3. Otherwise only the least-served candidates below the fairness cap
//!    compete. If every candidate has hit the cap the window resets.
//! 4. Highest PCU wins; ties go N > E > S > W.
//!
//! Because rule 3 keeps only the least-served candidates, non-critical
//! selection is a rotation: demand decides the order within a round, and
//! a heavy approach never takes a second turn before the others have had
//! one, whatever `fairness_cap` is. The cap only bounds how many rounds a
//! window lasts before the counts are cleared. Only critical demand can
//! break the rotation.

use std::collections::BTreeMap;

use aspc_common::events::Direction;

use super::approach::Approaches;
use super::tuning::ControllerTuning;

/// Times each approach has been served in the current fairness window
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceCounts {
    counts: BTreeMap<Direction, u32>,
}

impl ServiceCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, direction: Direction) -> u32 {
        self.counts.get(&direction).copied().unwrap_or(0)
    }

    pub fn record(&mut self, direction: Direction) {
        let entry = self.counts.entry(direction).or_insert(0);
        *entry = entry.saturating_add(1);
    }

    /// Start a fresh window
    pub fn reset(&mut self) {
        self.counts.clear();
    }

    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    /// Counts for all four directions, zeros included
    pub fn to_map(&self) -> BTreeMap<Direction, u32> {
        Direction::ALL.iter().map(|d| (*d, self.get(*d))).collect()
    }
}

/// Outcome of one selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub phase: Direction,
    /// Chosen via the critical pre-emption rule
    pub critical: bool,
    /// Every candidate had reached the cap; caller must clear the window
    pub window_reset: bool,
}

/// Choose the next approach
pub fn select(
    approaches: &Approaches,
    previous: Option<Direction>,
    service: &ServiceCounts,
    tuning: &ControllerTuning,
) -> Selection {
    let candidates: Vec<Direction> = Direction::PRIORITY
        .iter()
        .copied()
        .filter(|d| Some(*d) != previous)
        .collect();

    let critical: Vec<Direction> = candidates
        .iter()
        .copied()
        .filter(|d| approaches.pcu(*d) > tuning.critical_pcu_threshold)
        .collect();
    if !critical.is_empty() {
        return Selection {
            phase: highest_demand(approaches, &critical),
            critical: true,
            window_reset: false,
        };
    }

    let below_cap: Vec<Direction> = candidates
        .iter()
        .copied()
        .filter(|d| service.get(*d) < tuning.fairness_cap)
        .collect();

    if below_cap.is_empty() {
        // After a reset every candidate has zero services, so all compete
        return Selection {
            phase: highest_demand(approaches, &candidates),
            critical: false,
            window_reset: true,
        };
    }

    let fewest = below_cap
        .iter()
        .map(|d| service.get(*d))
        .min()
        .unwrap_or(0);
    let least_served: Vec<Direction> = below_cap
        .into_iter()
        .filter(|d| service.get(*d) == fewest)
        .collect();

    Selection {
        phase: highest_demand(approaches, &least_served),
        critical: false,
        window_reset: false,
    }
}

/// Highest PCU among `pool`, which is in priority order
fn highest_demand(approaches: &Approaches, pool: &[Direction]) -> Direction {
    let mut best = pool.first().copied().unwrap_or(Direction::North);
    let mut best_pcu = approaches.pcu(best);
    for d in pool.iter().copied().skip(1) {
        let pcu = approaches.pcu(d);
        if pcu > best_pcu {
            best = d;
            best_pcu = pcu;
        }
    }
    best
}
