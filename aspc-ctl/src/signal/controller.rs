//! Phase controller state machine
//!
//! One `PhaseController` per observed junction. `tick()` is called once per
//! scheduling interval with the commands pending for the junction and
//! returns the new snapshot plus the events the tick produced.
//!
//! Per tick:
//! 1. Arbitrate pending commands. A command not yet applied takes effect
//!    immediately and the timer is not decremented this tick.
//! 2. Otherwise count the timer down by the elapsed whole seconds and
//!    advance the state machine when it reaches zero.
//!
//! An extended green always ends in a yellow on its own approach, however
//! the extend is cleared. With `all_red_clearance_s` set, every normal
//! yellow is followed by an all-red interval before the next selection.
//!
//! Flash yellow has no countdown. It ends only on RESET or when a different
//! command wins arbitration, so it survives its own command's TTL.
//!
//! The tick never fails and never panics; any input yields a valid state.

use aspc_common::events::{
    ClearReason, ControllerMode, Direction, JunctionSnapshot, OverrideKind, PhaseIndicator,
    SignalEvent, SubPhase,
};
use aspc_common::time::elapsed_tick_seconds;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::approach::{Approaches, VehicleCounts};
use super::arbiter::{resolve_detailed, CommandIdentity, Override, Resolution};
use super::green_time::green_time;
use super::junction::{JunctionState, PhaseTimer};
use super::selector::{select, ServiceCounts};
use super::tuning::ControllerTuning;

/// Result of one tick
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub snapshot: JunctionSnapshot,
    pub events: Vec<SignalEvent>,
}

/// Controller for a single junction
#[derive(Debug, Clone)]
pub struct PhaseController {
    tuning: ControllerTuning,
    state: JunctionState,
    /// Identity of the last command that took effect (RESET included)
    applied: Option<CommandIdentity>,
    last_tick_at: Option<DateTime<Utc>>,
}

impl PhaseController {
    /// Cold start: initial approach on GREEN, one service recorded
    pub fn new(junction_id: impl Into<String>, tuning: ControllerTuning, now: DateTime<Utc>) -> Self {
        let approaches = Approaches::new();
        let first = tuning.initial_phase;
        let duration = green_time(approaches.pcu(first), approaches.total_pcu(), &tuning);
        let mut service_counts = ServiceCounts::new();
        service_counts.record(first);

        let state = JunctionState {
            junction_id: junction_id.into(),
            approaches,
            mode: ControllerMode::NormalGreen,
            current_phase: PhaseIndicator::Approach(first),
            sub_phase: SubPhase::Green,
            timer: PhaseTimer::Counting(duration),
            active_directions: vec![first],
            service_counts,
            active_override: None,
            last_served: first,
            tick: 0,
            updated_at: now,
        };

        Self {
            tuning,
            state,
            applied: None,
            last_tick_at: None,
        }
    }

    pub fn junction_id(&self) -> &str {
        &self.state.junction_id
    }

    pub fn tuning(&self) -> &ControllerTuning {
        &self.tuning
    }

    pub fn snapshot(&self) -> JunctionSnapshot {
        self.state.snapshot()
    }

    /// Replace one approach's vehicle composition
    ///
    /// Takes effect at the next selection or green-time calculation.
    pub fn apply_demand(
        &mut self,
        direction: Direction,
        counts: VehicleCounts,
        now: DateTime<Utc>,
    ) -> SignalEvent {
        self.state.approaches.update(
            direction,
            counts,
            &self.tuning.pcu_weights,
            self.tuning.queue_meters_per_pcu,
        );
        SignalEvent::DemandUpdated {
            junction_id: self.state.junction_id.clone(),
            direction,
            pcu: self.state.approaches.pcu(direction),
            timestamp: now,
        }
    }

    /// Advance one scheduling interval
    pub fn tick(&mut self, now: DateTime<Utc>, pending: &[Override]) -> TickOutcome {
        let step = match self.last_tick_at {
            Some(previous) => elapsed_tick_seconds(previous, now),
            None => 1,
        };
        self.last_tick_at = Some(now);

        let mut next = self.state.clone();
        next.tick = next.tick.saturating_add(1);
        next.updated_at = now;

        let mut events = Vec::new();
        let resolution = resolve_detailed(pending, now, self.tuning.override_ttl_s);
        let transitioned = self.arbitrate(&mut next, resolution, now, &mut events);
        if !transitioned {
            self.advance(&mut next, step, now, &mut events);
        }

        self.state = next;
        let snapshot = self.state.snapshot();
        events.push(SignalEvent::SnapshotPublished {
            snapshot: snapshot.clone(),
        });
        TickOutcome { snapshot, events }
    }

    // ========================================
    // Arbitration
    // ========================================

    /// Apply the arbitration result; true if the state was replaced this tick
    fn arbitrate(
        &mut self,
        next: &mut JunctionState,
        resolution: Resolution,
        now: DateTime<Utc>,
        events: &mut Vec<SignalEvent>,
    ) -> bool {
        match resolution {
            Resolution::Active(cmd) => {
                if self.applied == Some(cmd.identity()) {
                    return false;
                }
                self.applied = Some(cmd.identity());
                self.activate(next, cmd, now, events);
                true
            }
            Resolution::Reset(cmd) => {
                if self.applied == Some(cmd.identity()) {
                    return false;
                }
                self.applied = Some(cmd.identity());
                match next.active_override.take() {
                    Some(active) => {
                        info!(
                            "Junction {}: RESET clears {}",
                            next.junction_id, active.kind
                        );
                        events.push(cleared(next, active.kind, ClearReason::Reset, now));
                        next.service_counts.reset();
                        self.exit_override(next, now, events);
                        true
                    }
                    None => {
                        debug!("Junction {}: RESET with nothing active", next.junction_id);
                        false
                    }
                }
            }
            Resolution::Idle => {
                let lapsed = matches!(
                    &next.active_override,
                    Some(active) if active.kind != OverrideKind::FlashYellow
                );
                if !lapsed {
                    return false;
                }
                if let Some(active) = next.active_override.take() {
                    info!(
                        "Junction {}: {} override expired, resuming normal operation",
                        next.junction_id, active.kind
                    );
                    events.push(cleared(next, active.kind, ClearReason::Expired, now));
                }
                self.exit_override(next, now, events);
                true
            }
        }
    }

    fn activate(
        &self,
        next: &mut JunctionState,
        cmd: Override,
        now: DateTime<Utc>,
        events: &mut Vec<SignalEvent>,
    ) {
        let superseded = next.active_override.take();
        if let Some(previous) = &superseded {
            events.push(cleared(next, previous.kind, ClearReason::Superseded, now));
        }

        let tuning = &self.tuning;
        match cmd.kind {
            OverrideKind::ForceRed => {
                next.mode = ControllerMode::OverrideForceRed;
                next.current_phase = PhaseIndicator::AllRed;
                next.sub_phase = SubPhase::AllRed;
                next.timer = PhaseTimer::Counting(tuning.force_red_s);
                next.active_directions.clear();
            }
            OverrideKind::FlashYellow => {
                next.mode = ControllerMode::OverrideFlashYellow;
                next.current_phase = PhaseIndicator::FlashYellow;
                next.sub_phase = SubPhase::Yellow;
                next.timer = PhaseTimer::Indefinite;
                next.active_directions = Direction::ALL.to_vec();
            }
            OverrideKind::ExtendGreen => {
                let direction = next.current_phase.approach().unwrap_or(next.last_served);
                let remaining = match next.mode {
                    ControllerMode::NormalGreen
                    | ControllerMode::NormalYellow
                    | ControllerMode::NormalClearance
                    | ControllerMode::OverrideExtend => next.timer.seconds().unwrap_or(0),
                    _ => 0,
                };
                next.mode = ControllerMode::OverrideExtend;
                next.current_phase = PhaseIndicator::Approach(direction);
                next.sub_phase = SubPhase::Green;
                next.timer =
                    PhaseTimer::Counting(remaining.saturating_add(tuning.extend_green_bonus_s));
                next.active_directions = vec![direction];
            }
            OverrideKind::EmergencyCorridor => {
                let mut corridor: Vec<Direction> = Vec::new();
                for d in &cmd.payload.priority_directions {
                    if !corridor.contains(d) {
                        corridor.push(*d);
                    }
                }
                if corridor.is_empty() {
                    corridor = vec![Direction::North, Direction::South];
                }
                if let Some(vehicle) = &cmd.payload.vehicle_id {
                    info!("Junction {}: emergency corridor for {}", next.junction_id, vehicle);
                }
                next.mode = ControllerMode::OverrideEmergency;
                next.current_phase = PhaseIndicator::PriorityGreen;
                next.sub_phase = SubPhase::Green;
                next.timer = PhaseTimer::Counting(tuning.emergency_s);
                next.active_directions = corridor;
            }
            OverrideKind::Optimize => {
                // One-shot: re-time the current green, nothing stays active
                if superseded.is_some() {
                    self.exit_override(next, now, events);
                } else if next.mode == ControllerMode::NormalGreen {
                    let direction = next.current_phase.approach().unwrap_or(next.last_served);
                    let duration = green_time(
                        next.approaches.pcu(direction),
                        next.approaches.total_pcu(),
                        tuning,
                    );
                    next.timer = PhaseTimer::Counting(duration);
                }
                events.push(activated(next, &cmd, now));
                info!("Junction {}: OPTIMIZE applied", next.junction_id);
                return;
            }
            OverrideKind::Reset | OverrideKind::Unknown => return,
        }

        info!(
            "Junction {}: {} override active ({})",
            next.junction_id, cmd.kind, next.mode
        );
        events.push(activated(next, &cmd, now));
        next.active_override = Some(cmd);
    }

    // ========================================
    // Countdown
    // ========================================

    fn advance(
        &self,
        next: &mut JunctionState,
        step: u32,
        now: DateTime<Utc>,
        events: &mut Vec<SignalEvent>,
    ) {
        match next.timer {
            PhaseTimer::Indefinite => return,
            PhaseTimer::Counting(remaining) => {
                let remaining = remaining.saturating_sub(step);
                next.timer = PhaseTimer::Counting(remaining);
                if remaining > 0 {
                    return;
                }
            }
        }

        match next.mode {
            ControllerMode::NormalGreen => self.enter_yellow(next, now, events),
            ControllerMode::NormalYellow => self.end_yellow(next, now, events),
            ControllerMode::NormalClearance => self.resume_normal(next, now, events),
            ControllerMode::OverrideExtend => {
                if let Some(active) = next.active_override.take() {
                    events.push(cleared(next, active.kind, ClearReason::Completed, now));
                }
                self.enter_yellow(next, now, events);
            }
            ControllerMode::OverrideForceRed | ControllerMode::OverrideEmergency => {
                if let Some(active) = next.active_override.take() {
                    events.push(cleared(next, active.kind, ClearReason::Completed, now));
                }
                self.resume_normal(next, now, events);
            }
            ControllerMode::OverrideFlashYellow => {}
        }
    }

    fn enter_yellow(&self, next: &mut JunctionState, now: DateTime<Utc>, events: &mut Vec<SignalEvent>) {
        let direction = next.current_phase.approach().unwrap_or(next.last_served);
        next.mode = ControllerMode::NormalYellow;
        next.current_phase = PhaseIndicator::Approach(direction);
        next.sub_phase = SubPhase::Yellow;
        next.timer = PhaseTimer::Counting(self.tuning.yellow_s);
        next.active_directions = vec![direction];

        events.push(SignalEvent::PhaseChanged {
            junction_id: next.junction_id.clone(),
            from: PhaseIndicator::Approach(direction),
            to: PhaseIndicator::Approach(direction),
            sub_phase: SubPhase::Yellow,
            duration_s: self.tuning.yellow_s,
            critical: false,
            timestamp: now,
        });
    }

    /// After yellow: all-red clearance if configured, otherwise the next green
    fn end_yellow(&self, next: &mut JunctionState, now: DateTime<Utc>, events: &mut Vec<SignalEvent>) {
        let clearance = self.tuning.all_red_clearance_s;
        if clearance == 0 {
            self.resume_normal(next, now, events);
            return;
        }

        let from = next.current_phase;
        next.mode = ControllerMode::NormalClearance;
        next.current_phase = PhaseIndicator::AllRed;
        next.sub_phase = SubPhase::AllRed;
        next.timer = PhaseTimer::Counting(clearance);
        next.active_directions.clear();

        events.push(SignalEvent::PhaseChanged {
            junction_id: next.junction_id.clone(),
            from,
            to: PhaseIndicator::AllRed,
            sub_phase: SubPhase::AllRed,
            duration_s: clearance,
            critical: false,
            timestamp: now,
        });
    }

    /// Hand a cleared override back to the normal cycle
    ///
    /// An extended green still owes its approach a yellow; the other
    /// overrides hold no single approach and go straight to selection.
    fn exit_override(&self, next: &mut JunctionState, now: DateTime<Utc>, events: &mut Vec<SignalEvent>) {
        if next.mode == ControllerMode::OverrideExtend {
            self.enter_yellow(next, now, events);
        } else {
            self.resume_normal(next, now, events);
        }
    }

    /// Select the next approach and start its green
    fn resume_normal(&self, next: &mut JunctionState, now: DateTime<Utc>, events: &mut Vec<SignalEvent>) {
        let selection = select(
            &next.approaches,
            Some(next.last_served),
            &next.service_counts,
            &self.tuning,
        );
        if selection.window_reset {
            debug!("Junction {}: fairness window reset", next.junction_id);
            next.service_counts.reset();
        }
        next.service_counts.record(selection.phase);

        let duration = green_time(
            next.approaches.pcu(selection.phase),
            next.approaches.total_pcu(),
            &self.tuning,
        );
        let from = next.current_phase;

        next.mode = ControllerMode::NormalGreen;
        next.current_phase = PhaseIndicator::Approach(selection.phase);
        next.sub_phase = SubPhase::Green;
        next.timer = PhaseTimer::Counting(duration);
        next.active_directions = vec![selection.phase];
        next.last_served = selection.phase;

        debug!(
            "Junction {}: {} green for {}s{}",
            next.junction_id,
            selection.phase,
            duration,
            if selection.critical { " (critical)" } else { "" }
        );
        events.push(SignalEvent::PhaseChanged {
            junction_id: next.junction_id.clone(),
            from,
            to: next.current_phase,
            sub_phase: SubPhase::Green,
            duration_s: duration,
            critical: selection.critical,
            timestamp: now,
        });
    }
}

fn activated(state: &JunctionState, cmd: &Override, now: DateTime<Utc>) -> SignalEvent {
    SignalEvent::OverrideActivated {
        junction_id: state.junction_id.clone(),
        kind: cmd.kind,
        command_id: cmd.command_id,
        mode: state.mode,
        timestamp: now,
    }
}

fn cleared(
    state: &JunctionState,
    kind: OverrideKind,
    reason: ClearReason,
    now: DateTime<Utc>,
) -> SignalEvent {
    SignalEvent::OverrideCleared {
        junction_id: state.junction_id.clone(),
        kind,
        reason,
        timestamp: now,
    }
}
