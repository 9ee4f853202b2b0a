//! Event types for the ASPC event system
//!
//! Provides shared event definitions and the EventBus used by the
//! controller runtime and every observer (SSE, dashboards, tests).

// Sub-modules (supporting types)
mod shared_types;
mod signal_types;

pub use shared_types::{ApproachView, JunctionSnapshot};
pub use signal_types::{
    ClearReason, ControllerMode, Direction, OverrideKind, PhaseIndicator, SubPhase,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// ASPC event types
///
/// Events are broadcast via EventBus and can be serialized for SSE
/// transmission. Per junction, events are emitted in tick order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SignalEvent {
    /// Per-tick state snapshot
    ///
    /// Emitted once per tick for every observed junction.
    SnapshotPublished {
        /// Snapshot produced by the tick
        snapshot: JunctionSnapshot,
    },

    /// Normal-mode phase transition (GREEN→YELLOW or YELLOW→next GREEN)
    PhaseChanged {
        junction_id: String,
        /// Phase shown before the transition
        from: PhaseIndicator,
        /// Phase shown after the transition
        to: PhaseIndicator,
        /// Light colour after the transition
        sub_phase: SubPhase,
        /// Duration assigned to the new sub-phase
        duration_s: u32,
        /// Whether critical demand pre-empted fairness for this selection
        critical: bool,
        timestamp: DateTime<Utc>,
    },

    /// An override started governing the junction
    OverrideActivated {
        junction_id: String,
        kind: OverrideKind,
        /// Command identifier assigned on submission
        command_id: Uuid,
        /// Resulting state machine state
        mode: ControllerMode,
        timestamp: DateTime<Utc>,
    },

    /// An override stopped governing the junction
    OverrideCleared {
        junction_id: String,
        kind: OverrideKind,
        reason: ClearReason,
        timestamp: DateTime<Utc>,
    },

    /// Fresh vehicle composition applied to an approach
    DemandUpdated {
        junction_id: String,
        direction: Direction,
        pcu: f64,
        timestamp: DateTime<Utc>,
    },

    /// A controller was started for a junction (cold start)
    ObservationStarted {
        junction_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A controller was cancelled; its state is gone
    ObservationStopped {
        junction_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl SignalEvent {
    /// Event type name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            SignalEvent::SnapshotPublished { .. } => "SnapshotPublished",
            SignalEvent::PhaseChanged { .. } => "PhaseChanged",
            SignalEvent::OverrideActivated { .. } => "OverrideActivated",
            SignalEvent::OverrideCleared { .. } => "OverrideCleared",
            SignalEvent::DemandUpdated { .. } => "DemandUpdated",
            SignalEvent::ObservationStarted { .. } => "ObservationStarted",
            SignalEvent::ObservationStopped { .. } => "ObservationStopped",
        }
    }

    /// Junction the event belongs to
    pub fn junction_id(&self) -> &str {
        match self {
            SignalEvent::SnapshotPublished { snapshot } => &snapshot.junction_id,
            SignalEvent::PhaseChanged { junction_id, .. }
            | SignalEvent::OverrideActivated { junction_id, .. }
            | SignalEvent::OverrideCleared { junction_id, .. }
            | SignalEvent::DemandUpdated { junction_id, .. }
            | SignalEvent::ObservationStarted { junction_id, .. }
            | SignalEvent::ObservationStopped { junction_id, .. } => junction_id,
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers never stall a tick)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use aspc_common::events::{EventBus, SignalEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit(SignalEvent::ObservationStarted {
///     junction_id: "J001".to_string(),
///     timestamp: chrono::Utc::now(),
/// }).ok();
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SignalEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// * `capacity` - Number of events to buffer before the slowest
    ///   subscriber starts lagging
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<SignalEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, returning the number of subscribers that received it
    ///
    /// Fails only when there are no subscribers.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: SignalEvent,
    ) -> Result<usize, broadcast::error::SendError<SignalEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the no-subscriber case
    pub fn emit_lossy(&self, event: SignalEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
