//! Per-junction tick task
//!
//! Owns one `PhaseController` inside a spawned task. Everything the outside
//! world hands the controller (demand readings, commands received
//! in-process) goes through small queues on the handle and is drained at
//! the start of the next tick, so the controller itself is never shared.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use aspc_common::events::{Direction, EventBus, JunctionSnapshot, SignalEvent};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::channel::CommandChannel;
use crate::signal::{ControllerTuning, Override, PhaseController, VehicleCounts};

/// Scheduling settings shared by every junction task
#[derive(Debug, Clone, Copy)]
pub struct RuntimeSettings {
    pub tick_interval: Duration,
    pub poll_timeout: Duration,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            poll_timeout: Duration::from_millis(250),
        }
    }
}

/// Inputs queued for the next tick
#[derive(Debug, Default)]
struct Inbox {
    /// Latest reading per direction; newer readings replace older ones
    demand: BTreeMap<Direction, VehicleCounts>,
    /// Commands received directly, kept until they age past the TTL
    received: Vec<Override>,
}

/// Handle to a running junction task
pub struct JunctionRuntime {
    junction_id: String,
    snapshot: Arc<RwLock<JunctionSnapshot>>,
    inbox: Arc<Mutex<Inbox>>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

struct TickLoop {
    controller: PhaseController,
    channel: Arc<dyn CommandChannel>,
    event_bus: EventBus,
    snapshot: Arc<RwLock<JunctionSnapshot>>,
    inbox: Arc<Mutex<Inbox>>,
    poll_timeout: Duration,
}

impl JunctionRuntime {
    /// Cold-start a controller and begin ticking
    pub fn spawn(
        junction_id: impl Into<String>,
        tuning: ControllerTuning,
        channel: Arc<dyn CommandChannel>,
        event_bus: EventBus,
        settings: RuntimeSettings,
    ) -> Self {
        let junction_id = junction_id.into();
        let controller =
            PhaseController::new(junction_id.clone(), tuning, aspc_common::time::now());
        let snapshot = Arc::new(RwLock::new(controller.snapshot()));
        let inbox = Arc::new(Mutex::new(Inbox::default()));
        let cancel = CancellationToken::new();

        let tick_loop = TickLoop {
            controller,
            channel,
            event_bus,
            snapshot: Arc::clone(&snapshot),
            inbox: Arc::clone(&inbox),
            poll_timeout: settings.poll_timeout,
        };
        let task = tokio::spawn(tick_loop.run(settings.tick_interval, cancel.clone()));

        info!(
            "Junction {} controller started (tick {:?})",
            junction_id, settings.tick_interval
        );

        Self {
            junction_id,
            snapshot,
            inbox,
            cancel,
            task,
        }
    }

    pub fn junction_id(&self) -> &str {
        &self.junction_id
    }

    /// Snapshot published by the most recent tick
    pub async fn current_state(&self) -> JunctionSnapshot {
        self.snapshot.read().await.clone()
    }

    /// Queue a demand reading for the next tick
    pub async fn push_demand(&self, direction: Direction, counts: VehicleCounts) {
        self.inbox.lock().await.demand.insert(direction, counts);
    }

    /// Hand a command straight to this controller, bypassing the poll
    pub async fn push_command(&self, command: Override) {
        let mut inbox = self.inbox.lock().await;
        if !inbox.received.iter().any(|c| c.command_id == command.command_id) {
            inbox.received.push(command);
        }
    }

    /// Commands received in-process that have not yet aged out
    pub async fn received_commands(&self) -> Vec<Override> {
        self.inbox.lock().await.received.clone()
    }

    /// Stop ticking and wait for the task to finish
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!("Junction {} task ended abnormally: {}", self.junction_id, e);
        }
        info!("Junction {} controller stopped", self.junction_id);
    }
}

impl TickLoop {
    async fn run(mut self, tick_interval: Duration, cancel: CancellationToken) {
        let mut timer = interval(tick_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // First tick fires immediately; the cold-start snapshot already covers it
        timer.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = timer.tick() => {}
            }
            self.tick_once().await;
        }
    }

    async fn tick_once(&mut self) {
        let now = aspc_common::time::now();
        let junction_id = self.controller.junction_id().to_string();
        let ttl_s = self.controller.tuning().override_ttl_s;

        let (demand, received) = {
            let mut inbox = self.inbox.lock().await;
            inbox.received.retain(|c| !c.is_expired(now, ttl_s));
            (std::mem::take(&mut inbox.demand), inbox.received.clone())
        };

        let mut events: Vec<SignalEvent> = demand
            .into_iter()
            .map(|(direction, counts)| self.controller.apply_demand(direction, counts, now))
            .collect();

        let polled = match timeout(self.poll_timeout, self.channel.poll_pending(&junction_id)).await
        {
            Ok(Ok(commands)) => commands,
            Ok(Err(e)) => {
                warn!("Junction {}: command poll failed: {}", junction_id, e);
                Vec::new()
            }
            Err(_) => {
                warn!(
                    "Junction {}: command poll timed out after {:?}",
                    junction_id, self.poll_timeout
                );
                Vec::new()
            }
        };

        let pending = merge_commands(received, polled);
        let outcome = self.controller.tick(now, &pending);
        debug!(
            "Junction {} tick {}: {} ({:?}s left)",
            junction_id,
            outcome.snapshot.tick,
            outcome.snapshot.display_label,
            outcome.snapshot.time_remaining_seconds
        );

        *self.snapshot.write().await = outcome.snapshot;
        events.extend(outcome.events);
        for event in events {
            self.event_bus.emit_lossy(event);
        }
    }
}

/// Union of two command lists, first occurrence of each command id kept
pub(crate) fn merge_commands(received: Vec<Override>, polled: Vec<Override>) -> Vec<Override> {
    let mut seen = HashSet::new();
    received
        .into_iter()
        .chain(polled)
        .filter(|c| seen.insert(c.command_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::InMemoryCommandChannel;
    use crate::signal::OverridePayload;
    use aspc_common::events::{ControllerMode, OverrideKind};

    fn fast_settings() -> RuntimeSettings {
        RuntimeSettings {
            tick_interval: Duration::from_millis(20),
            poll_timeout: Duration::from_millis(50),
        }
    }

    #[test]
    fn test_merge_dedups_by_command_id() {
        let now = aspc_common::time::now();
        let a = Override::new("J001", OverrideKind::ForceRed, OverridePayload::default(), now);
        let b = Override::new("J001", OverrideKind::ExtendGreen, OverridePayload::default(), now);
        let merged = merge_commands(vec![a.clone()], vec![a, b]);
        assert_eq!(merged.len(), 2);
    }

    #[tokio::test]
    async fn test_runtime_publishes_snapshots() {
        let bus = EventBus::new(256);
        let mut rx = bus.subscribe();
        let runtime = JunctionRuntime::spawn(
            "J001",
            ControllerTuning::default(),
            Arc::new(InMemoryCommandChannel::new()),
            bus.clone(),
            fast_settings(),
        );

        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("no event within timeout")
            .unwrap();
        assert_eq!(event.junction_id(), "J001");

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(runtime.current_state().await.tick >= 1);
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_pushed_command_applies_next_tick() {
        let bus = EventBus::new(256);
        let runtime = JunctionRuntime::spawn(
            "J002",
            ControllerTuning::default(),
            Arc::new(InMemoryCommandChannel::new()),
            bus,
            fast_settings(),
        );

        let command = Override::new(
            "J002",
            OverrideKind::FlashYellow,
            OverridePayload::default(),
            aspc_common::time::now(),
        );
        runtime.push_command(command).await;
        tokio::time::sleep(Duration::from_millis(150)).await;

        let state = runtime.current_state().await;
        assert_eq!(state.mode, ControllerMode::OverrideFlashYellow);
        assert_eq!(state.time_remaining_seconds, None);
        runtime.shutdown().await;
    }
}
