//! Junction registry
//!
//! The set of junctions this instance knows about and the controllers
//! currently running for them. Observation is per junction: stopping one
//! discards its state, starting it again is a cold start.

use std::collections::HashMap;
use std::sync::Arc;

use aspc_common::events::{Direction, EventBus, JunctionSnapshot, OverrideKind, SignalEvent};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{info, warn};

use super::junction::{merge_commands, JunctionRuntime, RuntimeSettings};
use crate::channel::CommandChannel;
use crate::error::{Error, Result};
use crate::signal::{resolve, ControllerTuning, Override, OverridePayload, VehicleCounts};

/// Commands currently pending for a junction and what they resolve to
#[derive(Debug, Clone, Serialize)]
pub struct PendingOverrides {
    pub junction_id: String,
    pub commands: Vec<Override>,
    /// Kind the arbiter would pick right now, if any
    pub resolved_kind: Option<OverrideKind>,
}

/// Configured junction with its observation status
#[derive(Debug, Clone, Serialize)]
pub struct JunctionInfo {
    pub junction_id: String,
    pub observed: bool,
}

pub struct JunctionRegistry {
    known: Vec<String>,
    tuning: ControllerTuning,
    settings: RuntimeSettings,
    channel: Arc<dyn CommandChannel>,
    event_bus: EventBus,
    running: RwLock<HashMap<String, JunctionRuntime>>,
}

impl JunctionRegistry {
    pub fn new(
        known: Vec<String>,
        tuning: ControllerTuning,
        settings: RuntimeSettings,
        channel: Arc<dyn CommandChannel>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            known,
            tuning,
            settings,
            channel,
            event_bus,
            running: RwLock::new(HashMap::new()),
        }
    }

    pub fn tuning(&self) -> &ControllerTuning {
        &self.tuning
    }

    pub fn channel(&self) -> &Arc<dyn CommandChannel> {
        &self.channel
    }

    pub fn is_known(&self, junction_id: &str) -> bool {
        self.known.iter().any(|j| j == junction_id)
    }

    fn ensure_known(&self, junction_id: &str) -> Result<()> {
        if self.is_known(junction_id) {
            Ok(())
        } else {
            Err(Error::JunctionNotFound(junction_id.to_string()))
        }
    }

    pub async fn list(&self) -> Vec<JunctionInfo> {
        let running = self.running.read().await;
        self.known
            .iter()
            .map(|id| JunctionInfo {
                junction_id: id.clone(),
                observed: running.contains_key(id),
            })
            .collect()
    }

    pub async fn observed_junctions(&self) -> Vec<String> {
        let running = self.running.read().await;
        self.known
            .iter()
            .filter(|id| running.contains_key(*id))
            .cloned()
            .collect()
    }

    /// Start a controller for the junction
    ///
    /// Returns false if one was already running.
    pub async fn start_observation(&self, junction_id: &str) -> Result<bool> {
        self.ensure_known(junction_id)?;
        let mut running = self.running.write().await;
        if running.contains_key(junction_id) {
            return Ok(false);
        }

        let runtime = JunctionRuntime::spawn(
            junction_id,
            self.tuning.clone(),
            Arc::clone(&self.channel),
            self.event_bus.clone(),
            self.settings,
        );
        let snapshot = runtime.current_state().await;
        running.insert(junction_id.to_string(), runtime);
        drop(running);

        self.event_bus.emit_lossy(SignalEvent::ObservationStarted {
            junction_id: junction_id.to_string(),
            timestamp: snapshot.updated_at,
        });
        self.event_bus
            .emit_lossy(SignalEvent::SnapshotPublished { snapshot });
        Ok(true)
    }

    /// Cancel the junction's controller and drop its state
    ///
    /// Returns false if none was running.
    pub async fn stop_observation(&self, junction_id: &str) -> Result<bool> {
        self.ensure_known(junction_id)?;
        let runtime = self.running.write().await.remove(junction_id);
        let Some(runtime) = runtime else {
            return Ok(false);
        };

        runtime.shutdown().await;
        self.event_bus.emit_lossy(SignalEvent::ObservationStopped {
            junction_id: junction_id.to_string(),
            timestamp: aspc_common::time::now(),
        });
        Ok(true)
    }

    /// Stop every running controller
    pub async fn stop_all(&self) {
        let drained: Vec<JunctionRuntime> =
            self.running.write().await.drain().map(|(_, rt)| rt).collect();
        for runtime in drained {
            let junction_id = runtime.junction_id().to_string();
            runtime.shutdown().await;
            self.event_bus.emit_lossy(SignalEvent::ObservationStopped {
                junction_id,
                timestamp: aspc_common::time::now(),
            });
        }
    }

    /// Latest snapshot for an observed junction
    pub async fn get_current_state(&self, junction_id: &str) -> Result<JunctionSnapshot> {
        self.ensure_known(junction_id)?;
        let running = self.running.read().await;
        match running.get(junction_id) {
            Some(runtime) => Ok(runtime.current_state().await),
            None => Err(Error::NotObserved(junction_id.to_string())),
        }
    }

    /// Queue a demand reading; applied at the junction's next tick
    pub async fn update_approach_demand(
        &self,
        junction_id: &str,
        direction: Direction,
        counts: VehicleCounts,
    ) -> Result<()> {
        self.ensure_known(junction_id)?;
        let running = self.running.read().await;
        match running.get(junction_id) {
            Some(runtime) => {
                runtime.push_demand(direction, counts).await;
                Ok(())
            }
            None => Err(Error::NotObserved(junction_id.to_string())),
        }
    }

    /// Submit an override command
    ///
    /// The command goes into the shared channel and, when the junction is
    /// observed here, straight to its controller as well. Either path alone
    /// is enough for the command to take effect.
    pub async fn submit_override(
        &self,
        junction_id: &str,
        kind: OverrideKind,
        payload: OverridePayload,
        issued_at: Option<DateTime<Utc>>,
    ) -> Result<Override> {
        self.ensure_known(junction_id)?;
        let issued_at = issued_at.unwrap_or_else(aspc_common::time::now);
        let command = Override::new(junction_id, kind, payload, issued_at);

        if kind == OverrideKind::Unknown {
            warn!("Junction {}: storing command of unknown kind", junction_id);
        }

        let stored = self.channel.submit(command.clone()).await;

        let running = self.running.read().await;
        let runtime = running.get(junction_id);
        if let Some(runtime) = runtime {
            runtime.push_command(command.clone()).await;
        }

        match stored {
            Ok(true) => {
                info!(
                    "Junction {}: {} submitted (id {})",
                    junction_id, kind, command.command_id
                );
            }
            Ok(false) => {
                info!(
                    "Junction {}: {} not stored, a newer one is already pending",
                    junction_id, kind
                );
            }
            Err(e) if runtime.is_some() => {
                warn!(
                    "Junction {}: channel rejected {} ({}), delivered in-process only",
                    junction_id, kind, e
                );
            }
            Err(e) => return Err(e),
        }

        Ok(command)
    }

    /// Commands the junction's controller would see at its next tick
    pub async fn pending_overrides(&self, junction_id: &str) -> Result<PendingOverrides> {
        self.ensure_known(junction_id)?;

        let polled = match timeout(self.settings.poll_timeout, self.channel.poll_pending(junction_id))
            .await
        {
            Ok(Ok(commands)) => commands,
            Ok(Err(e)) => {
                warn!("Junction {}: command poll failed: {}", junction_id, e);
                Vec::new()
            }
            Err(_) => {
                warn!("Junction {}: command poll timed out", junction_id);
                Vec::new()
            }
        };

        let received = {
            let running = self.running.read().await;
            match running.get(junction_id) {
                Some(runtime) => runtime.received_commands().await,
                None => Vec::new(),
            }
        };

        let mut commands = merge_commands(received, polled);
        commands.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        let resolved_kind = resolve(&commands, aspc_common::time::now(), self.tuning.override_ttl_s)
            .map(|c| c.kind);

        Ok(PendingOverrides {
            junction_id: junction_id.to_string(),
            commands,
            resolved_kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::InMemoryCommandChannel;
    use std::time::Duration;

    fn registry() -> JunctionRegistry {
        JunctionRegistry::new(
            vec!["J001".to_string(), "J002".to_string()],
            ControllerTuning::default(),
            RuntimeSettings {
                tick_interval: Duration::from_millis(20),
                poll_timeout: Duration::from_millis(50),
            },
            Arc::new(InMemoryCommandChannel::new()),
            EventBus::new(256),
        )
    }

    #[tokio::test]
    async fn test_unknown_junction_rejected() {
        let reg = registry();
        assert!(matches!(
            reg.start_observation("J999").await,
            Err(Error::JunctionNotFound(_))
        ));
        assert!(matches!(
            reg.get_current_state("J999").await,
            Err(Error::JunctionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_state_requires_observation() {
        let reg = registry();
        assert!(matches!(
            reg.get_current_state("J001").await,
            Err(Error::NotObserved(_))
        ));

        assert!(reg.start_observation("J001").await.unwrap());
        assert!(!reg.start_observation("J001").await.unwrap());
        assert!(reg.get_current_state("J001").await.is_ok());

        assert!(reg.stop_observation("J001").await.unwrap());
        assert!(!reg.stop_observation("J001").await.unwrap());
        assert!(matches!(
            reg.get_current_state("J001").await,
            Err(Error::NotObserved(_))
        ));
    }

    #[tokio::test]
    async fn test_restart_is_cold_start() {
        let reg = registry();
        reg.start_observation("J002").await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        let before = reg.get_current_state("J002").await.unwrap().tick;
        assert!(before > 1);

        reg.stop_observation("J002").await.unwrap();
        reg.start_observation("J002").await.unwrap();
        assert!(reg.get_current_state("J002").await.unwrap().tick < before);
        reg.stop_all().await;
    }

    #[tokio::test]
    async fn test_pending_overrides_resolution() {
        let reg = registry();
        reg.submit_override("J001", OverrideKind::ExtendGreen, OverridePayload::default(), None)
            .await
            .unwrap();
        reg.submit_override("J001", OverrideKind::ForceRed, OverridePayload::default(), None)
            .await
            .unwrap();

        let pending = reg.pending_overrides("J001").await.unwrap();
        assert_eq!(pending.commands.len(), 2);
        assert_eq!(pending.resolved_kind, Some(OverrideKind::ForceRed));
    }
}
