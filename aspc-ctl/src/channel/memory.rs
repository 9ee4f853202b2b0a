//! Process-local command store

use std::collections::HashMap;

use async_trait::async_trait;
use aspc_common::events::OverrideKind;
use tokio::sync::RwLock;
use tracing::debug;

use super::CommandChannel;
use crate::error::Result;
use crate::signal::Override;

/// Most recent command per kind, per junction, held in memory
#[derive(Debug, Default)]
pub struct InMemoryCommandChannel {
    commands: RwLock<HashMap<String, HashMap<OverrideKind, Override>>>,
}

impl InMemoryCommandChannel {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CommandChannel for InMemoryCommandChannel {
    async fn submit(&self, command: Override) -> Result<bool> {
        let mut commands = self.commands.write().await;
        let per_kind = commands.entry(command.junction_id.clone()).or_default();

        if let Some(existing) = per_kind.get(&command.kind) {
            if existing.issued_at >= command.issued_at {
                debug!(
                    "Ignoring {} for {}: store already holds one issued at {}",
                    command.kind, command.junction_id, existing.issued_at
                );
                return Ok(false);
            }
        }

        per_kind.insert(command.kind, command);
        Ok(true)
    }

    async fn poll_pending(&self, junction_id: &str) -> Result<Vec<Override>> {
        let commands = self.commands.read().await;
        Ok(commands
            .get(junction_id)
            .map(|per_kind| per_kind.values().cloned().collect())
            .unwrap_or_default())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
