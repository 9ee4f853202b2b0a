//! Command channel
//!
//! Shared store through which override issuers hand commands to junction
//! controllers. Issuers only submit, controllers only poll. The store keeps
//! the most recent command per (junction, kind); precedence, TTL and RESET
//! handling all happen in the arbiter, so any backend that honours
//! last-write-wins per kind gives the same result.

mod memory;
mod sqlite;

pub use memory::InMemoryCommandChannel;
pub use sqlite::SqliteCommandChannel;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::{ChannelBackend, ChannelConfig};
use crate::error::Result;
use crate::signal::Override;

#[async_trait]
pub trait CommandChannel: Send + Sync {
    /// Store a command
    ///
    /// Returns false when the store already holds a command of the same kind
    /// for the junction issued at or after this one (retransmissions land
    /// here and are harmless).
    async fn submit(&self, command: Override) -> Result<bool>;

    /// Every stored command for a junction, expired ones included
    async fn poll_pending(&self, junction_id: &str) -> Result<Vec<Override>>;

    /// Backend name for logs and health output
    fn backend_name(&self) -> &'static str;
}

/// Open the configured backend
pub async fn open_channel(config: &ChannelConfig) -> Result<Arc<dyn CommandChannel>> {
    let channel: Arc<dyn CommandChannel> = match config.backend {
        ChannelBackend::Memory => Arc::new(InMemoryCommandChannel::new()),
        ChannelBackend::Sqlite => Arc::new(SqliteCommandChannel::open(&config.db_path).await?),
    };
    info!("Command channel backend: {}", channel.backend_name());
    Ok(channel)
}
