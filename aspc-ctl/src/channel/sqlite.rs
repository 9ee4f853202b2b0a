//! SQLite-backed command store
//!
//! Several controller processes pointed at the same database file see the
//! same command set. Rows are keyed by (junction_id, kind) and only
//! overwritten by a strictly newer command.

use std::path::Path;

use async_trait::async_trait;
use aspc_common::db::init_database;
use aspc_common::events::OverrideKind;
use aspc_common::time::from_epoch_millis;
use sqlx::SqlitePool;
use tracing::warn;
use uuid::Uuid;

use super::CommandChannel;
use crate::error::Result;
use crate::signal::{Override, OverridePayload};

pub struct SqliteCommandChannel {
    pool: SqlitePool,
}

impl SqliteCommandChannel {
    /// Open (creating if needed) the command database
    pub async fn open(db_path: &Path) -> Result<Self> {
        let pool = init_database(db_path).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl CommandChannel for SqliteCommandChannel {
    async fn submit(&self, command: Override) -> Result<bool> {
        let payload_json = serde_json::to_string(&command.payload)
            .unwrap_or_else(|_| "{}".to_string());

        let result = sqlx::query(
            r#"
            INSERT INTO override_commands (junction_id, kind, command_id, issued_at_ms, payload_json)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(junction_id, kind) DO UPDATE SET
                command_id = excluded.command_id,
                issued_at_ms = excluded.issued_at_ms,
                payload_json = excluded.payload_json
            WHERE excluded.issued_at_ms > override_commands.issued_at_ms
            "#,
        )
        .bind(&command.junction_id)
        .bind(command.kind.as_str())
        .bind(command.command_id.to_string())
        .bind(command.issued_at.timestamp_millis())
        .bind(payload_json)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn poll_pending(&self, junction_id: &str) -> Result<Vec<Override>> {
        let rows: Vec<(String, String, i64, String)> = sqlx::query_as(
            r#"
            SELECT kind, command_id, issued_at_ms, payload_json
            FROM override_commands
            WHERE junction_id = ?
            "#,
        )
        .bind(junction_id)
        .fetch_all(&self.pool)
        .await?;

        let mut commands = Vec::with_capacity(rows.len());
        for (kind, command_id, issued_at_ms, payload_json) in rows {
            let Ok(command_id) = Uuid::parse_str(&command_id) else {
                warn!("Skipping stored command with bad id '{}'", command_id);
                continue;
            };
            let Some(issued_at) = from_epoch_millis(issued_at_ms) else {
                warn!("Skipping command {} with bad timestamp {}", command_id, issued_at_ms);
                continue;
            };
            let payload: OverridePayload = match serde_json::from_str(&payload_json) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("Ignoring malformed payload on command {}: {}", command_id, e);
                    OverridePayload::default()
                }
            };
            let kind = kind.parse::<OverrideKind>().unwrap_or(OverrideKind::Unknown);

            commands.push(Override {
                command_id,
                junction_id: junction_id.to_string(),
                kind,
                issued_at,
                payload,
            });
        }

        Ok(commands)
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
