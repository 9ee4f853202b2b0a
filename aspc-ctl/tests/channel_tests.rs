//! Command channel backend tests
//!
//! Both backends must agree: latest command per (junction, kind), stale
//! submissions ignored, junctions isolated.

use std::sync::Arc;

use aspc_common::events::{Direction, OverrideKind};
use chrono::{DateTime, Duration, Utc};
use tempfile::TempDir;

use aspc_ctl::channel::{CommandChannel, InMemoryCommandChannel, SqliteCommandChannel};
use aspc_ctl::signal::{resolve, Override, OverridePayload};

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-01T08:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn command(junction: &str, kind: OverrideKind, offset_s: i64) -> Override {
    Override::new(
        junction,
        kind,
        OverridePayload::default(),
        t0() + Duration::seconds(offset_s),
    )
}

async fn sqlite_channel(dir: &TempDir) -> SqliteCommandChannel {
    SqliteCommandChannel::open(&dir.path().join("commands.db"))
        .await
        .unwrap()
}

/// Behaviour shared by every backend
async fn exercise_backend(channel: Arc<dyn CommandChannel>) {
    let first = command("J001", OverrideKind::ForceRed, 0);
    let newer = command("J001", OverrideKind::ForceRed, 5);
    let older = command("J001", OverrideKind::ForceRed, 2);
    let extend = command("J001", OverrideKind::ExtendGreen, 1);
    let elsewhere = command("J002", OverrideKind::FlashYellow, 1);

    assert!(channel.submit(first.clone()).await.unwrap());
    assert!(channel.submit(newer.clone()).await.unwrap());
    assert!(!channel.submit(older).await.unwrap());
    assert!(!channel.submit(newer.clone()).await.unwrap());
    assert!(channel.submit(extend.clone()).await.unwrap());
    assert!(channel.submit(elsewhere.clone()).await.unwrap());

    let mut pending = channel.poll_pending("J001").await.unwrap();
    pending.sort_by_key(|c| c.issued_at);
    assert_eq!(pending, vec![extend, newer.clone()]);

    let other = channel.poll_pending("J002").await.unwrap();
    assert_eq!(other, vec![elsewhere]);

    assert!(channel.poll_pending("J999").await.unwrap().is_empty());

    let winner = resolve(&pending, t0() + Duration::seconds(10), 120).unwrap();
    assert_eq!(winner.command_id, newer.command_id);
}

#[tokio::test]
async fn test_memory_backend() {
    let channel = Arc::new(InMemoryCommandChannel::new());
    assert_eq!(channel.backend_name(), "memory");
    exercise_backend(channel).await;
}

#[tokio::test]
async fn test_sqlite_backend() {
    let dir = TempDir::new().unwrap();
    let channel = Arc::new(sqlite_channel(&dir).await);
    assert_eq!(channel.backend_name(), "sqlite");
    exercise_backend(channel).await;
}

#[tokio::test]
async fn test_sqlite_preserves_payload() {
    let dir = TempDir::new().unwrap();
    let channel = sqlite_channel(&dir).await;

    let cmd = Override::new(
        "J003",
        OverrideKind::EmergencyCorridor,
        OverridePayload {
            vehicle_id: Some("AMB-12".to_string()),
            route: vec!["J003".to_string(), "J004".to_string()],
            priority_directions: vec![Direction::East, Direction::West],
            note: Some("cardiac".to_string()),
        },
        t0(),
    );
    channel.submit(cmd.clone()).await.unwrap();

    let pending = channel.poll_pending("J003").await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0], cmd);
}

#[tokio::test]
async fn test_sqlite_shared_between_processes() {
    let dir = TempDir::new().unwrap();
    // Two handles on one file stand in for two controller processes
    let issuer = sqlite_channel(&dir).await;
    let controller = sqlite_channel(&dir).await;

    let cmd = command("J001", OverrideKind::FlashYellow, 0);
    assert!(issuer.submit(cmd.clone()).await.unwrap());

    let seen = controller.poll_pending("J001").await.unwrap();
    assert_eq!(seen, vec![cmd.clone()]);

    // The second process cannot roll the command back
    let stale = command("J001", OverrideKind::FlashYellow, -30);
    assert!(!controller.submit(stale).await.unwrap());
    assert_eq!(issuer.poll_pending("J001").await.unwrap(), vec![cmd]);
}

#[tokio::test]
async fn test_sqlite_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let cmd = command("J005", OverrideKind::Reset, 0);
    {
        let channel = sqlite_channel(&dir).await;
        channel.submit(cmd.clone()).await.unwrap();
    }

    let channel = sqlite_channel(&dir).await;
    assert_eq!(channel.poll_pending("J005").await.unwrap(), vec![cmd]);
}
