//! Override arbitration
//!
//! Reduces the pending command set for a junction to at most one command
//! that should govern it right now.
//!
//! - Commands older than the TTL and unknown kinds take no part.
//! - The latest unexpired RESET cancels every command issued at or before it.
//! - Of the rest, the highest-precedence kind wins; within a kind the most
//!   recently issued command wins.

use std::cmp::Ordering;

use aspc_common::events::{Direction, OverrideKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Optional command details
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverridePayload {
    /// Emergency vehicle identifier, informational
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<String>,
    /// Junction ids along an emergency route, informational
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub route: Vec<String>,
    /// Approaches given green by an emergency corridor (default N + S)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub priority_directions: Vec<Direction>,
    /// Free-text operator note
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// An externally issued override command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Override {
    pub command_id: Uuid,
    pub junction_id: String,
    pub kind: OverrideKind,
    pub issued_at: DateTime<Utc>,
    #[serde(default)]
    pub payload: OverridePayload,
}

/// What the controller compares to tell a fresh command from one already applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandIdentity {
    pub kind: OverrideKind,
    pub issued_at: DateTime<Utc>,
}

impl Override {
    pub fn new(
        junction_id: impl Into<String>,
        kind: OverrideKind,
        payload: OverridePayload,
        issued_at: DateTime<Utc>,
    ) -> Self {
        // Stores keep millisecond precision; match it so identities survive a round trip
        let issued_at =
            DateTime::<Utc>::from_timestamp_millis(issued_at.timestamp_millis()).unwrap_or(issued_at);
        Self {
            command_id: Uuid::new_v4(),
            junction_id: junction_id.into(),
            kind,
            issued_at,
            payload,
        }
    }

    pub fn identity(&self) -> CommandIdentity {
        CommandIdentity {
            kind: self.kind,
            issued_at: self.issued_at,
        }
    }

    /// True once the command is strictly older than `ttl_s`
    pub fn is_expired(&self, now: DateTime<Utc>, ttl_s: u32) -> bool {
        (now - self.issued_at).num_milliseconds() > i64::from(ttl_s) * 1000
    }
}

/// Detailed arbitration result
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Nothing governs the junction
    Idle,
    /// Only a RESET survived; it clears whatever is active
    Reset(Override),
    /// This command governs the junction
    Active(Override),
}

/// Most recent first; command id breaks exact ties so the result is stable
fn recency(a: &Override, b: &Override) -> Ordering {
    a.issued_at
        .cmp(&b.issued_at)
        .then_with(|| a.command_id.cmp(&b.command_id))
}

fn rank(a: &Override, b: &Override) -> Ordering {
    a.kind
        .precedence()
        .cmp(&b.kind.precedence())
        .then_with(|| recency(a, b))
}

/// Full arbitration, reporting a surviving RESET separately
pub fn resolve_detailed(pending: &[Override], now: DateTime<Utc>, ttl_s: u32) -> Resolution {
    let live: Vec<&Override> = pending
        .iter()
        .filter(|c| c.kind.precedence().is_some())
        .filter(|c| !c.is_expired(now, ttl_s))
        .collect();

    let latest_reset = live
        .iter()
        .copied()
        .filter(|c| c.kind == OverrideKind::Reset)
        .max_by(|a, b| recency(a, b));
    let cutoff = latest_reset.map(|r| r.issued_at);

    let winner = live
        .iter()
        .copied()
        .filter(|c| c.kind != OverrideKind::Reset)
        .filter(|c| cutoff.map_or(true, |t| c.issued_at > t))
        .max_by(|a, b| rank(a, b));

    match (winner, latest_reset) {
        (Some(w), _) => Resolution::Active(w.clone()),
        (None, Some(r)) => Resolution::Reset(r.clone()),
        (None, None) => Resolution::Idle,
    }
}

/// The single governing command, if any
pub fn resolve(pending: &[Override], now: DateTime<Utc>, ttl_s: u32) -> Option<Override> {
    match resolve_detailed(pending, now, ttl_s) {
        Resolution::Active(cmd) => Some(cmd),
        Resolution::Reset(_) | Resolution::Idle => None,
    }
}
