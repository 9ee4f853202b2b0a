//! # ASPC Common Library
//!
//! Shared code for the Adaptive Signal Phase Controller crates:
//! - Event types (SignalEvent enum) and the EventBus
//! - Signal value types carried on events and snapshots
//! - Configuration file resolution and TOML loading
//! - SQLite initialization for the shared command store
//! - SSE stream helper
//! - Timestamp utilities

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod events;
pub mod sse;
pub mod time;

pub use error::{Error, Result};
pub use events::{EventBus, SignalEvent};
