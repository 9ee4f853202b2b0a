//! # Adaptive Signal Phase Controller (aspc-ctl)
//!
//! Runs one phase controller per observed four-way junction. Each second a
//! controller weighs approach demand in Passenger Car Units, picks the next
//! approach under a fairness window, sizes its green proportionally, and
//! lets the highest-precedence live override command take over when one is
//! pending.
//!
//! Layout:
//! - [`signal`]: the pure control core (no clock, no I/O)
//! - [`channel`]: shared store for override commands
//! - [`runtime`]: per-junction tick tasks and the junction registry
//! - [`simulation`]: synthetic demand when no detector feed is attached
//! - [`api`]: HTTP and SSE surface

pub mod api;
pub mod channel;
pub mod config;
pub mod error;
pub mod runtime;
pub mod signal;
pub mod simulation;

pub use error::{Error, Result};
