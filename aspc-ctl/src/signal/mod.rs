//! Signal control core
//!
//! Pure, synchronous logic: demand weighting, phase selection, green-time
//! calculation, override arbitration and the per-junction state machine.
//! Nothing here touches the clock, the network or the command store; the
//! runtime feeds time and commands in.

pub mod approach;
pub mod arbiter;
pub mod controller;
pub mod green_time;
pub mod junction;
pub mod pcu;
pub mod selector;
pub mod tuning;

pub use approach::{Approaches, VehicleClass, VehicleCounts};
pub use arbiter::{resolve, resolve_detailed, Override, OverridePayload, Resolution};
pub use controller::{PhaseController, TickOutcome};
pub use green_time::green_time;
pub use junction::{JunctionState, PhaseTimer};
pub use pcu::{weigh, PcuWeights};
pub use selector::{select, Selection, ServiceCounts};
pub use tuning::ControllerTuning;
