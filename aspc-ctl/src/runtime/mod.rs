//! Controller runtime
//!
//! Drives the pure signal core on a clock: one tick task per observed
//! junction, plus the registry the service surface talks to.

mod junction;
mod registry;

pub use junction::{JunctionRuntime, RuntimeSettings};
pub use registry::{JunctionInfo, JunctionRegistry, PendingOverrides};
