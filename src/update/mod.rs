//! Step logic: advancing buffers from measurements, deciding when to do so,
//! and applying resets.

pub mod engine;
pub mod reset;
pub mod staleness;

pub use engine::{ContactPolicy, RawMeasurements, UpdateEngine};
pub use reset::ResetController;
pub use staleness::StalenessGate;
