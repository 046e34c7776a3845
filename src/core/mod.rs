//! Core data types and the per-instance state buffers.

pub mod buffers;
pub mod snapshot;
pub mod types;

pub use buffers::{InstanceStateMut, StateBuffers};
pub use snapshot::{ContactSensorData, ContactSnapshot};
pub use types::{FilterShape, InstanceSelector, InstanceSet, Pose, SensorLayout};
