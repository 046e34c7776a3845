//! Contact Sensor – batched contact state for rigid-body simulations.
//!
//! This crate turns per-step contact forces reported by a physics backend for
//! N parallel simulation instances into a consistent temporal state: a rolling
//! net-force history, contact flags, and air time per tracked body. Updates
//! are pulled lazily when data is read and survive partial, per-instance
//! resets.
//!
//! ```
//! use contact_sensor::*;
//!
//! let backend = ScriptedBackend::new(2, ["left_foot", "right_foot"]);
//! let driver = backend.clone();
//! let mut sensor = ContactSensor::new(ContactSensorConfig::default(), backend).unwrap();
//!
//! driver.set_net_force(0, 1, Vec3::new(0.0, 0.0, 25.0));
//! sensor.update(0.01, false).unwrap();
//!
//! let data = sensor.data().unwrap();
//! assert_eq!(data.is_contact(0, 1), Some(true));
//! assert_eq!(data.is_contact(1, 1), Some(false));
//! ```

pub mod backend;
pub mod config;
pub mod core;
pub mod error;
pub mod sensor;
pub mod update;
pub mod utils;

pub use glam::{Quat, Vec3};

pub use backend::{ContactBackend, ScriptedBackend};
pub use config::{AirTimeMode, ContactSensorConfig, DEFAULT_CONTACT_THRESHOLD};
pub use crate::core::{
    buffers::StateBuffers,
    snapshot::{ContactSensorData, ContactSnapshot},
    types::{FilterShape, InstanceSelector, InstanceSet, Pose, SensorLayout},
};
pub use error::{Result, SensorError};
pub use sensor::ContactSensor;
pub use update::{ContactPolicy, RawMeasurements, ResetController, StalenessGate, UpdateEngine};
pub use utils::profiling::RefreshProfile;
