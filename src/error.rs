//! Error types for the contact sensor.
//!
//! None of these are transient: every variant describes a configuration or
//! integration defect, so callers should surface them rather than retry.

use thiserror::Error;

/// Errors produced while configuring, initializing, or refreshing a sensor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SensorError {
    /// Invalid static configuration (zero bodies, negative history length, ...).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The physics backend disagrees with what the sensor resolved.
    #[error("initialization error: {0}")]
    Initialization(String),

    /// A per-step measurement batch has the wrong number of elements.
    #[error("shape mismatch in {what}: expected {expected} elements, got {actual}")]
    ShapeMismatch {
        /// Which measurement was malformed.
        what: &'static str,
        /// Element count implied by the sensor layout.
        expected: usize,
        /// Element count actually received.
        actual: usize,
    },

    /// An instance selector names an instance the sensor does not have.
    #[error("instance {index} is out of range for {count} instances")]
    InstanceOutOfRange {
        /// Offending instance index.
        index: usize,
        /// Number of instances tracked by the sensor.
        count: usize,
    },

    /// A simulation step that would move the sensor clock backwards or to NaN.
    #[error("time step must be finite and non-negative, got {0}")]
    InvalidTimeStep(f32),

    /// One or more name patterns did not match any body.
    #[error("name patterns matched no body: {0:?}")]
    UnmatchedNames(Vec<String>),
}

impl SensorError {
    /// Creates a shape mismatch error for the given measurement.
    pub fn shape_mismatch(what: &'static str, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            what,
            expected,
            actual,
        }
    }

    /// Returns true for errors raised while building the sensor.
    pub fn is_fatal_setup(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::Initialization(_))
    }
}

/// Result type for sensor operations.
pub type Result<T> = std::result::Result<T, SensorError>;
