//! Configuration constants and the sensor configuration record.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SensorError};

/// Net force magnitude above which a body counts as touching something.
pub const DEFAULT_CONTACT_THRESHOLD: f32 = 1.0;

/// Default number of past steps kept in the force history (slot 0 excluded).
pub const DEFAULT_HISTORY_LENGTH: i32 = 0;

/// Default sensor update period in seconds. Zero refreshes on every step.
pub const DEFAULT_UPDATE_PERIOD: f32 = 0.0;

/// Default physics step size reported by in-process backends (in seconds).
pub const DEFAULT_PHYSICS_DT: f32 = 1.0 / 60.0;

/// Slack used when comparing elapsed sensor time against the update period.
pub const UPDATE_PERIOD_TOLERANCE: f32 = 1.0e-6;

/// How `last_air_time` behaves on steps without a contact onset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AirTimeMode {
    /// Every step overwrites `last_air_time`; non-onset bodies read zero.
    #[default]
    Overwrite,
    /// `last_air_time` keeps its value until the next onset replaces it.
    Sticky,
}

/// Static configuration of a contact sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactSensorConfig {
    /// Minimum sensor time between refreshes, in seconds.
    pub update_period: f32,
    /// Number of past net-force samples kept besides the current one.
    pub history_length: i32,
    /// Force magnitude above which a body is in contact.
    pub contact_threshold: f32,
    /// Filter expressions forwarded to the backend. Non-empty enables the
    /// per-shape force matrix.
    pub filter_expressions: Vec<String>,
    /// Whether `last_air_time` is cleared or kept between contact onsets.
    pub air_time_mode: AirTimeMode,
    /// Fan stale instances out over the rayon pool during refresh.
    pub parallel: bool,
}

impl Default for ContactSensorConfig {
    fn default() -> Self {
        Self {
            update_period: DEFAULT_UPDATE_PERIOD,
            history_length: DEFAULT_HISTORY_LENGTH,
            contact_threshold: DEFAULT_CONTACT_THRESHOLD,
            filter_expressions: Vec::new(),
            air_time_mode: AirTimeMode::default(),
            parallel: true,
        }
    }
}

impl ContactSensorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_update_period(mut self, period: f32) -> Self {
        self.update_period = period;
        self
    }

    pub fn with_history_length(mut self, length: i32) -> Self {
        self.history_length = length;
        self
    }

    pub fn with_contact_threshold(mut self, threshold: f32) -> Self {
        self.contact_threshold = threshold;
        self
    }

    pub fn with_filter_expressions<I, S>(mut self, expressions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter_expressions = expressions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_air_time_mode(mut self, mode: AirTimeMode) -> Self {
        self.air_time_mode = mode;
        self
    }

    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    /// True when the backend must provide the per-shape force matrix.
    pub fn filtering_enabled(&self) -> bool {
        !self.filter_expressions.is_empty()
    }

    /// Validated history length as a slot count offset.
    pub fn history_slots(&self) -> Result<usize> {
        usize::try_from(self.history_length).map_err(|_| {
            SensorError::Configuration(format!(
                "history length must be non-negative, got {}",
                self.history_length
            ))
        })
    }

    /// Checks the static configuration before any buffer is allocated.
    pub fn validate(&self) -> Result<()> {
        self.history_slots()?;
        if !self.update_period.is_finite() || self.update_period < 0.0 {
            return Err(SensorError::Configuration(format!(
                "update period must be a finite non-negative number, got {}",
                self.update_period
            )));
        }
        if !self.contact_threshold.is_finite() || self.contact_threshold < 0.0 {
            return Err(SensorError::Configuration(format!(
                "contact threshold must be a finite non-negative number, got {}",
                self.contact_threshold
            )));
        }
        if let Some(empty) = self.filter_expressions.iter().position(|e| e.trim().is_empty()) {
            return Err(SensorError::Configuration(format!(
                "filter expression {empty} is empty"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ContactSensorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.history_slots().unwrap(), 0);
        assert!(!config.filtering_enabled());
        assert_eq!(config.air_time_mode, AirTimeMode::Overwrite);
    }

    #[test]
    fn negative_history_is_rejected() {
        let config = ContactSensorConfig::new().with_history_length(-1);
        assert!(matches!(
            config.validate(),
            Err(SensorError::Configuration(_))
        ));
    }

    #[test]
    fn negative_period_and_nan_threshold_are_rejected() {
        let config = ContactSensorConfig::new().with_update_period(-0.5);
        assert!(config.validate().is_err());

        let config = ContactSensorConfig::new().with_contact_threshold(f32::NAN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn blank_filter_expression_is_rejected() {
        let config = ContactSensorConfig::new().with_filter_expressions(["/World/Ground", " "]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: ContactSensorConfig =
            serde_json::from_str(r#"{ "history_length": 3, "air_time_mode": "Sticky" }"#).unwrap();
        assert_eq!(config.history_length, 3);
        assert_eq!(config.air_time_mode, AirTimeMode::Sticky);
        assert_eq!(config.contact_threshold, DEFAULT_CONTACT_THRESHOLD);
        assert!(config.parallel);
    }
}
