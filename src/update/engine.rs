use glam::Vec3;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::{AirTimeMode, ContactSensorConfig, DEFAULT_CONTACT_THRESHOLD};
use crate::core::buffers::{InstanceStateMut, StateBuffers};
use crate::core::types::{InstanceSet, Pose, SensorLayout};
use crate::error::{Result, SensorError};
use crate::utils::logging::StageTrace;

/// One batch of raw backend measurements.
///
/// Rows follow the order of the [`InstanceSet`] they were fetched for; each
/// row holds `num_bodies` entries (times the filter size for the matrix).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMeasurements {
    pub poses: Vec<Pose>,
    pub net_forces: Vec<Vec3>,
    pub force_matrix: Option<Vec<Vec3>>,
}

#[derive(Debug, Clone, Copy)]
struct RawRow<'a> {
    poses: &'a [Pose],
    net_forces: &'a [Vec3],
    force_matrix: Option<&'a [Vec3]>,
}

impl RawMeasurements {
    fn row(&self, row: usize, layout: &SensorLayout) -> RawRow<'_> {
        let bodies = layout.num_bodies;
        let body_range = row * bodies..(row + 1) * bodies;
        let force_matrix = match (self.force_matrix.as_deref(), layout.matrix_stride()) {
            (Some(values), Some(stride)) => Some(&values[row * stride..(row + 1) * stride]),
            _ => None,
        };
        RawRow {
            poses: &self.poses[body_range.clone()],
            net_forces: &self.net_forces[body_range],
            force_matrix,
        }
    }
}

/// Contact classification rules applied on every step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPolicy {
    pub contact_threshold: f32,
    pub air_time_mode: AirTimeMode,
}

impl Default for ContactPolicy {
    fn default() -> Self {
        Self {
            contact_threshold: DEFAULT_CONTACT_THRESHOLD,
            air_time_mode: AirTimeMode::Overwrite,
        }
    }
}

impl From<&ContactSensorConfig> for ContactPolicy {
    fn from(config: &ContactSensorConfig) -> Self {
        Self {
            contact_threshold: config.contact_threshold,
            air_time_mode: config.air_time_mode,
        }
    }
}

/// Advances [`StateBuffers`] by one logical step from a batch of measurements.
#[derive(Debug, Clone)]
pub struct UpdateEngine {
    policy: ContactPolicy,
    parallel: bool,
}

impl UpdateEngine {
    pub fn new(policy: ContactPolicy) -> Self {
        Self {
            policy,
            parallel: false,
        }
    }

    pub fn policy(&self) -> &ContactPolicy {
        &self.policy
    }

    pub fn set_parallel(&mut self, enabled: bool) {
        self.parallel = enabled;
    }

    pub fn parallel(&self) -> bool {
        cfg!(feature = "parallel") && self.parallel
    }

    /// Applies one step to the given instances.
    ///
    /// `elapsed` holds the sensor time elapsed since each instance's previous
    /// update, in the order of `instances`. The whole batch is validated
    /// before any buffer is written.
    pub fn step(
        &self,
        buffers: &mut StateBuffers,
        instances: &InstanceSet,
        raw: &RawMeasurements,
        elapsed: &[f32],
    ) -> Result<()> {
        let layout = *buffers.layout();
        Self::validate(&layout, instances, raw, elapsed)?;
        if instances.is_empty() {
            return Ok(());
        }

        let _trace = StageTrace::new("step", instances.len());
        let rows = instances.rows(layout.num_instances);
        let mut jobs: Vec<(InstanceStateMut<'_>, usize)> = buffers
            .instances_mut()
            .into_iter()
            .zip(rows)
            .filter_map(|(view, row)| row.map(|row| (view, row)))
            .collect();

        let policy = self.policy;
        #[cfg(feature = "parallel")]
        if self.parallel {
            jobs.par_iter_mut().for_each(|(view, row)| {
                step_instance(&policy, view, raw.row(*row, &layout), elapsed[*row]);
            });
            return Ok(());
        }

        for (view, row) in jobs.iter_mut() {
            step_instance(&policy, view, raw.row(*row, &layout), elapsed[*row]);
        }
        Ok(())
    }

    /// Checks that a batch matches the buffer layout.
    pub fn validate(
        layout: &SensorLayout,
        instances: &InstanceSet,
        raw: &RawMeasurements,
        elapsed: &[f32],
    ) -> Result<()> {
        if let Some(index) = instances.iter().find(|&index| index >= layout.num_instances) {
            return Err(SensorError::InstanceOutOfRange {
                index,
                count: layout.num_instances,
            });
        }

        let rows = instances.len();
        if elapsed.len() != rows {
            return Err(SensorError::shape_mismatch("elapsed time", rows, elapsed.len()));
        }
        let per_body = rows * layout.num_bodies;
        if raw.poses.len() != per_body {
            return Err(SensorError::shape_mismatch("poses", per_body, raw.poses.len()));
        }
        if raw.net_forces.len() != per_body {
            return Err(SensorError::shape_mismatch(
                "net forces",
                per_body,
                raw.net_forces.len(),
            ));
        }

        let expected_matrix = layout.matrix_stride().map(|stride| rows * stride);
        let actual_matrix = raw.force_matrix.as_ref().map(Vec::len);
        match (expected_matrix, actual_matrix) {
            (Some(expected), Some(actual)) if expected != actual => Err(
                SensorError::shape_mismatch("force matrix", expected, actual),
            ),
            (Some(expected), None) => Err(SensorError::shape_mismatch("force matrix", expected, 0)),
            (None, Some(actual)) => Err(SensorError::shape_mismatch("force matrix", 0, actual)),
            _ => Ok(()),
        }
    }
}

fn step_instance(
    policy: &ContactPolicy,
    view: &mut InstanceStateMut<'_>,
    row: RawRow<'_>,
    elapsed: f32,
) {
    view.poses.copy_from_slice(row.poses);
    view.net_forces.copy_from_slice(row.net_forces);

    // copy_within moves as if through a temporary, so slots 1..=H receive the
    // pre-update slots 0..H before slot 0 is overwritten.
    let bodies = view.num_bodies;
    let history_len = view.history.len();
    if history_len > bodies {
        view.history.copy_within(0..history_len - bodies, bodies);
    }
    view.history[..bodies].copy_from_slice(view.net_forces);

    if let (Some(matrix), Some(raw_matrix)) = (view.force_matrix.as_deref_mut(), row.force_matrix) {
        matrix.copy_from_slice(raw_matrix);
    }

    for body in 0..bodies {
        let in_contact = view.net_forces[body].length() > policy.contact_threshold;
        let first_contact = view.current_air_time[body] > 0.0 && in_contact;

        view.current_air_time[body] += elapsed;
        match policy.air_time_mode {
            AirTimeMode::Overwrite => {
                view.last_air_time[body] = if first_contact {
                    view.current_air_time[body]
                } else {
                    0.0
                };
            }
            AirTimeMode::Sticky => {
                if first_contact {
                    view.last_air_time[body] = view.current_air_time[body];
                }
            }
        }
        if in_contact {
            view.current_air_time[body] = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::FilterShape;
    use approx::assert_relative_eq;

    fn raw_forces(forces: &[Vec3]) -> RawMeasurements {
        RawMeasurements {
            poses: vec![Pose::default(); forces.len()],
            net_forces: forces.to_vec(),
            force_matrix: None,
        }
    }

    #[test]
    fn policy_follows_config() {
        let config = ContactSensorConfig::new()
            .with_contact_threshold(2.5)
            .with_air_time_mode(AirTimeMode::Sticky);
        let engine = UpdateEngine::new(ContactPolicy::from(&config));
        assert_eq!(engine.policy().contact_threshold, 2.5);
        assert_eq!(engine.policy().air_time_mode, AirTimeMode::Sticky);
    }

    #[test]
    fn history_shifts_from_pre_update_state() {
        let mut buffers = StateBuffers::allocate(1, 1, 2, None).unwrap();
        let engine = UpdateEngine::new(ContactPolicy::default());
        let all = InstanceSet::all(1);

        for step in 1..=4 {
            let force = Vec3::new(step as f32, 0.0, 0.0);
            engine
                .step(&mut buffers, &all, &raw_forces(&[force]), &[0.1])
                .unwrap();
        }

        let history: Vec<f32> = buffers.history().iter().map(|f| f.x).collect();
        assert_eq!(history, vec![4.0, 3.0, 2.0]);
    }

    #[test]
    fn zero_history_length_keeps_only_current() {
        let mut buffers = StateBuffers::allocate(1, 2, 0, None).unwrap();
        let engine = UpdateEngine::new(ContactPolicy::default());
        let forces = [Vec3::X, Vec3::Y];
        engine
            .step(&mut buffers, &InstanceSet::all(1), &raw_forces(&forces), &[0.0])
            .unwrap();
        assert_eq!(buffers.history(), &forces);
    }

    #[test]
    fn onset_snapshots_air_time_then_zeroes_it() {
        let mut buffers = StateBuffers::allocate(1, 1, 0, None).unwrap();
        buffers.instance_mut(0).current_air_time[0] = 5.0;
        let engine = UpdateEngine::new(ContactPolicy::default());

        engine
            .step(
                &mut buffers,
                &InstanceSet::all(1),
                &raw_forces(&[Vec3::new(0.0, 0.0, 3.0)]),
                &[0.25],
            )
            .unwrap();

        assert_relative_eq!(buffers.last_air_time()[0], 5.25);
        assert_eq!(buffers.current_air_time()[0], 0.0);
    }

    #[test]
    fn overwrite_mode_clears_last_air_time_on_non_onset_steps() {
        let mut buffers = StateBuffers::allocate(1, 1, 0, None).unwrap();
        buffers.instance_mut(0).current_air_time[0] = 1.0;
        let engine = UpdateEngine::new(ContactPolicy::default());
        let all = InstanceSet::all(1);
        let contact = raw_forces(&[Vec3::new(0.0, 0.0, 10.0)]);

        engine.step(&mut buffers, &all, &contact, &[0.5]).unwrap();
        assert_relative_eq!(buffers.last_air_time()[0], 1.5);

        engine.step(&mut buffers, &all, &contact, &[0.5]).unwrap();
        assert_eq!(buffers.last_air_time()[0], 0.0);
    }

    #[test]
    fn sticky_mode_keeps_last_air_time_until_next_onset() {
        let mut buffers = StateBuffers::allocate(1, 1, 0, None).unwrap();
        buffers.instance_mut(0).current_air_time[0] = 1.0;
        let engine = UpdateEngine::new(ContactPolicy {
            air_time_mode: AirTimeMode::Sticky,
            ..ContactPolicy::default()
        });
        let all = InstanceSet::all(1);
        let contact = raw_forces(&[Vec3::new(0.0, 0.0, 10.0)]);
        let airborne = raw_forces(&[Vec3::ZERO]);

        engine.step(&mut buffers, &all, &contact, &[0.5]).unwrap();
        engine.step(&mut buffers, &all, &contact, &[0.5]).unwrap();
        assert_relative_eq!(buffers.last_air_time()[0], 1.5);

        engine.step(&mut buffers, &all, &airborne, &[0.5]).unwrap();
        assert_relative_eq!(buffers.last_air_time()[0], 1.5);
        engine.step(&mut buffers, &all, &contact, &[0.25]).unwrap();
        assert_relative_eq!(buffers.last_air_time()[0], 0.75);
    }

    #[test]
    fn contact_at_zero_air_time_is_not_an_onset() {
        let mut buffers = StateBuffers::allocate(1, 1, 0, None).unwrap();
        let engine = UpdateEngine::new(ContactPolicy::default());
        engine
            .step(
                &mut buffers,
                &InstanceSet::all(1),
                &raw_forces(&[Vec3::new(5.0, 0.0, 0.0)]),
                &[0.1],
            )
            .unwrap();
        assert_eq!(buffers.last_air_time()[0], 0.0);
        assert_eq!(buffers.current_air_time()[0], 0.0);
    }

    #[test]
    fn only_selected_instances_are_written() {
        let mut buffers = StateBuffers::allocate(3, 1, 1, None).unwrap();
        let engine = UpdateEngine::new(ContactPolicy::default());
        let subset = InstanceSet::from_mask(&[false, true, false]);

        engine
            .step(&mut buffers, &subset, &raw_forces(&[Vec3::splat(0.2)]), &[0.3])
            .unwrap();

        assert_eq!(buffers.net_forces()[0], Vec3::ZERO);
        assert_eq!(buffers.net_forces()[1], Vec3::splat(0.2));
        assert_eq!(buffers.net_forces()[2], Vec3::ZERO);
        assert_eq!(buffers.current_air_time(), &[0.0_f32, 0.3, 0.0]);
    }

    #[test]
    fn malformed_batches_fail_without_writing() {
        let mut buffers = StateBuffers::allocate(2, 2, 0, Some(FilterShape::new(1, 1))).unwrap();
        let engine = UpdateEngine::new(ContactPolicy::default());
        let all = InstanceSet::all(2);

        let short = raw_forces(&[Vec3::ONE; 3]);
        let err = engine.step(&mut buffers, &all, &short, &[0.1, 0.1]).unwrap_err();
        assert!(matches!(err, SensorError::ShapeMismatch { what: "poses", .. }));

        let missing_matrix = raw_forces(&[Vec3::ONE; 4]);
        let err = engine
            .step(&mut buffers, &all, &missing_matrix, &[0.1, 0.1])
            .unwrap_err();
        assert_eq!(err, SensorError::shape_mismatch("force matrix", 4, 0));

        let err = engine
            .step(&mut buffers, &all, &missing_matrix, &[0.1])
            .unwrap_err();
        assert!(matches!(err, SensorError::ShapeMismatch { what: "elapsed time", .. }));

        assert!(buffers.net_forces().iter().all(|f| *f == Vec3::ZERO));
    }

    #[test]
    fn force_matrix_rows_are_copied() {
        let mut buffers = StateBuffers::allocate(2, 1, 0, Some(FilterShape::new(1, 2))).unwrap();
        let engine = UpdateEngine::new(ContactPolicy::default());
        let subset = InstanceSet::from_mask(&[false, true]);
        let raw = RawMeasurements {
            poses: vec![Pose::default()],
            net_forces: vec![Vec3::ZERO],
            force_matrix: Some(vec![Vec3::X, Vec3::Y]),
        };

        engine.step(&mut buffers, &subset, &raw, &[0.0]).unwrap();

        let matrix = buffers.force_matrix().unwrap();
        assert_eq!(matrix, &[Vec3::ZERO, Vec3::ZERO, Vec3::X, Vec3::Y]);
    }
}
