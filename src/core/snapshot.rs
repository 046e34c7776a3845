use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::buffers::StateBuffers;
use crate::core::types::{Pose, SensorLayout};

/// Read-only view of the sensor buffers for the current step.
///
/// Borrowing the sensor keeps the view consistent: nothing can refresh or
/// reset the buffers while it is alive.
#[derive(Debug, Clone, Copy)]
pub struct ContactSensorData<'a> {
    buffers: &'a StateBuffers,
    contact_threshold: f32,
}

impl<'a> ContactSensorData<'a> {
    pub fn new(buffers: &'a StateBuffers, contact_threshold: f32) -> Self {
        Self {
            buffers,
            contact_threshold,
        }
    }

    pub fn layout(&self) -> &'a SensorLayout {
        self.buffers.layout()
    }

    /// Body poses, `[instance][body]`.
    pub fn poses(&self) -> &'a [Pose] {
        self.buffers.poses()
    }

    /// Pose of one body, or `None` outside the layout.
    pub fn pose(&self, instance: usize, body: usize) -> Option<Pose> {
        let index = self.buffers.body_index(instance, body)?;
        Some(self.buffers.poses()[index])
    }

    /// Net contact forces of the current step, `[instance][body]`.
    pub fn net_forces(&self) -> &'a [Vec3] {
        self.buffers.net_forces()
    }

    pub fn net_force(&self, instance: usize, body: usize) -> Option<Vec3> {
        let index = self.buffers.body_index(instance, body)?;
        Some(self.buffers.net_forces()[index])
    }

    /// Force history, `[instance][slot][body]`.
    pub fn net_forces_history(&self) -> &'a [Vec3] {
        self.buffers.history()
    }

    /// Net force recorded `slot` steps ago; slot 0 is the current step.
    pub fn history(&self, instance: usize, slot: usize, body: usize) -> Option<Vec3> {
        let index = self.buffers.history_index(instance, slot, body)?;
        Some(self.buffers.history()[index])
    }

    /// Per-shape forces, `[instance][body][shape][filter]`, when filtering is on.
    pub fn force_matrix(&self) -> Option<&'a [Vec3]> {
        self.buffers.force_matrix()
    }

    pub fn matrix_force(
        &self,
        instance: usize,
        body: usize,
        shape: usize,
        filter: usize,
    ) -> Option<Vec3> {
        let index = self.buffers.matrix_index(instance, body, shape, filter)?;
        self.buffers.force_matrix()?.get(index).copied()
    }

    pub fn current_air_time(&self) -> &'a [f32] {
        self.buffers.current_air_time()
    }

    pub fn last_air_time(&self) -> &'a [f32] {
        self.buffers.last_air_time()
    }

    /// `(current, last)` air time of one body.
    pub fn air_time(&self, instance: usize, body: usize) -> Option<(f32, f32)> {
        let index = self.buffers.body_index(instance, body)?;
        Some((
            self.buffers.current_air_time()[index],
            self.buffers.last_air_time()[index],
        ))
    }

    pub fn is_contact(&self, instance: usize, body: usize) -> Option<bool> {
        self.net_force(instance, body)
            .map(|force| force.length() > self.contact_threshold)
    }

    /// Contact flags for every `(instance, body)` pair.
    pub fn contact_mask(&self) -> Vec<bool> {
        self.buffers
            .net_forces()
            .iter()
            .map(|force| force.length() > self.contact_threshold)
            .collect()
    }

    /// Copies the view into an owned snapshot that outlives the next refresh.
    pub fn to_snapshot(&self) -> ContactSnapshot {
        ContactSnapshot {
            layout: *self.buffers.layout(),
            poses: self.buffers.poses().to_vec(),
            net_forces: self.buffers.net_forces().to_vec(),
            net_forces_history: self.buffers.history().to_vec(),
            force_matrix: self.buffers.force_matrix().map(<[Vec3]>::to_vec),
            current_air_time: self.buffers.current_air_time().to_vec(),
            last_air_time: self.buffers.last_air_time().to_vec(),
        }
    }
}

/// Owned copy of the sensor buffers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactSnapshot {
    pub layout: SensorLayout,
    pub poses: Vec<Pose>,
    pub net_forces: Vec<Vec3>,
    pub net_forces_history: Vec<Vec3>,
    pub force_matrix: Option<Vec<Vec3>>,
    pub current_air_time: Vec<f32>,
    pub last_air_time: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_queries_use_threshold() {
        let mut buffers = StateBuffers::allocate(1, 3, 0, None).unwrap();
        {
            let mut view = buffers.instance_mut(0);
            view.net_forces[0] = Vec3::new(0.0, 0.0, 1.0);
            view.net_forces[1] = Vec3::new(0.0, 0.0, 1.5);
            view.net_forces[2] = Vec3::new(3.0, 0.0, 0.0);
        }

        let data = ContactSensorData::new(&buffers, 1.0);
        assert_eq!(data.is_contact(0, 0), Some(false));
        assert_eq!(data.is_contact(0, 1), Some(true));
        assert_eq!(data.contact_mask(), vec![false, true, true]);

        let strict = ContactSensorData::new(&buffers, 2.0);
        assert_eq!(strict.contact_mask(), vec![false, false, true]);
    }

    #[test]
    fn out_of_range_reads_do_not_reach_the_next_instance() {
        let mut buffers = StateBuffers::allocate(2, 2, 1, None).unwrap();
        {
            let mut view = buffers.instance_mut(1);
            view.net_forces[0] = Vec3::new(0.0, 0.0, 42.0);
            view.history[0] = Vec3::new(0.0, 0.0, 42.0);
            view.current_air_time[1] = 0.1;
        }

        let data = ContactSensorData::new(&buffers, 1.0);
        assert_eq!(data.net_force(1, 0), Some(Vec3::new(0.0, 0.0, 42.0)));
        assert_eq!(data.net_force(0, 2), None);
        assert_eq!(data.is_contact(0, 2), None);
        assert_eq!(data.history(0, 2, 0), None);
        assert_eq!(data.history(0, 0, 2), None);
        assert_eq!(data.air_time(0, 3), None);
        assert_eq!(data.pose(2, 0), None);
        assert_eq!(data.air_time(1, 1), Some((0.1, 0.0)));
    }

    #[test]
    fn owned_snapshot_matches_view() {
        let buffers = StateBuffers::allocate(2, 1, 1, None).unwrap();
        let data = ContactSensorData::new(&buffers, 1.0);
        let snapshot = data.to_snapshot();
        assert_eq!(snapshot.net_forces_history.len(), 4);
        assert_eq!(snapshot.force_matrix, None);
        assert_eq!(snapshot.layout, *data.layout());
    }
}
