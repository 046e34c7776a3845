use glam::Vec3;

use crate::core::types::{FilterShape, InstanceSet, Pose, SensorLayout};
use crate::error::{Result, SensorError};

/// Structure-of-arrays storage for every per-instance, per-body quantity the
/// sensor tracks.
///
/// Per-body buffers are laid out `[instance][body]`. The force history is laid
/// out `[instance][slot][body]` and the force matrix
/// `[instance][body][shape][filter]`. Shapes are fixed at allocation.
#[derive(Debug, Clone)]
pub struct StateBuffers {
    layout: SensorLayout,
    poses: Vec<Pose>,
    net_forces: Vec<Vec3>,
    history: Vec<Vec3>,
    force_matrix: Option<Vec<Vec3>>,
    current_air_time: Vec<f32>,
    last_air_time: Vec<f32>,
}

impl StateBuffers {
    /// Allocates zeroed buffers for the given dimensions.
    pub fn allocate(
        num_instances: usize,
        num_bodies: usize,
        history_length: i32,
        filter: Option<FilterShape>,
    ) -> Result<Self> {
        if num_bodies == 0 {
            return Err(SensorError::Configuration(
                "sensor must track at least one body".to_string(),
            ));
        }
        if num_instances == 0 {
            return Err(SensorError::Configuration(
                "sensor must span at least one instance".to_string(),
            ));
        }
        if filter.is_some_and(|shape| shape.entries_per_body() == 0) {
            return Err(SensorError::Configuration(
                "force matrix needs at least one shape and one filter".to_string(),
            ));
        }
        let history_length = usize::try_from(history_length).map_err(|_| {
            SensorError::Configuration(format!(
                "history length must be non-negative, got {history_length}"
            ))
        })?;

        let layout = SensorLayout {
            num_instances,
            num_bodies,
            history_length,
            filter,
        };
        Ok(Self::from_layout(layout))
    }

    fn from_layout(layout: SensorLayout) -> Self {
        let per_body = layout.num_instances * layout.num_bodies;
        Self {
            layout,
            poses: vec![Pose::default(); per_body],
            net_forces: vec![Vec3::ZERO; per_body],
            history: vec![Vec3::ZERO; layout.num_instances * layout.history_stride()],
            force_matrix: layout
                .matrix_stride()
                .map(|stride| vec![Vec3::ZERO; layout.num_instances * stride]),
            current_air_time: vec![0.0; per_body],
            last_air_time: vec![0.0; per_body],
        }
    }

    pub fn layout(&self) -> &SensorLayout {
        &self.layout
    }

    pub fn poses(&self) -> &[Pose] {
        &self.poses
    }

    pub fn net_forces(&self) -> &[Vec3] {
        &self.net_forces
    }

    pub fn history(&self) -> &[Vec3] {
        &self.history
    }

    pub fn force_matrix(&self) -> Option<&[Vec3]> {
        self.force_matrix.as_deref()
    }

    pub fn current_air_time(&self) -> &[f32] {
        &self.current_air_time
    }

    pub fn last_air_time(&self) -> &[f32] {
        &self.last_air_time
    }

    /// Flat index of an `(instance, body)` pair in the per-body buffers, or
    /// `None` when either index is outside the layout.
    pub fn body_index(&self, instance: usize, body: usize) -> Option<usize> {
        let layout = &self.layout;
        (instance < layout.num_instances && body < layout.num_bodies)
            .then(|| instance * layout.num_bodies + body)
    }

    /// Flat index of `(instance, slot, body)` in the force history.
    pub fn history_index(&self, instance: usize, slot: usize, body: usize) -> Option<usize> {
        if slot >= self.layout.history_slots() {
            return None;
        }
        self.body_index(instance, body)?;
        Some(instance * self.layout.history_stride() + slot * self.layout.num_bodies + body)
    }

    /// Flat index of `(instance, body, shape, filter)` in the force matrix.
    pub fn matrix_index(
        &self,
        instance: usize,
        body: usize,
        shape: usize,
        filter: usize,
    ) -> Option<usize> {
        let dims = self.layout.filter?;
        if shape >= dims.num_shapes || filter >= dims.num_filters {
            return None;
        }
        let row = self.body_index(instance, body)?;
        Some(row * dims.entries_per_body() + shape * dims.num_filters + filter)
    }

    /// Mutable view of one instance's slices.
    pub fn instance_mut(&mut self, instance: usize) -> InstanceStateMut<'_> {
        let bodies = self.layout.num_bodies;
        let body_range = instance * bodies..(instance + 1) * bodies;
        let history_stride = self.layout.history_stride();
        let history_range = instance * history_stride..(instance + 1) * history_stride;
        let matrix = match (self.force_matrix.as_mut(), self.layout.matrix_stride()) {
            (Some(values), Some(stride)) => {
                Some(&mut values[instance * stride..(instance + 1) * stride])
            }
            _ => None,
        };

        InstanceStateMut {
            num_bodies: bodies,
            poses: &mut self.poses[body_range.clone()],
            net_forces: &mut self.net_forces[body_range.clone()],
            history: &mut self.history[history_range],
            force_matrix: matrix,
            current_air_time: &mut self.current_air_time[body_range.clone()],
            last_air_time: &mut self.last_air_time[body_range],
        }
    }

    /// Splits the buffers into one disjoint mutable view per instance.
    pub fn instances_mut(&mut self) -> Vec<InstanceStateMut<'_>> {
        let bodies = self.layout.num_bodies;
        let count = self.layout.num_instances;
        let history_stride = self.layout.history_stride();

        let matrices: Vec<Option<&mut [Vec3]>> =
            match (self.force_matrix.as_mut(), self.layout.matrix_stride()) {
                (Some(values), Some(stride)) => values.chunks_mut(stride).map(Some).collect(),
                _ => (0..count).map(|_| None).collect(),
            };

        self.poses
            .chunks_mut(bodies)
            .zip(self.net_forces.chunks_mut(bodies))
            .zip(self.history.chunks_mut(history_stride))
            .zip(self.current_air_time.chunks_mut(bodies))
            .zip(self.last_air_time.chunks_mut(bodies))
            .zip(matrices)
            .map(
                |(((((poses, net_forces), history), current_air_time), last_air_time), force_matrix)| {
                    InstanceStateMut {
                        num_bodies: bodies,
                        poses,
                        net_forces,
                        history,
                        force_matrix,
                        current_air_time,
                        last_air_time,
                    }
                },
            )
            .collect()
    }

    /// Zeroes air time, net forces and force history of the given instances.
    ///
    /// Poses and the force matrix are left as they are; the next real update
    /// overwrites them.
    pub fn reset(&mut self, instances: &InstanceSet) {
        for instance in instances.iter() {
            self.instance_mut(instance).reset();
        }
    }
}

/// Disjoint mutable borrows of one instance's slice of every buffer.
#[derive(Debug)]
pub struct InstanceStateMut<'a> {
    pub num_bodies: usize,
    pub poses: &'a mut [Pose],
    pub net_forces: &'a mut [Vec3],
    /// `[slot][body]`, slot 0 is the current step.
    pub history: &'a mut [Vec3],
    pub force_matrix: Option<&'a mut [Vec3]>,
    pub current_air_time: &'a mut [f32],
    pub last_air_time: &'a mut [f32],
}

impl InstanceStateMut<'_> {
    pub fn reset(&mut self) {
        self.current_air_time.fill(0.0);
        self.last_air_time.fill(0.0);
        self.net_forces.fill(Vec3::ZERO);
        self.history.fill(Vec3::ZERO);
    }

    /// Number of history slots, current step included.
    pub fn history_slots(&self) -> usize {
        self.history.len() / self.num_bodies
    }
}
