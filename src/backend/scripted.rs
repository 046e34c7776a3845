use std::sync::Arc;

use glam::Vec3;
use parking_lot::Mutex;

use crate::backend::ContactBackend;
use crate::core::types::{FilterShape, Pose};

/// In-process backend whose measurements are written by the driver.
///
/// Clones share state, so a driver can keep one handle while the sensor owns
/// another. Every net-force query is counted, which makes refresh behaviour
/// observable.
#[derive(Debug, Clone)]
pub struct ScriptedBackend {
    shared: Arc<Mutex<ScriptedState>>,
}

#[derive(Debug)]
struct ScriptedState {
    num_instances: usize,
    body_names: Vec<String>,
    tracked_body_count: usize,
    filter: Option<FilterShape>,
    physics_dt: f32,
    poses: Vec<Pose>,
    net_forces: Vec<Vec3>,
    force_matrix: Vec<Vec3>,
    fetch_count: usize,
    last_fetched: Vec<usize>,
}

impl ScriptedState {
    fn num_bodies(&self) -> usize {
        self.body_names.len()
    }

    fn matrix_entries_per_body(&self) -> usize {
        self.filter.map_or(0, |shape| shape.entries_per_body())
    }

    fn resize_matrix(&mut self) {
        let len = self.num_instances * self.num_bodies() * self.matrix_entries_per_body();
        self.force_matrix = vec![Vec3::ZERO; len];
    }

    fn gather<T: Copy>(values: &[T], instances: &[usize], stride: usize) -> Vec<T> {
        instances
            .iter()
            .flat_map(|&instance| values[instance * stride..(instance + 1) * stride].iter().copied())
            .collect()
    }
}

impl ScriptedBackend {
    pub fn new<I, S>(num_instances: usize, body_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let body_names: Vec<String> = body_names.into_iter().map(Into::into).collect();
        let per_body = num_instances * body_names.len();
        let state = ScriptedState {
            num_instances,
            tracked_body_count: per_body,
            body_names,
            filter: None,
            physics_dt: crate::config::DEFAULT_PHYSICS_DT,
            poses: vec![Pose::default(); per_body],
            net_forces: vec![Vec3::ZERO; per_body],
            force_matrix: Vec::new(),
            fetch_count: 0,
            last_fetched: Vec::new(),
        };
        Self {
            shared: Arc::new(Mutex::new(state)),
        }
    }

    pub fn with_filter_shape(self, shape: FilterShape) -> Self {
        {
            let mut state = self.shared.lock();
            state.filter = Some(shape);
            state.resize_matrix();
        }
        self
    }

    pub fn with_physics_dt(self, dt: f32) -> Self {
        self.shared.lock().physics_dt = dt;
        self
    }

    /// Overrides the body count the contact view reports, e.g. to mimic a
    /// view that failed to attach to some bodies.
    pub fn with_tracked_body_count(self, count: usize) -> Self {
        self.shared.lock().tracked_body_count = count;
        self
    }

    pub fn set_net_force(&self, instance: usize, body: usize, force: Vec3) {
        let mut state = self.shared.lock();
        let index = instance * state.num_bodies() + body;
        state.net_forces[index] = force;
    }

    /// Sets the same force on every body of every instance.
    pub fn fill_net_forces(&self, force: Vec3) {
        self.shared.lock().net_forces.fill(force);
    }

    pub fn set_pose(&self, instance: usize, body: usize, pose: Pose) {
        let mut state = self.shared.lock();
        let index = instance * state.num_bodies() + body;
        state.poses[index] = pose;
    }

    pub fn set_matrix_force(
        &self,
        instance: usize,
        body: usize,
        shape: usize,
        filter: usize,
        force: Vec3,
    ) {
        let mut state = self.shared.lock();
        let Some(dims) = state.filter else {
            return;
        };
        let index = (instance * state.num_bodies() + body) * dims.entries_per_body()
            + shape * dims.num_filters
            + filter;
        state.force_matrix[index] = force;
    }

    /// Number of net-force queries served so far.
    pub fn fetch_count(&self) -> usize {
        self.shared.lock().fetch_count
    }

    /// Instances requested by the most recent net-force query.
    pub fn last_fetched(&self) -> Vec<usize> {
        self.shared.lock().last_fetched.clone()
    }
}

impl ContactBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn instance_count(&self) -> usize {
        self.shared.lock().num_instances
    }

    fn contact_body_names(&self) -> Vec<String> {
        self.shared.lock().body_names.clone()
    }

    fn tracked_body_count(&self) -> usize {
        self.shared.lock().tracked_body_count
    }

    fn filter_shape(&self, filter_expressions: &[String]) -> Option<FilterShape> {
        if filter_expressions.is_empty() {
            return None;
        }
        self.shared.lock().filter
    }

    fn physics_dt(&self) -> f32 {
        self.shared.lock().physics_dt
    }

    fn poses(&self, instances: &[usize]) -> Vec<Pose> {
        let state = self.shared.lock();
        ScriptedState::gather(&state.poses, instances, state.num_bodies())
    }

    fn net_contact_forces(&self, instances: &[usize], _dt: f32) -> Vec<Vec3> {
        let mut state = self.shared.lock();
        state.fetch_count += 1;
        state.last_fetched = instances.to_vec();
        ScriptedState::gather(&state.net_forces, instances, state.num_bodies())
    }

    fn contact_force_matrix(&self, instances: &[usize], _dt: f32) -> Vec<Vec3> {
        let state = self.shared.lock();
        let stride = state.num_bodies() * state.matrix_entries_per_body();
        ScriptedState::gather(&state.force_matrix, instances, stride)
    }
}
