//! Physics backend seam.
//!
//! The sensor never talks to a simulator directly. Anything that can report
//! body poses and contact forces for a batch of instances implements
//! [`ContactBackend`].

pub mod scripted;
pub use scripted::ScriptedBackend;

use glam::Vec3;

use crate::core::types::{FilterShape, InstanceSet, Pose};
use crate::update::engine::RawMeasurements;

/// Source of per-step poses and contact forces.
///
/// Batched methods return one row per requested instance, in the order of
/// `instances`, each row holding one entry per tracked body (times the filter
/// size for the force matrix).
pub trait ContactBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Number of parallel simulation instances.
    fn instance_count(&self) -> usize;

    /// Names of the bodies in one instance that report contacts, in view order.
    fn contact_body_names(&self) -> Vec<String>;

    /// Bodies tracked by the contact view across all instances.
    fn tracked_body_count(&self) -> usize;

    /// Per-body force matrix dimensions for the given filter expressions, or
    /// `None` when the backend cannot resolve them.
    fn filter_shape(&self, filter_expressions: &[String]) -> Option<FilterShape>;

    /// Physics step size passed to force queries.
    fn physics_dt(&self) -> f32;

    fn poses(&self, instances: &[usize]) -> Vec<Pose>;

    fn net_contact_forces(&self, instances: &[usize], dt: f32) -> Vec<Vec3>;

    fn contact_force_matrix(&self, instances: &[usize], dt: f32) -> Vec<Vec3>;

    /// Gathers everything one update step needs.
    fn fetch(&self, instances: &InstanceSet, dt: f32, with_force_matrix: bool) -> RawMeasurements {
        let ids = instances.as_slice();
        RawMeasurements {
            poses: self.poses(ids),
            net_forces: self.net_contact_forces(ids, dt),
            force_matrix: with_force_matrix.then(|| self.contact_force_matrix(ids, dt)),
        }
    }
}
