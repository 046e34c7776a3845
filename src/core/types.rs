use std::collections::BTreeSet;
use std::ops::Range;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SensorError};

/// All-zero quaternion used for freshly allocated orientation slots.
pub const ZERO_QUAT: Quat = Quat::from_xyzw(0.0, 0.0, 0.0, 0.0);

/// World-frame pose of a tracked body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    /// Unit quaternion once written by a real update; zero before that.
    pub orientation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: ZERO_QUAT,
        }
    }
}

impl Pose {
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }
}

/// Dimensions of the optional per-shape force matrix for one body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterShape {
    /// Collision shapes per tracked body.
    pub num_shapes: usize,
    /// Filter shapes each body shape is paired against.
    pub num_filters: usize,
}

impl FilterShape {
    pub fn new(num_shapes: usize, num_filters: usize) -> Self {
        Self {
            num_shapes,
            num_filters,
        }
    }

    /// Number of force vectors stored per body.
    pub fn entries_per_body(&self) -> usize {
        self.num_shapes * self.num_filters
    }
}

/// Fixed dimensions of every sensor buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorLayout {
    pub num_instances: usize,
    pub num_bodies: usize,
    /// Past samples kept besides the current one (`H`).
    pub history_length: usize,
    pub filter: Option<FilterShape>,
}

impl SensorLayout {
    /// Slots in the force history ring, current step included.
    pub fn history_slots(&self) -> usize {
        self.history_length + 1
    }

    /// Force history entries owned by one instance.
    pub fn history_stride(&self) -> usize {
        self.history_slots() * self.num_bodies
    }

    /// Force matrix entries owned by one instance, if filtering is on.
    pub fn matrix_stride(&self) -> Option<usize> {
        self.filter
            .map(|shape| shape.entries_per_body() * self.num_bodies)
    }
}

/// Caller-facing selection of instances.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InstanceSelector {
    #[default]
    All,
    Subset(BTreeSet<usize>),
}

impl InstanceSelector {
    /// Normalizes the selector into a concrete, validated index set.
    ///
    /// An empty subset selects every instance, same as [`InstanceSelector::All`].
    pub fn resolve(&self, count: usize) -> Result<InstanceSet> {
        match self {
            InstanceSelector::All => Ok(InstanceSet::all(count)),
            InstanceSelector::Subset(indices) if indices.is_empty() => Ok(InstanceSet::all(count)),
            InstanceSelector::Subset(indices) => {
                if let Some(&index) = indices.iter().find(|&&index| index >= count) {
                    return Err(SensorError::InstanceOutOfRange { index, count });
                }
                Ok(InstanceSet(indices.iter().copied().collect()))
            }
        }
    }
}

impl From<Option<&[usize]>> for InstanceSelector {
    fn from(indices: Option<&[usize]>) -> Self {
        match indices {
            Some(indices) => indices.into(),
            None => InstanceSelector::All,
        }
    }
}

impl From<&[usize]> for InstanceSelector {
    fn from(indices: &[usize]) -> Self {
        InstanceSelector::Subset(indices.iter().copied().collect())
    }
}

impl<const N: usize> From<[usize; N]> for InstanceSelector {
    fn from(indices: [usize; N]) -> Self {
        InstanceSelector::Subset(indices.into_iter().collect())
    }
}

impl From<Vec<usize>> for InstanceSelector {
    fn from(indices: Vec<usize>) -> Self {
        InstanceSelector::Subset(indices.into_iter().collect())
    }
}

impl From<Range<usize>> for InstanceSelector {
    fn from(range: Range<usize>) -> Self {
        InstanceSelector::Subset(range.collect())
    }
}

impl From<BTreeSet<usize>> for InstanceSelector {
    fn from(indices: BTreeSet<usize>) -> Self {
        InstanceSelector::Subset(indices)
    }
}

/// Sorted, duplicate-free instance indices, already bounds-checked.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InstanceSet(Vec<usize>);

impl InstanceSet {
    pub fn all(count: usize) -> Self {
        Self((0..count).collect())
    }

    /// Collects the indices whose mask entry is set.
    pub fn from_mask(mask: &[bool]) -> Self {
        Self(
            mask.iter()
                .enumerate()
                .filter_map(|(index, &set)| set.then_some(index))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.0.binary_search(&index).is_ok()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }

    /// Maps every instance in `0..count` to its row in this set.
    pub fn rows(&self, count: usize) -> Vec<Option<usize>> {
        let mut rows = vec![None; count];
        for (row, &instance) in self.0.iter().enumerate() {
            if let Some(slot) = rows.get_mut(instance) {
                *slot = Some(row);
            }
        }
        rows
    }
}
