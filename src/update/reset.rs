use log::debug;

use crate::core::buffers::StateBuffers;
use crate::core::types::{InstanceSelector, InstanceSet};
use crate::error::Result;
use crate::update::staleness::StalenessGate;

/// Applies environment resets to the sensor state.
pub struct ResetController;

impl ResetController {
    /// Zeroes the temporal state of the selected instances and marks them
    /// current, so the next read serves the zeros instead of refetching
    /// backend state from before the reset.
    pub fn on_reset(
        buffers: &mut StateBuffers,
        gate: &mut StalenessGate,
        selector: &InstanceSelector,
    ) -> Result<InstanceSet> {
        let instances = selector.resolve(buffers.layout().num_instances)?;
        buffers.reset(&instances);
        gate.reset(&instances);
        debug!("contact sensor reset {} instance(s)", instances.len());
        Ok(instances)
    }
}
