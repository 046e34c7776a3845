use crate::config::UPDATE_PERIOD_TOLERANCE;
use crate::core::types::InstanceSet;

/// Per-instance sensor clock deciding when buffers must be recomputed.
///
/// Every instance starts outdated so the first read pulls real poses from the
/// backend.
#[derive(Debug, Clone)]
pub struct StalenessGate {
    update_period: f32,
    current_time: Vec<f32>,
    last_update_time: Vec<f32>,
    outdated: Vec<bool>,
}

impl StalenessGate {
    pub fn new(num_instances: usize, update_period: f32) -> Self {
        Self {
            update_period,
            current_time: vec![0.0; num_instances],
            last_update_time: vec![0.0; num_instances],
            outdated: vec![true; num_instances],
        }
    }

    pub fn update_period(&self) -> f32 {
        self.update_period
    }

    pub fn num_instances(&self) -> usize {
        self.current_time.len()
    }

    pub fn current_time(&self, instance: usize) -> f32 {
        self.current_time[instance]
    }

    pub fn last_update_time(&self, instance: usize) -> f32 {
        self.last_update_time[instance]
    }

    pub fn is_outdated(&self, instance: usize) -> bool {
        self.outdated[instance]
    }

    fn period_elapsed(&self, instance: usize) -> bool {
        let since_update = self.current_time[instance] - self.last_update_time[instance];
        since_update + UPDATE_PERIOD_TOLERANCE >= self.update_period
    }

    /// Advances every instance's clock by `dt` and latches the outdated flag
    /// of instances whose update period has elapsed.
    pub fn advance(&mut self, dt: f32) {
        for instance in 0..self.current_time.len() {
            self.current_time[instance] += dt;
            if self.period_elapsed(instance) {
                self.outdated[instance] = true;
            }
        }
    }

    /// True when the instance must be refreshed before it is read.
    pub fn needs_update(&self, instance: usize) -> bool {
        self.outdated[instance]
            || (self.current_time[instance] > self.last_update_time[instance]
                && self.period_elapsed(instance))
    }

    pub fn stale_instances(&self) -> InstanceSet {
        let mask: Vec<bool> = (0..self.current_time.len())
            .map(|instance| self.needs_update(instance))
            .collect();
        InstanceSet::from_mask(&mask)
    }

    /// Sensor time elapsed since each instance's previous update.
    pub fn elapsed(&self, instances: &InstanceSet) -> Vec<f32> {
        instances
            .iter()
            .map(|instance| self.current_time[instance] - self.last_update_time[instance])
            .collect()
    }

    pub fn mark_updated(&mut self, instances: &InstanceSet) {
        for instance in instances.iter() {
            self.last_update_time[instance] = self.current_time[instance];
            self.outdated[instance] = false;
        }
    }

    /// Restarts the clock of the given instances and marks them current.
    pub fn reset(&mut self, instances: &InstanceSet) {
        for instance in instances.iter() {
            self.current_time[instance] = 0.0;
            self.last_update_time[instance] = 0.0;
            self.outdated[instance] = false;
        }
    }

    /// Forces the next read of the given instances to refetch.
    pub fn invalidate(&mut self, instances: &InstanceSet) {
        for instance in instances.iter() {
            self.outdated[instance] = true;
        }
    }
}
