use std::fmt;
use std::time::Instant;

use log::{debug, info};

use crate::{
    backend::ContactBackend,
    config::ContactSensorConfig,
    core::{
        buffers::StateBuffers,
        snapshot::ContactSensorData,
        types::{FilterShape, InstanceSelector, SensorLayout},
    },
    error::{Result, SensorError},
    update::{ContactPolicy, ResetController, StalenessGate, UpdateEngine},
    utils::{
        logging::{StageTrace, warn_if_refresh_budget_exceeded},
        names::resolve_matching_names,
        profiling::{self, RefreshProfile},
    },
};

/// Contact sensor over a batch of simulation instances.
///
/// Owns every buffer it serves. Data is recomputed lazily: [`ContactSensor::data`]
/// only pulls measurements from the backend for instances whose clock moved
/// past their last update.
pub struct ContactSensor {
    config: ContactSensorConfig,
    backend: Box<dyn ContactBackend>,
    body_names: Vec<String>,
    buffers: StateBuffers,
    gate: StalenessGate,
    engine: UpdateEngine,
    physics_dt: f32,
    refresh_budget_ms: Option<f32>,
    profile: RefreshProfile,
}

impl ContactSensor {
    /// Validates the configuration, resolves the body layout against the
    /// backend, and allocates all buffers.
    pub fn new<B>(config: ContactSensorConfig, backend: B) -> Result<Self>
    where
        B: ContactBackend + 'static,
    {
        config.validate()?;

        let num_instances = backend.instance_count();
        if num_instances == 0 {
            return Err(SensorError::Initialization(format!(
                "backend '{}' reports no simulation instances",
                backend.name()
            )));
        }

        let body_names = backend.contact_body_names();
        if body_names.is_empty() {
            return Err(SensorError::Initialization(format!(
                "backend '{}' has no bodies with contact reporting enabled",
                backend.name()
            )));
        }

        let tracked = backend.tracked_body_count();
        if tracked % num_instances != 0 || tracked / num_instances != body_names.len() {
            return Err(SensorError::Initialization(format!(
                "contact view tracks {tracked} bodies over {num_instances} instances, \
                 expected {} per instance ({:?})",
                body_names.len(),
                body_names
            )));
        }

        let filter = Self::resolve_filter(&config, &backend)?;

        let physics_dt = backend.physics_dt();
        if !physics_dt.is_finite() || physics_dt <= 0.0 {
            return Err(SensorError::Initialization(format!(
                "backend physics step must be positive, got {physics_dt}"
            )));
        }

        let buffers = StateBuffers::allocate(
            num_instances,
            body_names.len(),
            config.history_length,
            filter,
        )?;
        let gate = StalenessGate::new(num_instances, config.update_period);
        let mut engine = UpdateEngine::new(ContactPolicy::from(&config));
        engine.set_parallel(config.parallel);

        info!(
            "contact sensor ready: {} bodies x {} instances, history {}, filter {:?}, backend '{}'",
            body_names.len(),
            num_instances,
            config.history_length,
            filter,
            backend.name()
        );

        Ok(Self {
            config,
            backend: Box::new(backend),
            body_names,
            buffers,
            gate,
            engine,
            physics_dt,
            refresh_budget_ms: None,
            profile: RefreshProfile::default(),
        })
    }

    fn resolve_filter<B: ContactBackend>(
        config: &ContactSensorConfig,
        backend: &B,
    ) -> Result<Option<FilterShape>> {
        if !config.filtering_enabled() {
            return Ok(None);
        }
        match backend.filter_shape(&config.filter_expressions) {
            Some(shape) if shape.entries_per_body() > 0 => Ok(Some(shape)),
            Some(shape) => Err(SensorError::Initialization(format!(
                "filter expressions {:?} resolved to an empty force matrix {shape:?}",
                config.filter_expressions
            ))),
            None => Err(SensorError::Initialization(format!(
                "backend '{}' could not resolve filter expressions {:?}",
                backend.name(),
                config.filter_expressions
            ))),
        }
    }

    pub fn config(&self) -> &ContactSensorConfig {
        &self.config
    }

    pub fn layout(&self) -> &SensorLayout {
        self.buffers.layout()
    }

    pub fn num_instances(&self) -> usize {
        self.buffers.layout().num_instances
    }

    pub fn num_bodies(&self) -> usize {
        self.buffers.layout().num_bodies
    }

    /// Ordered names of the bodies the sensor tracks in each instance.
    pub fn body_names(&self) -> &[String] {
        &self.body_names
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn set_parallel_enabled(&mut self, enabled: bool) {
        self.engine.set_parallel(enabled);
    }

    /// Returns whether refreshes fan out over the rayon pool.
    pub fn parallel_enabled(&self) -> bool {
        self.engine.parallel()
    }

    /// Warn whenever a refresh takes longer than `budget_ms`.
    pub fn set_refresh_budget(&mut self, budget_ms: Option<f32>) {
        self.refresh_budget_ms = budget_ms;
    }

    pub fn profile(&self) -> &RefreshProfile {
        &self.profile
    }

    pub fn profile_mut(&mut self) -> &mut RefreshProfile {
        &mut self.profile
    }

    /// Logs the accumulated refresh timings at info level.
    pub fn report_profile(&self) {
        self.profile.report();
    }

    pub fn current_time(&self, instance: usize) -> f32 {
        self.gate.current_time(instance)
    }

    pub fn last_update_time(&self, instance: usize) -> f32 {
        self.gate.last_update_time(instance)
    }

    pub fn needs_update(&self, instance: usize) -> bool {
        self.gate.needs_update(instance)
    }

    /// Advances the sensor clock by one simulation step of `dt` seconds.
    ///
    /// With `force_recompute` the stale instances are refreshed right away,
    /// otherwise on the next read. A negative or non-finite `dt` is rejected
    /// and leaves the clock untouched.
    pub fn update(&mut self, dt: f32, force_recompute: bool) -> Result<()> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(SensorError::InvalidTimeStep(dt));
        }
        self.gate.advance(dt);
        if force_recompute {
            self.refresh()?;
        }
        Ok(())
    }

    /// Recomputes every stale instance from fresh backend measurements.
    ///
    /// Returns the number of instances that were refreshed.
    pub fn refresh(&mut self) -> Result<usize> {
        let stale = self.gate.stale_instances();
        if stale.is_empty() {
            return Ok(0);
        }

        let started = Instant::now();
        let with_matrix = self.buffers.layout().filter.is_some();
        let raw = {
            let _trace = StageTrace::new("fetch", stale.len());
            profiling::timed(&mut self.profile.fetch_time, || {
                self.backend.fetch(&stale, self.physics_dt, with_matrix)
            })
        };
        let elapsed = self.gate.elapsed(&stale);
        profiling::timed(&mut self.profile.step_time, || {
            self.engine.step(&mut self.buffers, &stale, &raw, &elapsed)
        })?;
        self.gate.mark_updated(&stale);

        let duration = started.elapsed();
        self.profile.total_time += duration;
        self.profile.refresh_count += 1;
        self.profile.instances_refreshed += stale.len();
        if let Some(budget) = self.refresh_budget_ms {
            warn_if_refresh_budget_exceeded(duration, budget);
        }
        debug!("contact sensor refreshed {} instance(s)", stale.len());
        Ok(stale.len())
    }

    /// Returns the sensor data, refreshing stale instances first.
    pub fn data(&mut self) -> Result<ContactSensorData<'_>> {
        self.refresh()?;
        Ok(self.peek())
    }

    /// Returns the buffers as they are, without refreshing.
    pub fn peek(&self) -> ContactSensorData<'_> {
        ContactSensorData::new(&self.buffers, self.engine.policy().contact_threshold)
    }

    /// Zeroes the temporal state of the selected instances.
    ///
    /// Reset instances read as zeros until the simulation steps again.
    pub fn reset<S: Into<InstanceSelector>>(&mut self, selector: S) -> Result<()> {
        ResetController::on_reset(&mut self.buffers, &mut self.gate, &selector.into())?;
        Ok(())
    }

    /// Forces the next read of the selected instances to refetch.
    pub fn invalidate<S: Into<InstanceSelector>>(&mut self, selector: S) -> Result<()> {
        let instances = selector.into().resolve(self.num_instances())?;
        self.gate.invalidate(&instances);
        Ok(())
    }

    /// Finds tracked bodies whose names fully match any of the regular
    /// expressions in `name_keys`.
    pub fn find_bodies<S: AsRef<str>>(&self, name_keys: &[S]) -> Result<(Vec<usize>, Vec<String>)> {
        resolve_matching_names(name_keys, &self.body_names)
    }
}

impl fmt::Display for ContactSensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Contact sensor @ backend '{}':", self.backend.name())?;
        writeln!(f, "\tupdate period (s) : {}", self.config.update_period)?;
        writeln!(f, "\thistory length    : {}", self.config.history_length)?;
        writeln!(f, "\tnumber of bodies  : {}", self.num_bodies())?;
        write!(f, "\tbody names        : {:?}", self.body_names)
    }
}

impl fmt::Debug for ContactSensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContactSensor")
            .field("backend", &self.backend.name())
            .field("layout", self.buffers.layout())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
