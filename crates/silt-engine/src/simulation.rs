//! The step coordinator and its builder.
//!
//! [`Simulation`] owns a fixed pool of worker threads for the whole run.
//! Each [`step()`](Simulation::step) sends every worker a step command
//! together with its aggregator, then waits for all replies before the
//! aggregators are merged into the [`MeasurementStore`]. No worker can
//! start step `n + 1` before every worker has finished step `n` and the
//! merge has completed.
//!
//! # Shutdown
//!
//! Dropping a `Simulation` disconnects the command channels and joins
//! every worker thread.

use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender};
use indexmap::IndexMap;

use silt_core::{HydraulicView, InjectionId, Material, Particle, ParticleId, TimeIndex};
use silt_injection::{Injection, InjectionError, InjectionSpec, ParticleIdAllocator};
use silt_measure::{LocalAggregator, MeasurementError, MeasurementStore, TracePoint, TraceRecorder};
use silt_obstacle::ObstacleField;
use silt_routing::{ConstantDispersion, Dispersion, HomogeneousRouting, Routing};

use crate::config::{ConfigError, SimulationConfig};
use crate::metrics::{StepCounters, StepMetrics};
use crate::mover::Environment;
use crate::worker::{Command, Reply, Worker};

// Compile-time assertion: Simulation can be moved to another thread.
const _: () = {
    #[allow(dead_code)]
    fn assert_send<T: Send>() {}
    #[allow(dead_code)]
    fn check() {
        assert_send::<Simulation>();
        assert_send::<StopHandle>();
    }
};

// ── SimulationError ─────────────────────────────────────────────

/// Errors from building or stepping a [`Simulation`].
#[derive(Debug)]
pub enum SimulationError {
    /// The configuration failed validation.
    Config(ConfigError),
    /// An injection could not be realized or spawned.
    Injection(InjectionError),
    /// The measurement store rejected a merge.
    Measurement(MeasurementError),
    /// A worker thread could not be spawned.
    ThreadSpawn {
        /// OS error text.
        reason: String,
    },
    /// A worker stopped replying. The simulation is unusable afterwards.
    WorkerLost {
        /// Index of the worker.
        worker: usize,
    },
    /// `step()` was called after the end time was reached.
    Finished {
        /// Current simulation time [s].
        time: f64,
    },
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config error: {e}"),
            Self::Injection(e) => write!(f, "injection error: {e}"),
            Self::Measurement(e) => write!(f, "measurement error: {e}"),
            Self::ThreadSpawn { reason } => write!(f, "failed to spawn worker thread: {reason}"),
            Self::WorkerLost { worker } => write!(f, "worker {worker} disconnected"),
            Self::Finished { time } => write!(f, "simulation already finished at t={time}"),
        }
    }
}

impl Error for SimulationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Injection(e) => Some(e),
            Self::Measurement(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for SimulationError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<InjectionError> for SimulationError {
    fn from(e: InjectionError) -> Self {
        Self::Injection(e)
    }
}

impl From<MeasurementError> for SimulationError {
    fn from(e: MeasurementError) -> Self {
        Self::Measurement(e)
    }
}

// ── StopHandle ──────────────────────────────────────────────────

/// Cooperative cancellation flag checked by [`Simulation::run`] between
/// steps. Cloning shares the flag.
#[derive(Clone, Debug, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    /// A handle with no stop requested.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the run to stop after the current step.
    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether a stop was requested.
    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Clear a previous request.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::Release);
    }
}

// ── SimulationBuilder ───────────────────────────────────────────

/// Assembles a [`Simulation`] from a hydraulic view, materials,
/// injections and models.
///
/// Injections receive ids in the order they are added, and each one's
/// particle ids follow directly after the previous injection's range.
pub struct SimulationBuilder {
    view: Arc<dyn HydraulicView>,
    config: SimulationConfig,
    materials: Vec<Material>,
    injections: Vec<InjectionSpec>,
    routing: Option<Arc<dyn Routing>>,
    dispersion: Option<Arc<dyn Dispersion>>,
    obstacles: ObstacleField,
}

impl SimulationBuilder {
    /// Replace the run configuration.
    pub fn config(mut self, config: SimulationConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a material.
    pub fn material(mut self, material: Material) -> Self {
        self.materials.push(material);
        self
    }

    /// Add an injection.
    pub fn injection(mut self, spec: InjectionSpec) -> Self {
        self.injections.push(spec);
        self
    }

    /// Routing model. Default: [`HomogeneousRouting`].
    pub fn routing(mut self, routing: impl Routing + 'static) -> Self {
        self.routing = Some(Arc::new(routing));
        self
    }

    /// Dispersion model. Default: [`ConstantDispersion`].
    pub fn dispersion(mut self, dispersion: impl Dispersion + 'static) -> Self {
        self.dispersion = Some(Arc::new(dispersion));
        self
    }

    /// Subsurface obstacles. Default: none.
    pub fn obstacles(mut self, obstacles: ObstacleField) -> Self {
        self.obstacles = obstacles;
        self
    }

    /// Validate, realize all injections and spawn the worker pool.
    pub fn build(self) -> Result<Simulation, SimulationError> {
        self.config.validate()?;

        let mut allocator = ParticleIdAllocator::new();
        let injections = self
            .injections
            .into_iter()
            .enumerate()
            .map(|(i, spec)| spec.realize(InjectionId(i as u32), &mut allocator, &self.materials))
            .collect::<Result<Vec<Injection>, _>>()?;
        let mut particles = Vec::with_capacity(allocator.allocated() as usize);
        for injection in &injections {
            particles.extend(injection.spawn_particles()?);
        }

        let env = Arc::new(Environment {
            view: self.view,
            routing: self
                .routing
                .unwrap_or_else(|| Arc::new(HomogeneousRouting::default())),
            dispersion: self
                .dispersion
                .unwrap_or_else(|| Arc::new(ConstantDispersion::default())),
            obstacles: Arc::new(self.obstacles),
            injections,
            config: self.config.clone(),
        });

        let worker_count = self.config.resolved_worker_count();
        let particle_count = particles.len();
        let mut workers = Vec::with_capacity(worker_count);
        let mut rest = particles;
        for i in (0..worker_count).rev() {
            // Contiguous partitions: worker i owns ids [i·n/k, (i+1)·n/k).
            let split = i * particle_count / worker_count;
            let chunk = rest.split_off(split);
            workers.push(WorkerHandle::spawn(i, chunk, Arc::clone(&env))?);
        }
        workers.reverse();

        log::info!(
            "simulation ready: {particle_count} particles over {worker_count} workers, \
             routing {}, dispersion {}",
            env.routing.name(),
            env.dispersion.name()
        );

        Ok(Simulation {
            config: self.config.clone(),
            materials: self.materials,
            aggregators: (0..worker_count).map(|_| LocalAggregator::new()).collect(),
            workers,
            env,
            store: MeasurementStore::new(),
            time: self.config.start_time,
            steps_done: 0,
            particle_count,
            last_metrics: StepMetrics::default(),
            lost: None,
        })
    }
}

// ── WorkerHandle ────────────────────────────────────────────────

struct WorkerHandle {
    commands: Option<Sender<Command>>,
    replies: Receiver<Reply>,
    thread: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    fn spawn(
        index: usize,
        particles: Vec<Particle>,
        env: Arc<Environment>,
    ) -> Result<Self, SimulationError> {
        let (cmd_tx, cmd_rx) = bounded(1);
        let (reply_tx, reply_rx) = bounded(1);
        let worker = Worker::new(index, particles, env);
        let thread = thread::Builder::new()
            .name(format!("silt-worker-{index}"))
            .spawn(move || worker.run(cmd_rx, reply_tx))
            .map_err(|e| SimulationError::ThreadSpawn {
                reason: e.to_string(),
            })?;
        Ok(Self {
            commands: Some(cmd_tx),
            replies: reply_rx,
            thread: Some(thread),
        })
    }

    fn send(&self, command: Command) -> bool {
        self.commands
            .as_ref()
            .is_some_and(|tx| tx.send(command).is_ok())
    }
}

// ── Simulation ──────────────────────────────────────────────────

/// A running particle transport simulation.
///
/// Created through [`Simulation::builder`]. The clock starts at the
/// configured start time; every [`step()`](Simulation::step) advances it
/// by `dt`, with a shorter final step if the end time is not a whole
/// number of steps away.
pub struct Simulation {
    config: SimulationConfig,
    materials: Vec<Material>,
    workers: Vec<WorkerHandle>,
    aggregators: Vec<LocalAggregator>,
    env: Arc<Environment>,
    store: MeasurementStore,
    time: f64,
    steps_done: u64,
    particle_count: usize,
    last_metrics: StepMetrics,
    lost: Option<usize>,
}

impl Simulation {
    /// Start building a simulation over `view`.
    pub fn builder(view: impl HydraulicView + 'static) -> SimulationBuilder {
        Self::builder_shared(Arc::new(view))
    }

    /// Start building a simulation over a shared view.
    pub fn builder_shared(view: Arc<dyn HydraulicView>) -> SimulationBuilder {
        SimulationBuilder {
            view,
            config: SimulationConfig::default(),
            materials: Vec::new(),
            injections: Vec::new(),
            routing: None,
            dispersion: None,
            obstacles: ObstacleField::new(),
        }
    }

    /// Advance every particle by one step.
    ///
    /// Returns [`SimulationError::Finished`] once the end time is reached
    /// and [`SimulationError::WorkerLost`] if a worker thread died, after
    /// which every further call fails the same way.
    pub fn step(&mut self) -> Result<StepMetrics, SimulationError> {
        if let Some(worker) = self.lost {
            return Err(SimulationError::WorkerLost { worker });
        }
        if self.is_finished() {
            return Err(SimulationError::Finished { time: self.time });
        }
        let started = Instant::now();
        let t0 = self.time;
        let t1 = if self.steps_done + 1 >= self.config.step_count() {
            self.config.end_time
        } else {
            (self.config.start_time + (self.steps_done + 1) as f64 * self.config.dt)
                .min(self.config.end_time)
        };
        let dt = t1 - t0;
        let index = self
            .config
            .hydraulics
            .map_or(TimeIndex(0), |h| h.index_at(t0));

        for i in 0..self.workers.len() {
            let aggregator = std::mem::take(&mut self.aggregators[i]);
            let command = Command::Step {
                time: t0,
                dt,
                index,
                aggregator,
            };
            if !self.workers[i].send(command) {
                return Err(self.lose(i));
            }
        }

        // Barrier: every worker replies before anything is merged.
        let mut counters = StepCounters::default();
        let mut slowest = Duration::ZERO;
        for i in 0..self.workers.len() {
            match self.workers[i].replies.recv() {
                Ok(Reply::Stepped {
                    aggregator,
                    counters: c,
                    busy,
                }) => {
                    self.aggregators[i] = aggregator;
                    counters += &c;
                    slowest = slowest.max(busy);
                }
                Ok(Reply::Collected { .. }) | Err(_) => return Err(self.lose(i)),
            }
        }

        let merge_started = Instant::now();
        self.store.stamp(t1)?;
        for aggregator in &mut self.aggregators {
            aggregator.merge_into(&mut self.store, t1)?;
            aggregator.reset_counters();
        }
        let merge_us = merge_started.elapsed().as_micros() as u64;

        self.time = t1;
        self.steps_done += 1;
        log::debug!(
            "step {} t={t1}: {} active, {} waiting, {} released, {} left",
            self.steps_done,
            counters.active,
            counters.waiting,
            counters.released,
            counters.left
        );
        if counters.routing_inconsistencies > 0 || counters.consistency_errors > 0 {
            log::warn!(
                "step {}: {} routing inconsistencies, {} consistency errors",
                self.steps_done,
                counters.routing_inconsistencies,
                counters.consistency_errors
            );
        }
        self.last_metrics = StepMetrics {
            time: t1,
            total_us: started.elapsed().as_micros() as u64,
            slowest_worker_us: slowest.as_micros() as u64,
            merge_us,
            counters,
        };
        Ok(self.last_metrics.clone())
    }

    /// Step until the end time or until `stop` is requested.
    ///
    /// The flag is checked between steps. Returns the number of steps run.
    pub fn run(&mut self, stop: &StopHandle) -> Result<u64, SimulationError> {
        let mut steps = 0;
        while !self.is_finished() {
            if stop.is_stop_requested() {
                log::info!("stop requested at t={}", self.time);
                break;
            }
            self.step()?;
            steps += 1;
        }
        Ok(steps)
    }

    fn lose(&mut self, worker: usize) -> SimulationError {
        log::error!("worker {worker} disconnected, simulation poisoned");
        self.lost = Some(worker);
        SimulationError::WorkerLost { worker }
    }

    fn collect(&mut self) -> Result<(Vec<Particle>, Vec<TraceRecorder>), SimulationError> {
        if let Some(worker) = self.lost {
            return Err(SimulationError::WorkerLost { worker });
        }
        for i in 0..self.workers.len() {
            if !self.workers[i].send(Command::Collect) {
                return Err(self.lose(i));
            }
        }
        let mut particles = Vec::with_capacity(self.particle_count);
        let mut traces = Vec::new();
        for i in 0..self.workers.len() {
            match self.workers[i].replies.recv() {
                Ok(Reply::Collected {
                    particles: p,
                    traces: t,
                }) => {
                    particles.extend(p);
                    traces.extend(t);
                }
                Ok(Reply::Stepped { .. }) | Err(_) => return Err(self.lose(i)),
            }
        }
        particles.sort_by_key(|p| p.id());
        Ok((particles, traces))
    }

    /// A copy of every particle, sorted by id.
    pub fn particles(&mut self) -> Result<Vec<Particle>, SimulationError> {
        Ok(self.collect()?.0)
    }

    /// Recorded trajectories keyed by particle id. Empty unless
    /// [`SimulationConfig::record_traces`] is set.
    pub fn traces(&mut self) -> Result<IndexMap<ParticleId, Vec<TracePoint>>, SimulationError> {
        let (_, recorders) = self.collect()?;
        let mut merged = TraceRecorder::new(self.config.start_time, self.config.trace_interval);
        for recorder in &recorders {
            merged.absorb(recorder);
        }
        let mut traces = merged.traces().clone();
        traces.sort_keys();
        Ok(traces)
    }

    /// Visit statistics merged so far.
    pub fn store(&self) -> &MeasurementStore {
        &self.store
    }

    /// Current simulation time [s].
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Steps completed.
    pub fn steps_done(&self) -> u64 {
        self.steps_done
    }

    /// True once the clock reached the end time.
    pub fn is_finished(&self) -> bool {
        self.steps_done >= self.config.step_count() || self.time >= self.config.end_time
    }

    /// The run configuration.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Registered materials.
    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// Realized injections, indexed by [`InjectionId`].
    pub fn injections(&self) -> &[Injection] {
        &self.env.injections
    }

    /// Total particles over all injections.
    pub fn particle_count(&self) -> usize {
        self.particle_count
    }

    /// Size of the worker pool.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Metrics of the most recent step.
    pub fn last_metrics(&self) -> &StepMetrics {
        &self.last_metrics
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        for worker in &mut self.workers {
            worker.commands.take();
        }
        for (i, worker) in self.workers.iter_mut().enumerate() {
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    log::error!("worker {i} panicked");
                }
            }
        }
    }
}
