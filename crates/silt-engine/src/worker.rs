//! Worker threads: each owns a partition of the particles for the whole
//! run and advances it one step per [`Command::Step`].
//!
//! The coordinator talks to a worker over a pair of bounded(1) crossbeam
//! channels. A worker never blocks on anything but its command channel,
//! and exits when that channel disconnects.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use silt_core::{Particle, ParticleStatus, TimeIndex};
use silt_measure::{LocalAggregator, TraceRecorder};

use crate::metrics::StepCounters;
use crate::mover::{release, Environment, Mover, StepClock};

pub(crate) enum Command {
    /// Advance every particle over `[time, time + dt)`, recording visits
    /// into `aggregator`.
    Step {
        time: f64,
        dt: f64,
        index: TimeIndex,
        aggregator: LocalAggregator,
    },
    /// Send back a copy of the partition and its traces.
    Collect,
}

pub(crate) enum Reply {
    Stepped {
        aggregator: LocalAggregator,
        counters: StepCounters,
        busy: Duration,
    },
    Collected {
        particles: Vec<Particle>,
        traces: Option<TraceRecorder>,
    },
}

pub(crate) struct Worker {
    index: usize,
    particles: Vec<Particle>,
    rng: ChaCha8Rng,
    traces: Option<TraceRecorder>,
    env: Arc<Environment>,
}

impl Worker {
    /// Worker `index` seeds its generator from the run seed on its own
    /// stream, so partitions never share random draws.
    pub fn new(index: usize, particles: Vec<Particle>, env: Arc<Environment>) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(env.config.seed);
        rng.set_stream(index as u64);
        let traces = env
            .config
            .record_traces
            .then(|| TraceRecorder::new(env.config.start_time, env.config.trace_interval));
        Self {
            index,
            particles,
            rng,
            traces,
            env,
        }
    }

    /// Thread body. Returns when the coordinator hangs up.
    pub fn run(mut self, commands: Receiver<Command>, replies: Sender<Reply>) {
        log::debug!(
            "worker {} started with {} particles",
            self.index,
            self.particles.len()
        );
        for command in commands.iter() {
            let reply = match command {
                Command::Step {
                    time,
                    dt,
                    index,
                    mut aggregator,
                } => {
                    let started = Instant::now();
                    let counters = self.step(StepClock { time, dt, index }, &mut aggregator);
                    Reply::Stepped {
                        aggregator,
                        counters,
                        busy: started.elapsed(),
                    }
                }
                Command::Collect => Reply::Collected {
                    particles: self.particles.clone(),
                    traces: self.traces.clone(),
                },
            };
            if replies.send(reply).is_err() {
                break;
            }
        }
        log::debug!("worker {} stopped", self.index);
    }

    fn step(&mut self, clock: StepClock, aggregator: &mut LocalAggregator) -> StepCounters {
        let mut counters = StepCounters::default();
        let env = &*self.env;
        let end = clock.time + clock.dt;

        for p in self.particles.iter_mut() {
            let mut released = false;
            if p.status() == ParticleStatus::Waiting {
                if p.release_time() >= end {
                    counters.waiting += 1;
                    continue;
                }
                if let Err(e) = release(env, p) {
                    log::error!("particle {} could not be placed: {e}", p.id());
                    p.leave();
                    counters.placement_failures += 1;
                    continue;
                }
                released = true;
                counters.released += 1;
            }
            if !p.is_active() {
                continue;
            }

            let before = p.capacity();
            let mut mover = Mover {
                env,
                clock,
                rng: &mut self.rng,
                counters: &mut counters,
            };
            if let Err(e) = mover.advance(p) {
                log::error!("particle {}: {e}", p.id());
                counters.consistency_errors += 1;
            }

            if let Some(capacity) = p.capacity() {
                aggregator.record_visit(capacity, p, released || before != Some(capacity));
                counters.active += 1;
            }
        }

        if let Some(traces) = &mut self.traces {
            traces.record(end, &self.particles);
        }
        counters
    }
}
