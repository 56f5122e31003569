//! The [`Routing`] trait and the fully advective [`HomogeneousRouting`] model.
//!
//! # Outflow selection
//!
//! At a node, connections are visited bottom-to-top. The walk stops at the
//! first connection whose invert lies above the node's water level: the
//! ordering guarantees every later connection is dry as well. Among the
//! wetted connections, those carrying water away from the node in the
//! search direction are candidates, each weighted by its absolute
//! discharge. For downstream searches the node's overflow to the surface
//! competes as one more candidate, placed after all pipes.

use rand::{Rng, RngCore};
use smallvec::SmallVec;

use silt_core::{CapacityId, Connection, HydraulicView, Particle, TimeIndex};

use crate::config::{OutflowSelection, RoutingConfig};
use crate::error::RoutingError;
use crate::probe::VelocityProvider;

/// Direction of the connection search at a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Search {
    /// The particle travels with the flow: pick among connections that
    /// carry water from the node into a pipe (`forward = true`).
    Downstream,
    /// The particle travels against the flow: pick among connections that
    /// carry water from a pipe into the node (`forward = false`).
    Upstream,
}

/// Where a particle leaves a node to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Route {
    /// Into the pipe behind this connection.
    Pipe(Connection),
    /// Over the node's rim onto the surface.
    Surface,
}

/// Decides particle movement at nodes and bed exchange in capacities.
///
/// Implementations are shared read-only across workers; randomness comes
/// from the calling worker's generator.
pub trait Routing: Send + Sync {
    /// Human-readable model name.
    fn name(&self) -> &str;

    /// The configuration this model was built with.
    fn config(&self) -> &RoutingConfig;

    /// Whether a moving particle settles onto the bed this step.
    fn decide_deposit(
        &self,
        particle: &Particle,
        capacity: &dyn VelocityProvider,
        rng: &mut dyn RngCore,
    ) -> bool;

    /// Whether a resting particle is picked up by the flow this step.
    fn decide_erode(
        &self,
        particle: &Particle,
        capacity: &dyn VelocityProvider,
        rng: &mut dyn RngCore,
    ) -> bool;

    /// Pick the connection a particle at `node` leaves through.
    ///
    /// `Ok(None)` means the particle cannot move this step (dry node,
    /// negligible flow, no wetted candidate) and is a normal outcome.
    fn choose_connection(
        &self,
        node: CapacityId,
        view: &dyn HydraulicView,
        t: TimeIndex,
        search: Search,
        rng: &mut dyn RngCore,
    ) -> Result<Option<Route>, RoutingError>;
}

// ── HomogeneousRouting ──────────────────────────────────────────

/// Fully advective transport: particles never deposit and resting
/// particles are always eroded.
#[derive(Clone, Debug, Default)]
pub struct HomogeneousRouting {
    config: RoutingConfig,
}

impl HomogeneousRouting {
    /// Create with a validated configuration.
    pub fn new(config: RoutingConfig) -> Result<Self, RoutingError> {
        config.validate()?;
        Ok(Self { config })
    }
}

impl Routing for HomogeneousRouting {
    fn name(&self) -> &str {
        "HomogeneousRouting"
    }

    fn config(&self) -> &RoutingConfig {
        &self.config
    }

    fn decide_deposit(
        &self,
        _particle: &Particle,
        _capacity: &dyn VelocityProvider,
        _rng: &mut dyn RngCore,
    ) -> bool {
        false
    }

    fn decide_erode(
        &self,
        _particle: &Particle,
        _capacity: &dyn VelocityProvider,
        _rng: &mut dyn RngCore,
    ) -> bool {
        true
    }

    fn choose_connection(
        &self,
        node: CapacityId,
        view: &dyn HydraulicView,
        t: TimeIndex,
        search: Search,
        rng: &mut dyn RngCore,
    ) -> Result<Option<Route>, RoutingError> {
        choose_outflow(&self.config, node, view, t, search, rng)
    }
}

/// Shared node routing used by every model in this crate.
pub(crate) fn choose_outflow(
    config: &RoutingConfig,
    node: CapacityId,
    view: &dyn HydraulicView,
    t: TimeIndex,
    search: Search,
    rng: &mut dyn RngCore,
) -> Result<Option<Route>, RoutingError> {
    if view.water_height(node, t) < config.dry_threshold {
        return Ok(None);
    }
    let level = view.water_level(node, t);

    // Wetted candidates with their discharge; connections are sorted by
    // invert, so the first dry one ends the walk.
    let mut candidates: SmallVec<[(Connection, f64); 8]> = SmallVec::new();
    for conn in view.connections(node) {
        if !conn.is_wetted(level) {
            break;
        }
        let q = view.flow(conn.pipe, t);
        let carries = match search {
            Search::Downstream => conn.is_inlet_to_pipe(q),
            Search::Upstream => conn.is_outlet_from_pipe(q),
        };
        if carries {
            candidates.push((*conn, q.abs()));
        }
    }
    if candidates.is_empty() {
        return Ok(None);
    }

    let qsum: f64 = candidates.iter().map(|(_, q)| q).sum();
    let spill_threshold = qsum;
    let spill = if search == Search::Downstream && config.spill_to_surface {
        view.spill_flow(node, t).max(0.0)
    } else {
        0.0
    };
    let qsum_total = qsum + spill;
    if qsum_total < config.negligible_flow {
        return Ok(None);
    }

    let r: f64 = rng.random();
    match config.outflow {
        OutflowSelection::FlowProportional => {
            let threshold = r * qsum_total;
            if threshold > spill_threshold {
                log::trace!("node {node}: spill to surface (threshold {threshold})");
                return Ok(Some(Route::Surface));
            }
            let mut accumulated = 0.0;
            for (conn, q) in &candidates {
                accumulated += q;
                if accumulated > threshold {
                    log::trace!("node {node}: routed into pipe {}", conn.pipe);
                    return Ok(Some(Route::Pipe(*conn)));
                }
            }
            Err(RoutingError::AccumulationShortfall {
                node,
                threshold,
                accumulated,
            })
        }
        OutflowSelection::Uniform => {
            let options = candidates.len() + usize::from(spill > 0.0);
            let pick = ((r * options as f64) as usize).min(options - 1);
            match candidates.get(pick) {
                Some((conn, _)) => Ok(Some(Route::Pipe(*conn))),
                None => Ok(Some(Route::Surface)),
            }
        }
    }
}
