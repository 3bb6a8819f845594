// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Packing session: seeding, relaxation, growth and termination.
//!
//! A session owns its population, grid and random source. Each
//! [`PackingSession::step`] runs one solver step; a collision-free step is
//! snapshotted as the last stable configuration and the next step begins by
//! adding one freshly sampled ellipsoid. The session stops once
//! `max_iterations` steps pass without reaching a collision-free state again.
//!
//! Batch callers use [`PackingSession::run`]. Interactive hosts call
//! [`PackingSession::tick`] once per frame.

use std::sync::Arc;

use nalgebra::Point3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use polybrick_geometry::Boundary;

use crate::config::{validate_step_scale, PackingConfig};
use crate::context::SimulationContext;
use crate::ellipsoid::Ellipsoid;
use crate::error::Result;
use crate::grid::SpatialGrid;
use crate::population::Population;
use crate::sampling::sample_inside;
use crate::solver::{PackingSolver, StepReport};
use crate::tensor_field::TensorField;

/// Existing points further than `min_radius / 20` outside the boundary are
/// dropped at seeding.
const EXISTING_POINT_TOLERANCE_DIVISOR: f64 = 20.0;

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Iteration budget spent after at least one collision-free state.
    Stable,
    /// Iteration budget spent without ever reaching a collision-free state.
    TooManyInitial,
    /// Lifetime step cap reached.
    IterationLimit,
}

impl Termination {
    pub fn warning(self) -> Option<&'static str> {
        match self {
            Termination::TooManyInitial => Some("Too many initial ellipsoids"),
            Termination::IterationLimit => Some("Total iteration limit reached"),
            Termination::Stable => None,
        }
    }
}

/// Result of one [`PackingSession::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Running(StepReport),
    Terminated(Termination),
}

/// Final state of a terminated session.
#[derive(Debug, Clone)]
pub struct PackingOutcome {
    pub termination: Termination,
    /// Last collision-free configuration, if one was ever reached.
    pub stable: Option<Vec<Ellipsoid>>,
    /// Configuration after the final step.
    pub last_attempt: Vec<Ellipsoid>,
    /// The first `fixed_count` ellipsoids of either list are the fixed ones.
    pub fixed_count: usize,
    pub total_iterations: u64,
    pub growths: u64,
}

impl PackingOutcome {
    /// The stable configuration, or the last attempt when there is none.
    pub fn ellipsoids(&self) -> &[Ellipsoid] {
        self.stable.as_deref().unwrap_or(&self.last_attempt)
    }

    #[inline]
    pub fn is_stable(&self) -> bool {
        self.stable.is_some()
    }

    pub fn warning(&self) -> Option<&'static str> {
        self.termination.warning()
    }
}

/// Per-frame signals from an interactive host.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LiveInput {
    /// Run a step this frame.
    pub start: bool,
    /// Discard all progress and reseed before anything else.
    pub reset: bool,
    /// Replace the step scale from this frame on.
    pub step_scale: Option<f64>,
}

/// What an interactive host shows after a [`PackingSession::tick`].
#[derive(Debug, Clone)]
pub struct LiveFrame {
    pub ellipsoids: Vec<Ellipsoid>,
    pub total_iterations: u64,
    /// The host should invoke the session again.
    pub rerun: bool,
    pub termination: Option<Termination>,
}

pub struct PackingSession {
    context: SimulationContext,
    config: PackingConfig,
    solver: PackingSolver,
    population: Population,
    grid: SpatialGrid,
    rng: StdRng,
    collisions: Option<u64>,
    since_growth: u64,
    total_iterations: u64,
    growths: u64,
    last_stable: Option<Vec<Ellipsoid>>,
    termination: Option<Termination>,
}

impl PackingSession {
    /// Validate `config`, build the context and seed the population.
    pub fn new(
        boundary: Arc<dyn Boundary>,
        tensor_field: Option<Arc<TensorField>>,
        config: PackingConfig,
    ) -> Result<Self> {
        let context = build_context(boundary, tensor_field, &config)?;
        let mut session = Self {
            grid: SpatialGrid::for_context(&context),
            solver: PackingSolver::new(config.parallel, config.step_scale),
            rng: rng_for(&config),
            context,
            config,
            population: Population::default(),
            collisions: None,
            since_growth: 0,
            total_iterations: 0,
            growths: 0,
            last_stable: None,
            termination: None,
        };
        session.seed()?;
        Ok(session)
    }

    /// Replace boundary, tensor field and configuration, then reseed.
    pub fn reconfigure(
        &mut self,
        boundary: Arc<dyn Boundary>,
        tensor_field: Option<Arc<TensorField>>,
        config: PackingConfig,
    ) -> Result<()> {
        self.context = build_context(boundary, tensor_field, &config)?;
        self.solver = PackingSolver::new(config.parallel, config.step_scale);
        self.config = config;
        self.reset()
    }

    /// Discard all progress and reseed with the current settings.
    pub fn reset(&mut self) -> Result<()> {
        self.rng = rng_for(&self.config);
        self.seed()
    }

    fn seed(&mut self) -> Result<()> {
        let limits = *self.context.radii();
        let tolerance = limits.min() / EXISTING_POINT_TOLERANCE_DIVISOR;
        let boundary = self.context.boundary();

        let mut fixed = Vec::with_capacity(self.config.existing_points.len());
        for &[x, y, z] in &self.config.existing_points {
            let p = Point3::new(x, y, z);
            if !boundary.is_point_inside(&p, tolerance, false) {
                continue;
            }
            let mut e = Ellipsoid::new(p, &limits, &mut self.rng);
            e.check_border(boundary, &mut self.rng);
            fixed.push(e);
        }
        let dropped = self.config.existing_points.len() - fixed.len();

        let mut population = Population::new(fixed);
        for _ in 0..self.config.initial_number {
            let p = sample_inside(
                &self.context,
                &mut self.rng,
                self.config.tensor_bias,
                self.config.sampling_attempts,
            )?;
            population.push(Ellipsoid::new(p, &limits, &mut self.rng));
        }

        self.grid = SpatialGrid::populated(&self.context, &population);
        self.population = population;
        self.collisions = None;
        self.since_growth = 0;
        self.total_iterations = 0;
        self.growths = 0;
        self.last_stable = None;
        self.termination = None;

        tracing::info!(
            fixed = self.population.fixed_count(),
            movable = self.config.initial_number,
            dropped_existing = dropped,
            grid = ?self.grid.dims(),
            tensor_field = self.context.tensor_field().is_some(),
            "Seeded packing session"
        );
        Ok(())
    }

    /// Run one step, growing first if the previous step was collision-free.
    ///
    /// Once terminated, further calls return the termination without
    /// stepping.
    pub fn step(&mut self) -> Result<StepStatus> {
        if let Some(termination) = self.termination {
            return Ok(StepStatus::Terminated(termination));
        }
        if self.collisions == Some(0) {
            self.grow()?;
        }

        let report = self.solver.pack(
            &self.context,
            &mut self.population,
            &mut self.grid,
            &mut self.rng,
        );
        self.since_growth += 1;
        self.total_iterations += 1;
        self.collisions = Some(report.collisions);

        if report.degenerate_orientations > 0 {
            tracing::warn!(
                count = report.degenerate_orientations,
                iteration = self.total_iterations,
                "Degenerate tensor orientation, using reference axis"
            );
        }
        tracing::debug!(
            iteration = self.total_iterations,
            since_growth = self.since_growth,
            collisions = report.collisions,
            moved = report.moved,
            border = report.border_corrections,
            "Packing step"
        );

        if report.is_collision_free() {
            self.last_stable = Some(self.population.snapshot());
        }

        match self.check_termination() {
            Some(termination) => {
                self.termination = Some(termination);
                self.log_termination(termination);
                Ok(StepStatus::Terminated(termination))
            }
            None => Ok(StepStatus::Running(report)),
        }
    }

    fn grow(&mut self) -> Result<()> {
        let p = sample_inside(
            &self.context,
            &mut self.rng,
            self.config.tensor_bias,
            self.config.sampling_attempts,
        )?;
        let id = self
            .population
            .push(Ellipsoid::new(p, self.context.radii(), &mut self.rng));
        self.grid.allocate(id, &p);
        self.since_growth = 0;
        self.growths += 1;

        tracing::debug!(
            population = self.population.len(),
            growths = self.growths,
            iteration = self.total_iterations,
            "Converged, adding ellipsoid"
        );
        Ok(())
    }

    fn check_termination(&self) -> Option<Termination> {
        if self.since_growth >= self.config.max_iterations {
            return Some(if self.growths > 0 {
                Termination::Stable
            } else {
                Termination::TooManyInitial
            });
        }
        match self.config.total_iteration_limit {
            Some(limit) if self.total_iterations >= limit => Some(Termination::IterationLimit),
            _ => None,
        }
    }

    fn log_termination(&self, termination: Termination) {
        match termination.warning() {
            Some(warning) => tracing::warn!(
                termination = ?termination,
                total_iterations = self.total_iterations,
                growths = self.growths,
                population = self.population.len(),
                "{}",
                warning
            ),
            None => tracing::info!(
                total_iterations = self.total_iterations,
                growths = self.growths,
                population = self.last_stable.as_ref().map_or(0, Vec::len),
                "Packing finished"
            ),
        }
    }

    /// Step until the session terminates.
    pub fn run(&mut self) -> Result<PackingOutcome> {
        loop {
            if let StepStatus::Terminated(termination) = self.step()? {
                return Ok(self.outcome_for(termination));
            }
        }
    }

    /// Final state, once terminated.
    pub fn outcome(&self) -> Option<PackingOutcome> {
        self.termination.map(|t| self.outcome_for(t))
    }

    fn outcome_for(&self, termination: Termination) -> PackingOutcome {
        PackingOutcome {
            termination,
            stable: self.last_stable.clone(),
            last_attempt: self.population.snapshot(),
            fixed_count: self.population.fixed_count(),
            total_iterations: self.total_iterations,
            growths: self.growths,
        }
    }

    /// One interactive frame: apply the signals, step at most once and
    /// report what to display.
    pub fn tick(&mut self, input: LiveInput) -> Result<LiveFrame> {
        if let Some(step_scale) = input.step_scale {
            validate_step_scale(step_scale)?;
            self.solver.set_step_scale(step_scale);
        }
        if input.reset {
            self.reset()?;
        }
        if input.start {
            self.step()?;
        }

        let ellipsoids = match (self.termination, &self.last_stable) {
            (Some(_), Some(stable)) => stable.clone(),
            _ => self.population.snapshot(),
        };
        Ok(LiveFrame {
            ellipsoids,
            total_iterations: self.total_iterations,
            rerun: input.start && self.termination.is_none(),
            termination: self.termination,
        })
    }

    #[inline]
    pub fn context(&self) -> &SimulationContext {
        &self.context
    }

    #[inline]
    pub fn config(&self) -> &PackingConfig {
        &self.config
    }

    #[inline]
    pub fn solver(&self) -> &PackingSolver {
        &self.solver
    }

    #[inline]
    pub fn population(&self) -> &Population {
        &self.population
    }

    #[inline]
    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    /// Collision count of the last step, `None` before the first.
    #[inline]
    pub fn collisions(&self) -> Option<u64> {
        self.collisions
    }

    #[inline]
    pub fn iterations_since_growth(&self) -> u64 {
        self.since_growth
    }

    #[inline]
    pub fn total_iterations(&self) -> u64 {
        self.total_iterations
    }

    #[inline]
    pub fn growths(&self) -> u64 {
        self.growths
    }

    pub fn last_stable(&self) -> Option<&[Ellipsoid]> {
        self.last_stable.as_deref()
    }

    #[inline]
    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }
}

impl std::fmt::Debug for PackingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackingSession")
            .field("population", &self.population.len())
            .field("collisions", &self.collisions)
            .field("since_growth", &self.since_growth)
            .field("total_iterations", &self.total_iterations)
            .field("growths", &self.growths)
            .field("termination", &self.termination)
            .finish()
    }
}

fn build_context(
    boundary: Arc<dyn Boundary>,
    tensor_field: Option<Arc<TensorField>>,
    config: &PackingConfig,
) -> Result<SimulationContext> {
    config.validate()?;
    let context = SimulationContext::new(boundary, config.radius_limits()?);
    Ok(match tensor_field {
        Some(field) => context.with_tensor_field(field),
        None => context,
    })
}

fn rng_for(config: &PackingConfig) -> StdRng {
    match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
