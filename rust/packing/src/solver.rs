// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! One relaxation step over the whole population.
//!
//! A step runs in four passes:
//!
//! 1. **Pre-pass** - every movable ellipsoid is pulled back inside the
//!    boundary, re-bucketed and, with a tensor field, resized and reoriented.
//! 2. **Contacts** - grid cells are visited in x-slabs. Each slab records
//!    separation forces and contact counts into its own [`ContactBuffer`];
//!    the buffers are summed afterwards. Pairs where neither ellipsoid moved
//!    since the last step are skipped.
//! 3. **Integration** - each movable ellipsoid with a non-zero net force
//!    moves by that force averaged over its contacts.
//! 4. **Tally** - the contact counts are summed into the collision count.

use nalgebra::Vector3;
use rand::Rng;
use rayon::prelude::*;

use crate::context::SimulationContext;
use crate::ellipsoid::{ShapeUpdate, OVERLAP_FACTOR};
use crate::grid::SpatialGrid;
use crate::keys::EllipsoidId;
use crate::population::Population;
use crate::sampling::random_unit_vector;

/// Per-thread accumulation of separation forces and contact counts.
///
/// Indexed by [`EllipsoidId::index`]. Coincident pairs are collected instead
/// of resolved so random kicks can be drawn in a fixed order afterwards.
#[derive(Debug, Clone)]
pub struct ContactBuffer {
    forces: Vec<Vector3<f64>>,
    counts: Vec<u32>,
    coincident: Vec<(EllipsoidId, EllipsoidId)>,
}

impl ContactBuffer {
    pub fn new(len: usize) -> Self {
        Self {
            forces: vec![Vector3::zeros(); len],
            counts: vec![0; len],
            coincident: Vec::new(),
        }
    }

    /// Record an overlapping pair. `force` acts on `a`; `b` receives its
    /// negation. `None` marks coincident centres.
    #[inline]
    fn record(&mut self, a: EllipsoidId, b: EllipsoidId, force: Option<Vector3<f64>>) {
        match force {
            Some(f) => {
                self.forces[a.index()] += f;
                self.forces[b.index()] -= f;
            }
            None => self.coincident.push((a, b)),
        }
        self.counts[a.index()] += 1;
        self.counts[b.index()] += 1;
    }

    /// Sum two buffers.
    pub fn merge(mut self, other: ContactBuffer) -> Self {
        for (f, g) in self.forces.iter_mut().zip(&other.forces) {
            *f += g;
        }
        for (c, d) in self.counts.iter_mut().zip(&other.counts) {
            *c += d;
        }
        self.coincident.extend(other.coincident);
        self
    }

    /// Push every coincident pair apart along a random unit direction.
    ///
    /// Pairs are sorted first so the draws do not depend on thread timing.
    pub fn resolve_coincident<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.coincident.sort_unstable();
        for &(a, b) in &self.coincident {
            let kick = random_unit_vector(rng);
            self.forces[a.index()] += kick;
            self.forces[b.index()] -= kick;
        }
    }

    #[inline]
    pub fn force(&self, id: EllipsoidId) -> Vector3<f64> {
        self.forces[id.index()]
    }

    #[inline]
    pub fn count(&self, id: EllipsoidId) -> u32 {
        self.counts[id.index()]
    }

    #[inline]
    pub fn coincident_pairs(&self) -> &[(EllipsoidId, EllipsoidId)] {
        &self.coincident
    }

    /// Sum of all contact counts. Always even.
    pub fn collisions(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }
}

/// Summary of one [`PackingSolver::pack`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Sum of per-ellipsoid contact counts (twice the overlapping pairs).
    pub collisions: u64,
    /// Ellipsoids displaced by the integration pass.
    pub moved: usize,
    /// Ellipsoids pulled back onto the boundary in the pre-pass.
    pub border_corrections: usize,
    /// Shape refreshes that fell back to the reference axis.
    pub degenerate_orientations: usize,
    /// Overlapping pairs with identical centres.
    pub coincident_pairs: usize,
}

impl StepReport {
    #[inline]
    pub fn is_collision_free(&self) -> bool {
        self.collisions == 0
    }
}

/// Runs relaxation steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackingSolver {
    parallel: bool,
    step_scale: f64,
}

impl Default for PackingSolver {
    fn default() -> Self {
        Self {
            parallel: true,
            step_scale: 1.0,
        }
    }
}

impl PackingSolver {
    pub fn new(parallel: bool, step_scale: f64) -> Self {
        Self {
            parallel,
            step_scale,
        }
    }

    #[inline]
    pub fn parallel(&self) -> bool {
        self.parallel
    }

    #[inline]
    pub fn step_scale(&self) -> f64 {
        self.step_scale
    }

    pub fn set_step_scale(&mut self, step_scale: f64) {
        self.step_scale = step_scale;
    }

    /// Run one relaxation step, mutating ellipsoids and grid membership.
    pub fn pack<R: Rng + ?Sized>(
        &self,
        context: &SimulationContext,
        population: &mut Population,
        grid: &mut SpatialGrid,
        rng: &mut R,
    ) -> StepReport {
        let mut report = StepReport::default();
        let limits = context.radii();
        let movable = population.fixed_count()..population.len();

        // Pre-pass: border, bucket and shape follow last step's positions
        for i in movable.clone() {
            let id = EllipsoidId::new(i);
            grid.remove(id);
            let e = &mut population[id];
            if e.check_border(context.boundary(), rng) {
                report.border_corrections += 1;
            }
            grid.allocate(id, &e.position());
            if let Some(field) = context.tensor_field() {
                if e.update_size_orientation(field, limits) == ShapeUpdate::DegenerateFallback {
                    report.degenerate_orientations += 1;
                }
            }
        }

        let mut contacts = self.find_contacts(population, grid);
        report.coincident_pairs = contacts.coincident.len();
        contacts.resolve_coincident(rng);

        for i in movable {
            let id = EllipsoidId::new(i);
            let force = contacts.force(id);
            let e = &mut population[id];
            if force.norm_squared() > 0.0 {
                let count = contacts.count(id).max(1) as f64;
                e.apply_force(force * (self.step_scale / count));
                grid.remove(id);
                e.integrate();
                e.set_moved(true);
                let update = match context.tensor_field() {
                    Some(field) => e.update_size_orientation(field, limits),
                    None => e.reset_size(limits),
                };
                if update == ShapeUpdate::DegenerateFallback {
                    report.degenerate_orientations += 1;
                }
                grid.allocate(id, &e.position());
                report.moved += 1;
            } else {
                // Balanced contacts still overlap and must be tested again
                e.set_moved(contacts.count(id) > 0);
            }
        }

        for i in 0..population.fixed_count() {
            population[EllipsoidId::new(i)].set_moved(false);
        }

        report.collisions = contacts.collisions();
        report
    }

    /// Broad and narrow phase: overlapping pairs with their separation
    /// forces, before coincident pairs are resolved.
    pub fn find_contacts(&self, population: &Population, grid: &SpatialGrid) -> ContactBuffer {
        let n = population.len();
        let slabs = grid.dims()[0];

        if self.parallel {
            (0..slabs)
                .into_par_iter()
                .fold(
                    || ContactBuffer::new(n),
                    |mut buffer, x| {
                        collide_slab(population, grid, x, &mut buffer);
                        buffer
                    },
                )
                .reduce(|| ContactBuffer::new(n), ContactBuffer::merge)
        } else {
            let mut buffer = ContactBuffer::new(n);
            for x in 0..slabs {
                collide_slab(population, grid, x, &mut buffer);
            }
            buffer
        }
    }
}

/// Test every candidate pair whose first member lies in x-slab `x`.
fn collide_slab(population: &Population, grid: &SpatialGrid, x: usize, buffer: &mut ContactBuffer) {
    let [_, ny, nz] = grid.dims();
    for y in 0..ny {
        for z in 0..nz {
            let cell = match grid.cell(x as isize, y as isize, z as isize) {
                Some(cell) if !cell.is_empty() => cell,
                _ => continue,
            };
            let neighbors = grid.neighbor_members(x, y, z);

            for (k, &a) in cell.iter().enumerate() {
                for &b in &cell[k + 1..] {
                    test_pair(population, a, b, buffer);
                }
                for &b in &neighbors {
                    test_pair(population, a, b, buffer);
                }
            }
        }
    }
}

#[inline]
fn test_pair(population: &Population, a: EllipsoidId, b: EllipsoidId, buffer: &mut ContactBuffer) {
    // Two fixed ellipsoids can never separate
    if population.is_fixed(a) && population.is_fixed(b) {
        return;
    }
    let (ea, eb) = (&population[a], &population[b]);
    if !(ea.moved() || eb.moved()) {
        return;
    }

    let d = ea.distance_to(eb);
    let rim = ea.rim_distance(eb);
    if d < OVERLAP_FACTOR * rim {
        let force = if d > 0.0 {
            Some((ea.position() - eb.position()) / d * ((rim - d) * 0.5))
        } else {
            None
        };
        buffer.record(a, b, force);
    }
}
