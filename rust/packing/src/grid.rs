// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Uniform bucket grid over the boundary's bounding box.
//!
//! Cells are at least one maximum ellipsoid diameter wide, so any colliding
//! pair lies in the same cell or in adjacent cells. Pair enumeration visits
//! each cell's own members plus a fixed half of its 26 neighbours; together
//! that covers every unordered pair of adjacent cells exactly once.

use nalgebra::Point3;
use smallvec::SmallVec;

use polybrick_geometry::Aabb;

use crate::context::SimulationContext;
use crate::keys::EllipsoidId;
use crate::population::Population;

/// Ellipsoids stored in one cell.
pub type Bucket = SmallVec<[EllipsoidId; 8]>;

/// Forward half of the 26-neighbourhood: the nine cells below in y, then
/// four cells in the same y plane.
pub const HALF_NEIGHBORHOOD: [[isize; 3]; 13] = [
    [-1, -1, -1],
    [0, -1, -1],
    [-1, -1, 0],
    [0, -1, 0],
    [-1, -1, 1],
    [0, -1, 1],
    [1, -1, -1],
    [1, -1, 0],
    [1, -1, 1],
    [-1, 0, -1],
    [-1, 0, 0],
    [-1, 0, 1],
    [0, 0, 1],
];

#[derive(Debug, Clone)]
pub struct SpatialGrid {
    origin: Point3<f64>,
    cell_size: f64,
    dims: [usize; 3],
    cells: Vec<Bucket>,
    /// Flat index of the cell each ellipsoid is stored in.
    locations: Vec<Option<usize>>,
}

impl SpatialGrid {
    /// Grid covering `bounds` with cubic cells of edge `cell_size`.
    ///
    /// Each axis gets `ceil(extent / cell_size)` cells, at least one.
    pub fn new(bounds: &Aabb, cell_size: f64) -> Self {
        let extent = bounds.extent();
        let count = |len: f64| -> usize {
            let n = (len / cell_size).ceil();
            if n.is_finite() && n >= 1.0 {
                n as usize
            } else {
                1
            }
        };
        let dims = [count(extent.x), count(extent.y), count(extent.z)];

        Self {
            origin: bounds.min,
            cell_size,
            dims,
            cells: vec![Bucket::new(); dims[0] * dims[1] * dims[2]],
            locations: Vec::new(),
        }
    }

    /// Grid sized for the context's bounds and maximum radius.
    pub fn for_context(context: &SimulationContext) -> Self {
        Self::new(context.bounds(), context.radii().cell_size())
    }

    /// Grid holding every ellipsoid of `population` at its current position.
    pub fn populated(context: &SimulationContext, population: &Population) -> Self {
        let mut grid = Self::for_context(context);
        for (id, e) in population.iter() {
            grid.allocate(id, &e.position());
        }
        grid
    }

    #[inline]
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    #[inline]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.cells.iter().map(|c| c.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|c| c.is_empty())
    }

    /// Cell containing `position`, clamped into the grid.
    pub fn cell_of(&self, position: &Point3<f64>) -> [usize; 3] {
        let axis = |value: f64, min: f64, count: usize| -> usize {
            let i = ((value - min) / self.cell_size).floor();
            if !(i > 0.0) {
                0
            } else {
                (i as usize).min(count - 1)
            }
        };
        [
            axis(position.x, self.origin.x, self.dims[0]),
            axis(position.y, self.origin.y, self.dims[1]),
            axis(position.z, self.origin.z, self.dims[2]),
        ]
    }

    #[inline]
    fn flat(&self, [x, y, z]: [usize; 3]) -> usize {
        (x * self.dims[1] + y) * self.dims[2] + z
    }

    #[inline]
    fn unflat(&self, flat: usize) -> [usize; 3] {
        let z = flat % self.dims[2];
        let rest = flat / self.dims[2];
        [rest / self.dims[1], rest % self.dims[1], z]
    }

    /// Append `id` to the cell containing `position`.
    ///
    /// Prior membership is not removed; call [`SpatialGrid::remove`] first
    /// when relocating.
    pub fn allocate(&mut self, id: EllipsoidId, position: &Point3<f64>) {
        let flat = self.flat(self.cell_of(position));
        self.cells[flat].push(id);
        if self.locations.len() <= id.index() {
            self.locations.resize(id.index() + 1, None);
        }
        self.locations[id.index()] = Some(flat);
    }

    /// Remove `id` from the cell it was last allocated to.
    ///
    /// Returns `false` if it was not stored.
    pub fn remove(&mut self, id: EllipsoidId) -> bool {
        let flat = match self.locations.get_mut(id.index()).and_then(Option::take) {
            Some(flat) => flat,
            None => return false,
        };
        let bucket = &mut self.cells[flat];
        match bucket.iter().position(|&e| e == id) {
            Some(i) => {
                bucket.swap_remove(i);
                true
            }
            None => false,
        }
    }

    /// Remove `id` and store it again at `position`.
    pub fn relocate(&mut self, id: EllipsoidId, position: &Point3<f64>) {
        self.remove(id);
        self.allocate(id, position);
    }

    /// Bucket at integer cell coordinates, `None` outside the grid.
    pub fn cell(&self, x: isize, y: isize, z: isize) -> Option<&[EllipsoidId]> {
        if x < 0 || y < 0 || z < 0 {
            return None;
        }
        let (x, y, z) = (x as usize, y as usize, z as usize);
        if x >= self.dims[0] || y >= self.dims[1] || z >= self.dims[2] {
            return None;
        }
        Some(&self.cells[self.flat([x, y, z])])
    }

    /// Bucket of the cell containing `position`.
    pub fn cell_at(&self, position: &Point3<f64>) -> &[EllipsoidId] {
        &self.cells[self.flat(self.cell_of(position))]
    }

    /// Cell coordinates `id` is stored in.
    pub fn location(&self, id: EllipsoidId) -> Option<[usize; 3]> {
        self.locations
            .get(id.index())
            .copied()
            .flatten()
            .map(|flat| self.unflat(flat))
    }

    /// Members of the forward half-neighbourhood of cell `(x, y, z)`.
    pub fn neighbor_members(&self, x: usize, y: usize, z: usize) -> Vec<EllipsoidId> {
        let mut members = Vec::new();
        for [dx, dy, dz] in HALF_NEIGHBORHOOD {
            if let Some(bucket) = self.cell(x as isize + dx, y as isize + dy, z as isize + dz) {
                members.extend_from_slice(bucket);
            }
        }
        members
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
        self.locations.clear();
    }

    /// Every ellipsoid is stored exactly once, in the cell containing its
    /// current position.
    pub fn is_consistent(&self, population: &Population) -> bool {
        if self.len() != population.len() {
            return false;
        }
        population.iter().all(|(id, e)| {
            let expected = self.flat(self.cell_of(&e.position()));
            self.locations.get(id.index()).copied().flatten() == Some(expected)
                && self.cells[expected].iter().filter(|&&m| m == id).count() == 1
        })
    }
}
