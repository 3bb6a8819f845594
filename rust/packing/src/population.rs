// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arena of ellipsoids addressed by stable [`EllipsoidId`]s.
//!
//! Fixed ellipsoids (seeded from existing points) occupy the first slots and
//! are never moved by the solver. Movable ellipsoids follow and are only ever
//! appended.

use std::ops::{Index, IndexMut};

use crate::ellipsoid::Ellipsoid;
use crate::keys::EllipsoidId;

#[derive(Debug, Clone, Default)]
pub struct Population {
    ellipsoids: Vec<Ellipsoid>,
    fixed: usize,
}

impl Population {
    /// Start a population with the given fixed ellipsoids.
    pub fn new(fixed: Vec<Ellipsoid>) -> Self {
        let fixed_count = fixed.len();
        Self {
            ellipsoids: fixed,
            fixed: fixed_count,
        }
    }

    /// Append a movable ellipsoid.
    pub fn push(&mut self, ellipsoid: Ellipsoid) -> EllipsoidId {
        let id = EllipsoidId::new(self.ellipsoids.len());
        self.ellipsoids.push(ellipsoid);
        id
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ellipsoids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ellipsoids.is_empty()
    }

    #[inline]
    pub fn fixed_count(&self) -> usize {
        self.fixed
    }

    #[inline]
    pub fn is_fixed(&self, id: EllipsoidId) -> bool {
        id.index() < self.fixed
    }

    #[inline]
    pub fn get(&self, id: EllipsoidId) -> Option<&Ellipsoid> {
        self.ellipsoids.get(id.index())
    }

    #[inline]
    pub fn get_mut(&mut self, id: EllipsoidId) -> Option<&mut Ellipsoid> {
        self.ellipsoids.get_mut(id.index())
    }

    /// All ids in slot order.
    pub fn ids(&self) -> impl Iterator<Item = EllipsoidId> {
        (0..self.ellipsoids.len()).map(EllipsoidId::new)
    }

    pub fn fixed_ids(&self) -> impl Iterator<Item = EllipsoidId> {
        (0..self.fixed).map(EllipsoidId::new)
    }

    pub fn movable_ids(&self) -> impl Iterator<Item = EllipsoidId> {
        (self.fixed..self.ellipsoids.len()).map(EllipsoidId::new)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EllipsoidId, &Ellipsoid)> {
        self.ellipsoids
            .iter()
            .enumerate()
            .map(|(i, e)| (EllipsoidId::new(i), e))
    }

    #[inline]
    pub fn as_slice(&self) -> &[Ellipsoid] {
        &self.ellipsoids
    }

    /// Owned copy of the current configuration.
    pub fn snapshot(&self) -> Vec<Ellipsoid> {
        self.ellipsoids.clone()
    }
}

impl Index<EllipsoidId> for Population {
    type Output = Ellipsoid;

    #[inline]
    fn index(&self, id: EllipsoidId) -> &Ellipsoid {
        &self.ellipsoids[id.index()]
    }
}

impl IndexMut<EllipsoidId> for Population {
    #[inline]
    fn index_mut(&mut self, id: EllipsoidId) -> &mut Ellipsoid {
        &mut self.ellipsoids[id.index()]
    }
}
