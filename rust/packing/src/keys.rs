// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Stable ellipsoid handles.
//!
//! Ellipsoids are never removed during a session, so a plain index into the
//! population arena stays valid for the session's lifetime. The newtype keeps
//! handles from being mixed up with cell or tensor indices.

use std::fmt;

/// Handle of an ellipsoid in a [`Population`](crate::Population).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EllipsoidId(u32);

impl EllipsoidId {
    #[inline]
    pub(crate) fn new(index: usize) -> Self {
        debug_assert!(index <= u32::MAX as usize);
        Self(index as u32)
    }

    /// Slot of this ellipsoid in the population and in per-step buffers.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EllipsoidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
