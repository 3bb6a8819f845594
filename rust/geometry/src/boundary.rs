// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Closed boundary volumes that packings are confined to.
//!
//! A [`Boundary`] answers three questions: is a point inside, what is the
//! closest point on the boundary surface, and what is the bounding box. Any
//! closed solid can be used; the packing engine never inspects the geometry
//! directly.

use nalgebra::{Point3, Vector3};

use crate::bounds::Aabb;
use crate::error::{Error, Result};

/// Point containment tolerance used for rejection sampling.
pub const SQRT_EPSILON: f64 = 1.490_116_119_384_765_6e-8;

/// A closed region of space.
///
/// Implementations must be side-effect free; the packing engine calls them
/// from a single thread between steps but may share them across threads.
pub trait Boundary: Send + Sync + std::fmt::Debug {
    /// Test whether `point` lies inside the region.
    ///
    /// Points within `tolerance` of the surface count as inside unless
    /// `strict` is set, in which case they count as outside.
    fn is_point_inside(&self, point: &Point3<f64>, tolerance: f64, strict: bool) -> bool;

    /// Closest point on the boundary surface.
    fn closest_point(&self, point: &Point3<f64>) -> Point3<f64>;

    /// Axis-aligned bounds of the region.
    fn bounding_box(&self) -> Aabb;
}

/// Axis-aligned solid box.
#[derive(Debug, Clone, Copy)]
pub struct BoxBoundary {
    bounds: Aabb,
}

impl BoxBoundary {
    /// Create a box boundary. Fails if any extent is not strictly positive.
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Result<Self> {
        let bounds = Aabb::new(min, max);
        let e = bounds.extent();
        if !(e.x > 0.0 && e.y > 0.0 && e.z > 0.0) {
            return Err(Error::DegenerateBounds(format!(
                "box extent ({}, {}, {}) must be positive",
                e.x, e.y, e.z
            )));
        }
        Ok(Self { bounds })
    }
}

impl Boundary for BoxBoundary {
    fn is_point_inside(&self, point: &Point3<f64>, tolerance: f64, strict: bool) -> bool {
        let b = &self.bounds;
        if strict {
            point.x > b.min.x + tolerance
                && point.x < b.max.x - tolerance
                && point.y > b.min.y + tolerance
                && point.y < b.max.y - tolerance
                && point.z > b.min.z + tolerance
                && point.z < b.max.z - tolerance
        } else {
            b.expanded(tolerance).contains(point)
        }
    }

    fn closest_point(&self, point: &Point3<f64>) -> Point3<f64> {
        let b = &self.bounds;
        if !b.contains(point) {
            return b.clamp(point);
        }

        // Inside: snap to the nearest face
        let faces = [
            (point.x - b.min.x, 0, b.min.x),
            (b.max.x - point.x, 0, b.max.x),
            (point.y - b.min.y, 1, b.min.y),
            (b.max.y - point.y, 1, b.max.y),
            (point.z - b.min.z, 2, b.min.z),
            (b.max.z - point.z, 2, b.max.z),
        ];
        let mut best = faces[0];
        for f in &faces[1..] {
            if f.0 < best.0 {
                best = *f;
            }
        }

        let mut result = *point;
        result[best.1] = best.2;
        result
    }

    fn bounding_box(&self) -> Aabb {
        self.bounds
    }
}

/// Solid sphere.
#[derive(Debug, Clone, Copy)]
pub struct SphereBoundary {
    center: Point3<f64>,
    radius: f64,
}

impl SphereBoundary {
    pub fn new(center: Point3<f64>, radius: f64) -> Result<Self> {
        if !(radius > 0.0 && radius.is_finite()) {
            return Err(Error::DegenerateBounds(format!(
                "sphere radius {} must be positive",
                radius
            )));
        }
        Ok(Self { center, radius })
    }
}

impl Boundary for SphereBoundary {
    fn is_point_inside(&self, point: &Point3<f64>, tolerance: f64, strict: bool) -> bool {
        let d = (point - self.center).norm();
        if strict {
            d < self.radius - tolerance
        } else {
            d <= self.radius + tolerance
        }
    }

    fn closest_point(&self, point: &Point3<f64>) -> Point3<f64> {
        let offset = point - self.center;
        let len = offset.norm();
        let dir = if len > 0.0 {
            offset / len
        } else {
            Vector3::z()
        };
        self.center + dir * self.radius
    }

    fn bounding_box(&self) -> Aabb {
        let r = Vector3::repeat(self.radius);
        Aabb::new(self.center - r, self.center + r)
    }
}
