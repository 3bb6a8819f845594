// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A single packable ellipsoid.
//!
//! Each ellipsoid has a centre, three semi-axes `a`, `b`, `c` along a local
//! frame and an orientation vector. The local Z axis (semi-axis `c`) points
//! along the orientation. Motion is a damped relaxation: forces accumulate
//! into the acceleration, [`Ellipsoid::integrate`] applies them once and
//! clears all motion state.

use nalgebra::{Matrix3, Point3, Vector3};
use rand::Rng;

use polybrick_geometry::{rotation_between, Boundary, Mesh, SQRT_EPSILON};
use polybrick_geometry::transform::DIRECTION_EPSILON;

use crate::context::RadiusLimits;
use crate::sampling::random_unit_vector;
use crate::tensor_field::TensorField;

/// Pairs closer than this fraction of their rim distance overlap.
pub const OVERLAP_FACTOR: f64 = 0.95;

/// Chance that a border correction also re-randomizes the velocity.
pub const BORDER_KICK_PROBABILITY: f64 = 0.02;

/// Result of refreshing an ellipsoid's shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeUpdate {
    Unchanged,
    Changed,
    /// The field had no usable axis; the reference axis was used instead.
    DegenerateFallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ellipsoid {
    position: Point3<f64>,
    velocity: Vector3<f64>,
    acceleration: Vector3<f64>,
    radii: [f64; 3],
    orientation: Vector3<f64>,
    moved: bool,
}

impl Ellipsoid {
    /// New ellipsoid at `position` with the default `[min, min, max]` radii,
    /// oriented along Z, with a random unit velocity.
    pub fn new<R: Rng + ?Sized>(position: Point3<f64>, limits: &RadiusLimits, rng: &mut R) -> Self {
        Self {
            position,
            velocity: random_unit_vector(rng),
            acceleration: Vector3::zeros(),
            radii: [limits.min(), limits.min(), limits.max()],
            orientation: Vector3::z(),
            moved: true,
        }
    }

    /// Ellipsoid at rest with the given shape. A zero orientation falls back
    /// to Z.
    pub fn from_parts(position: Point3<f64>, radii: [f64; 3], orientation: Vector3<f64>) -> Self {
        Self {
            position,
            velocity: Vector3::zeros(),
            acceleration: Vector3::zeros(),
            radii,
            orientation: orientation
                .try_normalize(DIRECTION_EPSILON)
                .unwrap_or_else(Vector3::z),
            moved: true,
        }
    }

    /// Replace the semi-axes. Intended for building ellipsoids by hand.
    pub fn with_radii(mut self, a: f64, b: f64, c: f64) -> Self {
        self.radii = [a, b, c];
        self
    }

    /// Replace the orientation. Zero vectors leave it unchanged.
    pub fn with_orientation(mut self, orientation: Vector3<f64>) -> Self {
        if let Some(o) = orientation.try_normalize(DIRECTION_EPSILON) {
            self.orientation = o;
        }
        self
    }

    #[inline]
    pub fn position(&self) -> Point3<f64> {
        self.position
    }

    #[inline]
    pub fn velocity(&self) -> Vector3<f64> {
        self.velocity
    }

    #[inline]
    pub fn acceleration(&self) -> Vector3<f64> {
        self.acceleration
    }

    /// Semi-axes `[a, b, c]`.
    #[inline]
    pub fn radii(&self) -> [f64; 3] {
        self.radii
    }

    #[inline]
    pub fn orientation(&self) -> Vector3<f64> {
        self.orientation
    }

    /// Whether the position or shape changed since the last collision pass.
    #[inline]
    pub fn moved(&self) -> bool {
        self.moved
    }

    #[inline]
    pub fn set_moved(&mut self, moved: bool) {
        self.moved = moved;
    }

    /// Accumulate a force. No normalization is applied.
    #[inline]
    pub fn apply_force(&mut self, force: Vector3<f64>) {
        self.acceleration += force;
    }

    /// `velocity += acceleration; position += velocity`, then clear both.
    pub fn integrate(&mut self) {
        self.velocity += self.acceleration;
        self.position += self.velocity;
        self.acceleration = Vector3::zeros();
        self.velocity = Vector3::zeros();
    }

    /// Pull the centre back onto the boundary if it is not strictly inside.
    ///
    /// Returns `true` unless the centre is strictly inside. A correction
    /// marks the ellipsoid as moved even when the centre already lies on the
    /// surface, and occasionally re-randomizes its velocity.
    pub fn check_border<R: Rng + ?Sized>(&mut self, boundary: &dyn Boundary, rng: &mut R) -> bool {
        if boundary.is_point_inside(&self.position, SQRT_EPSILON, true) {
            return false;
        }

        let closest = boundary.closest_point(&self.position);
        if rng.gen_bool(BORDER_KICK_PROBABILITY) {
            self.velocity = random_unit_vector(rng);
        }
        self.position = closest;
        self.moved = true;
        true
    }

    /// Size and orient from the field at the current position.
    ///
    /// `c = max - minor * (max - min)`, `a = b = max - major * (max - min)`.
    pub fn update_size_orientation(&mut self, field: &TensorField, limits: &RadiusLimits) -> ShapeUpdate {
        let (sample, degenerate) = match field.orientation(&self.position) {
            Ok(sample) => (sample, false),
            Err(fallback) => (fallback.with_reference_axis(), true),
        };

        let ab = limits.lerp_down(sample.major_factor);
        let c = limits.lerp_down(sample.minor_factor);
        let axis = sample.axis.try_normalize(DIRECTION_EPSILON).unwrap_or_else(Vector3::z);

        let changed = self.set_shape([ab, ab, c], axis);
        if degenerate {
            ShapeUpdate::DegenerateFallback
        } else if changed {
            ShapeUpdate::Changed
        } else {
            ShapeUpdate::Unchanged
        }
    }

    /// Restore the default `[min, min, max]` radii along Z.
    pub fn reset_size(&mut self, limits: &RadiusLimits) -> ShapeUpdate {
        if self.set_shape([limits.min(), limits.min(), limits.max()], Vector3::z()) {
            ShapeUpdate::Changed
        } else {
            ShapeUpdate::Unchanged
        }
    }

    fn set_shape(&mut self, radii: [f64; 3], orientation: Vector3<f64>) -> bool {
        if self.radii == radii && self.orientation == orientation {
            return false;
        }
        self.radii = radii;
        self.orientation = orientation;
        self.moved = true;
        true
    }

    /// Distance from the centre to the surface along a unit direction given
    /// in the ellipsoid's local frame.
    #[inline]
    pub fn directional_radius(&self, local_direction: &Vector3<f64>) -> f64 {
        let [a, b, c] = self.radii;
        let d = local_direction;
        (1.0 / ((d.x / a).powi(2) + (d.y / b).powi(2) + (d.z / c).powi(2))).sqrt()
    }

    /// Approximate centre distance at which the two surfaces touch.
    ///
    /// Both directional radii are measured in one shared frame that takes the
    /// average orientation onto Z. Opposite orientations fall back to the
    /// world frame; coincident centres measure along Z.
    pub fn rim_distance(&self, other: &Ellipsoid) -> f64 {
        let average = (self.orientation + other.orientation) * 0.5;
        let rotation = rotation_between(&average, &Vector3::z());
        let direction = (rotation * (other.position - self.position))
            .try_normalize(DIRECTION_EPSILON)
            .unwrap_or_else(Vector3::z);
        self.directional_radius(&direction) + other.directional_radius(&direction)
    }

    #[inline]
    pub fn distance_to(&self, other: &Ellipsoid) -> f64 {
        (self.position - other.position).norm()
    }

    /// Centre distance below `0.95 * rim_distance`.
    pub fn overlaps(&self, other: &Ellipsoid) -> bool {
        self.distance_to(other) < OVERLAP_FACTOR * self.rim_distance(other)
    }

    /// Triangulated surface: a UV sphere scaled by the radii, turned so local
    /// Z follows the orientation, and moved to the centre.
    pub fn to_mesh(&self, rings: u32, segments: u32) -> Mesh {
        let mut mesh = Mesh::uv_sphere(rings, segments);
        let rotation = rotation_between(&Vector3::z(), &self.orientation);
        let scale = Matrix3::from_diagonal(&Vector3::new(self.radii[0], self.radii[1], self.radii[2]));
        let linear = rotation.matrix() * scale;
        mesh.transform(&linear, &self.position.coords);
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use polybrick_geometry::BoxBoundary;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn limits() -> RadiusLimits {
        RadiusLimits::new(0.5, 2.0).unwrap()
    }

    fn at(x: f64, y: f64, z: f64) -> Ellipsoid {
        let mut rng = StdRng::seed_from_u64(1);
        Ellipsoid::new(Point3::new(x, y, z), &limits(), &mut rng)
    }

    #[test]
    fn new_uses_default_shape() {
        let e = at(1.0, 2.0, 3.0);
        assert_eq!(e.radii(), [0.5, 0.5, 2.0]);
        assert_eq!(e.orientation(), Vector3::z());
        assert!(e.moved());
        assert_relative_eq!(e.velocity().norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn integrate_clears_motion_state() {
        let mut e = at(0.0, 0.0, 0.0);
        let v = e.velocity();
        e.apply_force(Vector3::new(1.0, 0.0, 0.0));
        e.apply_force(Vector3::new(0.0, 2.0, 0.0));
        e.integrate();
        assert_relative_eq!(e.position().coords, v + Vector3::new(1.0, 2.0, 0.0), epsilon = 1e-12);
        assert_eq!(e.velocity(), Vector3::zeros());
        assert_eq!(e.acceleration(), Vector3::zeros());
    }

    #[test]
    fn rim_distance_along_axes() {
        let a = at(0.0, 0.0, 0.0);
        let b = at(0.0, 0.0, 10.0);
        assert_relative_eq!(a.rim_distance(&b), 4.0, epsilon = 1e-12);

        let c = at(10.0, 0.0, 0.0);
        assert_relative_eq!(a.rim_distance(&c), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn rim_distance_is_symmetric() {
        let a = at(0.3, -1.0, 2.0)
            .with_radii(0.7, 1.1, 1.9)
            .with_orientation(Vector3::new(1.0, 2.0, 0.5));
        let b = at(2.0, 0.5, -0.4)
            .with_radii(0.5, 0.6, 1.2)
            .with_orientation(Vector3::new(-0.3, 0.2, 1.0));
        assert_eq!(a.rim_distance(&b), b.rim_distance(&a));
    }

    #[test]
    fn rim_distance_handles_opposite_orientations_and_coincident_centres() {
        let a = at(0.0, 0.0, 0.0).with_orientation(Vector3::x());
        let b = at(0.0, 0.0, 0.0).with_orientation(-Vector3::x());
        let rim = a.rim_distance(&b);
        assert!(rim.is_finite());
        assert_relative_eq!(rim, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn overlap_uses_slack() {
        let spheres = RadiusLimits::new(0.5, 0.5).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let a = Ellipsoid::new(Point3::origin(), &spheres, &mut rng);
        let b = Ellipsoid::new(Point3::new(0.96, 0.0, 0.0), &spheres, &mut rng);
        let c = Ellipsoid::new(Point3::new(0.94, 0.0, 0.0), &spheres, &mut rng);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
    }

    #[test]
    fn check_border_projects_outside_points() {
        let boundary = BoxBoundary::new(Point3::origin(), Point3::new(10.0, 10.0, 10.0)).unwrap();
        let mut rng = StdRng::seed_from_u64(5);

        let mut inside = at(5.0, 5.0, 5.0);
        inside.set_moved(false);
        assert!(!inside.check_border(&boundary, &mut rng));
        assert!(!inside.moved());

        let mut outside = at(12.0, 5.0, -1.0);
        outside.set_moved(false);
        assert!(outside.check_border(&boundary, &mut rng));
        assert_eq!(outside.position(), Point3::new(10.0, 5.0, 0.0));
        assert!(outside.moved());
        assert!(boundary.is_point_inside(&outside.position(), SQRT_EPSILON, false));

        let mut on_surface = at(10.0, 5.0, 5.0);
        on_surface.set_moved(false);
        assert!(on_surface.check_border(&boundary, &mut rng));
        assert_eq!(on_surface.position(), Point3::new(10.0, 5.0, 5.0));
        assert!(on_surface.moved());
    }

    #[test]
    fn reset_size_marks_moved_only_on_change() {
        let mut e = at(0.0, 0.0, 0.0);
        e.set_moved(false);
        assert_eq!(e.reset_size(&limits()), ShapeUpdate::Unchanged);
        assert!(!e.moved());

        let mut e = e.with_radii(1.0, 1.0, 1.0);
        assert_eq!(e.reset_size(&limits()), ShapeUpdate::Changed);
        assert!(e.moved());
        assert_eq!(e.radii(), [0.5, 0.5, 2.0]);
    }

    #[test]
    fn mesh_spans_radii_along_orientation() {
        let e = at(1.0, 1.0, 1.0).with_orientation(Vector3::x());
        let mesh = e.to_mesh(16, 16);
        let (min, max) = mesh.bounds();
        assert!((max.x - 3.0).abs() < 1e-4);
        assert!((min.x + 1.0).abs() < 1e-4);
        assert!((max.z - 1.5).abs() < 0.05);
    }
}
