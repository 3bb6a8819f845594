// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Single stress-like samples of a tensor field.

use nalgebra::{Point3, Vector3};

use polybrick_geometry::{frame_from_rotations, orthonormal_frame};

/// An oriented placement frame: origin plus X and Y directions.
///
/// The Z direction is implied (`X × Y`) once the frame is orthonormalized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub origin: Point3<f64>,
    pub x_axis: Vector3<f64>,
    pub y_axis: Vector3<f64>,
}

impl Plane {
    pub fn new(origin: Point3<f64>, x_axis: Vector3<f64>, y_axis: Vector3<f64>) -> Self {
        Self {
            origin,
            x_axis,
            y_axis,
        }
    }

    /// World XY plane moved to `origin`.
    pub fn world_xy(origin: Point3<f64>) -> Self {
        Self::new(origin, Vector3::x(), Vector3::y())
    }
}

/// Three orthogonal axes with a signed magnitude each, anchored at a point.
///
/// `magnitudes[i]` is the strength along `axes[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    location: Point3<f64>,
    axes: [Vector3<f64>; 3],
    magnitudes: [f64; 3],
}

impl Tensor {
    /// Build a tensor from an already orthonormal right-handed frame.
    pub fn new(location: Point3<f64>, axes: [Vector3<f64>; 3], magnitudes: [f64; 3]) -> Self {
        Self {
            location,
            axes,
            magnitudes,
        }
    }

    /// Build a tensor from a plane, orthonormalizing its axes.
    ///
    /// Returns `None` when the plane axes are degenerate or parallel.
    pub fn from_plane(plane: &Plane, magnitudes: [f64; 3]) -> Option<Self> {
        let axes = orthonormal_frame(&plane.x_axis, &plane.y_axis)?;
        Some(Self::new(plane.origin, axes, magnitudes))
    }

    /// Tensor whose frame is world XY turned about its own X, then Y, then Z
    /// axis by the given angles in radians.
    pub fn from_rotations(location: Point3<f64>, magnitudes: [f64; 3], rotations: [f64; 3]) -> Self {
        let axes = frame_from_rotations(rotations[0], rotations[1], rotations[2]);
        Self::new(location, axes, magnitudes)
    }

    #[inline]
    pub fn location(&self) -> Point3<f64> {
        self.location
    }

    #[inline]
    pub fn axes(&self) -> &[Vector3<f64>; 3] {
        &self.axes
    }

    #[inline]
    pub fn magnitudes(&self) -> [f64; 3] {
        self.magnitudes
    }

    /// Axes scaled by their magnitudes.
    pub fn scaled_axes(&self) -> [Vector3<f64>; 3] {
        [
            self.axes[0] * self.magnitudes[0],
            self.axes[1] * self.magnitudes[1],
            self.axes[2] * self.magnitudes[2],
        ]
    }

    /// Largest absolute magnitude.
    pub fn dominant_stress(&self) -> f64 {
        self.magnitudes
            .iter()
            .map(|m| m.abs())
            .fold(0.0, f64::max)
    }

    /// Axis indices ordered by descending absolute magnitude.
    ///
    /// Ties keep axis order. Returns `None` if any magnitude is not finite.
    pub fn principal_order(&self) -> Option<[usize; 3]> {
        if self.magnitudes.iter().any(|m| !m.is_finite()) {
            return None;
        }
        let mut order = [0usize, 1, 2];
        order.sort_by(|&a, &b| {
            self.magnitudes[b]
                .abs()
                .total_cmp(&self.magnitudes[a].abs())
        });
        Some(order)
    }

    /// Same tensor at a shifted location.
    pub fn translated(&self, offset: &Vector3<f64>) -> Self {
        Self {
            location: self.location + offset,
            ..self.clone()
        }
    }
}

/// Orientation and normalized stress factors at a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationSample {
    /// Unit direction of the dominant stress axis.
    pub axis: Vector3<f64>,
    /// Factor of the dominant magnitude in `[0, 1]`.
    pub major_factor: f64,
    /// Factor of the second magnitude in `[0, 1]`.
    pub minor_factor: f64,
}

/// The field had no usable dominant axis at the query point.
///
/// Carries the stress factors that could still be computed so callers can
/// fall back to a reference axis without losing sizing information.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DegenerateOrientation {
    pub major_factor: f64,
    pub minor_factor: f64,
}

impl DegenerateOrientation {
    /// Sample using the world Z axis in place of the missing direction.
    pub fn with_reference_axis(self) -> OrientationSample {
        OrientationSample {
            axis: Vector3::z(),
            major_factor: self.major_factor,
            minor_factor: self.minor_factor,
        }
    }
}

impl std::fmt::Display for DegenerateOrientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "no dominant tensor axis at query point")
    }
}

impl std::error::Error for DegenerateOrientation {}
