// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared rotation and frame utilities
//!
//! Ellipsoid orientation, tensor frames and mesh export all need the same few
//! operations: rotate one direction onto another, orthonormalize a pair of
//! axes into a right-handed frame, and build a frame from successive axis
//! rotations.

use nalgebra::{Rotation3, Unit, Vector3};

/// Length below which a direction is treated as degenerate.
pub const DIRECTION_EPSILON: f64 = 1e-12;

/// A unit vector perpendicular to `v`.
///
/// Picks the world axis least aligned with `v` so the cross product is well
/// conditioned.
pub fn any_perpendicular(v: &Vector3<f64>) -> Vector3<f64> {
    let helper = if v.z.abs() < 0.9 {
        Vector3::z()
    } else {
        Vector3::x()
    };
    let p = helper.cross(v);
    let len = p.norm();
    if len < DIRECTION_EPSILON {
        Vector3::y()
    } else {
        p / len
    }
}

/// Rotation that takes direction `from` onto direction `to`.
///
/// Zero-length inputs yield the identity. Exactly opposite directions rotate
/// half a turn about an arbitrary perpendicular axis.
pub fn rotation_between(from: &Vector3<f64>, to: &Vector3<f64>) -> Rotation3<f64> {
    if from.norm() < DIRECTION_EPSILON || to.norm() < DIRECTION_EPSILON {
        return Rotation3::identity();
    }

    Rotation3::rotation_between(from, to).unwrap_or_else(|| {
        let axis = Unit::new_normalize(any_perpendicular(from));
        Rotation3::from_axis_angle(&axis, std::f64::consts::PI)
    })
}

/// Orthonormalize `x` and `y` into a right-handed frame `[x, y, z]`.
///
/// Follows the usual placement convention: X is kept, Y is projected onto the
/// plane perpendicular to X, Z = X × Y. Returns `None` if the axes are
/// degenerate or parallel.
pub fn orthonormal_frame(x: &Vector3<f64>, y: &Vector3<f64>) -> Option<[Vector3<f64>; 3]> {
    let x_len = x.norm();
    if !(x_len > DIRECTION_EPSILON) {
        return None;
    }
    let x_axis = x / x_len;

    let y_orth = y - x_axis * y.dot(&x_axis);
    let y_len = y_orth.norm();
    if !(y_len > DIRECTION_EPSILON) {
        return None;
    }
    let y_axis = y_orth / y_len;

    let z_axis = x_axis.cross(&y_axis);
    Some([x_axis, y_axis, z_axis])
}

/// Frame obtained by rotating the world XY frame about its own X axis, then
/// its own Y axis, then its own Z axis. Angles are in radians.
pub fn frame_from_rotations(about_x: f64, about_y: f64, about_z: f64) -> [Vector3<f64>; 3] {
    let r = Rotation3::from_axis_angle(&Vector3::x_axis(), about_x)
        * Rotation3::from_axis_angle(&Vector3::y_axis(), about_y)
        * Rotation3::from_axis_angle(&Vector3::z_axis(), about_z);
    let m = r.matrix();
    [
        m.column(0).into_owned(),
        m.column(1).into_owned(),
        m.column(2).into_owned(),
    ]
}
