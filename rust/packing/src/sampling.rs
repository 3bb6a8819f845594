// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Random directions and rejection sampling inside a boundary.

use nalgebra::{Point3, Vector3};
use rand::Rng;

use polybrick_geometry::{Aabb, SQRT_EPSILON};

use crate::context::SimulationContext;
use crate::error::{Error, Result};

/// Uniformly distributed unit vector.
pub fn random_unit_vector<R: Rng + ?Sized>(rng: &mut R) -> Vector3<f64> {
    let z: f64 = rng.gen_range(-1.0..=1.0);
    let phi: f64 = rng.gen_range(0.0..std::f64::consts::TAU);
    let r = (1.0 - z * z).max(0.0).sqrt();
    Vector3::new(r * phi.cos(), r * phi.sin(), z)
}

/// Uniform point in an axis-aligned box.
pub fn random_point_in<R: Rng + ?Sized>(bounds: &Aabb, rng: &mut R) -> Point3<f64> {
    let e = bounds.extent();
    Point3::new(
        bounds.min.x + rng.gen::<f64>() * e.x,
        bounds.min.y + rng.gen::<f64>() * e.y,
        bounds.min.z + rng.gen::<f64>() * e.z,
    )
}

/// Pick a point strictly inside the boundary.
///
/// With a tensor field present, a `tensor_bias` fraction of the draws picks a
/// random field node that lies inside the boundary; all other draws are
/// rejection-sampled from the bounding box. Gives up after `attempts` boxes.
pub fn sample_inside<R: Rng + ?Sized>(
    context: &SimulationContext,
    rng: &mut R,
    tensor_bias: f64,
    attempts: usize,
) -> Result<Point3<f64>> {
    let boundary = context.boundary();

    if let Some(field) = context.tensor_field() {
        if tensor_bias > 0.0 && rng.gen_bool(tensor_bias.clamp(0.0, 1.0)) {
            let inside: Vec<Point3<f64>> = field
                .nodes()
                .filter(|p| boundary.is_point_inside(p, SQRT_EPSILON, true))
                .collect();
            if !inside.is_empty() {
                return Ok(inside[rng.gen_range(0..inside.len())]);
            }
        }
    }

    for _ in 0..attempts {
        let p = random_point_in(context.bounds(), rng);
        if boundary.is_point_inside(&p, SQRT_EPSILON, true) {
            return Ok(p);
        }
    }

    Err(Error::Sampling { attempts })
}
