// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Plain serializable views of packing results.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use polybrick_geometry::Mesh;

use crate::ellipsoid::Ellipsoid;
use crate::session::{PackingOutcome, Termination};

/// One ellipsoid as handed to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EllipsoidRecord {
    pub center: [f64; 3],
    /// Semi-axes along the local X, Y and Z axes.
    pub radii: [f64; 3],
    /// Direction of the local Z axis.
    pub orientation: [f64; 3],
    #[serde(default)]
    pub fixed: bool,
}

impl EllipsoidRecord {
    pub fn new(ellipsoid: &Ellipsoid, fixed: bool) -> Self {
        let c = ellipsoid.position();
        let o = ellipsoid.orientation();
        Self {
            center: [c.x, c.y, c.z],
            radii: ellipsoid.radii(),
            orientation: [o.x, o.y, o.z],
            fixed,
        }
    }

    /// Rebuild the ellipsoid at rest.
    pub fn to_ellipsoid(&self) -> Ellipsoid {
        let [x, y, z] = self.center;
        let [ox, oy, oz] = self.orientation;
        Ellipsoid::from_parts(Point3::new(x, y, z), self.radii, Vector3::new(ox, oy, oz))
    }
}

impl From<&Ellipsoid> for EllipsoidRecord {
    fn from(ellipsoid: &Ellipsoid) -> Self {
        Self::new(ellipsoid, false)
    }
}

/// Records for a list whose first `fixed_count` entries are fixed.
pub fn records(ellipsoids: &[Ellipsoid], fixed_count: usize) -> Vec<EllipsoidRecord> {
    ellipsoids
        .iter()
        .enumerate()
        .map(|(i, e)| EllipsoidRecord::new(e, i < fixed_count))
        .collect()
}

/// Serializable summary of a finished session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub termination: Termination,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub stable: bool,
    pub total_iterations: u64,
    pub growths: u64,
    pub ellipsoids: Vec<EllipsoidRecord>,
}

impl From<&PackingOutcome> for OutcomeRecord {
    fn from(outcome: &PackingOutcome) -> Self {
        Self {
            termination: outcome.termination,
            warning: outcome.warning().map(str::to_owned),
            stable: outcome.is_stable(),
            total_iterations: outcome.total_iterations,
            growths: outcome.growths,
            ellipsoids: records(outcome.ellipsoids(), outcome.fixed_count),
        }
    }
}

/// All ellipsoids as one triangle mesh.
pub fn ellipsoids_to_mesh(ellipsoids: &[Ellipsoid], rings: u32, segments: u32) -> Mesh {
    let meshes: Vec<Mesh> = ellipsoids.iter().map(|e| e.to_mesh(rings, segments)).collect();
    let mut merged = Mesh::new();
    merged.merge_all(&meshes);
    merged
}
