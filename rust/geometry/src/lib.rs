// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! PolyBrick Geometry
//!
//! Boundary volumes, bounding boxes, triangle meshes and rotation helpers
//! shared by the packing engine and its front ends. Built on nalgebra.

pub mod boundary;
pub mod bounds;
pub mod error;
pub mod mesh;
pub mod mesh_boundary;
pub mod transform;

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix3, Point3, Rotation3, Vector3};

pub use boundary::{Boundary, BoxBoundary, SphereBoundary, SQRT_EPSILON};
pub use bounds::Aabb;
pub use error::{Error, Result};
pub use mesh::Mesh;
pub use mesh_boundary::MeshBoundary;
pub use transform::{any_perpendicular, frame_from_rotations, orthonormal_frame, rotation_between};
