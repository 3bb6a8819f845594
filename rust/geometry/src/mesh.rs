// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh data structures

use nalgebra::{Matrix3, Point3, Vector3};

/// Triangle mesh
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Vertex positions (x, y, z)
    pub positions: Vec<f32>,
    /// Vertex normals (nx, ny, nz)
    pub normals: Vec<f32>,
    /// Triangle indices (i0, i1, i2)
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            positions: Vec::new(),
            normals: Vec::new(),
            indices: Vec::new(),
        }
    }

    /// Create a mesh with capacity
    pub fn with_capacity(vertex_count: usize, index_count: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertex_count * 3),
            normals: Vec::with_capacity(vertex_count * 3),
            indices: Vec::with_capacity(index_count),
        }
    }

    /// Unit sphere centred at the origin, built from latitude rings and
    /// longitude segments. Poles are single vertices.
    ///
    /// `rings` is clamped to at least 2 and `segments` to at least 3.
    pub fn uv_sphere(rings: u32, segments: u32) -> Self {
        let rings = rings.max(2);
        let segments = segments.max(3);
        let vertex_count = (2 + (rings - 1) * segments) as usize;
        let mut mesh = Self::with_capacity(vertex_count, (rings * segments * 6) as usize);

        mesh.add_vertex(Point3::new(0.0, 0.0, 1.0), Vector3::z());
        for r in 1..rings {
            let theta = std::f64::consts::PI * r as f64 / rings as f64;
            let (st, ct) = theta.sin_cos();
            for s in 0..segments {
                let phi = std::f64::consts::TAU * s as f64 / segments as f64;
                let (sp, cp) = phi.sin_cos();
                let n = Vector3::new(st * cp, st * sp, ct);
                mesh.add_vertex(Point3::from(n), n);
            }
        }
        mesh.add_vertex(Point3::new(0.0, 0.0, -1.0), -Vector3::z());

        let ring_start = |r: u32| 1 + (r - 1) * segments;
        let south = (vertex_count - 1) as u32;

        // North cap
        for s in 0..segments {
            let next = (s + 1) % segments;
            mesh.add_triangle(0, ring_start(1) + s, ring_start(1) + next);
        }
        // Bands
        for r in 1..rings - 1 {
            let a = ring_start(r);
            let b = ring_start(r + 1);
            for s in 0..segments {
                let next = (s + 1) % segments;
                mesh.add_triangle(a + s, b + s, b + next);
                mesh.add_triangle(a + s, b + next, a + next);
            }
        }
        // South cap
        let last = ring_start(rings - 1);
        for s in 0..segments {
            let next = (s + 1) % segments;
            mesh.add_triangle(last + s, south, last + next);
        }

        mesh
    }

    /// Add a vertex with normal
    #[inline]
    pub fn add_vertex(&mut self, position: Point3<f64>, normal: Vector3<f64>) {
        self.positions.push(position.x as f32);
        self.positions.push(position.y as f32);
        self.positions.push(position.z as f32);

        self.normals.push(normal.x as f32);
        self.normals.push(normal.y as f32);
        self.normals.push(normal.z as f32);
    }

    /// Add a triangle
    #[inline]
    pub fn add_triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        self.indices.push(i0);
        self.indices.push(i1);
        self.indices.push(i2);
    }

    /// Apply `p' = linear * p + offset` to every vertex.
    ///
    /// Normals are transformed by the inverse transpose of `linear` and
    /// renormalized, so non-uniform scales keep them perpendicular to the
    /// surface. A singular `linear` leaves normals untouched.
    pub fn transform(&mut self, linear: &Matrix3<f64>, offset: &Vector3<f64>) {
        for chunk in self.positions.chunks_exact_mut(3) {
            let p = Vector3::new(chunk[0] as f64, chunk[1] as f64, chunk[2] as f64);
            let q = linear * p + offset;
            chunk[0] = q.x as f32;
            chunk[1] = q.y as f32;
            chunk[2] = q.z as f32;
        }

        let normal_matrix = match linear.try_inverse() {
            Some(inv) => inv.transpose(),
            None => return,
        };
        for chunk in self.normals.chunks_exact_mut(3) {
            let n = Vector3::new(chunk[0] as f64, chunk[1] as f64, chunk[2] as f64);
            let m = normal_matrix * n;
            let len = m.norm();
            if len > 0.0 {
                let m = m / len;
                chunk[0] = m.x as f32;
                chunk[1] = m.y as f32;
                chunk[2] = m.z as f32;
            }
        }
    }

    /// Merge another mesh into this one
    #[inline]
    pub fn merge(&mut self, other: &Mesh) {
        if other.is_empty() {
            return;
        }

        let vertex_offset = (self.positions.len() / 3) as u32;

        self.positions.reserve(other.positions.len());
        self.normals.reserve(other.normals.len());
        self.indices.reserve(other.indices.len());

        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        self.indices
            .extend(other.indices.iter().map(|&i| i + vertex_offset));
    }

    /// Batch merge multiple meshes at once
    pub fn merge_all(&mut self, meshes: &[Mesh]) {
        let total_positions: usize = meshes.iter().map(|m| m.positions.len()).sum();
        let total_indices: usize = meshes.iter().map(|m| m.indices.len()).sum();

        self.positions.reserve(total_positions);
        self.normals.reserve(total_positions);
        self.indices.reserve(total_indices);

        for mesh in meshes {
            self.merge(mesh);
        }
    }

    /// Get vertex count
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Get triangle count
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check if mesh is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Calculate bounds (min, max)
    pub fn bounds(&self) -> (Point3<f32>, Point3<f32>) {
        if self.is_empty() {
            return (Point3::origin(), Point3::origin());
        }

        let mut min = Point3::new(f32::MAX, f32::MAX, f32::MAX);
        let mut max = Point3::new(f32::MIN, f32::MIN, f32::MIN);

        self.positions.chunks_exact(3).for_each(|chunk| {
            let (x, y, z) = (chunk[0], chunk[1], chunk[2]);
            min.x = min.x.min(x);
            min.y = min.y.min(y);
            min.z = min.z.min(z);
            max.x = max.x.max(x);
            max.y = max.y.max(y);
            max.z = max.z.max(z);
        });

        (min, max)
    }

    /// Clear the mesh
    #[inline]
    pub fn clear(&mut self) {
        self.positions.clear();
        self.normals.clear();
        self.indices.clear();
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}
