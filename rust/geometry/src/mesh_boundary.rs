// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Closed triangle mesh used as a packing boundary.
//!
//! The mesh must be closed and edge-manifold: every undirected edge is shared
//! by exactly two triangles. Open meshes are rejected up front because the
//! inside test relies on ray parity, which is meaningless for an open surface.

use nalgebra::{Point3, Vector3};
use rustc_hash::FxHashMap;

use crate::boundary::Boundary;
use crate::bounds::Aabb;
use crate::error::{Error, Result};
use crate::mesh::Mesh;

/// Triangle count above which closest-point queries run in parallel.
const PARALLEL_THRESHOLD: usize = 2048;

/// Skewed ray directions for parity voting. Not axis aligned so rays rarely
/// graze edges of axis-aligned geometry.
const RAY_DIRECTIONS: [[f64; 3]; 3] = [
    [0.577_215_66, 0.577_350_27, 0.577_485_05],
    [-0.267_261_24, 0.534_522_48, 0.801_783_73],
    [0.801_783_73, -0.267_261_24, -0.534_522_48],
];

/// A closed triangle mesh boundary.
#[derive(Debug, Clone)]
pub struct MeshBoundary {
    triangles: Vec<[Point3<f64>; 3]>,
    bounds: Aabb,
}

impl MeshBoundary {
    /// Build a boundary from indexed triangles.
    ///
    /// Fails on empty input, out-of-range indices, open edges and
    /// non-manifold edges.
    pub fn new(vertices: &[Point3<f64>], triangles: &[[u32; 3]]) -> Result<Self> {
        if vertices.is_empty() || triangles.is_empty() {
            return Err(Error::EmptyMesh(
                "boundary mesh has no triangles".to_string(),
            ));
        }

        for tri in triangles {
            for &i in tri {
                if i as usize >= vertices.len() {
                    return Err(Error::InvalidIndex {
                        index: i,
                        vertex_count: vertices.len(),
                    });
                }
            }
        }

        check_closed(triangles)?;

        let soup: Vec<[Point3<f64>; 3]> = triangles
            .iter()
            .map(|t| {
                [
                    vertices[t[0] as usize],
                    vertices[t[1] as usize],
                    vertices[t[2] as usize],
                ]
            })
            .collect();

        let bounds = Aabb::from_points(soup.iter().flat_map(|t| t.iter()))?;

        Ok(Self {
            triangles: soup,
            bounds,
        })
    }

    /// Build a boundary from a render mesh, welding vertices that share
    /// exactly the same position.
    pub fn from_mesh(mesh: &Mesh) -> Result<Self> {
        let mut welded: FxHashMap<[u32; 3], u32> = FxHashMap::default();
        let mut vertices = Vec::with_capacity(mesh.vertex_count());
        let mut remap = Vec::with_capacity(mesh.vertex_count());

        for chunk in mesh.positions.chunks_exact(3) {
            let key = [chunk[0].to_bits(), chunk[1].to_bits(), chunk[2].to_bits()];
            let idx = *welded.entry(key).or_insert_with(|| {
                vertices.push(Point3::new(
                    chunk[0] as f64,
                    chunk[1] as f64,
                    chunk[2] as f64,
                ));
                (vertices.len() - 1) as u32
            });
            remap.push(idx);
        }

        let mut triangles = Vec::with_capacity(mesh.triangle_count());
        for tri in mesh.indices.chunks_exact(3) {
            let mut out = [0u32; 3];
            for (slot, &i) in out.iter_mut().zip(tri) {
                *slot = *remap.get(i as usize).ok_or(Error::InvalidIndex {
                    index: i,
                    vertex_count: remap.len(),
                })?;
            }
            triangles.push(out);
        }

        Self::new(&vertices, &triangles)
    }

    /// Number of triangles in the boundary.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    fn distance_to_surface(&self, point: &Point3<f64>) -> f64 {
        (self.closest_point(point) - point).norm()
    }

    fn parity_inside(&self, point: &Point3<f64>) -> bool {
        let votes = RAY_DIRECTIONS
            .iter()
            .filter(|d| {
                let dir = Vector3::new(d[0], d[1], d[2]);
                let hits = self
                    .triangles
                    .iter()
                    .filter(|t| ray_hits_triangle(point, &dir, t))
                    .count();
                hits % 2 == 1
            })
            .count();
        votes >= 2
    }
}

impl Boundary for MeshBoundary {
    fn is_point_inside(&self, point: &Point3<f64>, tolerance: f64, strict: bool) -> bool {
        if !self.bounds.expanded(tolerance).contains(point) {
            return false;
        }
        if self.distance_to_surface(point) <= tolerance {
            return !strict;
        }
        self.parity_inside(point)
    }

    fn closest_point(&self, point: &Point3<f64>) -> Point3<f64> {
        let nearest = |t: &[Point3<f64>; 3]| {
            let c = closest_point_on_triangle(point, &t[0], &t[1], &t[2]);
            ((c - point).norm_squared(), c)
        };

        let best = if self.triangles.len() >= PARALLEL_THRESHOLD {
            use rayon::prelude::*;
            self.triangles
                .par_iter()
                .map(nearest)
                .min_by(|a, b| a.0.total_cmp(&b.0))
        } else {
            self.triangles
                .iter()
                .map(nearest)
                .min_by(|a, b| a.0.total_cmp(&b.0))
        };

        // new() guarantees at least one triangle
        best.map(|(_, c)| c).unwrap_or(*point)
    }

    fn bounding_box(&self) -> Aabb {
        self.bounds
    }
}

/// Count edge usage and reject open or non-manifold meshes.
fn check_closed(triangles: &[[u32; 3]]) -> Result<()> {
    let mut edge_use: FxHashMap<(u32, u32), u32> = FxHashMap::default();
    for t in triangles {
        for (a, b) in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
            let key = if a < b { (a, b) } else { (b, a) };
            *edge_use.entry(key).or_insert(0) += 1;
        }
    }

    let open = edge_use.values().filter(|&&n| n == 1).count();
    if open > 0 {
        return Err(Error::OpenBoundary {
            boundary_edges: open,
        });
    }

    let non_manifold = edge_use.values().filter(|&&n| n > 2).count();
    if non_manifold > 0 {
        return Err(Error::NonManifoldBoundary {
            edges: non_manifold,
        });
    }

    Ok(())
}

/// Closest point on triangle `abc` to `p` (Voronoi region walk).
pub fn closest_point_on_triangle(
    p: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
) -> Point3<f64> {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return *a;
    }

    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return *b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return *c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let sum = va + vb + vc;
    if sum.abs() < f64::EPSILON {
        return *a; // degenerate triangle
    }
    let v = vb / sum;
    let w = vc / sum;
    a + ab * v + ac * w
}

/// Moller-Trumbore ray/triangle test for rays starting at `origin`.
fn ray_hits_triangle(origin: &Point3<f64>, dir: &Vector3<f64>, t: &[Point3<f64>; 3]) -> bool {
    let e1 = t[1] - t[0];
    let e2 = t[2] - t[0];
    let h = dir.cross(&e2);
    let det = e1.dot(&h);
    if det.abs() < 1e-14 {
        return false;
    }

    let inv = 1.0 / det;
    let s = origin - t[0];
    let u = inv * s.dot(&h);
    if !(0.0..=1.0).contains(&u) {
        return false;
    }

    let q = s.cross(&e1);
    let v = inv * dir.dot(&q);
    if v < 0.0 || u + v > 1.0 {
        return false;
    }

    inv * e2.dot(&q) > 1e-12
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Closed cube [0, s]^3 with outward winding.
    fn cube(s: f64) -> (Vec<Point3<f64>>, Vec<[u32; 3]>) {
        let v = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(s, 0.0, 0.0),
            Point3::new(s, s, 0.0),
            Point3::new(0.0, s, 0.0),
            Point3::new(0.0, 0.0, s),
            Point3::new(s, 0.0, s),
            Point3::new(s, s, s),
            Point3::new(0.0, s, s),
        ];
        let t = vec![
            [0, 2, 1], [0, 3, 2], // bottom
            [4, 5, 6], [4, 6, 7], // top
            [0, 1, 5], [0, 5, 4], // front
            [2, 3, 7], [2, 7, 6], // back
            [1, 2, 6], [1, 6, 5], // right
            [3, 0, 4], [3, 4, 7], // left
        ];
        (v, t)
    }

    #[test]
    fn closed_cube_is_accepted() {
        let (v, t) = cube(2.0);
        let b = MeshBoundary::new(&v, &t).unwrap();
        assert_eq!(b.triangle_count(), 12);
        assert_eq!(b.bounding_box().max, Point3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn open_mesh_is_rejected() {
        let (v, mut t) = cube(2.0);
        t.pop();
        match MeshBoundary::new(&v, &t) {
            Err(Error::OpenBoundary { boundary_edges }) => assert_eq!(boundary_edges, 3),
            other => panic!("expected OpenBoundary, got {:?}", other),
        }
    }

    #[test]
    fn bad_index_is_rejected() {
        let (v, mut t) = cube(1.0);
        t[0] = [0, 1, 99];
        assert!(matches!(
            MeshBoundary::new(&v, &t),
            Err(Error::InvalidIndex { index: 99, .. })
        ));
    }

    #[test]
    fn inside_test_uses_parity_and_tolerance() {
        let (v, t) = cube(2.0);
        let b = MeshBoundary::new(&v, &t).unwrap();
        assert!(b.is_point_inside(&Point3::new(1.0, 1.0, 1.0), 1e-6, true));
        assert!(b.is_point_inside(&Point3::new(0.3, 1.7, 0.9), 1e-6, true));
        assert!(!b.is_point_inside(&Point3::new(3.0, 1.0, 1.0), 1e-6, false));
        // On the surface: inside only when not strict
        let on_face = Point3::new(1.0, 1.0, 2.0);
        assert!(b.is_point_inside(&on_face, 1e-6, false));
        assert!(!b.is_point_inside(&on_face, 1e-6, true));
    }

    #[test]
    fn closest_point_projects_onto_face() {
        let (v, t) = cube(2.0);
        let b = MeshBoundary::new(&v, &t).unwrap();
        let cp = b.closest_point(&Point3::new(1.0, 0.5, 5.0));
        assert_relative_eq!(cp.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(cp.y, 0.5, epsilon = 1e-12);
        assert_relative_eq!(cp.z, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn from_mesh_welds_shared_corners() {
        let (v, t) = cube(1.0);
        let mut mesh = Mesh::new();
        // Unwelded copy: three fresh vertices per triangle
        for tri in &t {
            let base = mesh.vertex_count() as u32;
            for &i in tri {
                mesh.add_vertex(v[i as usize], Vector3::z());
            }
            mesh.add_triangle(base, base + 1, base + 2);
        }
        let b = MeshBoundary::from_mesh(&mesh).unwrap();
        assert!(b.is_point_inside(&Point3::new(0.5, 0.5, 0.5), 1e-6, true));
    }

    #[test]
    fn triangle_closest_point_regions() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(1.0, 0.0, 0.0);
        let c = Point3::new(0.0, 1.0, 0.0);
        assert_eq!(closest_point_on_triangle(&Point3::new(-1.0, -1.0, 0.0), &a, &b, &c), a);
        let edge = closest_point_on_triangle(&Point3::new(0.5, -1.0, 0.0), &a, &b, &c);
        assert_relative_eq!(edge.x, 0.5, epsilon = 1e-12);
        assert_relative_eq!(edge.y, 0.0, epsilon = 1e-12);
        let face = closest_point_on_triangle(&Point3::new(0.2, 0.2, 3.0), &a, &b, &c);
        assert_relative_eq!(face.z, 0.0, epsilon = 1e-12);
    }
}
