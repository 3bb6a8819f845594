// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wavefront OBJ support: closed boundary meshes in through `tobj`,
//! meshes and polylines out.

use std::fmt::Debug;
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use polybrick_geometry::{Mesh, MeshBoundary, Point3};

/// Indexed triangles read from an OBJ file.
#[derive(Debug, Default)]
pub struct ObjMesh {
    pub vertices: Vec<Point3<f64>>,
    pub triangles: Vec<[u32; 3]>,
}

/// Triangulate faces but keep position indices shared between faces, so
/// edge adjacency survives split normals and texture coordinates.
fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        triangulate: true,
        single_index: false,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    }
}

/// Load every object in an OBJ file into one triangle soup.
pub fn load_obj<P: AsRef<Path> + Debug>(path: P) -> Result<ObjMesh> {
    let (models, _) = tobj::load_obj(path, &load_options())?;
    collect_models(models)
}

/// Load a closed OBJ mesh as a packing boundary.
pub fn load_mesh_boundary(path: &Path) -> Result<MeshBoundary> {
    let obj = load_obj(path).with_context(|| format!("Failed to read mesh {}", path.display()))?;
    let boundary = MeshBoundary::new(&obj.vertices, &obj.triangles)
        .with_context(|| format!("Mesh {} is not closed", path.display()))?;
    tracing::debug!(
        path = %path.display(),
        vertices = obj.vertices.len(),
        triangles = obj.triangles.len(),
        "Loaded boundary mesh"
    );
    Ok(boundary)
}

fn collect_models(models: Vec<tobj::Model>) -> Result<ObjMesh> {
    let mut mesh = ObjMesh::default();

    for model in &models {
        let offset = mesh.vertices.len() as u32;
        let positions = &model.mesh.positions;
        if positions.len() % 3 != 0 {
            bail!("object '{}' has a truncated vertex list", model.name);
        }
        mesh.vertices.extend(positions.chunks_exact(3).map(|p| {
            Point3::new(f64::from(p[0]), f64::from(p[1]), f64::from(p[2]))
        }));
        mesh.triangles.extend(
            model
                .mesh
                .indices
                .chunks_exact(3)
                .map(|t| [t[0] + offset, t[1] + offset, t[2] + offset]),
        );
    }

    if mesh.triangles.is_empty() {
        bail!("OBJ contains no faces");
    }
    Ok(mesh)
}

/// Write a triangle mesh.
pub fn write_mesh<W: Write>(mesh: &Mesh, mut writer: W) -> Result<()> {
    for p in mesh.positions.chunks_exact(3) {
        writeln!(writer, "v {} {} {}", p[0], p[1], p[2])?;
    }
    for n in mesh.normals.chunks_exact(3) {
        writeln!(writer, "vn {} {} {}", n[0], n[1], n[2])?;
    }
    for t in mesh.indices.chunks_exact(3) {
        let (a, b, c) = (t[0] + 1, t[1] + 1, t[2] + 1);
        writeln!(writer, "f {a}//{a} {b}//{b} {c}//{c}")?;
    }
    writer.flush()?;
    Ok(())
}

/// Write line segments, two vertices each.
pub fn write_segments<W: Write>(segments: &[[Point3<f64>; 2]], mut writer: W) -> Result<()> {
    for [a, b] in segments {
        writeln!(writer, "v {} {} {}", a.x, a.y, a.z)?;
        writeln!(writer, "v {} {} {}", b.x, b.y, b.z)?;
    }
    for i in 0..segments.len() {
        writeln!(writer, "l {} {}", 2 * i + 1, 2 * i + 2)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, Cursor};

    fn read_obj<R: BufRead>(mut reader: R) -> Result<ObjMesh> {
        let (models, _) = tobj::load_obj_buf(&mut reader, &load_options(), |_| {
            Err(tobj::LoadError::OpenFileFailed)
        })?;
        collect_models(models)
    }

    #[test]
    fn quads_are_triangulated() {
        let obj = "# square\nv 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";
        let mesh = read_obj(Cursor::new(obj)).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.triangles.len(), 2);
        assert!(mesh.triangles.iter().flatten().all(|&i| i < 4));
    }

    #[test]
    fn objects_are_merged_with_offsets() {
        let obj = "o a\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n\
                   o b\nv 0 0 1\nv 1 0 1\nv 0 1 1\nf 4 5 6\n";
        let mesh = read_obj(Cursor::new(obj)).unwrap();
        assert_eq!(mesh.vertices.len(), 6);
        assert_eq!(mesh.triangles, vec![[0, 1, 2], [3, 4, 5]]);
        assert_eq!(mesh.vertices[3], Point3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn split_normals_keep_shared_positions() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 0 0 1\n\
                   vn 0 0 -1\nvn 0 -1 0\nvn -1 0 0\nvn 1 1 1\n\
                   f 1//1 3//1 2//1\nf 1//2 2//2 4//2\nf 1//3 4//3 3//3\nf 2//4 3//4 4//4\n";
        let mesh = read_obj(Cursor::new(obj)).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert!(MeshBoundary::new(&mesh.vertices, &mesh.triangles).is_ok());
    }

    #[test]
    fn faceless_files_are_rejected() {
        assert!(read_obj(Cursor::new("v 0 0 0\nv 1 0 0\n")).is_err());
    }

    #[test]
    fn mesh_output_is_one_based() {
        let mut mesh = Mesh::new();
        for p in [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            mesh.add_vertex(Point3::new(p[0], p[1], p[2]), polybrick_geometry::Vector3::z());
        }
        mesh.add_triangle(0, 1, 2);

        let mut out = Vec::new();
        write_mesh(&mesh, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.lines().any(|l| l == "f 1//1 2//2 3//3"));
    }

    #[test]
    fn segments_become_lines() {
        let mut out = Vec::new();
        write_segments(&[[Point3::origin(), Point3::new(1.0, 0.0, 0.0)]], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().last(), Some("l 1 2"));
    }
}
