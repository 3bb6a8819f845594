// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tensor fields: sparse stress samples with nearest-node interpolation.
//!
//! A field is immutable once built. Node locations are indexed in an R*-tree
//! so interpolation only touches the few closest samples. Stress statistics
//! (`max_stress`, `min_stress`, `stress_threshold`) are computed once from
//! each tensor's dominant absolute magnitude and used to normalize the size
//! factors handed to ellipsoids.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use nalgebra::{Point3, Vector3};
use rstar::primitives::GeomWithData;
use rstar::RTree;

use polybrick_geometry::{frame_from_rotations, orthonormal_frame, Boundary, SQRT_EPSILON};

use crate::error::{Error, Result};
use crate::tensor::{DegenerateOrientation, OrientationSample, Plane, Tensor};

/// Number of nearest tensors blended by [`TensorField::interpolate`].
pub const INTERPOLATION_NEIGHBORS: usize = 4;

/// Percentile of dominant stresses treated as full stress.
pub const STRESS_PERCENTILE: f64 = 0.95;

/// Steps traced in each direction by [`TensorField::stress_curves`].
pub const MAX_CURVE_STEPS: usize = 1000;

/// Steps both ends of a stress curve must take before they may close a loop.
const LOOP_MIN_STEPS: usize = 50;

/// Bisection rounds when clipping a stress curve onto the boundary.
const CLIP_ITERATIONS: usize = 48;

/// Number of columns in a tensor CSV row.
const CSV_COLUMNS: usize = 10;

type Node = GeomWithData<[f64; 3], usize>;

/// Immutable collection of tensors with a spatial index over their locations.
#[derive(Debug, Clone)]
pub struct TensorField {
    tensors: Vec<Tensor>,
    index: RTree<Node>,
    max_stress: f64,
    min_stress: f64,
    stress_threshold: f64,
}

impl TensorField {
    /// Build a field from tensors. Fails if `tensors` is empty.
    pub fn new(tensors: Vec<Tensor>) -> Result<Self> {
        if tensors.is_empty() {
            return Err(Error::EmptyTensorField);
        }

        let mut stresses: Vec<f64> = tensors.iter().map(Tensor::dominant_stress).collect();
        stresses.sort_by(f64::total_cmp);
        let min_stress = stresses[0];
        let max_stress = stresses[stresses.len() - 1];
        // Nearest-rank percentile
        let rank = ((STRESS_PERCENTILE * stresses.len() as f64).ceil() as usize).max(1);
        let stress_threshold = stresses[rank.min(stresses.len()) - 1];

        tracing::debug!(
            tensors = tensors.len(),
            min_stress,
            max_stress,
            stress_threshold,
            "Built tensor field"
        );

        Ok(Self {
            index: build_index(&tensors),
            tensors,
            max_stress,
            min_stress,
            stress_threshold,
        })
    }

    /// Build a field from placement planes and per-axis strengths.
    ///
    /// Each strength list holds either one value, used for every plane, or
    /// exactly one value per plane.
    pub fn from_planes(planes: &[Plane], xs: &[f64], ys: &[f64], zs: &[f64]) -> Result<Self> {
        let n = planes.len();
        let xs = broadcast("x_strength", xs, n)?;
        let ys = broadcast("y_strength", ys, n)?;
        let zs = broadcast("z_strength", zs, n)?;

        let tensors = planes
            .iter()
            .enumerate()
            .map(|(i, plane)| {
                Tensor::from_plane(plane, [xs[i], ys[i], zs[i]]).ok_or_else(|| {
                    Error::invalid("planes", format!("plane {} has degenerate axes", i))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(tensors)
    }

    /// Parse a delimited tensor file.
    ///
    /// The first line is a header and is skipped. Each following row holds
    /// `id, y, z, x, magnitude_x, magnitude_y, magnitude_z, rotation_xy,
    /// rotation_yz, rotation_zx` with angles in degrees. Blank lines are
    /// ignored.
    ///
    /// The frame is world XY turned about its own X, then Y, then Z axis.
    /// The magnitudes follow the solver's axis order, which is cyclic with
    /// the frame: `magnitude_x` acts along the frame's Y axis, `magnitude_y`
    /// along Z and `magnitude_z` along X.
    pub fn from_csv_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut tensors = Vec::new();

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line_number = i + 1;
            if line_number == 1 || line.trim().is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if fields.len() < CSV_COLUMNS {
                return Err(Error::TensorFieldParse {
                    line: line_number,
                    reason: format!("expected {} columns, found {}", CSV_COLUMNS, fields.len()),
                });
            }

            let mut values = [0.0f64; CSV_COLUMNS - 1];
            for (slot, field) in values.iter_mut().zip(&fields[1..CSV_COLUMNS]) {
                *slot = fast_float::parse::<f64, _>(field).map_err(|_| Error::TensorFieldParse {
                    line: line_number,
                    reason: format!("invalid number '{}'", field),
                })?;
            }

            let [y, z, x, mx, my, mz, rot_xy, rot_yz, rot_zx] = values;
            let [fx, fy, fz] =
                frame_from_rotations(rot_xy.to_radians(), rot_yz.to_radians(), rot_zx.to_radians());
            // Solver axes are cyclic with the frame: X on Y, Y on Z, Z on X
            tensors.push(Tensor::new(Point3::new(x, y, z), [fy, fz, fx], [mx, my, mz]));
        }

        Self::new(tensors)
    }

    /// Open and parse a delimited tensor file.
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_csv_reader(BufReader::new(file))
    }

    /// Copy of the field with every tensor moved by `offset`.
    pub fn translated(&self, offset: &Vector3<f64>) -> Self {
        let tensors: Vec<Tensor> = self.tensors.iter().map(|t| t.translated(offset)).collect();
        Self {
            index: build_index(&tensors),
            tensors,
            max_stress: self.max_stress,
            min_stress: self.min_stress,
            stress_threshold: self.stress_threshold,
        }
    }

    #[inline]
    pub fn tensors(&self) -> &[Tensor] {
        &self.tensors
    }

    /// Tensor locations in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = Point3<f64>> + '_ {
        self.tensors.iter().map(Tensor::location)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    #[inline]
    pub fn max_stress(&self) -> f64 {
        self.max_stress
    }

    #[inline]
    pub fn min_stress(&self) -> f64 {
        self.min_stress
    }

    #[inline]
    pub fn stress_threshold(&self) -> f64 {
        self.stress_threshold
    }

    /// Index of the tensor nearest to `point`.
    pub fn closest_index(&self, point: &Point3<f64>) -> Option<usize> {
        self.index
            .nearest_neighbor(&[point.x, point.y, point.z])
            .map(|node| node.data)
    }

    /// Inverse-cube-distance blend of the nearest tensors.
    ///
    /// Each contributing frame is sign-aligned with the nearest tensor's
    /// frame before blending. A query exactly on a node returns that tensor.
    pub fn interpolate(&self, point: &Point3<f64>) -> Tensor {
        let nearest: Vec<(usize, f64)> = self
            .index
            .nearest_neighbor_iter(&[point.x, point.y, point.z])
            .take(INTERPOLATION_NEIGHBORS)
            .map(|node| (node.data, (self.tensors[node.data].location() - point).norm()))
            .collect();

        let (first, first_distance) = match nearest.first() {
            Some(&n) => n,
            None => return Tensor::new(*point, [Vector3::x(), Vector3::y(), Vector3::z()], [0.0; 3]),
        };
        if first_distance == 0.0 {
            return self.tensors[first].clone();
        }

        let reference = *self.tensors[first].axes();
        let mut axes = [Vector3::zeros(); 3];
        let mut magnitudes = [0.0f64; 3];
        let mut total_weight = 0.0;

        for &(i, distance) in &nearest {
            let weight = 1.0 / (distance * distance * distance);
            total_weight += weight;
            let tensor = &self.tensors[i];
            for k in 0..3 {
                let axis = tensor.axes()[k];
                let aligned = if axis.dot(&reference[k]) < 0.0 { -axis } else { axis };
                axes[k] += aligned * weight;
                magnitudes[k] += tensor.magnitudes()[k] * weight;
            }
        }
        for m in &mut magnitudes {
            *m /= total_weight;
        }

        let frame = orthonormal_frame(&axes[0], &axes[1]).unwrap_or(reference);
        Tensor::new(*point, frame, magnitudes)
    }

    /// Dominant stress direction and normalized size factors at `point`.
    ///
    /// The major factor comes from the largest absolute magnitude, the minor
    /// factor from the second largest. Both are 1 when the stress threshold
    /// equals the minimum stress. Fails when the interpolated tensor has no
    /// finite, non-zero dominant axis.
    pub fn orientation(
        &self,
        point: &Point3<f64>,
    ) -> std::result::Result<OrientationSample, DegenerateOrientation> {
        let tensor = self.interpolate(point);
        let magnitudes = tensor.magnitudes();

        let order = match tensor.principal_order() {
            Some(order) => order,
            None => {
                return Err(DegenerateOrientation {
                    major_factor: self.stress_factor(f64::NAN),
                    minor_factor: self.stress_factor(f64::NAN),
                })
            }
        };

        let major = magnitudes[order[0]].abs();
        let minor = magnitudes[order[1]].abs();
        let major_factor = self.stress_factor(major);
        let minor_factor = self.stress_factor(minor);

        let axis = tensor.axes()[order[0]];
        if major == 0.0 || !(axis.iter().all(|c| c.is_finite())) {
            return Err(DegenerateOrientation {
                major_factor,
                minor_factor,
            });
        }

        Ok(OrientationSample {
            axis,
            major_factor,
            minor_factor,
        })
    }

    /// Principal stress lines through `seed`: major, middle and minor.
    ///
    /// Each line follows the interpolated principal axis of its rank in
    /// steps of `step`, both ways from `seed`. A direction ends when it
    /// leaves `boundary` (the last segment is clipped onto the surface), when
    /// the axis degenerates, or after [`MAX_CURVE_STEPS`]. Two ends that meet
    /// again close the line into a loop. All lines are empty when `seed` is
    /// not strictly inside `boundary`.
    pub fn stress_curves(
        &self,
        seed: &Point3<f64>,
        boundary: &dyn Boundary,
        step: f64,
    ) -> Result<[Vec<Point3<f64>>; 3]> {
        if !(step.is_finite() && step > 0.0) {
            return Err(Error::invalid("step", format!("must be positive, got {}", step)));
        }

        let mut curves: [Vec<Point3<f64>>; 3] = Default::default();
        if !boundary.is_point_inside(seed, SQRT_EPSILON, true) {
            return Ok(curves);
        }
        for (rank, curve) in curves.iter_mut().enumerate() {
            *curve = self.trace_curve(seed, boundary, step, rank);
        }

        tracing::debug!(
            major = curves[0].len(),
            middle = curves[1].len(),
            minor = curves[2].len(),
            "Traced stress curves"
        );
        Ok(curves)
    }

    fn trace_curve(
        &self,
        seed: &Point3<f64>,
        boundary: &dyn Boundary,
        step: f64,
        rank: usize,
    ) -> Vec<Point3<f64>> {
        let axis = match self.principal_axis(seed, rank) {
            Some(axis) => axis,
            None => return Vec::new(),
        };

        let mut fronts = [CurveFront::new(*seed, axis), CurveFront::new(*seed, -axis)];
        let mut lines = [vec![*seed], vec![*seed]];
        let mut closed = false;

        for k in 0..MAX_CURVE_STEPS {
            if fronts.iter().all(|f| f.stopped) {
                break;
            }
            for (front, line) in fronts.iter_mut().zip(lines.iter_mut()) {
                if let Some(p) = front.advance(self, boundary, step, rank) {
                    line.push(p);
                }
            }
            if k >= LOOP_MIN_STEPS
                && fronts.iter().all(|f| !f.stopped)
                && (fronts[0].position - fronts[1].position).norm() < step
            {
                closed = true;
                break;
            }
        }

        let [forward, mut curve] = lines;
        curve.reverse();
        curve.pop();
        curve.extend(forward);
        if closed {
            curve.push(curve[0]);
        }
        curve
    }

    /// Unit principal axis of the given rank, or `None` where it vanishes.
    fn principal_axis(&self, point: &Point3<f64>, rank: usize) -> Option<Vector3<f64>> {
        let tensor = self.interpolate(point);
        let order = tensor.principal_order()?;
        if tensor.magnitudes()[order[rank]] == 0.0 {
            return None;
        }
        tensor.axes()[order[rank]].try_normalize(f64::EPSILON)
    }

    /// Normalize a stress to `[0, 1]` against `min_stress` and the threshold.
    fn stress_factor(&self, stress: f64) -> f64 {
        let range = self.stress_threshold - self.min_stress;
        if !(range > 0.0) {
            return 1.0;
        }
        if !stress.is_finite() {
            return 0.0;
        }
        ((stress - self.min_stress) / range).clamp(0.0, 1.0)
    }
}

/// One end of a stress curve being traced.
struct CurveFront {
    position: Point3<f64>,
    direction: Vector3<f64>,
    stopped: bool,
}

impl CurveFront {
    fn new(position: Point3<f64>, direction: Vector3<f64>) -> Self {
        Self {
            position,
            direction,
            stopped: false,
        }
    }

    /// Take one step. Returns the new position, if the front moved.
    fn advance(
        &mut self,
        field: &TensorField,
        boundary: &dyn Boundary,
        step: f64,
        rank: usize,
    ) -> Option<Point3<f64>> {
        if self.stopped {
            return None;
        }

        let next = self.position + self.direction * step;
        if !boundary.is_point_inside(&next, SQRT_EPSILON, true) {
            self.stopped = true;
            let clipped = clip_to_boundary(boundary, &self.position, &next);
            if clipped == self.position {
                return None;
            }
            self.position = clipped;
            return Some(clipped);
        }

        // Principal axes carry no sign; keep heading the same way
        match field.principal_axis(&next, rank) {
            Some(axis) if axis.dot(&self.direction) < 0.0 => self.direction = -axis,
            Some(axis) => self.direction = axis,
            None => self.stopped = true,
        }
        self.position = next;
        Some(next)
    }
}

/// Last point of the segment `inside..outside` that lies inside `boundary`.
fn clip_to_boundary(
    boundary: &dyn Boundary,
    inside: &Point3<f64>,
    outside: &Point3<f64>,
) -> Point3<f64> {
    let (mut lo, mut hi) = (*inside, *outside);
    for _ in 0..CLIP_ITERATIONS {
        let mid = nalgebra::center(&lo, &hi);
        if boundary.is_point_inside(&mid, SQRT_EPSILON, true) {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    lo
}

fn build_index(tensors: &[Tensor]) -> RTree<Node> {
    let nodes = tensors
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let p = t.location();
            GeomWithData::new([p.x, p.y, p.z], i)
        })
        .collect();
    RTree::bulk_load(nodes)
}

fn broadcast(name: &'static str, values: &[f64], count: usize) -> Result<Vec<f64>> {
    match values.len() {
        1 => Ok(vec![values[0]; count]),
        n if n == count => Ok(values.to_vec()),
        found => Err(Error::TensorListMismatch {
            name,
            expected: count,
            found,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn axis_aligned(location: Point3<f64>, magnitudes: [f64; 3]) -> Tensor {
        Tensor::from_rotations(location, magnitudes, [0.0; 3])
    }

    #[test]
    fn empty_field_is_rejected() {
        assert!(matches!(TensorField::new(Vec::new()), Err(Error::EmptyTensorField)));
    }

    #[test]
    fn single_tensor_gives_full_factors() {
        let field = TensorField::new(vec![axis_aligned(Point3::origin(), [10.0, 0.0, 0.0])]).unwrap();
        assert_eq!(field.max_stress(), 10.0);
        assert_eq!(field.min_stress(), 10.0);

        for p in [Point3::new(3.0, -2.0, 1.0), Point3::origin()] {
            let sample = field.orientation(&p).unwrap();
            assert_eq!(sample.major_factor, 1.0);
            assert_eq!(sample.minor_factor, 1.0);
            assert_relative_eq!(sample.axis, Vector3::x(), epsilon = 1e-12);
        }
    }

    #[test]
    fn stress_statistics_are_ordered() {
        let tensors = (0..20)
            .map(|i| axis_aligned(Point3::new(i as f64, 0.0, 0.0), [i as f64 + 1.0, 0.5, 0.1]))
            .collect();
        let field = TensorField::new(tensors).unwrap();
        assert_eq!(field.min_stress(), 1.0);
        assert_eq!(field.max_stress(), 20.0);
        assert_eq!(field.stress_threshold(), 19.0);
        assert!(field.min_stress() <= field.stress_threshold());
        assert!(field.stress_threshold() <= field.max_stress());
    }

    #[test]
    fn interpolation_is_exact_on_nodes() {
        let a = axis_aligned(Point3::new(0.0, 0.0, 0.0), [1.0, 2.0, 3.0]);
        let b = axis_aligned(Point3::new(4.0, 0.0, 0.0), [5.0, 6.0, 7.0]);
        let field = TensorField::new(vec![a.clone(), b]).unwrap();
        assert_eq!(field.interpolate(&Point3::origin()), a);
    }

    #[test]
    fn interpolation_blends_between_nodes() {
        let field = TensorField::new(vec![
            axis_aligned(Point3::new(0.0, 0.0, 0.0), [2.0, 0.0, 0.0]),
            axis_aligned(Point3::new(2.0, 0.0, 0.0), [4.0, 0.0, 0.0]),
        ])
        .unwrap();
        let mid = field.interpolate(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(mid.magnitudes()[0], 3.0, epsilon = 1e-12);
        assert_relative_eq!(mid.axes()[0], Vector3::x(), epsilon = 1e-12);
    }

    #[test]
    fn interpolation_aligns_flipped_axes() {
        let flipped = Tensor::new(
            Point3::new(2.0, 0.0, 0.0),
            [-Vector3::x(), -Vector3::y(), Vector3::z()],
            [1.0, 1.0, 1.0],
        );
        let field = TensorField::new(vec![
            axis_aligned(Point3::new(0.0, 0.0, 0.0), [1.0, 1.0, 1.0]),
            flipped,
        ])
        .unwrap();
        let t = field.interpolate(&Point3::new(0.9, 0.0, 0.0));
        assert_relative_eq!(t.axes()[0], Vector3::x(), epsilon = 1e-12);
        assert_relative_eq!(t.axes()[1], Vector3::y(), epsilon = 1e-12);
    }

    #[test]
    fn zero_magnitudes_are_degenerate() {
        let field = TensorField::new(vec![
            axis_aligned(Point3::origin(), [0.0, 0.0, 0.0]),
            axis_aligned(Point3::new(1.0, 0.0, 0.0), [2.0, 1.0, 0.0]),
        ])
        .unwrap();
        let err = field.orientation(&Point3::origin()).unwrap_err();
        assert_eq!(err.with_reference_axis().axis, Vector3::z());
    }

    #[test]
    fn from_planes_broadcasts_single_values() {
        let planes = vec![
            Plane::world_xy(Point3::origin()),
            Plane::world_xy(Point3::new(1.0, 0.0, 0.0)),
        ];
        let field = TensorField::from_planes(&planes, &[3.0], &[1.0, 2.0], &[0.5]).unwrap();
        assert_eq!(field.len(), 2);
        assert_eq!(field.tensors()[1].magnitudes(), [3.0, 2.0, 0.5]);

        let err = TensorField::from_planes(&planes, &[1.0, 2.0, 3.0], &[1.0], &[1.0]).unwrap_err();
        assert!(matches!(
            err,
            Error::TensorListMismatch { name: "x_strength", expected: 2, found: 3 }
        ));
    }

    #[test]
    fn csv_columns_map_to_location_and_frame() {
        let csv = "id,y,z,x,mx,my,mz,rxy,ryz,rzx\n\
                   1,2.0,3.0,1.0,5,1,0.5,90,0,0\n\
                   \n\
                   2,0,0,0,1,1,1,0,0,0\n";
        let field = TensorField::from_csv_reader(csv.as_bytes()).unwrap();
        assert_eq!(field.len(), 2);

        // Turning 90 degrees about X carries the frame's Y axis onto world Z
        let t = &field.tensors()[0];
        assert_eq!(t.location(), Point3::new(1.0, 2.0, 3.0));
        assert_eq!(t.magnitudes(), [5.0, 1.0, 0.5]);
        assert_relative_eq!(t.axes()[0], Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(t.axes()[1], -Vector3::y(), epsilon = 1e-12);
        assert_relative_eq!(t.axes()[2], Vector3::x(), epsilon = 1e-12);
    }

    #[test]
    fn csv_axes_follow_the_solver_order() {
        let csv = "id,y,z,x,mx,my,mz,rxy,ryz,rzx\n0,0,0,0,10,1,1,0,0,0\n";
        let field = TensorField::from_csv_reader(csv.as_bytes()).unwrap();
        let sample = field.orientation(&Point3::new(0.5, 0.0, 0.0)).unwrap();
        assert_relative_eq!(sample.axis, Vector3::y(), epsilon = 1e-12);

        let csv = "id,y,z,x,mx,my,mz,rxy,ryz,rzx\n0,0,0,0,1,10,1,0,0,0\n";
        let field = TensorField::from_csv_reader(csv.as_bytes()).unwrap();
        let sample = field.orientation(&Point3::origin()).unwrap();
        assert_relative_eq!(sample.axis, Vector3::z(), epsilon = 1e-12);

        let csv = "id,y,z,x,mx,my,mz,rxy,ryz,rzx\n0,0,0,0,1,1,10,0,0,0\n";
        let field = TensorField::from_csv_reader(csv.as_bytes()).unwrap();
        let sample = field.orientation(&Point3::origin()).unwrap();
        assert_relative_eq!(sample.axis, Vector3::x(), epsilon = 1e-12);
    }

    #[test]
    fn csv_reports_bad_rows() {
        let csv = "header\n1,2,3\n";
        assert!(matches!(
            TensorField::from_csv_reader(csv.as_bytes()),
            Err(Error::TensorFieldParse { line: 2, .. })
        ));

        let csv = "header\n1,a,0,0,1,1,1,0,0,0\n";
        assert!(matches!(
            TensorField::from_csv_reader(csv.as_bytes()),
            Err(Error::TensorFieldParse { line: 2, .. })
        ));
    }

    #[test]
    fn uniform_field_gives_straight_stress_curves() {
        use polybrick_geometry::BoxBoundary;

        let field = TensorField::new(vec![axis_aligned(Point3::new(5.0, 5.0, 5.0), [3.0, 2.0, 1.0])])
            .unwrap();
        let boundary = BoxBoundary::new(Point3::origin(), Point3::new(10.0, 10.0, 10.0)).unwrap();
        let seed = Point3::new(2.0, 4.0, 6.0);
        let [major, middle, minor] = field.stress_curves(&seed, &boundary, 1.0).unwrap();

        // Major runs along x from wall to wall through the seed
        assert!(major.contains(&seed));
        for p in &major {
            assert_relative_eq!(p.y, 4.0, epsilon = 1e-12);
            assert_relative_eq!(p.z, 6.0, epsilon = 1e-12);
        }
        assert!(major.windows(2).all(|w| w[1].x > w[0].x));
        assert_relative_eq!(major[0].x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(major[major.len() - 1].x, 10.0, epsilon = 1e-6);

        for p in &middle {
            assert_relative_eq!(p.x, 2.0, epsilon = 1e-12);
            assert_relative_eq!(p.z, 6.0, epsilon = 1e-12);
        }
        assert_relative_eq!(middle[0].y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(middle[middle.len() - 1].y, 10.0, epsilon = 1e-6);

        for p in &minor {
            assert_relative_eq!(p.x, 2.0, epsilon = 1e-12);
            assert_relative_eq!(p.y, 4.0, epsilon = 1e-12);
        }
        assert_relative_eq!(minor[0].z, 0.0, epsilon = 1e-6);
        assert_relative_eq!(minor[minor.len() - 1].z, 10.0, epsilon = 1e-6);
    }

    #[test]
    fn stress_curves_end_on_a_curved_boundary() {
        use polybrick_geometry::SphereBoundary;

        let field = TensorField::new(vec![axis_aligned(Point3::origin(), [1.0, 5.0, 2.0])]).unwrap();
        let boundary = SphereBoundary::new(Point3::origin(), 3.0).unwrap();
        let [major, _, _] = field.stress_curves(&Point3::new(0.5, 0.0, 0.5), &boundary, 0.7).unwrap();

        for end in [major[0], major[major.len() - 1]] {
            assert_relative_eq!(end.coords.norm(), 3.0, epsilon = 1e-6);
            assert_relative_eq!(end.x, 0.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn stress_curves_need_an_inside_seed_and_a_positive_step() {
        use polybrick_geometry::BoxBoundary;

        let field = TensorField::new(vec![axis_aligned(Point3::origin(), [1.0, 1.0, 1.0])]).unwrap();
        let boundary = BoxBoundary::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0)).unwrap();

        let curves = field.stress_curves(&Point3::new(2.0, 0.5, 0.5), &boundary, 0.1).unwrap();
        assert!(curves.iter().all(Vec::is_empty));
        assert!(matches!(
            field.stress_curves(&Point3::new(0.5, 0.5, 0.5), &boundary, 0.0),
            Err(Error::InvalidParameter { name: "step", .. })
        ));
    }

    #[test]
    fn translation_moves_nodes_and_keeps_stats() {
        let field = TensorField::new(vec![axis_aligned(Point3::origin(), [1.0, 0.0, 0.0])]).unwrap();
        let moved = field.translated(&Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(moved.nodes().next(), Some(Point3::new(1.0, 2.0, 3.0)));
        assert_eq!(moved.closest_index(&Point3::new(1.0, 2.0, 3.5)), Some(0));
        assert_eq!(moved.max_stress(), field.max_stress());
    }
}
