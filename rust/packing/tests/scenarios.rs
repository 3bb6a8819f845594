// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end packing behaviour across solver, grid, tensor field and session.

use std::io::Cursor;
use std::sync::Arc;

use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use polybrick_geometry::{Boundary, BoxBoundary, MeshBoundary, SQRT_EPSILON};
use polybrick_packing::{
    Ellipsoid, Error, PackingConfig, PackingParams, PackingSession, PackingSolver, Population,
    RadiusLimits, SimulationContext, SpatialGrid, StepStatus, Tensor, TensorField, Termination,
};

fn box_boundary(size: f64) -> Arc<dyn Boundary> {
    Arc::new(BoxBoundary::new(Point3::origin(), Point3::new(size, size, size)).unwrap())
}

fn sphere_context(size: f64) -> SimulationContext {
    SimulationContext::new(box_boundary(size), RadiusLimits::new(0.5, 0.5).unwrap())
}

fn population_at(context: &SimulationContext, points: &[[f64; 3]], rng: &mut StdRng) -> Population {
    let mut population = Population::default();
    for &[x, y, z] in points {
        population.push(Ellipsoid::new(Point3::new(x, y, z), context.radii(), rng));
    }
    population
}

fn serial() -> PackingSolver {
    PackingSolver::new(false, 1.0)
}

#[test]
fn separated_pair_reports_no_collisions() {
    let context = sphere_context(10.0);
    let mut rng = StdRng::seed_from_u64(1);
    let mut population = population_at(&context, &[[2.0, 5.0, 5.0], [5.0, 5.0, 5.0]], &mut rng);
    let mut grid = SpatialGrid::populated(&context, &population);

    let report = serial().pack(&context, &mut population, &mut grid, &mut rng);
    assert_eq!(report.collisions, 0);
    assert_eq!(report.moved, 0);
}

#[test]
fn overlapping_pair_is_pushed_apart() {
    let context = sphere_context(10.0);
    let mut rng = StdRng::seed_from_u64(2);
    let before = [[5.0, 5.0, 5.0], [5.1, 5.0, 5.0]];
    let mut population = population_at(&context, &before, &mut rng);
    let mut grid = SpatialGrid::populated(&context, &population);

    let report = serial().pack(&context, &mut population, &mut grid, &mut rng);
    assert_eq!(report.collisions, 2);
    assert_eq!(report.moved, 2);

    let a = population.as_slice()[0].position();
    let b = population.as_slice()[1].position();
    assert_ne!(a, Point3::from(before[0]));
    assert_ne!(b, Point3::from(before[1]));
    assert!(population.iter().all(|(_, e)| e.moved()));
    assert!(grid.is_consistent(&population));
}

#[test]
fn single_tensor_with_flat_stress_gives_full_factors() {
    let tensor = Tensor::new(
        Point3::origin(),
        [Vector3::x(), Vector3::y(), Vector3::z()],
        [10.0, 0.0, 0.0],
    );
    let field = TensorField::new(vec![tensor]).unwrap();
    assert_eq!(field.max_stress(), 10.0);
    assert_eq!(field.min_stress(), 10.0);

    for p in [Point3::new(3.0, -2.0, 7.0), Point3::origin(), Point3::new(0.1, 0.0, 0.0)] {
        let sample = field.orientation(&p).unwrap();
        assert_eq!(sample.major_factor, 1.0);
        assert_eq!(sample.minor_factor, 1.0);
        assert_relative_eq!(sample.axis.dot(&Vector3::x()).abs(), 1.0, epsilon = 1e-12);
    }
}

#[test]
fn crowded_start_warns_and_has_no_stable_result() {
    let config = PackingConfig::new(60, 0.5, 0.5, 1)
        .with_seed(5)
        .with_parallel(false);
    let mut session = PackingSession::new(box_boundary(3.0), None, config).unwrap();

    let outcome = session.run().unwrap();
    assert_eq!(outcome.termination, Termination::TooManyInitial);
    assert!(outcome.stable.is_none());
    assert!(outcome.warning().is_some());
    assert_eq!(outcome.total_iterations, 1);
    assert_eq!(outcome.ellipsoids().len(), 60);
}

#[test]
fn sparse_population_converges() {
    let context = sphere_context(6.0);
    let mut rng = StdRng::seed_from_u64(11);
    let points: Vec<[f64; 3]> = (0..40)
        .map(|_| [rng.gen_range(0.5..5.5), rng.gen_range(0.5..5.5), rng.gen_range(0.5..5.5)])
        .collect();
    let mut population = population_at(&context, &points, &mut rng);
    let mut grid = SpatialGrid::populated(&context, &population);
    let solver = serial();

    let mut converged_at = None;
    for step in 0..500 {
        let report = solver.pack(&context, &mut population, &mut grid, &mut rng);
        assert_eq!(report.collisions % 2, 0);
        if report.is_collision_free() {
            converged_at = Some(step);
            break;
        }
    }
    assert!(converged_at.is_some(), "no collision-free step within 500");

    for (_, e) in population.iter() {
        assert!(context
            .boundary()
            .is_point_inside(&e.position(), SQRT_EPSILON, false));
    }

    // A converged state stays converged and goes quiet
    let report = solver.pack(&context, &mut population, &mut grid, &mut rng);
    assert_eq!(report.collisions, 0);
    assert!(population.iter().all(|(_, e)| !e.moved()));

    let all = population.as_slice();
    for i in 0..all.len() {
        for j in i + 1..all.len() {
            assert!(!all[i].overlaps(&all[j]), "{} and {} overlap", i, j);
        }
    }
}

#[test]
fn rim_distance_is_symmetric() {
    let limits = RadiusLimits::new(0.2, 1.5).unwrap();
    let mut rng = StdRng::seed_from_u64(17);
    for _ in 0..200 {
        let random = |rng: &mut StdRng| {
            let p = Point3::new(rng.gen_range(-3.0..3.0), rng.gen_range(-3.0..3.0), rng.gen_range(-3.0..3.0));
            let o = Vector3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
            let ab = rng.gen_range(0.2..1.5);
            Ellipsoid::new(p, &limits, rng)
                .with_radii(ab, ab, rng.gen_range(0.2..1.5))
                .with_orientation(o)
        };
        let a = random(&mut rng);
        let b = random(&mut rng);
        assert_relative_eq!(a.rim_distance(&b), b.rim_distance(&a), max_relative = 1e-12);
    }
}

const FIELD_CSV: &str = "\
id,y,z,x,mx,my,mz,rxy,ryz,rzx
0,2,2,2,12,3,1,0,0,0
1,6,2,2,4,1,0.5,0,0,90

2,2,6,6,20,8,2,45,0,0
3,6,6,6,1,0.5,0.1,0,30,0
";

#[test]
fn tensor_steered_session_keeps_invariants() {
    let field = Arc::new(TensorField::from_csv_reader(Cursor::new(FIELD_CSV)).unwrap());
    assert_eq!(field.len(), 4);

    let config = PackingConfig::new(12, 0.3, 0.9, 40)
        .with_existing_points(vec![[4.0, 4.0, 4.0]])
        .with_seed(23)
        .with_total_iteration_limit(120);
    let mut session = PackingSession::new(box_boundary(8.0), Some(field), config).unwrap();
    let limits = *session.context().radii();

    loop {
        let status = session.step().unwrap();
        assert!(session.grid().is_consistent(session.population()));
        for (_, e) in session.population().iter() {
            assert!(e.radii().iter().all(|&r| limits.contains(r)), "radii {:?}", e.radii());
        }
        if let StepStatus::Terminated(_) = status {
            break;
        }
    }

    let outcome = session.outcome().unwrap();
    assert_eq!(outcome.fixed_count, 1);
    assert_eq!(outcome.ellipsoids()[0].position(), Point3::new(4.0, 4.0, 4.0));
}

#[test]
fn mesh_boundary_session_seeds_inside() {
    let vertices = [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(4.0, 0.0, 0.0),
        Point3::new(4.0, 4.0, 0.0),
        Point3::new(0.0, 4.0, 0.0),
        Point3::new(0.0, 0.0, 4.0),
        Point3::new(4.0, 0.0, 4.0),
        Point3::new(4.0, 4.0, 4.0),
        Point3::new(0.0, 4.0, 4.0),
    ];
    let triangles: [[u32; 3]; 12] = [
        [0, 2, 1],
        [0, 3, 2],
        [4, 5, 6],
        [4, 6, 7],
        [0, 1, 5],
        [0, 5, 4],
        [1, 2, 6],
        [1, 6, 5],
        [2, 3, 7],
        [2, 7, 6],
        [3, 0, 4],
        [3, 4, 7],
    ];
    let boundary: Arc<dyn Boundary> = Arc::new(MeshBoundary::new(&vertices, &triangles).unwrap());
    let config = PackingConfig::new(8, 0.4, 0.4, 30).with_seed(3).with_total_iteration_limit(10);
    let mut session = PackingSession::new(boundary.clone(), None, config).unwrap();

    for (_, e) in session.population().iter() {
        assert!(boundary.is_point_inside(&e.position(), SQRT_EPSILON, true));
    }
    let outcome = session.run().unwrap();
    assert!(outcome.total_iterations <= 10);
}

#[test]
fn open_mesh_is_rejected() {
    let vertices = [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
    ];
    assert!(MeshBoundary::new(&vertices, &[[0u32, 1, 2]]).is_err());
}

#[test]
fn missing_radius_is_a_fatal_input_error() {
    let params = PackingParams {
        initial_number: Some(5),
        max_radius: Some(1.0),
        max_iterations: Some(10),
        ..Default::default()
    };
    assert!(matches!(
        PackingConfig::try_from(params),
        Err(Error::MissingParameter("min_radius"))
    ));
}
