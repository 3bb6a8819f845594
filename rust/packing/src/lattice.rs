// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Kissing lattice: which packed ellipsoids touch.

use nalgebra::Point3;
use rayon::prelude::*;

use crate::ellipsoid::Ellipsoid;

pub const DEFAULT_MIN_TOLERANCE: f64 = 0.9;
pub const DEFAULT_MAX_TOLERANCE: f64 = 1.2;

/// Two ellipsoids whose centre distance is close to their rim distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KissingPair {
    /// Index into the input slice, `a < b`.
    pub a: usize,
    pub b: usize,
    pub distance: f64,
    pub rim_distance: f64,
}

/// Every unordered pair with
/// `min_tolerance * rim <= distance <= max_tolerance * rim`.
///
/// Pairs are ordered by `a`, then `b`.
pub fn kissing_pairs(
    ellipsoids: &[Ellipsoid],
    min_tolerance: f64,
    max_tolerance: f64,
) -> Vec<KissingPair> {
    let n = ellipsoids.len();
    (0..n)
        .into_par_iter()
        .flat_map_iter(|a| {
            let ea = &ellipsoids[a];
            (a + 1..n).filter_map(move |b| {
                let eb = &ellipsoids[b];
                let distance = ea.distance_to(eb);
                let rim_distance = ea.rim_distance(eb);
                (distance >= rim_distance * min_tolerance && distance <= rim_distance * max_tolerance)
                    .then_some(KissingPair {
                        a,
                        b,
                        distance,
                        rim_distance,
                    })
            })
        })
        .collect()
}

/// Centres plus one segment per kissing pair.
#[derive(Debug, Clone, Default)]
pub struct KissingLattice {
    pub centroids: Vec<Point3<f64>>,
    pub segments: Vec<[Point3<f64>; 2]>,
}

pub fn kissing_lattice(
    ellipsoids: &[Ellipsoid],
    min_tolerance: f64,
    max_tolerance: f64,
) -> KissingLattice {
    let centroids: Vec<Point3<f64>> = ellipsoids.iter().map(Ellipsoid::position).collect();
    let segments: Vec<[Point3<f64>; 2]> = kissing_pairs(ellipsoids, min_tolerance, max_tolerance)
        .into_iter()
        .map(|pair| [centroids[pair.a], centroids[pair.b]])
        .collect();

    tracing::debug!(ellipsoids = ellipsoids.len(), segments = segments.len(), "Built kissing lattice");
    KissingLattice {
        centroids,
        segments,
    }
}
