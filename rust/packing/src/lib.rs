// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! PolyBrick Packing
//!
//! Iterative packing of non-overlapping ellipsoids inside a closed boundary,
//! optionally sized and oriented by a tensor field.
//!
//! ```no_run
//! use std::sync::Arc;
//! use polybrick_geometry::{BoxBoundary, Point3};
//! use polybrick_packing::{PackingConfig, PackingSession};
//!
//! # fn main() -> polybrick_packing::Result<()> {
//! let boundary = Arc::new(BoxBoundary::new(Point3::origin(), Point3::new(10.0, 10.0, 10.0))?);
//! let config = PackingConfig::new(20, 0.4, 0.8, 200).with_seed(7);
//! let mut session = PackingSession::new(boundary, None, config)?;
//! let outcome = session.run()?;
//! println!("{} ellipsoids", outcome.ellipsoids().len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod ellipsoid;
pub mod error;
pub mod grid;
pub mod keys;
pub mod lattice;
pub mod population;
pub mod record;
pub mod sampling;
pub mod session;
pub mod solver;
pub mod tensor;
pub mod tensor_field;

pub use config::{PackingConfig, PackingParams};
pub use context::{RadiusLimits, SimulationContext};
pub use ellipsoid::{Ellipsoid, ShapeUpdate, OVERLAP_FACTOR};
pub use error::{Error, Result};
pub use grid::SpatialGrid;
pub use keys::EllipsoidId;
pub use lattice::{kissing_lattice, kissing_pairs, KissingLattice, KissingPair};
pub use population::Population;
pub use record::{ellipsoids_to_mesh, records, EllipsoidRecord, OutcomeRecord};
pub use session::{LiveFrame, LiveInput, PackingOutcome, PackingSession, StepStatus, Termination};
pub use solver::{ContactBuffer, PackingSolver, StepReport};
pub use tensor::{DegenerateOrientation, OrientationSample, Plane, Tensor};
pub use tensor_field::TensorField;
