// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Packing job files.
//!
//! ```json
//! {
//!   "boundary": { "type": "box", "min": [0, 0, 0], "max": [10, 10, 10] },
//!   "params": { "initial_number": 20, "min_radius": 0.4, "max_radius": 0.8, "max_iterations": 200 },
//!   "tensor_field": { "csv": "stress.csv", "translate": [0, 0, 5] }
//! }
//! ```
//!
//! Relative paths are resolved against the job file's directory.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use polybrick_geometry::{Boundary, BoxBoundary, Point3, SphereBoundary, Vector3};
use polybrick_packing::{PackingParams, TensorField};

use crate::obj::load_mesh_boundary;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoundarySpec {
    Box { min: [f64; 3], max: [f64; 3] },
    Sphere { center: [f64; 3], radius: f64 },
    /// Closed triangle mesh in OBJ format.
    Mesh { path: PathBuf },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TensorFieldSpec {
    pub csv: PathBuf,
    #[serde(default)]
    pub translate: Option<[f64; 3]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub boundary: BoundarySpec,
    #[serde(default)]
    pub params: PackingParams,
    #[serde(default)]
    pub tensor_field: Option<TensorFieldSpec>,
}

impl Job {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Failed to open job {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse job {}", path.display()))
    }

    pub fn boundary(&self, base: &Path) -> Result<Arc<dyn Boundary>> {
        let boundary: Arc<dyn Boundary> = match &self.boundary {
            BoundarySpec::Box { min, max } => Arc::new(BoxBoundary::new(point(min), point(max))?),
            BoundarySpec::Sphere { center, radius } => {
                Arc::new(SphereBoundary::new(point(center), *radius)?)
            }
            BoundarySpec::Mesh { path } => Arc::new(load_mesh_boundary(&base.join(path))?),
        };
        Ok(boundary)
    }

    pub fn tensor_field(&self, base: &Path) -> Result<Option<Arc<TensorField>>> {
        let spec = match &self.tensor_field {
            Some(spec) => spec,
            None => return Ok(None),
        };
        let path = base.join(&spec.csv);
        let mut field = TensorField::from_csv_path(&path)
            .with_context(|| format!("Failed to load tensor field {}", path.display()))?;
        if let Some([x, y, z]) = spec.translate {
            field = field.translated(&Vector3::new(x, y, z));
        }
        tracing::info!(
            tensors = field.len(),
            max_stress = field.max_stress(),
            threshold = field.stress_threshold(),
            "Loaded tensor field"
        );
        Ok(Some(Arc::new(field)))
    }
}

fn point(p: &[f64; 3]) -> Point3<f64> {
    Point3::new(p[0], p[1], p[2])
}
