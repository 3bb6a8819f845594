// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Immutable simulation parameters shared by every packing operation.

use std::fmt;
use std::sync::Arc;

use polybrick_geometry::{Aabb, Boundary};

use crate::error::{Error, Result};
use crate::tensor_field::TensorField;

/// Grid cells are this much larger than the largest ellipsoid diameter.
pub const CELL_SIZE_MARGIN: f64 = 1.01;

/// Allowed semi-axis lengths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusLimits {
    min: f64,
    max: f64,
}

impl RadiusLimits {
    /// Both limits must be finite and positive with `min <= max`.
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !(min.is_finite() && min > 0.0) {
            return Err(Error::invalid("min_radius", format!("{} must be positive", min)));
        }
        if !(max.is_finite() && max >= min) {
            return Err(Error::invalid(
                "max_radius",
                format!("{} must be at least min_radius {}", max, min),
            ));
        }
        Ok(Self { min, max })
    }

    #[inline]
    pub fn min(&self) -> f64 {
        self.min
    }

    #[inline]
    pub fn max(&self) -> f64 {
        self.max
    }

    /// `max - min`
    #[inline]
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Radius for a stress factor in `[0, 1]`: 0 gives `max`, 1 gives `min`.
    #[inline]
    pub fn lerp_down(&self, factor: f64) -> f64 {
        (self.max - factor.clamp(0.0, 1.0) * self.span()).clamp(self.min, self.max)
    }

    #[inline]
    pub fn contains(&self, radius: f64) -> bool {
        radius >= self.min && radius <= self.max
    }

    /// Edge length of a spatial grid cell: `2 * max * 1.01`.
    #[inline]
    pub fn cell_size(&self) -> f64 {
        2.0 * self.max * CELL_SIZE_MARGIN
    }
}

/// Everything a packing step reads but never writes.
///
/// Cloning is cheap; the boundary and tensor field are shared.
#[derive(Clone)]
pub struct SimulationContext {
    boundary: Arc<dyn Boundary>,
    bounds: Aabb,
    radii: RadiusLimits,
    tensor_field: Option<Arc<TensorField>>,
}

impl SimulationContext {
    pub fn new(boundary: Arc<dyn Boundary>, radii: RadiusLimits) -> Self {
        let bounds = boundary.bounding_box();
        Self {
            boundary,
            bounds,
            radii,
            tensor_field: None,
        }
    }

    /// Steer ellipsoid size and orientation from `field`.
    pub fn with_tensor_field(mut self, field: Arc<TensorField>) -> Self {
        self.tensor_field = Some(field);
        self
    }

    #[inline]
    pub fn boundary(&self) -> &dyn Boundary {
        self.boundary.as_ref()
    }

    /// Bounding box of the boundary, captured at construction.
    #[inline]
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    #[inline]
    pub fn radii(&self) -> &RadiusLimits {
        &self.radii
    }

    #[inline]
    pub fn tensor_field(&self) -> Option<&TensorField> {
        self.tensor_field.as_deref()
    }
}

impl fmt::Debug for SimulationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationContext")
            .field("boundary", &self.boundary)
            .field("bounds", &self.bounds)
            .field("radii", &self.radii)
            .field("tensors", &self.tensor_field.as_ref().map(|t| t.len()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_limits_validate() {
        assert!(RadiusLimits::new(0.5, 0.5).is_ok());
        assert!(RadiusLimits::new(0.0, 1.0).is_err());
        assert!(RadiusLimits::new(1.0, 0.5).is_err());
        assert!(RadiusLimits::new(0.5, f64::NAN).is_err());
    }

    #[test]
    fn lerp_down_stays_in_range() {
        let r = RadiusLimits::new(1.0, 3.0).unwrap();
        assert_eq!(r.lerp_down(0.0), 3.0);
        assert_eq!(r.lerp_down(1.0), 1.0);
        assert_eq!(r.lerp_down(0.5), 2.0);
        assert_eq!(r.lerp_down(7.0), 1.0);
        assert!((r.cell_size() - 6.06).abs() < 1e-12);
    }
}
